//! In-memory posting store.
//!
//! Reference implementation of [`PostingStore`]: same observable contract
//! as the SQLite backend, ordered maps for deterministic scans. Backs the
//! unit tests and any embedding caller that does not need durability.

use std::collections::BTreeMap;

use ahash::AHashSet;

use crate::dictionary::TermId;
use crate::errors::{EngineError, Result};
use crate::store::{validate_posting_batch, DocId, PostingStore};

#[derive(Debug, Default)]
pub struct MemoryStore {
    /// `(document_id, term_id) -> score`, ordered for deterministic scans.
    postings: BTreeMap<(DocId, TermId), f64>,
    /// `document_id -> (name, fulltext)`.
    documents: BTreeMap<DocId, (String, Option<String>)>,
    in_bulk: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PostingStore for MemoryStore {
    fn begin_bulk_insert(&mut self) -> Result<()> {
        if self.in_bulk {
            return Err(EngineError::Contract(
                "bulk-insert scope is already open".into(),
            ));
        }
        self.in_bulk = true;
        Ok(())
    }

    fn end_bulk_insert(&mut self) -> Result<()> {
        if !self.in_bulk {
            return Err(EngineError::Contract(
                "no bulk-insert scope to close".into(),
            ));
        }
        self.in_bulk = false;
        Ok(())
    }

    fn insert_document(&mut self, doc_id: DocId, name: &str, fulltext: Option<&str>) -> Result<()> {
        self.documents
            .insert(doc_id, (name.to_string(), fulltext.map(str::to_string)));
        Ok(())
    }

    fn insert_postings(&mut self, doc_id: DocId, postings: &[(TermId, f64)]) -> Result<()> {
        validate_posting_batch(doc_id, postings)?;
        for &(term_id, score) in postings {
            self.postings.insert((doc_id, term_id), score);
        }
        Ok(())
    }

    fn scan_by_term(&self, term_id: TermId) -> Result<Vec<DocId>> {
        Ok(self
            .postings
            .keys()
            .filter(|&&(_, term)| term == term_id)
            .map(|&(doc, _)| doc)
            .collect())
    }

    fn scan_by_document(&self, doc_id: DocId) -> Result<Vec<(TermId, f64)>> {
        Ok(self
            .postings
            .range((doc_id, TermId::MIN)..=(doc_id, TermId::MAX))
            .map(|(&(_, term), &score)| (term, score))
            .collect())
    }

    fn delete_by_term_ids(&mut self, term_ids: &[TermId]) -> Result<()> {
        if term_ids.is_empty() {
            return Ok(());
        }
        let doomed: AHashSet<TermId> = term_ids.iter().copied().collect();
        self.postings.retain(|&(_, term), _| !doomed.contains(&term));
        let surviving: AHashSet<DocId> = self.postings.keys().map(|&(doc, _)| doc).collect();
        self.documents.retain(|doc, _| surviving.contains(doc));
        Ok(())
    }

    fn bulk_update_scores(&mut self, updates: &[(f64, DocId, TermId)]) -> Result<()> {
        for &(score, doc_id, term_id) in updates {
            if let Some(slot) = self.postings.get_mut(&(doc_id, term_id)) {
                *slot = score;
            }
        }
        Ok(())
    }

    fn term_document_frequency(&self, term_id: TermId) -> Result<u64> {
        Ok(self
            .postings
            .keys()
            .filter(|&&(_, term)| term == term_id)
            .count() as u64)
    }

    fn term_total_frequency(&self, term_id: TermId) -> Result<f64> {
        Ok(self
            .postings
            .iter()
            .filter(|(&(_, term), _)| term == term_id)
            .map(|(_, &score)| score)
            .sum())
    }

    fn terms_below_total_frequency(&self, threshold: f64) -> Result<Vec<TermId>> {
        let mut totals: BTreeMap<TermId, f64> = BTreeMap::new();
        for (&(_, term), &score) in &self.postings {
            *totals.entry(term).or_insert(0.0) += score;
        }
        Ok(totals
            .into_iter()
            .filter(|&(_, total)| total <= threshold)
            .map(|(term, _)| term)
            .collect())
    }

    fn document_name(&self, doc_id: DocId) -> Result<Option<String>> {
        Ok(self.documents.get(&doc_id).map(|(name, _)| name.clone()))
    }

    fn document_fulltext(&self, doc_id: DocId) -> Result<Option<String>> {
        Ok(self
            .documents
            .get(&doc_id)
            .and_then(|(_, fulltext)| fulltext.clone()))
    }

    fn document_count(&self) -> Result<u64> {
        Ok(self.documents.len() as u64)
    }

    fn prepare_for_inserts(&mut self) -> Result<()> {
        Ok(())
    }

    fn prepare_for_deletes(&mut self) -> Result<()> {
        if self.in_bulk {
            self.end_bulk_insert()?;
        }
        Ok(())
    }

    fn prepare_for_updates(&mut self) -> Result<()> {
        Ok(())
    }

    fn compact(&mut self) -> Result<()> {
        Ok(())
    }
}
