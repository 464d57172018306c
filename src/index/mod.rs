//! Inverted-index construction and access.
//!
//! [`InvertedIndex::build`] runs the three-phase pipeline over a streaming
//! document source:
//!
//! 1. **ingest** — every document inserted with raw term counts, inside a
//!    single bulk-insert epoch against an index-free table;
//! 2. **prune** — terms at or below the frequency threshold removed,
//!    orphaned documents cascaded away;
//! 3. **score** — raw counts rewritten in place as L2-normalized TF-IDF.
//!
//! The phases are strictly sequenced and each one asks the store to
//! prepare its auxiliary indices first; doing that in any other order
//! costs orders of magnitude on realistic corpora (see [`crate::store`]).
//! After scoring, the index is sealed: queries only take `&self`.

pub mod sidecar;

use std::path::Path;

use ahash::{AHashMap, AHashSet};
use tracing::info;

use crate::dictionary::{TermDictionary, TermId};
use crate::errors::Result;
use crate::models::DocumentRecord;
use crate::store::{DocId, PostingStore};

/// Scoring updates are pushed to the store in batches of this many
/// documents.
const FLUSH_EVERY_DOCS: u32 = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Inclusive prune bound: a term whose total corpus frequency is at or
    /// below this is dropped.
    pub frequency_threshold: u32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            frequency_threshold: 5,
        }
    }
}

/// A sealed (or in-construction) inverted index: posting store, term
/// dictionary, and the frozen end-of-ingest document count.
pub struct InvertedIndex<S: PostingStore> {
    store: S,
    dictionary: TermDictionary,
    /// Document count at end of ingest. Frozen: the idf denominator keeps
    /// using it even after prune removes documents.
    num_documents: u32,
}

impl<S: PostingStore> InvertedIndex<S> {
    /// Build an index from a document stream and seal it.
    pub fn build<I>(mut store: S, documents: I, options: BuildOptions) -> Result<Self>
    where
        I: IntoIterator<Item = Result<DocumentRecord>>,
    {
        let mut dictionary = TermDictionary::new();
        store.prepare_for_inserts()?;
        let num_documents = ingest(&mut store, &mut dictionary, documents)?;
        let mut index = Self {
            store,
            dictionary,
            num_documents,
        };
        index.prune(options.frequency_threshold)?;
        index.score()?;
        index.store.compact()?;
        info!(
            documents = index.store.document_count()?,
            terms = index.dictionary.len(),
            "index sealed"
        );
        Ok(index)
    }

    /// Reopen a previously built index from its store and sidecar file.
    pub fn open(store: S, sidecar_path: &Path) -> Result<Self> {
        let (dictionary, num_documents) = sidecar::read(sidecar_path)?;
        Ok(Self {
            store,
            dictionary,
            num_documents,
        })
    }

    /// Persist the metadata needed to reopen this index.
    pub fn write_sidecar(&self, path: &Path) -> Result<()> {
        sidecar::write(path, &self.dictionary, self.num_documents)
    }

    /// Remove infrequent terms from store and dictionary.
    fn prune(&mut self, threshold: u32) -> Result<()> {
        self.store.prepare_for_deletes()?;
        let infrequent = self
            .store
            .terms_below_total_frequency(f64::from(threshold))?;
        if infrequent.is_empty() {
            return Ok(());
        }
        self.store.delete_by_term_ids(&infrequent)?;
        let ids: AHashSet<TermId> = infrequent.iter().copied().collect();
        self.dictionary.remove_by_ids(&ids);
        info!(
            removed_terms = infrequent.len(),
            surviving_documents = self.store.document_count()?,
            "prune complete"
        );
        Ok(())
    }

    /// Rewrite raw frequency counts as L2-normalized TF-IDF weights.
    fn score(&mut self) -> Result<()> {
        self.store.prepare_for_updates()?;
        let mut updates: Vec<(f64, DocId, TermId)> = Vec::new();
        let mut scored: u32 = 0;
        for doc_id in 0..self.num_documents {
            let frequencies = self.store.scan_by_document(doc_id)?;
            if frequencies.is_empty() {
                // pruned away
                continue;
            }
            let mut tfidfs: Vec<(TermId, f64)> = Vec::with_capacity(frequencies.len());
            for (term_id, frequency) in frequencies {
                tfidfs.push((term_id, frequency * self.idf(Some(term_id))?));
            }
            let norm = l2_norm(tfidfs.iter().map(|&(_, tfidf)| tfidf));
            // a document whose every term has zero idf keeps its zero
            // tfidf components unnormalized
            let denom = if norm > 0.0 { norm } else { 1.0 };
            for (term_id, tfidf) in tfidfs {
                updates.push((tfidf / denom, doc_id, term_id));
            }
            scored += 1;
            if scored % FLUSH_EVERY_DOCS == 0 {
                self.store.bulk_update_scores(&updates)?;
                updates.clear();
            }
        }
        self.store.bulk_update_scores(&updates)?;
        info!(documents = scored, "scoring complete");
        Ok(())
    }

    /// Inverse document frequency: `log2(N / max(df, 1))` with `N` the
    /// frozen end-of-ingest document count. `None` is the unknown-term
    /// sentinel and scores as `df = 0`.
    pub fn idf(&self, term_id: Option<TermId>) -> Result<f64> {
        if self.num_documents == 0 {
            return Ok(0.0);
        }
        let df = match term_id {
            Some(id) => self.store.term_document_frequency(id)?,
            None => 0,
        };
        Ok((f64::from(self.num_documents) / df.max(1) as f64).log2())
    }

    /// Resolve a term without side effects; unknown terms stay unknown.
    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.dictionary.lookup(term)
    }

    /// Ids of documents containing the term.
    pub fn postings_list(&self, term_id: TermId) -> Result<Vec<DocId>> {
        self.store.scan_by_term(term_id)
    }

    /// Normalized term vector of a document.
    pub fn document_vector(&self, doc_id: DocId) -> Result<Vec<(TermId, f64)>> {
        self.store.scan_by_document(doc_id)
    }

    pub fn document_name(&self, doc_id: DocId) -> Result<Option<String>> {
        self.store.document_name(doc_id)
    }

    pub fn document_fulltext(&self, doc_id: DocId) -> Result<Option<String>> {
        self.store.document_fulltext(doc_id)
    }

    /// Document count at end of ingest (pre-prune).
    pub fn num_documents(&self) -> u32 {
        self.num_documents
    }

    pub fn dictionary(&self) -> &TermDictionary {
        &self.dictionary
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Phase 1: stream documents into the store inside one bulk epoch.
///
/// Memory stays O(distinct terms of the current document); the stream is
/// never materialized.
fn ingest<S, I>(store: &mut S, dictionary: &mut TermDictionary, documents: I) -> Result<u32>
where
    S: PostingStore,
    I: IntoIterator<Item = Result<DocumentRecord>>,
{
    store.begin_bulk_insert()?;
    let mut next_doc: u32 = 0;
    for record in documents {
        let record = record?;
        let mut counts: AHashMap<TermId, f64> = AHashMap::new();
        for token in &record.tokens {
            *counts.entry(dictionary.intern(token)).or_insert(0.0) += 1.0;
        }
        let postings: Vec<(TermId, f64)> = counts.into_iter().collect();
        store.insert_document(next_doc, &record.name, record.fulltext.as_deref())?;
        store.insert_postings(next_doc, &postings)?;
        next_doc += 1;
    }
    store.end_bulk_insert()?;
    info!(
        documents = next_doc,
        distinct_terms = dictionary.len(),
        "ingest complete"
    );
    Ok(next_doc)
}

/// L2 norm of a numeric vector.
pub(crate) fn l2_norm(values: impl Iterator<Item = f64>) -> f64 {
    values.map(|v| v * v).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn record(name: &str, tokens: &[&str]) -> Result<DocumentRecord> {
        Ok(DocumentRecord {
            name: name.to_string(),
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            fulltext: None,
        })
    }

    fn build(docs: Vec<Result<DocumentRecord>>, threshold: u32) -> InvertedIndex<MemoryStore> {
        InvertedIndex::build(
            MemoryStore::new(),
            docs,
            BuildOptions {
                frequency_threshold: threshold,
            },
        )
        .unwrap()
    }

    #[test]
    fn document_ids_follow_arrival_order() {
        let index = build(
            vec![
                record("first", &["aa", "bb"]),
                record("second", &["aa"]),
                record("third", &["bb", "cc"]),
            ],
            0,
        );
        assert_eq!(index.document_name(0).unwrap().as_deref(), Some("first"));
        assert_eq!(index.document_name(1).unwrap().as_deref(), Some("second"));
        assert_eq!(index.document_name(2).unwrap().as_deref(), Some("third"));
        assert_eq!(index.num_documents(), 3);
    }

    #[test]
    fn scores_are_l2_normalized_tfidf() {
        // docA: a b b c, docB: a b d
        let index = build(
            vec![
                record("docA", &["a", "b", "b", "c"]),
                record("docB", &["a", "b", "d"]),
            ],
            0,
        );
        for doc_id in 0..2 {
            let sum_sq: f64 = index
                .document_vector(doc_id)
                .unwrap()
                .iter()
                .map(|&(_, score)| score * score)
                .sum();
            assert!((sum_sq - 1.0).abs() < 1e-9, "doc {doc_id}: {sum_sq}");
        }
        // idf(a) = idf(b) = log2(2/2) = 0, idf(c) = idf(d) = 1, so each
        // document's vector collapses onto its discriminative term
        let a = index.term_id("a").unwrap();
        let c = index.term_id("c").unwrap();
        let vec_a: AHashMap<TermId, f64> =
            index.document_vector(0).unwrap().into_iter().collect();
        assert!((vec_a[&c] - 1.0).abs() < 1e-9);
        assert!(vec_a[&a].abs() < 1e-9);
    }

    #[test]
    fn prune_is_inclusive_and_cascades_documents() {
        // three documents with distinct unique tokens, threshold 5:
        // every term total is 1 <= 5, so everything is pruned
        let index = build(
            vec![
                record("d0", &["unique0"]),
                record("d1", &["unique1"]),
                record("d2", &["unique2"]),
            ],
            5,
        );
        assert_eq!(index.store().document_count().unwrap(), 0);
        assert!(index.dictionary().is_empty());
        // the frozen ingest count is unaffected
        assert_eq!(index.num_documents(), 3);
    }

    #[test]
    fn prune_boundary_total_equal_to_threshold_is_removed() {
        // "pair" appears twice in total, "solo" once
        let index = build(
            vec![record("d0", &["pair", "solo"]), record("d1", &["pair"])],
            2,
        );
        assert_eq!(index.term_id("pair"), None);
        assert_eq!(index.term_id("solo"), None);
        // a term one above the boundary survives
        let index = build(
            vec![record("d0", &["pair", "pair", "pair"]), record("d1", &["pair"])],
            3,
        );
        assert!(index.term_id("pair").is_some());
    }

    #[test]
    fn surviving_terms_exceed_threshold_strictly() {
        let docs = vec![
            record("d0", &["common", "common", "rare"]),
            record("d1", &["common", "common"]),
            record("d2", &["common"]),
        ];
        let index = build(docs, 2);
        // common: total 5 > 2 survives; rare: total 1 <= 2 pruned
        let common = index.term_id("common").unwrap();
        assert!(index.store().term_total_frequency(common).unwrap() > 0.0);
        assert_eq!(index.term_id("rare"), None);
    }

    #[test]
    fn idf_uses_pre_prune_document_count() {
        // d2 is orphaned by the prune, but N stays 3
        let index = build(
            vec![
                record("d0", &["kept", "kept", "kept"]),
                record("d1", &["kept", "kept", "kept"]),
                record("d2", &["gone"]),
            ],
            2,
        );
        assert_eq!(index.store().document_count().unwrap(), 2);
        let kept = index.term_id("kept").unwrap();
        let idf = index.idf(Some(kept)).unwrap();
        assert!((idf - (3.0f64 / 2.0).log2()).abs() < 1e-12);
    }

    #[test]
    fn unknown_term_idf_is_finite() {
        let index = build(vec![record("d0", &["known", "known"])], 1);
        let idf = index.idf(None).unwrap();
        assert!((idf - 0.0).abs() < 1e-12); // log2(1/1)
        assert!(idf.is_finite());
    }

    #[test]
    fn empty_stream_builds_empty_index() {
        let index = build(vec![], 5);
        assert_eq!(index.num_documents(), 0);
        assert_eq!(index.store().document_count().unwrap(), 0);
        assert_eq!(index.idf(None).unwrap(), 0.0);
    }

    #[test]
    fn producer_errors_abort_the_build() {
        let docs = vec![
            record("ok", &["token"]),
            Err(crate::errors::EngineError::Contract("boom".into())),
        ];
        let result = InvertedIndex::build(MemoryStore::new(), docs, BuildOptions::default());
        assert!(result.is_err());
    }
}
