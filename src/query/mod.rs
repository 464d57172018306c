//! Query evaluation against a sealed index.
//!
//! A query is a token list (normalized with the same rules as ingest).
//! Candidates come from the union — or, conjunctively, the intersection —
//! of the query terms' postings lists; each candidate's stored normalized
//! vector is dotted against the normalized query TF-IDF vector, and the
//! top-k cosine similarities win.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::dictionary::TermId;
use crate::errors::{EngineError, Result};
use crate::index::{l2_norm, InvertedIndex};
use crate::models::{QueryHit, QueryParams};
use crate::store::{DocId, PostingStore};

pub struct QueryEngine<'a, S: PostingStore> {
    index: &'a InvertedIndex<S>,
}

impl<'a, S: PostingStore> QueryEngine<'a, S> {
    pub fn new(index: &'a InvertedIndex<S>) -> Self {
        Self { index }
    }

    /// Evaluate one query and return up to `params.top_k` hits, best first.
    ///
    /// Ties on similarity break by ascending document id, so results are
    /// deterministic for a given index state. Unknown terms, empty
    /// queries, and zero-information queries are reported to `sink` and
    /// produce empty result sets rather than errors.
    pub fn query(
        &self,
        tokens: &[String],
        params: QueryParams,
        sink: &dyn DiagnosticSink,
    ) -> Result<Vec<QueryHit>> {
        // dedup, preserving first-occurrence order so terms[i] stays
        // aligned with term_ids[i]
        let mut seen: AHashSet<&str> = AHashSet::new();
        let terms: Vec<&str> = tokens
            .iter()
            .map(String::as_str)
            .filter(|term| seen.insert(*term))
            .collect();
        if terms.is_empty() {
            sink.emit(Diagnostic::EmptyQuery);
            return Ok(Vec::new());
        }

        // resolve without touching the dictionary; unknown terms keep the
        // None sentinel and an empty postings list
        let term_ids: Vec<Option<TermId>> = terms
            .iter()
            .map(|term| self.index.term_id(term))
            .collect();

        // query tf-idf vector: tf is 1 for every (deduped) term
        let mut weights: Vec<f64> = Vec::with_capacity(terms.len());
        for (term, &term_id) in terms.iter().zip(&term_ids) {
            if term_id.is_none() {
                sink.emit(Diagnostic::UnknownTerm {
                    term: term.to_string(),
                });
            }
            let idf = self.index.idf(term_id)?;
            sink.emit(Diagnostic::TermIdf {
                term: term.to_string(),
                idf,
            });
            weights.push(idf);
        }
        let norm = l2_norm(weights.iter().copied());
        if norm == 0.0 {
            // every idf is zero: the query vector has no direction and
            // cosine against it is undefined, so report rather than
            // produce NaN
            sink.emit(Diagnostic::QueryCarriesNoInformation);
            return Ok(Vec::new());
        }
        let query_vector: Vec<(TermId, f64)> = term_ids
            .iter()
            .zip(&weights)
            .filter_map(|(&term_id, &weight)| term_id.map(|id| (id, weight / norm)))
            .collect();

        let candidates = if params.conjunctive {
            self.conjunctive_candidates(&term_ids)?
        } else {
            self.disjunctive_candidates(&term_ids)?
        };

        let ranked = self.top_k(&candidates, &query_vector, params.top_k)?;
        if ranked.is_empty() {
            sink.emit(Diagnostic::EmptyResultSet);
            return Ok(Vec::new());
        }

        let mut hits = Vec::with_capacity(ranked.len());
        for (doc_id, similarity) in ranked {
            let document_name = self.index.document_name(doc_id)?.ok_or_else(|| {
                EngineError::Corrupt(format!("document {doc_id} has postings but no name"))
            })?;
            let fulltext = if params.want_fulltext {
                self.index.document_fulltext(doc_id)?
            } else {
                None
            };
            hits.push(QueryHit {
                doc_id,
                document_name,
                similarity,
                fulltext,
            });
        }
        Ok(hits)
    }

    /// Documents containing any query term, in first-seen order.
    fn disjunctive_candidates(&self, term_ids: &[Option<TermId>]) -> Result<Vec<DocId>> {
        let mut seen: AHashSet<DocId> = AHashSet::new();
        let mut candidates = Vec::new();
        for term_id in term_ids.iter().copied().flatten() {
            for doc_id in self.index.postings_list(term_id)? {
                if seen.insert(doc_id) {
                    candidates.push(doc_id);
                }
            }
        }
        Ok(candidates)
    }

    /// Documents containing all query terms. An unknown term empties the
    /// set immediately: no document can contain it.
    fn conjunctive_candidates(&self, term_ids: &[Option<TermId>]) -> Result<Vec<DocId>> {
        let mut known = Vec::with_capacity(term_ids.len());
        for term_id in term_ids {
            match term_id {
                Some(id) => known.push(*id),
                None => return Ok(Vec::new()),
            }
        }
        let mut ids = known.into_iter();
        let Some(first) = ids.next() else {
            return Ok(Vec::new());
        };
        let mut current: AHashSet<DocId> = self.index.postings_list(first)?.into_iter().collect();
        for term_id in ids {
            if current.is_empty() {
                break;
            }
            let postings: AHashSet<DocId> =
                self.index.postings_list(term_id)?.into_iter().collect();
            current.retain(|doc_id| postings.contains(doc_id));
        }
        let mut candidates: Vec<DocId> = current.into_iter().collect();
        candidates.sort_unstable();
        Ok(candidates)
    }

    /// Score candidates and select the top k with a bounded min-heap:
    /// O(C log K) over C candidates.
    fn top_k(
        &self,
        candidates: &[DocId],
        query_vector: &[(TermId, f64)],
        k: usize,
    ) -> Result<Vec<(DocId, f64)>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        // min-heap keyed on (score, Reverse(doc_id)): the worst entry is
        // the lowest score, largest doc id
        let mut heap: BinaryHeap<Reverse<(FloatOrd, Reverse<DocId>)>> =
            BinaryHeap::with_capacity(k + 1);
        for &doc_id in candidates {
            let vector: AHashMap<TermId, f64> =
                self.index.document_vector(doc_id)?.into_iter().collect();
            let cosine: f64 = query_vector
                .iter()
                .map(|&(term_id, weight)| weight * vector.get(&term_id).copied().unwrap_or(0.0))
                .sum();
            let entry = Reverse((FloatOrd(cosine), Reverse(doc_id)));
            if heap.len() < k {
                heap.push(entry);
            } else if let Some(worst) = heap.peek() {
                if entry < *worst {
                    heap.pop();
                    heap.push(entry);
                }
            }
        }
        let mut ranked: Vec<(DocId, f64)> = heap
            .into_iter()
            .map(|Reverse((FloatOrd(score), Reverse(doc_id)))| (doc_id, score))
            .collect();
        ranked.sort_unstable_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        Ok(ranked)
    }
}

/// Total order over f64 scores (NaN never occurs: inputs are finite
/// normalized weights).
#[derive(PartialEq)]
struct FloatOrd(f64);

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}
