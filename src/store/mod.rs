//! Posting storage backends.
//!
//! The sparse term-document matrix lives behind the [`PostingStore`] trait
//! so backends are substitutable: [`SqliteStore`] is the durable engine
//! used by the CLI, [`MemoryStore`] is the in-memory reference model used
//! by tests.
//!
//! # Index scheduling
//!
//! Auxiliary indices are *not* free: building them before the bulk-insert
//! phase, or failing to build them before the delete/update phases, slows
//! a realistic build by two to three orders of magnitude. The preparation
//! hooks encode the required order:
//!
//! | phase   | hook                  | indices built                        |
//! |---------|-----------------------|--------------------------------------|
//! | ingest  | `prepare_for_inserts` | none                                 |
//! | prune   | `prepare_for_deletes` | `term_id`                            |
//! | scoring | `prepare_for_updates` | `document_id`, `(document_id, term_id)` |
//!
//! Callers must invoke the hook for a phase before entering it.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use ahash::AHashSet;

use crate::dictionary::TermId;
use crate::errors::{EngineError, Result};

/// Dense identifier of a document, assigned in ingest order starting at 0.
pub type DocId = u32;

/// Durable storage of `(document_id, term_id, score)` posting triples plus
/// the document table (`document_id -> (name, fulltext)`).
///
/// Each `(document_id, term_id)` pair appears at most once; violating that
/// is a producer bug surfaced as [`EngineError::Contract`]. Deleting a
/// document's last posting removes its document-table row in the same
/// logical operation.
pub trait PostingStore {
    /// Open a high-throughput insertion epoch: all inserts until
    /// [`end_bulk_insert`](Self::end_bulk_insert) form one logical
    /// transaction.
    fn begin_bulk_insert(&mut self) -> Result<()>;

    /// Commit the insertion epoch opened by
    /// [`begin_bulk_insert`](Self::begin_bulk_insert).
    fn end_bulk_insert(&mut self) -> Result<()>;

    /// Insert the document-table row for `doc_id`.
    fn insert_document(&mut self, doc_id: DocId, name: &str, fulltext: Option<&str>) -> Result<()>;

    /// Append postings for one document.
    fn insert_postings(&mut self, doc_id: DocId, postings: &[(TermId, f64)]) -> Result<()>;

    /// Postings list of a term: ids of documents containing it. Order is
    /// unspecified but deterministic for a given store state.
    fn scan_by_term(&self, term_id: TermId) -> Result<Vec<DocId>>;

    /// Term vector of a document.
    fn scan_by_document(&self, doc_id: DocId) -> Result<Vec<(TermId, f64)>>;

    /// Delete all postings whose term id is in `term_ids`, cascading
    /// document-table rows for documents left without postings.
    fn delete_by_term_ids(&mut self, term_ids: &[TermId]) -> Result<()>;

    /// Overwrite scores of matching `(score, document_id, term_id)` rows.
    /// Non-existent pairs are silently ignored.
    fn bulk_update_scores(&mut self, updates: &[(f64, DocId, TermId)]) -> Result<()>;

    /// Number of distinct documents containing the term.
    fn term_document_frequency(&self, term_id: TermId) -> Result<u64>;

    /// Sum of the term's scores; equals its corpus frequency before the
    /// scoring phase rewrites counts.
    fn term_total_frequency(&self, term_id: TermId) -> Result<f64>;

    /// Ids of all terms whose total score is `<= threshold` (inclusive).
    fn terms_below_total_frequency(&self, threshold: f64) -> Result<Vec<TermId>>;

    fn document_name(&self, doc_id: DocId) -> Result<Option<String>>;

    fn document_fulltext(&self, doc_id: DocId) -> Result<Option<String>>;

    /// Number of rows currently in the document table.
    fn document_count(&self) -> Result<u64>;

    /// Commit pending work; the ingest phase needs no auxiliary indices.
    fn prepare_for_inserts(&mut self) -> Result<()>;

    /// Commit pending work and build the `term_id` index for fast deletes.
    fn prepare_for_deletes(&mut self) -> Result<()>;

    /// Build the `document_id` and covering indices for fast updates.
    fn prepare_for_updates(&mut self) -> Result<()>;

    /// Release dead space and optimize for reads. Called once at sealing.
    fn compact(&mut self) -> Result<()>;
}

/// Producer-contract checks shared by all backends: scores must be
/// non-negative and a term may appear at most once per batch.
pub(crate) fn validate_posting_batch(doc_id: DocId, postings: &[(TermId, f64)]) -> Result<()> {
    let mut seen: AHashSet<TermId> = AHashSet::with_capacity(postings.len());
    for &(term_id, score) in postings {
        if score < 0.0 {
            return Err(EngineError::Contract(format!(
                "negative score {score} for (document {doc_id}, term {term_id})"
            )));
        }
        if !seen.insert(term_id) {
            return Err(EngineError::Contract(format!(
                "duplicate posting (document {doc_id}, term {term_id})"
            )));
        }
    }
    Ok(())
}
