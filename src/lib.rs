//! # forumquery
//!
//! forumquery builds and queries an inverted index over large corpora of
//! short forum comments, ranking documents against free-text queries under
//! a cosine/TF-IDF model.
//!
//! The crate provides both a command-line interface and a library that can
//! be used programmatically in other Rust applications.
//!
//! ## Architecture
//!
//! - [`corpus`] streams pre-tokenized documents out of monthly archive
//!   files;
//! - [`store`] keeps the sparse term-document matrix behind the
//!   [`PostingStore`] trait (SQLite-backed by default);
//! - [`index`] runs the three-phase build pipeline — ingest, prune,
//!   score — and seals the result;
//! - [`query`] evaluates queries against a sealed index.
//!
//! ## Example
//!
//! ```
//! use forumquery::{BuildOptions, InvertedIndex, MemoryStore, QueryEngine, QueryParams};
//! use forumquery::{DocumentRecord, MemorySink};
//!
//! let documents = vec![
//!     Ok(DocumentRecord {
//!         name: "c1".to_string(),
//!         tokens: vec!["rust".to_string(), "search".to_string()],
//!         fulltext: None,
//!     }),
//!     Ok(DocumentRecord {
//!         name: "c2".to_string(),
//!         tokens: vec!["rust".to_string(), "games".to_string()],
//!         fulltext: None,
//!     }),
//! ];
//! let index = InvertedIndex::build(
//!     MemoryStore::new(),
//!     documents,
//!     BuildOptions { frequency_threshold: 0 },
//! )?;
//!
//! let engine = QueryEngine::new(&index);
//! let sink = MemorySink::new();
//! let hits = engine.query(&["search".to_string()], QueryParams::default(), &sink)?;
//! assert_eq!(hits[0].document_name, "c1");
//! # Ok::<(), forumquery::EngineError>(())
//! ```

pub mod corpus;
pub mod diagnostics;
pub mod dictionary;
pub mod errors;
pub mod index;
pub mod models;
pub mod query;
pub mod store;

// Re-export commonly used types for convenience
pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, TracingSink};
pub use dictionary::{TermDictionary, TermId};
pub use errors::{EngineError, Result};
pub use index::{BuildOptions, InvertedIndex};
pub use models::{DocumentRecord, QueryHit, QueryParams};
pub use query::QueryEngine;
pub use store::{DocId, MemoryStore, PostingStore, SqliteStore};
