//! Structured diagnostics emitted by the builder and the query engine.
//!
//! Non-fatal conditions (unknown query terms, empty result sets) are
//! reported here rather than through the error channel; callers choose
//! where they land by picking a sink.

use tracing::{info, warn};

/// A non-fatal event observed during build or query evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Inverse document frequency of one query term.
    TermIdf { term: String, idf: f64 },
    /// A query term that is not in the dictionary.
    UnknownTerm { term: String },
    /// The query was empty after tokenization and dedup.
    EmptyQuery,
    /// Every query term has zero idf; the query vector has no direction
    /// and similarities are undefined.
    QueryCarriesNoInformation,
    /// Evaluation completed but no candidate matched.
    EmptyResultSet,
}

/// Receiver for [`Diagnostic`] events.
pub trait DiagnosticSink {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Default sink: forwards diagnostics to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::TermIdf { term, idf } => info!(term = %term, idf, "query term idf"),
            Diagnostic::UnknownTerm { term } => warn!(term = %term, "query term not in index"),
            Diagnostic::EmptyQuery => warn!("query is empty"),
            Diagnostic::QueryCarriesNoInformation => {
                warn!("query carries no information (all idf values are zero)")
            }
            Diagnostic::EmptyResultSet => info!("no matching documents"),
        }
    }
}

/// Collecting sink for tests and for callers that render diagnostics
/// themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: std::sync::Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.events.lock().unwrap())
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.events.lock().unwrap().push(diagnostic);
    }
}
