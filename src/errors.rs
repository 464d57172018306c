//! Error types for the index engine.
//!
//! Four fault kinds cross the library boundary: configuration faults,
//! storage faults (I/O and corrupt state), and contract violations.
//! Query warnings are not errors; they flow through the diagnostic sink
//! (see [`crate::diagnostics`]) and evaluation continues.

use std::path::PathBuf;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Missing or incompatible parameters, or a fresh build requested over
    /// existing state. Fatal at startup; nothing is written.
    #[error("configuration error: {0}")]
    Config(String),

    /// The underlying storage engine failed. A build in progress leaves the
    /// store in an undefined state and must be discarded.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// I/O failure outside the storage engine (archive files, sidecar).
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Existing on-disk state that cannot be interpreted.
    #[error("corrupt index: {0}")]
    Corrupt(String),

    /// An invariant violated by the producer (duplicate postings, negative
    /// counts). Indicates a bug, not a user error.
    #[error("contract violation: {0}")]
    Contract(String),
}

impl EngineError {
    /// I/O fault tagged with the path (or pseudo-path) it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }
}
