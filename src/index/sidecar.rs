//! Sidecar metadata persisted next to the store file.
//!
//! The store alone is not reopenable: query evaluation needs the term
//! dictionary and the end-of-ingest document count. Both are written here
//! as a small versioned JSON record at end-of-build and loaded read-only
//! at query-open time.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dictionary::{TermDictionary, TermId};
use crate::errors::{EngineError, Result};

const MAGIC: &str = "fqix";
const VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Sidecar {
    magic: String,
    version: u32,
    num_documents: u32,
    next_term_id: TermId,
    terms: Vec<(String, TermId)>,
}

/// Serialize the dictionary and document count to `path`, replacing any
/// previous sidecar.
pub fn write(path: &Path, dictionary: &TermDictionary, num_documents: u32) -> Result<()> {
    let sidecar = Sidecar {
        magic: MAGIC.to_string(),
        version: VERSION,
        num_documents,
        next_term_id: dictionary.next_term_id(),
        terms: dictionary
            .entries()
            .map(|(term, id)| (term.to_string(), id))
            .collect(),
    };
    let body = serde_json::to_string(&sidecar)
        .map_err(|e| EngineError::Corrupt(format!("cannot serialize sidecar: {e}")))?;
    fs::write(path, body).map_err(|e| EngineError::io(path, e))
}

/// Load and validate a sidecar, yielding the reopened dictionary and the
/// end-of-ingest document count.
pub fn read(path: &Path) -> Result<(TermDictionary, u32)> {
    let body = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
    let sidecar: Sidecar = serde_json::from_str(&body)
        .map_err(|e| EngineError::Corrupt(format!("{}: {e}", path.display())))?;
    if sidecar.magic != MAGIC {
        return Err(EngineError::Corrupt(format!(
            "{}: not an index sidecar",
            path.display()
        )));
    }
    if sidecar.version != VERSION {
        return Err(EngineError::Corrupt(format!(
            "{}: unsupported sidecar version {}",
            path.display(),
            sidecar.version
        )));
    }
    let dictionary = TermDictionary::from_entries(sidecar.terms, sidecar.next_term_id);
    Ok((dictionary, sidecar.num_documents))
}
