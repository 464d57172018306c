//! SQLite-backed posting store.
//!
//! The schema mirrors the relational sparse-matrix layout: a bare
//! `doc_term_table(document_id, term_id, score)` with no constraints —
//! uniqueness of `(document_id, term_id)` is the producer's contract, and
//! keeping the table index-free during ingest is what makes bulk inserts
//! fast — plus a `document_table` keyed by document id. Auxiliary indices
//! are created exclusively by the phase-preparation hooks (see the module
//! docs in [`crate::store`]).

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::dictionary::TermId;
use crate::errors::{EngineError, Result};
use crate::store::{validate_posting_batch, DocId, PostingStore};

const SCHEMA: &str = "
CREATE TABLE doc_term_table(
    document_id INTEGER,
    term_id INTEGER,
    score REAL
);

CREATE TABLE document_table(
    document_id INTEGER PRIMARY KEY,
    document_name TEXT NOT NULL,
    fulltext TEXT
);
";

// Build-profile pragmas: durability is deliberately traded away. A build
// interrupted mid-phase leaves the store undefined and must be discarded.
const PRAGMAS: &str = "
PRAGMA synchronous=OFF;
PRAGMA secure_delete=FALSE;
PRAGMA page_size=4096;
";

fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    // journal_mode replies with the resulting mode, so it goes through the
    // query path
    conn.query_row("PRAGMA journal_mode=OFF", [], |_| Ok(()))?;
    conn.execute_batch(PRAGMAS)
}

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    in_bulk: bool,
}

impl SqliteStore {
    /// Create a fresh store file. Refuses to clobber existing state.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(EngineError::Config(format!(
                "store file already exists: {}",
                path.display()
            )));
        }
        let conn = Connection::open(path)?;
        apply_pragmas(&conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            in_bulk: false,
        })
    }

    /// Open an existing store read-mostly (the query path).
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EngineError::Config(format!(
                "no store file at {}",
                path.display()
            )));
        }
        let conn = Connection::open(path)?;
        apply_pragmas(&conn)?;
        let store = Self {
            conn,
            in_bulk: false,
        };
        store.check_schema(path)?;
        Ok(store)
    }

    /// In-memory store with the same schema; used by tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            in_bulk: false,
        })
    }

    fn check_schema(&self, path: &Path) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type = 'table'
             AND name IN ('doc_term_table', 'document_table')",
            [],
            |row| row.get(0),
        )?;
        if tables != 2 {
            return Err(EngineError::Corrupt(format!(
                "{} is not an index store (expected doc_term_table and document_table)",
                path.display()
            )));
        }
        Ok(())
    }

    fn create_index(&self, name: &str, columns: &str) -> Result<()> {
        debug!(name, columns, "creating auxiliary index");
        self.conn.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS {name} ON doc_term_table ({columns})"
        ))?;
        Ok(())
    }
}

impl PostingStore for SqliteStore {
    fn begin_bulk_insert(&mut self) -> Result<()> {
        if self.in_bulk {
            return Err(EngineError::Contract(
                "bulk-insert scope is already open".into(),
            ));
        }
        self.conn.execute_batch("BEGIN")?;
        self.in_bulk = true;
        Ok(())
    }

    fn end_bulk_insert(&mut self) -> Result<()> {
        if !self.in_bulk {
            return Err(EngineError::Contract(
                "no bulk-insert scope to close".into(),
            ));
        }
        self.conn.execute_batch("COMMIT")?;
        self.in_bulk = false;
        Ok(())
    }

    fn insert_document(&mut self, doc_id: DocId, name: &str, fulltext: Option<&str>) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO document_table VALUES (?1, ?2, ?3)")?;
        stmt.execute(params![doc_id, name, fulltext])?;
        Ok(())
    }

    fn insert_postings(&mut self, doc_id: DocId, postings: &[(TermId, f64)]) -> Result<()> {
        validate_posting_batch(doc_id, postings)?;
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO doc_term_table VALUES (?1, ?2, ?3)")?;
        for &(term_id, score) in postings {
            stmt.execute(params![doc_id, term_id, score])?;
        }
        Ok(())
    }

    fn scan_by_term(&self, term_id: TermId) -> Result<Vec<DocId>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT document_id FROM doc_term_table WHERE term_id = ?1")?;
        let rows = stmt.query_map([term_id], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<DocId>>>()?)
    }

    fn scan_by_document(&self, doc_id: DocId) -> Result<Vec<(TermId, f64)>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT term_id, score FROM doc_term_table WHERE document_id = ?1")?;
        let rows = stmt.query_map([doc_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<(TermId, f64)>>>()?)
    }

    fn delete_by_term_ids(&mut self, term_ids: &[TermId]) -> Result<()> {
        if term_ids.is_empty() {
            return Ok(());
        }
        self.conn.execute_batch("BEGIN")?;
        {
            let mut stmt = self
                .conn
                .prepare_cached("DELETE FROM doc_term_table WHERE term_id = ?1")?;
            for &term_id in term_ids {
                stmt.execute([term_id])?;
            }
        }
        // Cascade: documents whose last posting just disappeared lose their
        // document-table row inside the same transaction.
        self.conn.execute(
            "DELETE FROM document_table
             WHERE document_id NOT IN (SELECT document_id FROM doc_term_table)",
            [],
        )?;
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn bulk_update_scores(&mut self, updates: &[(f64, DocId, TermId)]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        self.conn.execute_batch("BEGIN")?;
        {
            let mut stmt = self.conn.prepare_cached(
                "UPDATE doc_term_table SET score = ?1
                 WHERE document_id = ?2 AND term_id = ?3",
            )?;
            for &(score, doc_id, term_id) in updates {
                stmt.execute(params![score, doc_id, term_id])?;
            }
        }
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn term_document_frequency(&self, term_id: TermId) -> Result<u64> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT COUNT(*) FROM doc_term_table WHERE term_id = ?1")?;
        let count: i64 = stmt.query_row([term_id], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn term_total_frequency(&self, term_id: TermId) -> Result<f64> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT TOTAL(score) FROM doc_term_table WHERE term_id = ?1")?;
        Ok(stmt.query_row([term_id], |row| row.get(0))?)
    }

    fn terms_below_total_frequency(&self, threshold: f64) -> Result<Vec<TermId>> {
        let mut stmt = self.conn.prepare(
            "SELECT term_id FROM doc_term_table
             GROUP BY term_id HAVING TOTAL(score) <= ?1",
        )?;
        let rows = stmt.query_map([threshold], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<TermId>>>()?)
    }

    fn document_name(&self, doc_id: DocId) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT document_name FROM document_table WHERE document_id = ?1")?;
        Ok(stmt.query_row([doc_id], |row| row.get(0)).optional()?)
    }

    fn document_fulltext(&self, doc_id: DocId) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT fulltext FROM document_table WHERE document_id = ?1")?;
        let text: Option<Option<String>> =
            stmt.query_row([doc_id], |row| row.get(0)).optional()?;
        Ok(text.flatten())
    }

    fn document_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM document_table", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn prepare_for_inserts(&mut self) -> Result<()> {
        // Ingest runs fastest against a bare table; nothing to build.
        debug!("store prepared for inserts (no auxiliary indices)");
        Ok(())
    }

    fn prepare_for_deletes(&mut self) -> Result<()> {
        if self.in_bulk {
            self.end_bulk_insert()?;
        }
        self.create_index("term_id_index", "term_id")
    }

    fn prepare_for_updates(&mut self) -> Result<()> {
        self.create_index("document_id_index", "document_id")?;
        self.create_index("covering_index", "document_id, term_id")
    }

    fn compact(&mut self) -> Result<()> {
        debug!("compacting store");
        self.conn.execute_batch("ANALYZE; VACUUM;")?;
        Ok(())
    }
}
