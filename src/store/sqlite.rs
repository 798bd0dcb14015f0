//! SQLite-backed document store
//!
//! One database file holds the corpus: document rows, an FTS5 mirror for
//! lexical search, and embedding blobs for semantic search. The store
//! implements the two retrieval seams the pipeline consumes; writes only
//! happen through the indexing path.

use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::errors::Result;
use crate::search::types::{FullTextIndex, LexicalRow, VectorIndex, VectorRow};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    id          TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    path        TEXT NOT NULL,
    body        TEXT NOT NULL,
    hash        TEXT NOT NULL,
    indexed_at  TEXT NOT NULL
);

CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
    id UNINDEXED,
    title,
    body
);

CREATE TABLE IF NOT EXISTS embeddings (
    doc_id  TEXT PRIMARY KEY,
    dim     INTEGER NOT NULL,
    vector  BLOB NOT NULL
);
";

/// A document row as written by the indexer.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: String,
    pub title: String,
    pub path: String,
    pub body: String,
    pub hash: String,
}

/// Corpus counters for the status command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusStats {
    pub documents: usize,
    pub embedded: usize,
}

pub struct DocumentStore {
    conn: Mutex<Connection>,
}

impl DocumentStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("document store lock poisoned")
    }

    /// Insert or replace a document and its FTS mirror row.
    pub fn upsert_document(&self, doc: &StoredDocument) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO documents (id, title, path, body, hash, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
               title = excluded.title,
               path = excluded.path,
               body = excluded.body,
               hash = excluded.hash,
               indexed_at = excluded.indexed_at",
            params![
                doc.id,
                doc.title,
                doc.path,
                doc.body,
                doc.hash,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        conn.execute("DELETE FROM documents_fts WHERE id = ?1", params![doc.id])?;
        conn.execute(
            "INSERT INTO documents_fts (id, title, body) VALUES (?1, ?2, ?3)",
            params![doc.id, doc.title, doc.body],
        )?;
        Ok(())
    }

    /// Remove a document and everything derived from it.
    pub fn remove_document(&self, id: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        conn.execute("DELETE FROM documents_fts WHERE id = ?1", params![id])?;
        conn.execute("DELETE FROM embeddings WHERE doc_id = ?1", params![id])?;
        Ok(())
    }

    /// Stored content hash for a document, if it is indexed.
    pub fn document_hash(&self, id: &str) -> Result<Option<String>> {
        let conn = self.conn();
        let mut statement = conn.prepare("SELECT hash FROM documents WHERE id = ?1")?;
        let mut rows = statement.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// All indexed document ids.
    pub fn all_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut statement = conn.prepare("SELECT id FROM documents ORDER BY id")?;
        let ids = statement
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Store a document's embedding, replacing any previous vector.
    pub fn put_embedding(&self, doc_id: &str, vector: &[f32]) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO embeddings (doc_id, dim, vector) VALUES (?1, ?2, ?3)
             ON CONFLICT(doc_id) DO UPDATE SET dim = excluded.dim, vector = excluded.vector",
            params![doc_id, vector.len() as i64, vector_to_blob(vector)],
        )?;
        Ok(())
    }

    pub fn has_embedding(&self, doc_id: &str) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM embeddings WHERE doc_id = ?1",
            params![doc_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Drop a document's embedding (e.g. after its content changed and the
    /// re-embed failed); the document stays lexically searchable.
    pub fn remove_embedding(&self, doc_id: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM embeddings WHERE doc_id = ?1", params![doc_id])?;
        Ok(())
    }

    pub fn stats(&self) -> Result<CorpusStats> {
        let conn = self.conn();
        let documents: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        let embedded: i64 = conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok(CorpusStats {
            documents: documents as usize,
            embedded: embedded as usize,
        })
    }

    /// FTS5 match with title weighted well above body, best hits first.
    /// A malformed expression comes back as an error; the caller decides
    /// whether that is fatal.
    fn fts_search(&self, expression: &str, limit: usize) -> Result<Vec<LexicalRow>> {
        let conn = self.conn();
        let mut statement = conn.prepare(
            "SELECT d.id, d.title, d.path, d.body,
                    bm25(documents_fts, 0.0, 10.0, 1.0) AS raw_score
             FROM documents_fts
             JOIN documents d ON d.id = documents_fts.id
             WHERE documents_fts MATCH ?1
             ORDER BY raw_score
             LIMIT ?2",
        )?;

        let rows = statement
            .query_map(params![expression, limit as i64], |row| {
                Ok(LexicalRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    path: row.get(2)?,
                    body: row.get(3)?,
                    raw_score: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Brute-force nearest-neighbor scan by cosine distance. The corpus is
    /// small by design; a linear pass beats maintaining an ANN structure.
    fn vector_scan(&self, embedding: &[f32], limit: usize) -> Result<Vec<VectorRow>> {
        let conn = self.conn();
        let mut statement = conn.prepare(
            "SELECT e.doc_id, d.title, d.path, d.body, e.vector
             FROM embeddings e
             JOIN documents d ON d.id = e.doc_id
             WHERE e.dim = ?1",
        )?;

        let mut rows = statement
            .query_map(params![embedding.len() as i64], |row| {
                let blob: Vec<u8> = row.get(4)?;
                Ok(VectorRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    path: row.get(2)?,
                    body: row.get(3)?,
                    distance: cosine_distance(embedding, &blob_to_vector(&blob)),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[async_trait]
impl FullTextIndex for DocumentStore {
    async fn search(&self, expression: &str, limit: usize) -> Result<Vec<LexicalRow>> {
        self.fts_search(expression, limit)
    }
}

#[async_trait]
impl VectorIndex for DocumentStore {
    async fn nearest(&self, embedding: &[f32], limit: usize) -> Result<Vec<VectorRow>> {
        self.vector_scan(embedding, limit)
    }
}

fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn blob_to_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine distance in [0,2]: 0 for identical directions, 1 for orthogonal.
fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        1.0
    } else {
        1.0 - dot / denom
    }
}
