//! Document store module
//!
//! SQLite persistence for the corpus (documents, FTS5 mirror, embedding
//! blobs) plus the incremental indexer that keeps it in step with the
//! filesystem.

pub mod scanner;
pub mod sqlite;

// Re-export key types
pub use scanner::{ScanOutcome, Scanner};
pub use sqlite::{CorpusStats, DocumentStore, StoredDocument};
