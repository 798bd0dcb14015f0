//! Error types for docdex
//!
//! Most retrieval failures are absorbed where they happen (a dead signal is
//! degraded quality, not a dead query); the variants here cover the failures
//! that must reach the caller.

use thiserror::Error;

/// Main error type for the search pipeline and its collaborators
#[derive(Error, Debug)]
pub enum SearchError {
    /// Query rejected before any network call
    #[error("query too short: need at least {min} characters, got {got}")]
    QueryTooShort { min: usize, got: usize },

    /// Ollama API returned a non-success status
    #[error("Ollama API error: {0}")]
    OllamaApi(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document store errors
    #[error("index store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, SearchError>;
