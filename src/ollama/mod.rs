//! Ollama API module
//!
//! Provides the HTTP client and wire types for the two endpoints the
//! pipeline consumes: non-streaming text generation (with optional
//! per-token log-probabilities) and batch embedding.

pub mod client;
pub mod types;

// Re-export key types for convenience
pub use client::{OllamaClient, DEFAULT_OLLAMA_URL};
