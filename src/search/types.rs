//! Core value types and the seams the pipeline consumes its collaborators
//! through. Everything here is a per-query value; nothing is cached across
//! invocations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::Result;

/// A scored document candidate flowing between pipeline stages.
///
/// The meaning of `score` depends on the stage that produced the value:
/// normalized BM25 for lexical hits, distance-derived similarity for vector
/// hits, accumulated RRF mass after fusion, and the blended ranking score in
/// final results. Each stage replaces the score; only the fuser accumulates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique within the corpus (the document's corpus-relative path)
    pub id: String,
    pub title: String,
    pub path: String,
    pub body: String,
    pub score: f64,
}

/// One ranked result list from a single (retrieval method, query variant)
/// pair, with the fusion weight its contributions carry. Hit order is
/// exactly the order the retriever returned.
#[derive(Debug, Clone)]
pub struct RankedSet {
    pub hits: Vec<Candidate>,
    pub weight: f64,
}

/// Reranker verdicts keyed by candidate id. Failed judgments hold an
/// out-of-range sentinel; the blender treats anything outside [0,1] as
/// neutral.
pub type JudgmentMap = HashMap<String, f64>;

/// A row returned by the full-text engine: stored fields plus the engine's
/// raw relevance score (SQLite bm25() convention: more negative = better).
#[derive(Debug, Clone)]
pub struct LexicalRow {
    pub id: String,
    pub title: String,
    pub path: String,
    pub body: String,
    pub raw_score: f64,
}

/// A row returned by the vector index: stored fields plus similarity
/// distance to the query embedding.
#[derive(Debug, Clone)]
pub struct VectorRow {
    pub id: String,
    pub title: String,
    pub path: String,
    pub body: String,
    pub distance: f64,
}

/// Full-text engine seam. Implementations return rows best-first; a
/// malformed match expression surfaces as an error and the retriever
/// absorbs it.
#[async_trait]
pub trait FullTextIndex: Send + Sync {
    async fn search(&self, expression: &str, limit: usize) -> Result<Vec<LexicalRow>>;
}

/// Vector index seam. Rows come back nearest-first by similarity distance.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn nearest(&self, embedding: &[f32], limit: usize) -> Result<Vec<VectorRow>>;
}

/// One output token with the log-probability the model assigned it.
#[derive(Debug, Clone)]
pub struct TokenLogprob {
    pub token: String,
    pub logprob: f64,
}

/// Result of a completion request: generated text plus per-token logprobs
/// when they were requested and the endpoint supplied them.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub logprobs: Vec<TokenLogprob>,
}

/// Options for a single completion request.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Cap on generated tokens (None = model default)
    pub max_tokens: Option<u32>,
    /// Request per-token log-probabilities
    pub logprobs: bool,
}

/// Generative model seam (one-shot, non-streaming completions).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<Completion>;
}

/// Embedding model seam. Entries that cannot be embedded come back as
/// `None`; those texts are unembeddable, not errors.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_serialization() {
        let candidate = Candidate {
            id: "notes/borrow.md".to_string(),
            title: "Borrowing".to_string(),
            path: "/corpus/notes/borrow.md".to_string(),
            body: "The borrow checker".to_string(),
            score: 0.42,
        };

        let json = serde_json::to_string(&candidate).unwrap();
        let back: Candidate = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, candidate.id);
        assert_eq!(back.score, candidate.score);
    }

    #[test]
    fn test_completion_default_is_empty() {
        let completion = Completion::default();
        assert!(completion.text.is_empty());
        assert!(completion.logprobs.is_empty());
    }
}
