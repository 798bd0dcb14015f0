// Hybrid search pipeline
//
// One user query fans out into expanded variants, each variant runs both
// lexical and semantic retrieval, the ranked lists fuse by reciprocal rank,
// the top of the fused list gets an LLM relevance judgment, and a
// position-aware blend produces the final ordering.
//
// Stages:
// - expand: query variants via the generative model
// - lexical: FTS5 retrieval with normalized BM25 scores
// - vector: embedding retrieval with distance-derived scores
// - fusion: weighted reciprocal rank fusion
// - rerank: yes/no logprob judgments in bounded batches
// - blend: rank-tiered combination of both signals
// - pipeline: per-mode orchestration

pub mod blend;
pub mod expand;
pub mod fusion;
pub mod lexical;
pub mod pipeline;
pub mod rerank;
pub mod types;
pub mod vector;

// Re-export key types
pub use pipeline::{PipelineConfig, SearchDebug, SearchOutcome, SearchPipeline};
pub use types::{
    Candidate, Completion, CompletionOptions, FullTextIndex, JudgmentMap, LexicalRow, RankedSet,
    TextEmbedder, TextGenerator, TokenLogprob, VectorIndex, VectorRow,
};
