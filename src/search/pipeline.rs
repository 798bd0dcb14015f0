//! End-to-end search orchestration.
//!
//! Sequences expansion, dual retrieval, fusion, reranking, and blending
//! per query mode. Every invocation works on fresh per-call values; the
//! pipeline holds no mutable state between queries.

use std::sync::Arc;

use futures_util::future::join_all;

use crate::errors::{Result, SearchError};
use crate::search::blend;
use crate::search::expand::QueryExpander;
use crate::search::fusion::{self, FUSED_CANDIDATE_LIMIT};
use crate::search::lexical::{LexicalRetriever, MIN_QUERY_CHARS};
use crate::search::rerank::{Reranker, RERANK_BATCH_WIDTH};
use crate::search::types::{
    Candidate, FullTextIndex, RankedSet, TextEmbedder, TextGenerator, VectorIndex,
};
use crate::search::vector::VectorRetriever;

/// Tuning knobs for one pipeline instance. Passed in explicitly so tests
/// can substitute endpoints and shrink the knobs; never ambient state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Final results returned to the caller
    pub result_limit: usize,
    /// Model-generated query rewrites on top of the original
    pub expansion_count: usize,
    /// Per-method, per-variant retrieval depth
    pub retrieval_depth: usize,
    /// Fused candidates kept for reranking
    pub fused_limit: usize,
    /// Concurrent judgment requests per rerank batch
    pub rerank_batch_width: usize,
    /// Fusion weight for the original query's result sets
    pub original_weight: f64,
    /// Fusion weight for each expansion variant's result sets
    pub variant_weight: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            result_limit: 10,
            expansion_count: 3,
            retrieval_depth: 20,
            fused_limit: FUSED_CANDIDATE_LIMIT,
            rerank_batch_width: RERANK_BATCH_WIDTH,
            original_weight: 2.0,
            variant_weight: 1.0,
        }
    }
}

/// Extra information surfaced by `--debug`.
#[derive(Debug, Clone, Default)]
pub struct SearchDebug {
    /// Expanded query list, original first
    pub variants: Vec<String>,
    /// Candidates that survived fusion (combined mode) or the merged
    /// candidate count (vector mode)
    pub fused_count: usize,
}

/// A completed search: ranked results plus debug detail.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<Candidate>,
    pub debug: SearchDebug,
}

/// The retrieval-fusion-reranking pipeline.
pub struct SearchPipeline {
    expander: QueryExpander,
    lexical: LexicalRetriever,
    vector: VectorRetriever,
    reranker: Reranker,
    config: PipelineConfig,
}

impl SearchPipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        embedder: Arc<dyn TextEmbedder>,
        full_text: Arc<dyn FullTextIndex>,
        vectors: Arc<dyn VectorIndex>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            expander: QueryExpander::new(generator.clone(), config.expansion_count),
            lexical: LexicalRetriever::new(full_text),
            vector: VectorRetriever::new(embedder, vectors),
            reranker: Reranker::new(generator, config.rerank_batch_width),
            config,
        }
    }

    /// Lexical-only mode (`search`): one full-text pass over the original
    /// query, no model calls at all.
    pub async fn search_lexical(&self, query: &str) -> Result<Vec<Candidate>> {
        validate_query(query)?;
        Ok(self.lexical.search(query, self.config.result_limit).await)
    }

    /// Vector-only mode (`vsearch`): expansion plus multi-query semantic
    /// search with a max-score merge across variants.
    pub async fn search_vector(&self, query: &str) -> Result<SearchOutcome> {
        validate_query(query)?;

        let variants = self.expander.expand(query).await;
        let results = self
            .vector
            .search_multi(&variants, self.config.result_limit)
            .await;

        Ok(SearchOutcome {
            debug: SearchDebug {
                variants,
                fused_count: results.len(),
            },
            results,
        })
    }

    /// Combined mode (`query`): expansion, concurrent dual retrieval per
    /// variant, rank fusion, reranking, and the position-aware blend.
    pub async fn search_combined(&self, query: &str) -> Result<SearchOutcome> {
        validate_query(query)?;

        let variants = self.expander.expand(query).await;

        // Every variant's lexical and vector retrievals are independent
        // until fusion, so all of them go out at once.
        let sets = join_all(variants.iter().enumerate().map(|(at, variant)| {
            let weight = if at == 0 {
                self.config.original_weight
            } else {
                self.config.variant_weight
            };
            self.retrieve_variant(variant, weight)
        }))
        .await;
        let sets: Vec<RankedSet> = sets.into_iter().flatten().collect();

        let fused = fusion::fuse(&sets, self.config.fused_limit);
        let fused_count = fused.len();

        // Judgments use the original query, not any rewrite.
        let judgments = self.reranker.judge(query, &fused).await;
        let results = blend::blend(fused, &judgments, self.config.result_limit);

        Ok(SearchOutcome {
            results,
            debug: SearchDebug {
                variants,
                fused_count,
            },
        })
    }

    async fn retrieve_variant(&self, variant: &str, weight: f64) -> Vec<RankedSet> {
        let (lexical, vector) = tokio::join!(
            self.lexical.search(variant, self.config.retrieval_depth),
            self.vector.search(variant, self.config.retrieval_depth),
        );

        vec![
            RankedSet {
                hits: lexical,
                weight,
            },
            RankedSet {
                hits: vector,
                weight,
            },
        ]
    }
}

/// Usage check shared by every mode, applied before any network call.
fn validate_query(query: &str) -> Result<()> {
    let got = query.trim().chars().count();
    if got < MIN_QUERY_CHARS {
        return Err(SearchError::QueryTooShort {
            min: MIN_QUERY_CHARS,
            got,
        });
    }
    Ok(())
}
