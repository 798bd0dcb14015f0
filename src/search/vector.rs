//! Semantic retrieval over the vector index.
//!
//! Texts are wrapped in role-specific templates before embedding, distances
//! become scores through a bounded transform, and multi-query mode merges
//! per-variant results functionally, keeping the best score seen per
//! candidate.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;

use crate::search::types::{Candidate, TextEmbedder, VectorIndex, VectorRow};

/// Which side of the retrieval pair a text is embedded as. The embedding
/// model was trained with distinct prefixes for the two roles; mixing them
/// up quietly ruins similarity quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingRole {
    Query,
    Document,
}

/// Wrap text in the role-specific template expected by the embedding model.
pub fn embedding_prompt(role: EmbeddingRole, text: &str, title: Option<&str>) -> String {
    match role {
        EmbeddingRole::Query => format!("search_query: {text}"),
        EmbeddingRole::Document => match title {
            Some(title) => format!("search_document: {title}\n{text}"),
            None => format!("search_document: {text}"),
        },
    }
}

/// Distance to score: strictly decreasing in distance, bounded in (0,1],
/// with distance 0 mapping to exactly 1.0.
pub fn distance_to_score(distance: f64) -> f64 {
    1.0 / (distance + 1.0)
}

pub struct VectorRetriever {
    embedder: Arc<dyn TextEmbedder>,
    index: Arc<dyn VectorIndex>,
}

impl VectorRetriever {
    pub fn new(embedder: Arc<dyn TextEmbedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Single-query mode: embed one variant and take the direct top-K.
    /// An unembeddable variant contributes nothing, it is not an error.
    pub async fn search(&self, variant: &str, limit: usize) -> Vec<Candidate> {
        let Some(embedding) = self.embed_query(variant).await else {
            return Vec::new();
        };

        match self.index.nearest(&embedding, limit).await {
            Ok(rows) => rows.into_iter().map(candidate_from_row).collect(),
            Err(err) => {
                tracing::debug!("vector search failed for {variant:?}: {err}");
                Vec::new()
            }
        }
    }

    /// Multi-query mode: search every variant and keep the maximum score
    /// observed per candidate. Rewards consistent relevance across
    /// phrasings without double-counting repeat appearances.
    pub async fn search_multi(&self, variants: &[String], limit: usize) -> Vec<Candidate> {
        let per_variant = join_all(variants.iter().map(|v| self.search(v, limit))).await;

        let mut merged = merge_max(per_variant);
        merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        merged.truncate(limit);
        merged
    }

    async fn embed_query(&self, variant: &str) -> Option<Vec<f32>> {
        let prompt = embedding_prompt(EmbeddingRole::Query, variant, None);
        match self.embedder.embed(&[prompt]).await {
            Ok(mut vectors) => vectors.pop().flatten(),
            Err(err) => {
                tracing::warn!("embedding failed for query variant {variant:?}: {err}");
                None
            }
        }
    }
}

fn candidate_from_row(row: VectorRow) -> Candidate {
    Candidate {
        id: row.id,
        title: row.title,
        path: row.path,
        body: row.body,
        score: distance_to_score(row.distance),
    }
}

/// Fold per-variant result lists into one, keyed by candidate id, keeping
/// the best score seen. Each variant's list stays immutable; the merge
/// happens after all variants have resolved.
fn merge_max(lists: Vec<Vec<Candidate>>) -> Vec<Candidate> {
    let mut order: Vec<Candidate> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for hit in lists.into_iter().flatten() {
        match seen.get(&hit.id) {
            Some(&at) => {
                if hit.score > order[at].score {
                    order[at].score = hit.score;
                }
            }
            None => {
                seen.insert(hit.id.clone(), order.len());
                order.push(hit);
            }
        }
    }

    order
}
