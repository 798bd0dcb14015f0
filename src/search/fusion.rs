//! Reciprocal Rank Fusion across retrieval result sets.
//!
//! Fusion operates on rank position only: the normalized scores the
//! retrievers produced are discarded once a set enters the fold. Rank is
//! scale-free, which is what lets lexical and semantic lists combine
//! without calibrating their scoring scales against each other.

use std::collections::HashMap;

use crate::search::types::{Candidate, RankedSet};

/// RRF smoothing constant.
pub const RRF_K: f64 = 60.0;

/// Fused candidates kept for the reranking stage.
pub const FUSED_CANDIDATE_LIMIT: usize = 30;

/// Fuse any number of weighted ranked lists into one ranking.
///
/// A hit at 1-based rank `r` in a set of weight `w` contributes
/// `w / (r + RRF_K)`; contributions for the same id are summed across all
/// sets. The first full record seen for an id is kept as the
/// representative. The accumulator is insertion-ordered so that equal
/// scores keep a stable, reproducible order.
pub fn fuse(sets: &[RankedSet], limit: usize) -> Vec<Candidate> {
    let mut order: Vec<Candidate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for set in sets {
        for (position, hit) in set.hits.iter().enumerate() {
            let rank = (position + 1) as f64;
            let contribution = set.weight / (rank + RRF_K);

            match index.get(&hit.id) {
                Some(&at) => order[at].score += contribution,
                None => {
                    index.insert(hit.id.clone(), order.len());
                    let mut entry = hit.clone();
                    entry.score = contribution;
                    order.push(entry);
                }
            }
        }
    }

    order.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    order.truncate(limit);
    order
}
