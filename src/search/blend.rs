//! Position-aware blending of fused rank and reranker confidence.
//!
//! Top fused ranks are usually already right, so the cheap rank signal
//! dominates there; deep in the list the rank is noise and the judgment
//! takes over. The tier boundaries encode that shift.

use crate::search::types::{Candidate, JudgmentMap};

/// Retrieval-vs-reranker weight for a 1-based fused rank.
fn retrieval_weight(rank: usize) -> f64 {
    if rank <= 3 {
        0.75
    } else if rank <= 10 {
        0.60
    } else {
        0.40
    }
}

/// Judgment for a candidate, with missing and out-of-range (failed
/// sentinel) entries treated as a neutral coin flip.
fn confidence_for(judgments: &JudgmentMap, id: &str) -> f64 {
    match judgments.get(id) {
        Some(&confidence) if (0.0..=1.0).contains(&confidence) => confidence,
        _ => 0.5,
    }
}

/// Blend the fused ordering with reranker confidence and re-sort.
///
/// `fused` must be in fused-rank order (index 0 = rank 1). Each blended
/// score is `w·(1/rank) + (1−w)·confidence` with `w` from the rank tier.
/// The final sort is stable, so equal scores keep fusion's order.
pub fn blend(fused: Vec<Candidate>, judgments: &JudgmentMap, limit: usize) -> Vec<Candidate> {
    let mut blended: Vec<Candidate> = fused
        .into_iter()
        .enumerate()
        .map(|(position, mut candidate)| {
            let rank = position + 1;
            let weight = retrieval_weight(rank);
            let confidence = confidence_for(judgments, &candidate.id);
            candidate.score = weight * (1.0 / rank as f64) + (1.0 - weight) * confidence;
            candidate
        })
        .collect();

    blended.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    blended.truncate(limit);
    blended
}
