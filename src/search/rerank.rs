//! LLM relevance judgment with logprob-calibrated confidence.
//!
//! Each fused candidate gets an individual yes/no judgment call against the
//! original query; the answer token's log-probability becomes a confidence.
//! Judgments run in fixed-width concurrent batches with a full-batch
//! barrier between them, bounding pressure on the model server.

use std::sync::Arc;

use futures_util::future::join_all;

use crate::search::types::{Candidate, Completion, CompletionOptions, JudgmentMap, TextGenerator, TokenLogprob};

/// Requests in flight at once while judging a batch.
pub const RERANK_BATCH_WIDTH: usize = 5;

/// Document excerpt cap in the judgment prompt, keeps well inside the
/// model's context window.
pub const EXCERPT_MAX_CHARS: usize = 4000;

/// Sentinel stored when a judgment call fails outright. Outside [0,1] so
/// downstream stages can tell "model said 50/50" from "no answer"; the
/// blender maps it to neutral.
pub const FAILED_JUDGMENT: f64 = -1.0;

pub struct Reranker {
    generator: Arc<dyn TextGenerator>,
    batch_width: usize,
}

impl Reranker {
    pub fn new(generator: Arc<dyn TextGenerator>, batch_width: usize) -> Self {
        Self {
            generator,
            batch_width: batch_width.max(1),
        }
    }

    /// Judge every candidate against the original (non-expanded) query.
    ///
    /// Batches run strictly one after another; requests inside a batch run
    /// concurrently and the batch completes only when all of them resolve.
    /// A failed call marks that candidate alone; it never aborts the batch.
    pub async fn judge(&self, query: &str, candidates: &[Candidate]) -> JudgmentMap {
        let mut judgments = JudgmentMap::new();

        for batch in candidates.chunks(self.batch_width) {
            let scores = join_all(batch.iter().map(|c| self.judge_one(query, c))).await;
            for (candidate, score) in batch.iter().zip(scores) {
                judgments.insert(candidate.id.clone(), score);
            }
        }

        judgments
    }

    async fn judge_one(&self, query: &str, candidate: &Candidate) -> f64 {
        let prompt = build_judgment_prompt(query, candidate);
        let options = CompletionOptions {
            max_tokens: Some(2),
            logprobs: true,
        };

        match self.generator.complete(&prompt, &options).await {
            Ok(completion) => score_judgment(&completion),
            Err(err) => {
                tracing::warn!("rerank call failed for {}: {err}", candidate.id);
                FAILED_JUDGMENT
            }
        }
    }
}

fn build_judgment_prompt(query: &str, candidate: &Candidate) -> String {
    let excerpt = truncate_chars(&candidate.body, EXCERPT_MAX_CHARS);
    format!(
        "You are judging search relevance. Answer with a single word: \"yes\" \
         if the document is relevant to the query, or \"no\" if it is not.\n\n\
         Query: {query}\n\n\
         Document title: {title}\n\
         Document content:\n{excerpt}\n\n\
         Relevant (yes or no):",
        title = candidate.title,
    )
}

/// Char-boundary-safe prefix of at most `max` characters.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

/// Map a judgment completion to a score in [0,1].
///
/// Scans output tokens in order for the first containing "yes" and the
/// first containing "no" (case-insensitive); the earlier label wins, and a
/// lone label wins unconditionally. `exp(logprob)` of the winning token,
/// clamped to [0,1], is the confidence. The final mapping is asymmetric:
/// yes lands in [0.6, 1.0] and no in [0.0, 0.4], so a hesitant yes still
/// clears the most confident no.
pub fn score_judgment(completion: &Completion) -> f64 {
    let yes = find_label(&completion.logprobs, "yes");
    let no = find_label(&completion.logprobs, "no");

    let verdict = match (yes, no) {
        (Some((yes_at, yes_lp)), Some((no_at, _))) if yes_at <= no_at => Some((true, yes_lp)),
        (Some(_), Some((_, no_lp))) => Some((false, no_lp)),
        (Some((_, yes_lp)), None) => Some((true, yes_lp)),
        (None, Some((_, no_lp))) => Some((false, no_lp)),
        (None, None) => None,
    };

    match verdict {
        Some((true, logprob)) => 0.6 + 0.4 * probability(logprob),
        Some((false, logprob)) => 0.4 - 0.4 * probability(logprob),
        None => 0.5,
    }
}

/// First token whose text contains `label`, with its position and logprob.
fn find_label(tokens: &[TokenLogprob], label: &str) -> Option<(usize, f64)> {
    tokens
        .iter()
        .enumerate()
        .find(|(_, t)| t.token.to_lowercase().contains(label))
        .map(|(at, t)| (at, t.logprob))
}

fn probability(logprob: f64) -> f64 {
    logprob.exp().clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Result, SearchError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn completion(tokens: &[(&str, f64)]) -> Completion {
        Completion {
            text: tokens.iter().map(|(t, _)| *t).collect(),
            logprobs: tokens
                .iter()
                .map(|(token, logprob)| TokenLogprob {
                    token: token.to_string(),
                    logprob: *logprob,
                })
                .collect(),
        }
    }

    #[test]
    fn test_confident_yes() {
        // logprob 0 => probability 1.0 => score 1.0
        let score = score_judgment(&completion(&[("Yes", 0.0)]));
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_confident_no() {
        let score = score_judgment(&completion(&[("No", 0.0)]));
        assert!(score.abs() < 1e-12);
    }

    #[test]
    fn test_yes_branch_floor() {
        // Even a vanishingly unlikely yes stays at or above 0.6.
        let score = score_judgment(&completion(&[("yes", -50.0)]));
        assert!(score >= 0.6);
    }

    #[test]
    fn test_no_branch_ceiling() {
        let score = score_judgment(&completion(&[("no", -50.0)]));
        assert!(score <= 0.4);
    }

    #[test]
    fn test_hesitant_yes_beats_confident_no() {
        let hesitant_yes = score_judgment(&completion(&[("yes", -10.0)]));
        let confident_no = score_judgment(&completion(&[("no", -0.01)]));
        assert!(hesitant_yes > confident_no);
    }

    #[test]
    fn test_first_label_wins() {
        let yes_then_no = score_judgment(&completion(&[("yes", -0.1), (" no", -0.2)]));
        assert!(yes_then_no >= 0.6);

        let no_then_yes = score_judgment(&completion(&[("No", -0.1), (" yes", -0.2)]));
        assert!(no_then_yes <= 0.4);
    }

    #[test]
    fn test_case_insensitive_substring_match() {
        let score = score_judgment(&completion(&[("YES.", -0.5)]));
        assert!(score >= 0.6);
    }

    #[test]
    fn test_unparseable_is_neutral() {
        assert_eq!(score_judgment(&completion(&[("maybe", -0.1)])), 0.5);
        assert_eq!(score_judgment(&Completion::default()), 0.5);
    }

    #[test]
    fn test_positive_logprob_clamped() {
        // Some backends emit slightly positive logprobs; probability must
        // still clamp to 1.0.
        let score = score_judgment(&completion(&[("yes", 0.3)]));
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    /// Generator that records the peak number of concurrent calls and
    /// fails on request for specific candidates.
    struct ProbeGenerator {
        active: AtomicUsize,
        peak: AtomicUsize,
        fail_for: Vec<&'static str>,
    }

    #[async_trait]
    impl TextGenerator for ProbeGenerator {
        async fn complete(&self, prompt: &str, _options: &CompletionOptions) -> Result<Completion> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.fail_for.iter().any(|needle| prompt.contains(needle)) {
                return Err(SearchError::OllamaApi("generate returned 503".to_string()));
            }
            Ok(completion(&[("yes", -0.1)]))
        }
    }

    fn candidates(n: usize) -> Vec<Candidate> {
        (0..n)
            .map(|i| Candidate {
                id: format!("doc{i}"),
                title: format!("title-{i}"),
                path: format!("/corpus/doc{i}"),
                body: "body".to_string(),
                score: 0.0,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_batch_width_bounds_concurrency() {
        let generator = Arc::new(ProbeGenerator {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            fail_for: vec![],
        });
        let reranker = Reranker::new(generator.clone(), 5);

        let judgments = reranker.judge("query", &candidates(12)).await;
        assert_eq!(judgments.len(), 12);
        assert!(generator.peak.load(Ordering::SeqCst) <= 5);
    }

    #[tokio::test]
    async fn test_single_failure_does_not_abort_batch() {
        let generator = Arc::new(ProbeGenerator {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            fail_for: vec!["title-1"],
        });
        let reranker = Reranker::new(generator, 5);

        let judgments = reranker.judge("query", &candidates(3)).await;
        assert_eq!(judgments.len(), 3);
        assert_eq!(judgments["doc1"], FAILED_JUDGMENT);
        assert!(judgments["doc0"] >= 0.6);
        assert!(judgments["doc2"] >= 0.6);
    }
}
