//! Query expansion via a single generative call.
//!
//! One user query becomes an ordered variant list whose first element is
//! always the original. Expansion is strictly best-effort: any model
//! failure degrades to searching with the original query alone.

use std::sync::Arc;

use crate::search::types::{CompletionOptions, TextGenerator};

/// Expands a query into alternative phrasings through the generative model.
pub struct QueryExpander {
    generator: Arc<dyn TextGenerator>,
    max_variants: usize,
}

impl QueryExpander {
    pub fn new(generator: Arc<dyn TextGenerator>, max_variants: usize) -> Self {
        Self {
            generator,
            max_variants,
        }
    }

    /// Expand into `[original, ...rewrites]`. Never fails and never
    /// retries: a dead expansion call must not block search.
    pub async fn expand(&self, query: &str) -> Vec<String> {
        let mut variants = vec![query.to_string()];
        if self.max_variants == 0 {
            return variants;
        }

        let prompt = build_expansion_prompt(query, self.max_variants);
        let options = CompletionOptions {
            max_tokens: Some(200),
            logprobs: false,
        };

        match self.generator.complete(&prompt, &options).await {
            Ok(completion) => {
                variants.extend(parse_variants(&completion.text, self.max_variants));
            }
            Err(err) => {
                tracing::warn!("query expansion failed, searching with original only: {err}");
            }
        }

        variants
    }
}

fn build_expansion_prompt(query: &str, count: usize) -> String {
    format!(
        "Rewrite the following search query {count} different ways to help find \
         relevant documents. Use synonyms and alternative phrasings that capture \
         the same intent. Output exactly {count} rewrites, one per line, with no \
         numbering, bullets, or commentary.\n\nQuery: {query}"
    )
}

/// Parse one-rewrite-per-line output, dropping list markers and blank lines.
fn parse_variants(response: &str, max: usize) -> Vec<String> {
    response
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .take(max)
        .map(str::to_string)
        .collect()
}

/// Models number or bullet their lines no matter how firmly told not to.
fn strip_list_marker(line: &str) -> &str {
    let trimmed = line.trim();
    let without_digits = trimmed.trim_start_matches(|c: char| c.is_ascii_digit());
    let rest = if without_digits.len() < trimmed.len()
        && (without_digits.starts_with('.') || without_digits.starts_with(')'))
    {
        &without_digits[1..]
    } else {
        trimmed.trim_start_matches(['-', '*', '•'])
    };
    rest.trim().trim_matches('"').trim()
}
