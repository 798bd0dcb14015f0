//! Lexical retrieval over the full-text index.
//!
//! Builds a fault-tolerant FTS5 match expression and squashes the engine's
//! raw BM25 scores into [0,1]. Engine errors and too-short variants both
//! yield an empty list; lexical search is never the reason a query dies.

use std::sync::Arc;

use crate::search::types::{Candidate, FullTextIndex, LexicalRow};

/// Variants shorter than this (after trimming) are rejected outright.
pub const MIN_QUERY_CHARS: usize = 2;

/// NEAR proximity window for the middle clause of the match expression.
const PROXIMITY_WINDOW: usize = 10;

pub struct LexicalRetriever {
    index: Arc<dyn FullTextIndex>,
}

impl LexicalRetriever {
    pub fn new(index: Arc<dyn FullTextIndex>) -> Self {
        Self { index }
    }

    /// Search one query variant, returning candidates scored in [0,1].
    pub async fn search(&self, variant: &str, limit: usize) -> Vec<Candidate> {
        let trimmed = variant.trim();
        if trimmed.chars().count() < MIN_QUERY_CHARS {
            return Vec::new();
        }

        let expression = build_match_expression(trimmed);
        match self.index.search(&expression, limit).await {
            Ok(rows) => rows.into_iter().map(candidate_from_row).collect(),
            Err(err) => {
                tracing::debug!("full-text search failed for {trimmed:?}: {err}");
                Vec::new()
            }
        }
    }
}

fn candidate_from_row(row: LexicalRow) -> Candidate {
    Candidate {
        id: row.id,
        title: row.title,
        path: row.path,
        body: row.body,
        score: normalize_bm25(row.raw_score),
    }
}

/// Build a tolerant FTS5 expression with three OR-joined clauses, most
/// specific first: the exact phrase, the terms within a NEAR window, and a
/// plain OR over the terms. The OR clause guarantees hits even when the
/// phrase and proximity clauses match nothing. Single usable terms skip
/// straight to the bare term.
pub fn build_match_expression(query: &str) -> String {
    let phrase = quote_term(query);
    let terms: Vec<String> = query
        .split_whitespace()
        .filter(|t| t.chars().count() > 1)
        .map(quote_term)
        .collect();

    match terms.len() {
        // Nothing but single-character terms: the phrase is all we have.
        0 => phrase,
        1 => terms.into_iter().next().unwrap_or(phrase),
        _ => {
            let near = format!("NEAR({}, {PROXIMITY_WINDOW})", terms.join(" "));
            let any = terms.join(" OR ");
            format!("({phrase}) OR ({near}) OR ({any})")
        }
    }
}

/// FTS5 string syntax: wrap in double quotes, double any embedded quote.
fn quote_term(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}

/// Squash a raw SQLite bm25() score (more negative = better) into [0,1]
/// with a logistic curve. Constants are tuned so weak matches land around
/// 0.1-0.3 and strong matches above 0.9; the mapping is strictly monotone
/// in raw relevance.
pub fn normalize_bm25(raw: f64) -> f64 {
    let relevance = -raw;
    1.0 / (1.0 + (-(relevance - 3.0) / 1.5).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Result, SearchError};
    use async_trait::async_trait;

    #[test]
    fn test_expression_single_term() {
        assert_eq!(build_match_expression("hello"), "\"hello\"");
    }

    #[test]
    fn test_expression_drops_single_char_terms() {
        // "a" is too short to be a useful term; "hello" stands alone.
        assert_eq!(build_match_expression("a hello"), "\"hello\"");
    }

    #[test]
    fn test_expression_only_single_char_terms_falls_back_to_phrase() {
        assert_eq!(build_match_expression("a b"), "\"a b\"");
    }

    #[test]
    fn test_expression_multi_term_has_three_clauses() {
        let expr = build_match_expression("borrow checker");
        assert_eq!(
            expr,
            "(\"borrow checker\") OR (NEAR(\"borrow\" \"checker\", 10)) OR (\"borrow\" OR \"checker\")"
        );
    }

    #[test]
    fn test_expression_doubles_embedded_quotes() {
        let expr = build_match_expression("say \"hi\" there");
        assert!(expr.contains("\"say \"\"hi\"\" there\""));
        // The quoted word keeps its doubled quotes in the term clauses too.
        assert!(expr.contains("\"\"\"hi\"\"\""));
    }

    #[test]
    fn test_normalize_monotonic() {
        // bm25 raw scores improve as they get more negative.
        let weak = normalize_bm25(-0.5);
        let medium = normalize_bm25(-3.0);
        let strong = normalize_bm25(-8.0);
        assert!(weak < medium);
        assert!(medium < strong);
    }

    #[test]
    fn test_normalize_bounds() {
        assert!(normalize_bm25(0.0) > 0.0);
        assert!(normalize_bm25(-1000.0) <= 1.0);
        // Weak matches land low, strong matches high.
        assert!(normalize_bm25(-1.0) < 0.3);
        assert!(normalize_bm25(-8.0) > 0.9);
    }

    struct StaticIndex {
        rows: Vec<LexicalRow>,
        fail: bool,
    }

    #[async_trait]
    impl FullTextIndex for StaticIndex {
        async fn search(&self, _expression: &str, limit: usize) -> Result<Vec<LexicalRow>> {
            if self.fail {
                return Err(SearchError::Config("bad match expression".to_string()));
            }
            Ok(self.rows.iter().take(limit).cloned().collect())
        }
    }

    fn row(id: &str, raw_score: f64) -> LexicalRow {
        LexicalRow {
            id: id.to_string(),
            title: id.to_string(),
            path: format!("/corpus/{id}"),
            body: "body".to_string(),
            raw_score,
        }
    }

    #[tokio::test]
    async fn test_short_variant_returns_empty() {
        let retriever = LexicalRetriever::new(Arc::new(StaticIndex {
            rows: vec![row("a.md", -5.0)],
            fail: false,
        }));
        assert!(retriever.search(" x ", 10).await.is_empty());
        assert!(retriever.search("", 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_engine_error_returns_empty() {
        let retriever = LexicalRetriever::new(Arc::new(StaticIndex {
            rows: Vec::new(),
            fail: true,
        }));
        assert!(retriever.search("borrow checker", 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_scores_normalized_into_unit_interval() {
        let retriever = LexicalRetriever::new(Arc::new(StaticIndex {
            rows: vec![row("a.md", -8.0), row("b.md", -1.0)],
            fail: false,
        }));
        let hits = retriever.search("borrow checker", 10).await;
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score > 0.9);
        assert!(hits[1].score < 0.3);
    }
}
