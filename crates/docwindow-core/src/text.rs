//! Lexical text processing: `bm25_text` normalization, query keyword
//! extraction, and the weighted keyword-count score.
//!
//! The lexical signal is a keyword-occurrence heuristic, not true BM25:
//! every field is scanned for occurrences of any query keyword and the
//! per-field counts are combined with fixed weights.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Field weights for [`KeywordMatcher::lexical_score`].
pub const BM25_TEXT_WEIGHT: f64 = 0.4;
pub const CONTENT_WEIGHT: f64 = 0.3;
pub const TITLE_WEIGHT: f64 = 0.2;
pub const FILE_NAME_WEIGHT: f64 = 0.1;

/// Words dropped from queries before matching (compared uppercase).
const QUERY_STOPWORDS: &[&str] = &[
    "THE", "AND", "FOR", "ARE", "BUT", "NOT", "YOU", "ALL", "ANY", "CAN", "HAS", "HAD", "HOW",
    "WHAT", "WHEN", "WHERE", "WHICH", "WHO", "WHY", "WITH", "THIS", "THAT", "FROM", "INTO",
    "ABOUT", "HAVE", "WAS", "WERE", "DOES", "OUR", "THERE",
];

/// Words dropped from `bm25_text` at indexing time (compared lowercase).
const INDEX_STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he",
    "in", "is", "it", "its", "of", "on", "or", "she", "that", "the", "their", "them", "then",
    "there", "these", "they", "this", "those", "to", "was", "we", "were", "will", "with", "you",
];

static KEYWORD_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{3,}\b").expect("keyword token pattern is valid"));

/// Build the normalized token string stored as `chunk.bm25_text`.
///
/// Lowercases, replaces punctuation with spaces, drops stopwords and
/// single-character tokens, and joins the rest with single spaces.
pub fn bm25_text(content: &str) -> String {
    let cleaned: String = content
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|t| t.chars().count() > 1 && !INDEX_STOPWORDS.contains(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract search keywords from a free-text query.
///
/// The query is uppercased; alphabetic tokens of three or more letters are
/// kept, stopwords removed, and duplicates dropped in first-seen order.
pub fn extract_keywords(query: &str) -> Vec<String> {
    let upper = query.to_uppercase();
    let mut seen = HashSet::new();
    KEYWORD_TOKEN
        .find_iter(&upper)
        .map(|m| m.as_str())
        .filter(|t| !QUERY_STOPWORDS.contains(t))
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}

/// Case-insensitive alternation over a query's keywords.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
    pattern: Regex,
}

impl KeywordMatcher {
    /// Build a matcher from extracted keywords. `None` when there are none.
    pub fn new(keywords: Vec<String>) -> Option<Self> {
        if keywords.is_empty() {
            return None;
        }
        let alternation = keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = RegexBuilder::new(&format!("(?:{})", alternation))
            .case_insensitive(true)
            .build()
            .ok()?;
        Some(Self { keywords, pattern })
    }

    /// Extract keywords from `query` and build a matcher for them.
    pub fn from_query(query: &str) -> Option<Self> {
        Self::new(extract_keywords(query))
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Non-overlapping keyword occurrences in `haystack`.
    pub fn count(&self, haystack: &str) -> usize {
        self.pattern.find_iter(haystack).count()
    }

    /// Weighted lexical score over the four searchable fields.
    pub fn lexical_score(&self, bm25_text: &str, content: &str, title: &str, file_name: &str) -> f64 {
        BM25_TEXT_WEIGHT * self.count(bm25_text) as f64
            + CONTENT_WEIGHT * self.count(content) as f64
            + TITLE_WEIGHT * self.count(title) as f64
            + FILE_NAME_WEIGHT * self.count(file_name) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bm25_text_normalizes() {
        assert_eq!(
            bm25_text("The Pricing-Dashboard, for Q3: is LIVE!"),
            "pricing dashboard q3 live"
        );
    }

    #[test]
    fn test_bm25_text_empty() {
        assert_eq!(bm25_text("  ...  "), "");
    }

    #[test]
    fn test_extract_keywords_uppercases_and_dedups() {
        let kws = extract_keywords("pricing Pricing affordability dashboard");
        assert_eq!(kws, vec!["PRICING", "AFFORDABILITY", "DASHBOARD"]);
    }

    #[test]
    fn test_extract_keywords_drops_short_and_stopwords() {
        assert!(extract_keywords("a is to").is_empty());
        assert!(extract_keywords("what is the 2024 q3").is_empty());
        assert_eq!(extract_keywords("the revenue of q3"), vec!["REVENUE"]);
    }

    #[test]
    fn test_extract_keywords_skips_alphanumeric_tokens() {
        assert_eq!(extract_keywords("v2api orders"), vec!["ORDERS"]);
    }

    #[test]
    fn test_matcher_counts_case_insensitively() {
        let m = KeywordMatcher::from_query("orders").unwrap();
        assert_eq!(m.count("Orders, ORDERS and orders_daily"), 3);
        assert_eq!(m.count("nothing here"), 0);
    }

    #[test]
    fn test_matcher_none_without_keywords() {
        assert!(KeywordMatcher::from_query("a is to").is_none());
    }

    #[test]
    fn test_lexical_score_weights() {
        let m = KeywordMatcher::from_query("pricing affordability dashboard").unwrap();
        let score = m.lexical_score(
            "pricing affordability dashboard weekly",
            "Pricing affordability dashboard, refreshed weekly.",
            "Weekly Metrics",
            "weekly.md",
        );
        assert!((score - (0.4 * 3.0 + 0.3 * 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_lexical_score_title_and_file_name() {
        let m = KeywordMatcher::from_query("orders").unwrap();
        let score = m.lexical_score("", "", "Orders Table", "orders.md");
        assert!((score - 0.3).abs() < 1e-9);
    }
}
