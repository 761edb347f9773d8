//! `dw search`: hybrid search against the SQLite index.
//!
//! The algorithm lives in [`docwindow_core::search::HybridSearcher`]; this
//! module wires it to the configured store and provider and prints results.

use anyhow::Result;

use docwindow_core::search::{
    ContextHit, HitScores, HybridSearcher, SearchHit, SearchOutcome, SearchRequest,
    SearchResults, SearchStatus,
};

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::sqlite_store::SqliteStore;

/// Options for `dw search` beyond the query itself.
#[derive(Debug, Clone, Default)]
pub struct SearchArgs {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub top_k: Option<usize>,
    pub bm25_weight: Option<f64>,
    pub embedding_weight: Option<f64>,
    /// Force context-window expansion regardless of category.
    pub context: bool,
    pub window: Option<usize>,
    pub json: bool,
}

impl SearchArgs {
    pub fn to_request(&self, query: &str) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            category: self.category.clone(),
            subcategory: self.subcategory.clone(),
            top_k: self.top_k,
            bm25_weight: self.bm25_weight,
            embedding_weight: self.embedding_weight,
            context_window: self.window,
        }
    }
}

/// Build a searcher over the configured database and embedding provider.
pub async fn build_searcher(config: &Config) -> Result<HybridSearcher<SqliteStore>> {
    let provider = embedding::create_provider(&config.embedding)?;
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    store.ensure_schema().await?;
    Ok(HybridSearcher::new(store, provider, config.searcher_settings()))
}

pub async fn run_search(config: &Config, query: &str, args: &SearchArgs) -> Result<()> {
    let searcher = build_searcher(config).await?;
    let request = args.to_request(query);

    let results = if args.context {
        SearchResults::WithContext(searcher.search_with_context(&request).await)
    } else {
        searcher.search_auto(&request).await
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results(&results);
    }

    searcher.store().pool().close().await;

    if let SearchStatus::Failed(failure) = results.status() {
        anyhow::bail!("Search failed: {}", failure);
    }
    Ok(())
}

fn print_results(results: &SearchResults) {
    if let SearchStatus::LexicalOnly { reason } = results.status() {
        println!("(lexical only: {})", reason);
    }
    if results.is_empty() {
        if !matches!(results.status(), SearchStatus::Failed(_)) {
            println!("No results.");
        }
        return;
    }

    match results {
        SearchResults::Plain(outcome) => print_plain(outcome),
        SearchResults::WithContext(outcome) => print_with_context(outcome),
    }
}

fn print_plain(outcome: &SearchOutcome<SearchHit>) {
    for (i, hit) in outcome.results.iter().enumerate() {
        print_header(i, &hit.document.document_title, &hit.document.category, &hit.scores);
        println!("    path: {}", hit.document.relative_path);
        if let Some(ref url) = hit.document.source_url {
            println!("    url: {}", url);
        }
        println!("    chunk: {} ({})", hit.chunk_sequence, hit.chunk_id);
        println!("    excerpt: \"{}\"", excerpt(&hit.content));
        println!("    id: {}", hit.document.document_id);
        println!();
    }
}

fn print_with_context(outcome: &SearchOutcome<ContextHit>) {
    for (i, hit) in outcome.results.iter().enumerate() {
        print_header(i, &hit.document.document_title, &hit.document.category, &hit.scores);
        println!("    path: {}", hit.document.relative_path);
        if let Some(ref url) = hit.document.source_url {
            println!("    url: {}", url);
        }
        let scope = if hit.is_full_document {
            "full document".to_string()
        } else {
            format!("{} chunks", hit.context_window_size)
        };
        println!("    context: {}", scope);
        if let Some(ref err) = hit.context_error {
            println!("    context error: {}", err);
        }
        println!("    id: {}", hit.document.document_id);
        println!();
        for line in hit.context_content.lines() {
            println!("    | {}", line);
        }
        println!();
    }
}

fn print_header(i: usize, title: &str, category: &str, scores: &HitScores) {
    println!(
        "{}. [{:.3}] {} / {}  (lexical {:.3}, semantic {:.3})",
        i + 1,
        scores.combined_score,
        category,
        title,
        scores.lexical_score,
        scores.semantic_score
    );
}

fn excerpt(content: &str) -> String {
    const MAX_CHARS: usize = 240;
    let flat = content.replace('\n', " ");
    let flat = flat.trim();
    if flat.chars().count() <= MAX_CHARS {
        return flat.to_string();
    }
    let cut: String = flat.chars().take(MAX_CHARS).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_to_request() {
        let args = SearchArgs {
            category: Some("table-context".into()),
            top_k: Some(3),
            window: Some(1),
            ..Default::default()
        };
        let req = args.to_request("orders refunds");
        assert_eq!(req.query, "orders refunds");
        assert_eq!(req.category.as_deref(), Some("table-context"));
        assert_eq!(req.top_k, Some(3));
        assert_eq!(req.context_window, Some(1));
        assert!(req.bm25_weight.is_none());
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        let out = excerpt(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 243);
        assert_eq!(excerpt("a\nb"), "a b");
    }
}
