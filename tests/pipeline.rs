//! Crawl → index → search over a temporary directory tree and SQLite file.

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use docwindow::config::IndexConfig;
use docwindow::connector_fs::scan_filesystem;
use docwindow::db;
use docwindow::embedding::DisabledProvider;
use docwindow::ingest::{index_files, IndexOptions};
use docwindow::sqlite_store::SqliteStore;
use docwindow_core::chunk::Chunker;
use docwindow_core::embedding::EmbeddingProvider;
use docwindow_core::metadata::{CategoryPattern, MetadataExtractor};
use docwindow_core::search::{HybridSearcher, SearchRequest, SearchResults, SearchStatus, SearcherSettings};
use docwindow_core::store::Store;

/// Maps text mentioning refunds to one axis and everything else to another.
struct TopicProvider;

#[async_trait]
impl EmbeddingProvider for TopicProvider {
    fn model_name(&self) -> &str {
        "topic"
    }
    fn dims(&self) -> usize {
        2
    }
    async fn load(&self) -> Result<()> {
        Ok(())
    }
    async fn embed(&self, text: &str, _prefix: Option<&str>) -> Result<Vec<f32>> {
        if text.to_lowercase().contains("refund") {
            Ok(vec![1.0, 0.0])
        } else {
            Ok(vec![0.0, 1.0])
        }
    }
}

fn write_tree(root: &std::path::Path) {
    fs::create_dir_all(root.join("table-context/sales")).unwrap();
    fs::create_dir_all(root.join("experiment-readouts/checkout")).unwrap();
    fs::create_dir_all(root.join("notes")).unwrap();

    let orders = [
        "The orders table stores one row per customer order.",
        "Columns include order_id, customer_id, amount, and created_at.",
        "Refunded orders keep their original order_id and a negative amount.",
        "Cancelled orders are removed nightly by the cleanup job.",
        "Orders older than seven years are archived to cold storage.",
        "Analysts should join orders to customers on customer_id.",
        "Order totals are stored in cents to avoid rounding.",
        "The orders table is partitioned by created_at month.",
    ]
    .join("\n\n");
    fs::write(root.join("table-context/sales/orders.md"), orders).unwrap();
    fs::write(
        root.join("experiment-readouts/checkout/one-click.md"),
        "One-click checkout lifted completed orders by two percent with no change in refunds.",
    )
    .unwrap();
    fs::write(root.join("notes/standup.txt"), "Standup: orders dashboard is slow again.").unwrap();
    fs::write(root.join("notes/empty.md"), "\n\n").unwrap();
}

async fn build(provider: Arc<dyn EmbeddingProvider>) -> (TempDir, HybridSearcher<SqliteStore>) {
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("docs");
    write_tree(&docs);

    let files = scan_filesystem(&IndexConfig {
        root: docs,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(files.len(), 4);

    let pool = db::connect_path(&tmp.path().join("dw.sqlite")).await.unwrap();
    let store = SqliteStore::new(pool);
    store.ensure_schema().await.unwrap();

    let extractor = MetadataExtractor::new(
        vec![
            CategoryPattern::new("table-context", "table-context"),
            CategoryPattern::new("experiment-readout", "experiment-readouts"),
        ],
        "general",
    );
    let chunker = Chunker::new(80, 10).unwrap();
    let options = IndexOptions {
        extractor: &extractor,
        chunker: &chunker,
        source_url_base: Some("https://kb.example.com"),
        passage_prefix: Some("search_document: "),
        indexed_at: 1_700_000_000,
    };
    let summary = index_files(&store, provider.as_ref(), &files, &options)
        .await
        .unwrap();
    assert_eq!(summary.documents_written, 3);
    assert_eq!(summary.files_skipped, 1);

    let searcher = HybridSearcher::new(store, provider, SearcherSettings::default());
    (tmp, searcher)
}

#[tokio::test]
async fn test_semantic_scores_reorder_hits() {
    let (_tmp, searcher) = build(Arc::new(TopicProvider)).await;

    let outcome = searcher
        .search(&SearchRequest::new("refund orders").top_k(3))
        .await;
    assert_eq!(outcome.status, SearchStatus::Complete);
    assert!(!outcome.results.is_empty());

    let top = &outcome.results[0];
    assert!(top.content.to_lowercase().contains("refund"));
    assert!(top.scores.semantic_score > 0.99);
    for pair in outcome.results.windows(2) {
        assert!(pair[0].scores.combined_score >= pair[1].scores.combined_score);
    }
}

#[tokio::test]
async fn test_context_window_in_large_document() {
    let (_tmp, searcher) = build(Arc::new(TopicProvider)).await;

    let orders_id = docwindow_core::ids::document_id("table-context/sales/orders.md");
    let total = searcher.store().document_chunks(&orders_id).await.unwrap().len();
    assert!(total > 5, "expected a multi-chunk document, got {}", total);

    let results = searcher
        .search_auto(
            &SearchRequest::new("partitioned")
                .category("table-context")
                .context_window(1),
        )
        .await;
    let SearchResults::WithContext(outcome) = results else {
        panic!("table-context searches expand to context windows");
    };
    let hit = &outcome.results[0];
    assert_eq!(hit.document.document_id, orders_id);
    assert!(!hit.is_full_document);
    // The match is in the last chunk, so the window clamps to two chunks.
    assert_eq!(hit.context_window_size, 2);
    assert!(hit.context_content.contains("partitioned"));
    assert_eq!(
        hit.document.source_url.as_deref(),
        Some("https://kb.example.com/table-context/sales/orders.md")
    );
}

#[tokio::test]
async fn test_small_document_returns_whole() {
    let (_tmp, searcher) = build(Arc::new(TopicProvider)).await;

    let outcome = searcher
        .search_with_context(&SearchRequest::new("checkout").context_window(0))
        .await;
    let hit = &outcome.results[0];
    assert_eq!(hit.document.category, "experiment-readout");
    assert_eq!(hit.document.subcategory.as_deref(), Some("checkout"));
    assert!(hit.is_full_document);
}

#[tokio::test]
async fn test_disabled_provider_indexes_without_embeddings() {
    let (_tmp, searcher) = build(Arc::new(DisabledProvider)).await;

    let stats = searcher.store().stats().await.unwrap();
    assert_eq!(stats.embedded_chunks, 0);
    assert!(stats.chunks > 0);

    let outcome = searcher.search(&SearchRequest::new("standup dashboard")).await;
    assert!(matches!(outcome.status, SearchStatus::LexicalOnly { .. }));
    assert_eq!(outcome.results[0].document.relative_path, "notes/standup.txt");
    assert_eq!(outcome.results[0].scores.semantic_score, 0.0);
}
