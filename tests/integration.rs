use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use docwindow_core::ids::document_id;

fn dw_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dw"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let docs = root.join("docs");
    fs::create_dir_all(docs.join("table-context/sales")).unwrap();
    fs::write(
        docs.join("alpha.md"),
        "# Alpha Document\n\nThis is the alpha document about Rust programming.\n\nIt contains information about cargo and crates.",
    )
    .unwrap();
    fs::write(
        docs.join("beta.md"),
        "# Beta Document\n\nThis document discusses Python and machine learning.\n\nDeep learning frameworks like PyTorch are covered.",
    )
    .unwrap();
    fs::write(
        docs.join("table-context/sales/orders.txt"),
        "The orders table stores one row per customer order.\n\nColumns: order_id, customer_id, amount, created_at.\n\nRefunded orders keep their original order_id and carry a negative amount.",
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/dw.sqlite"

[chunking]
chunk_size = 120
overlap = 20

[index]
root = "{root}/docs"
source_url_base = "https://docs.example.com/kb"

[server]
bind = "127.0.0.1:7399"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("docwindow.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_dw(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = dw_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("DOCWINDOW_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run dw binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn indexed_env() -> (TempDir, PathBuf) {
    let (tmp, config) = setup_test_env();
    let (_, stderr, ok) = run_dw(&config, &["index"]);
    assert!(ok, "index failed: {}", stderr);
    (tmp, config)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config) = setup_test_env();
    let (stdout, stderr, ok) = run_dw(&config, &["init"]);
    assert!(ok, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized"));
    assert!(tmp.path().join("data/dw.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config) = setup_test_env();
    let (_, _, ok1) = run_dw(&config, &["init"]);
    let (_, stderr, ok2) = run_dw(&config, &["init"]);
    assert!(ok1);
    assert!(ok2, "second init failed: {}", stderr);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, ok) = run_dw(&tmp.path().join("nope.toml"), &["stats"]);
    assert!(!ok);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_index_reports_counts() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, ok) = run_dw(&config, &["index"]);
    assert!(ok, "index failed: {}", stderr);
    assert!(stdout.contains("files scanned: 3"), "stdout: {}", stdout);
    assert!(stdout.contains("documents written: 3"), "stdout: {}", stdout);
    assert!(stdout.contains("added: 3"), "stdout: {}", stdout);
}

#[test]
fn test_index_dry_run_writes_nothing() {
    let (tmp, config) = setup_test_env();
    let (stdout, _, ok) = run_dw(&config, &["index", "--dry-run"]);
    assert!(ok);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("files found: 3"));
    assert!(!tmp.path().join("data/dw.sqlite").exists());
}

#[test]
fn test_reindex_tracks_changes() {
    let (tmp, config) = indexed_env();
    fs::write(tmp.path().join("docs/beta.md"), "Beta rewritten entirely.").unwrap();
    fs::remove_file(tmp.path().join("docs/alpha.md")).unwrap();

    let (stdout, stderr, ok) = run_dw(&config, &["index"]);
    assert!(ok, "reindex failed: {}", stderr);
    assert!(stdout.contains("documents written: 2"), "stdout: {}", stdout);
    assert!(
        stdout.contains("added: 0  modified: 1  unchanged: 1  removed: 1"),
        "stdout: {}",
        stdout
    );
}

#[test]
fn test_search_lexical_only_when_embeddings_disabled() {
    let (_tmp, config) = indexed_env();
    let (stdout, stderr, ok) = run_dw(&config, &["search", "rust cargo"]);
    assert!(ok, "search failed: {}", stderr);
    assert!(stdout.contains("(lexical only:"), "stdout: {}", stdout);
    assert!(stdout.contains("1. ["), "stdout: {}", stdout);
    assert!(stdout.contains("alpha"));
    assert!(!stdout.contains("beta.md"));
}

#[test]
fn test_search_json_outcome() {
    let (_tmp, config) = indexed_env();
    let (stdout, _, ok) = run_dw(
        &config,
        &["search", "python learning", "--json", "--bm25-weight", "1", "--embedding-weight", "0"],
    );
    assert!(ok);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["status"]["state"], "complete");
    let results = value["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0]["relative_path"], "beta.md");
    assert_eq!(results[0]["semantic_score"], 0.0);
    assert_eq!(
        results[0]["source_url"],
        "https://docs.example.com/kb/beta.md"
    );
}

#[test]
fn test_search_deterministic() {
    let (_tmp, config) = indexed_env();
    let (first, _, _) = run_dw(&config, &["search", "orders document", "--json"]);
    let (second, _, _) = run_dw(&config, &["search", "orders document", "--json"]);
    assert_eq!(first, second);
}

#[test]
fn test_search_without_keywords() {
    let (_tmp, config) = indexed_env();
    let (stdout, _, ok) = run_dw(&config, &["search", "is it ok"]);
    assert!(ok);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_no_matches() {
    let (_tmp, config) = indexed_env();
    let (stdout, _, ok) = run_dw(&config, &["search", "xylophone"]);
    assert!(ok);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_context_category_expands() {
    let (_tmp, config) = indexed_env();
    let (stdout, stderr, ok) = run_dw(
        &config,
        &["search", "refunded orders", "--category", "table-context", "--json"],
    );
    assert!(ok, "search failed: {}", stderr);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let results = value["results"].as_array().unwrap();
    assert!(!results.is_empty());
    for hit in results {
        assert_eq!(hit["category"], "table-context");
        assert_eq!(hit["subcategory"], "sales");
        assert_eq!(hit["is_full_document"], true);
        assert!(hit["context_content"].as_str().unwrap().contains("Refunded"));
    }
}

#[test]
fn test_search_forced_context_window() {
    let (_tmp, config) = indexed_env();
    let (stdout, _, ok) = run_dw(&config, &["search", "refunded", "--context", "--window", "0"]);
    assert!(ok);
    assert!(stdout.contains("context: full document"), "stdout: {}", stdout);
}

#[test]
fn test_get_document() {
    let (_tmp, config) = indexed_env();
    let id = document_id("alpha.md");
    let (stdout, stderr, ok) = run_dw(&config, &["get", &id]);
    assert!(ok, "get failed: {}", stderr);
    assert!(stdout.contains(&id));
    assert!(stdout.contains("path:         alpha.md"));
    assert!(stdout.contains("category:     general"));
    assert!(stdout.contains("--- Chunks"));
    assert!(stdout.contains("Rust programming"));
}

#[test]
fn test_get_missing_document() {
    let (_tmp, config) = indexed_env();
    let (_, stderr, ok) = run_dw(&config, &["get", "does-not-exist"]);
    assert!(!ok);
    assert!(stderr.contains("document not found"));
}

#[test]
fn test_stats() {
    let (_tmp, config) = indexed_env();
    let (stdout, _, ok) = run_dw(&config, &["stats"]);
    assert!(ok);
    assert!(stdout.contains("Documents:   3"), "stdout: {}", stdout);
    assert!(stdout.contains("Embedded:    0 /"), "stdout: {}", stdout);
    assert!(stdout.contains("table-context"));
    assert!(stdout.contains("general"));
}
