//! Indexing pipeline orchestration.
//!
//! Every run is a full rebuild: crawl → metadata → chunking → embedding →
//! reset → write. Chunks are prepared and embedded before the tables are
//! touched, so a crawl or chunking error leaves the previous index in place.
//! Embedding is non-fatal: a provider that fails to load, or a chunk that
//! fails to embed, is stored with a NULL embedding and counted.
//!
//! Indexing is a single-writer batch. No lock is taken; running two indexers
//! against the same database at once is unsupported.

use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, info, warn};

use docwindow_core::chunk::Chunker;
use docwindow_core::embedding::EmbeddingProvider;
use docwindow_core::metadata::MetadataExtractor;
use docwindow_core::models::{ChangeType, SourceFile};
use docwindow_core::prepare::{prepare_document, PreparedDocument};
use docwindow_core::store::IndexSink;

use crate::config::Config;
use crate::connector_fs;
use crate::db;
use crate::embedding;
use crate::sqlite_store::SqliteStore;

/// Counts reported at the end of an indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub files_scanned: usize,
    pub documents_written: usize,
    /// Files that produced no chunks.
    pub files_skipped: usize,
    pub chunks_written: usize,
    pub chunks_embedded: usize,
    pub embed_failures: usize,
    pub added: usize,
    pub modified: usize,
    pub unchanged: usize,
    /// Documents present before this run and absent after it.
    pub removed: usize,
}

/// Per-run inputs that do not come from the crawler.
pub struct IndexOptions<'a> {
    pub extractor: &'a MetadataExtractor,
    pub chunker: &'a Chunker,
    pub source_url_base: Option<&'a str>,
    pub passage_prefix: Option<&'a str>,
    pub indexed_at: i64,
}

pub async fn run_index(config: &Config, dry_run: bool) -> Result<()> {
    let files = connector_fs::scan_filesystem(&config.index)?;
    let extractor = config.metadata.extractor();
    let chunker = Chunker::new(config.chunking.chunk_size, config.chunking.overlap)?;

    if dry_run {
        let estimated: usize = files.iter().map(|f| chunker.split(&f.text).len()).sum();
        println!("index {} (dry-run)", config.index.root.display());
        println!("  files found: {}", files.len());
        println!("  estimated chunks: {}", estimated);
        return Ok(());
    }

    let provider = embedding::create_provider(&config.embedding)?;
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    store.ensure_schema().await?;

    let options = IndexOptions {
        extractor: &extractor,
        chunker: &chunker,
        source_url_base: config.index.source_url_base.as_deref(),
        passage_prefix: config.embedding.passage_prefix.as_deref(),
        indexed_at: chrono::Utc::now().timestamp(),
    };
    let summary = index_files(&store, provider.as_ref(), &files, &options).await?;

    println!("index {}", config.index.root.display());
    println!("  files scanned: {}", summary.files_scanned);
    println!("  documents written: {}", summary.documents_written);
    println!("  files skipped (empty): {}", summary.files_skipped);
    println!("  chunks written: {}", summary.chunks_written);
    if config.embedding.is_enabled() {
        println!("  chunks embedded: {}", summary.chunks_embedded);
        println!("  embedding failures: {}", summary.embed_failures);
    }
    println!(
        "  added: {}  modified: {}  unchanged: {}  removed: {}",
        summary.added, summary.modified, summary.unchanged, summary.removed
    );
    println!("ok");

    pool.close().await;
    Ok(())
}

/// Rebuild the index in `sink` from `files`.
pub async fn index_files<S: IndexSink + ?Sized>(
    sink: &S,
    provider: &dyn EmbeddingProvider,
    files: &[SourceFile],
    options: &IndexOptions<'_>,
) -> Result<IndexSummary> {
    let mut summary = IndexSummary {
        files_scanned: files.len(),
        ..Default::default()
    };

    let mut prepared: Vec<PreparedDocument> = Vec::with_capacity(files.len());
    for file in files {
        match prepare_document(
            file,
            options.extractor,
            options.chunker,
            options.source_url_base,
            options.indexed_at,
        ) {
            Some(doc) => prepared.push(doc),
            None => {
                debug!(path = %file.relative_path, "no content to chunk, skipping");
                summary.files_skipped += 1;
            }
        }
    }

    let embedding_ready = match provider.load().await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                model = provider.model_name(),
                error = %e,
                "embedding provider unavailable, chunks will be stored without embeddings"
            );
            false
        }
    };

    if embedding_ready {
        for doc in prepared.iter_mut() {
            for chunk in doc.chunks.iter_mut() {
                match provider.embed(&chunk.content, options.passage_prefix).await {
                    Ok(vec) => {
                        chunk.embedding = Some(vec);
                        summary.chunks_embedded += 1;
                    }
                    Err(e) => {
                        warn!(
                            chunk_id = %chunk.chunk_id,
                            path = %doc.document.relative_path,
                            error = %e,
                            "failed to embed chunk"
                        );
                        summary.embed_failures += 1;
                    }
                }
            }
        }
    }

    let previous = sink.previous_versions().await?;
    sink.reset().await?;

    let mut seen = HashSet::with_capacity(prepared.len());
    for mut doc in prepared {
        doc.document
            .apply_previous(previous.get(&doc.document.document_id));
        match doc.document.change_type {
            ChangeType::Added => summary.added += 1,
            ChangeType::Modified => summary.modified += 1,
            ChangeType::Unchanged => summary.unchanged += 1,
        }

        sink.write_document(&doc.document, &doc.chunks).await?;
        summary.documents_written += 1;
        summary.chunks_written += doc.chunks.len();
        seen.insert(doc.document.document_id);
    }

    summary.removed = previous.keys().filter(|id| !seen.contains(*id)).count();

    info!(
        documents = summary.documents_written,
        chunks = summary.chunks_written,
        embedded = summary.chunks_embedded,
        "index rebuilt"
    );
    Ok(summary)
}
