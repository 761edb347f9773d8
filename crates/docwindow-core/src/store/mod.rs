//! Storage abstraction for docwindow.
//!
//! Two traits split the store by phase:
//!
//! | Trait | Used by | Operations |
//! |-------|---------|------------|
//! | [`Store`] | hybrid searcher, `get`, `stats` | read-only queries |
//! | [`IndexSink`] | indexing pipeline | version snapshot, reset, bulk write |
//!
//! Indexing and searching are separate phases: rows are written once per
//! indexing run and are immutable afterwards. Implementations must be
//! `Send + Sync` to work with async runtimes.

pub mod memory;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    Chunk, ChunkRecord, Document, DocumentResponse, DocumentSummary, IndexStats, PreviousVersion,
};
use crate::text::KeywordMatcher;

/// Parameters for lexical candidate retrieval.
#[derive(Debug, Clone)]
pub struct LexicalQuery<'a> {
    pub matcher: &'a KeywordMatcher,
    pub category: Option<&'a str>,
    pub subcategory: Option<&'a str>,
    /// Maximum number of candidates to return.
    pub limit: usize,
}

/// A chunk that matched at least one keyword, with its lexical score and
/// enough document metadata to present a result without another lookup.
#[derive(Debug, Clone)]
pub struct LexicalCandidate {
    pub chunk_id: String,
    pub chunk_sequence: i64,
    pub chunk_start: i64,
    pub chunk_end: i64,
    pub content: String,
    /// Stored embedding in its raw JSON form. Parsed lazily by the searcher
    /// so one malformed row degrades only its own score.
    pub embedding: Option<String>,
    pub lexical_score: f64,
    pub document: DocumentSummary,
}

/// Drop zero scores, order deterministically, and keep the first `limit`.
///
/// Order: lexical score descending, then relative path, then `chunk_start`.
/// Backends call this after scoring so every store ranks identically.
pub fn rank_candidates(mut candidates: Vec<LexicalCandidate>, limit: usize) -> Vec<LexicalCandidate> {
    candidates.retain(|c| c.lexical_score > 0.0);
    candidates.sort_by(|a, b| {
        b.lexical_score
            .total_cmp(&a.lexical_score)
            .then_with(|| a.document.relative_path.cmp(&b.document.relative_path))
            .then_with(|| a.chunk_start.cmp(&b.chunk_start))
    });
    candidates.truncate(limit);
    candidates
}

/// Read side of the two-table store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Score chunks of documents passing the filters against the matcher and
    /// return the top candidates, ranked with [`rank_candidates`].
    async fn lexical_candidates(&self, query: &LexicalQuery<'_>) -> Result<Vec<LexicalCandidate>>;

    /// All chunks of a document, ordered by `chunk_start`.
    async fn document_chunks(&self, document_id: &str) -> Result<Vec<ChunkRecord>>;

    /// Full document with its chunks, by id.
    async fn get_document(&self, document_id: &str) -> Result<Option<DocumentResponse>>;

    /// Document, chunk, and embedding counts overall and per category.
    async fn stats(&self) -> Result<IndexStats>;
}

/// Write side of the two-table store, used only by the indexing pipeline.
///
/// Not safe to drive from two indexing runs at once: `reset` drops tables
/// another run may still be writing to.
#[async_trait]
pub trait IndexSink: Send + Sync {
    /// Hash and version of every document currently stored, keyed by id.
    async fn previous_versions(&self) -> Result<HashMap<String, PreviousVersion>>;

    /// Drop the document table, then the chunk table, and recreate both empty.
    async fn reset(&self) -> Result<()>;

    /// Write one document and all of its chunks atomically.
    async fn write_document(&self, document: &Document, chunks: &[Chunk]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(path: &str, start: i64, score: f64) -> LexicalCandidate {
        LexicalCandidate {
            chunk_id: format!("{}#{}", path, start),
            chunk_sequence: 0,
            chunk_start: start,
            chunk_end: start + 10,
            content: String::new(),
            embedding: None,
            lexical_score: score,
            document: DocumentSummary {
                document_id: path.to_string(),
                document_title: path.to_string(),
                relative_path: path.to_string(),
                file_name: path.to_string(),
                category: "general".to_string(),
                subcategory: None,
                source_url: None,
                last_modified: 0,
                chunk_count: 1,
            },
        }
    }

    #[test]
    fn test_rank_candidates_orders_and_limits() {
        let ranked = rank_candidates(
            vec![
                candidate("b.md", 0, 0.7),
                candidate("a.md", 50, 0.7),
                candidate("a.md", 0, 0.7),
                candidate("c.md", 0, 1.2),
                candidate("d.md", 0, 0.0),
            ],
            3,
        );
        let ids: Vec<&str> = ranked.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["c.md#0", "a.md#0", "a.md#50"]);
    }

    #[test]
    fn test_rank_candidates_drops_zero_scores() {
        let ranked = rank_candidates(vec![candidate("a.md", 0, 0.0)], 10);
        assert!(ranked.is_empty());
    }
}
