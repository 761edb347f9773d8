//! In-memory [`Store`] and [`IndexSink`] implementation for tests.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock`. Embeddings are kept
//! in their stored JSON form, exactly as the SQLite backend persists them,
//! so malformed-embedding handling can be exercised without a database.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::embedding_to_json;
use crate::models::{
    CategoryStats, Chunk, ChunkRecord, Document, DocumentResponse, IndexStats, PreviousVersion,
};

use super::{rank_candidates, IndexSink, LexicalCandidate, LexicalQuery, Store};

struct StoredChunk {
    chunk: Chunk,
    embedding: Option<String>,
}

#[derive(Default)]
struct Tables {
    documents: HashMap<String, Document>,
    chunks: Vec<StoredChunk>,
}

/// In-memory two-table store.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    /// Overwrite a chunk's stored embedding text, bypassing serialization.
    pub fn set_raw_embedding(&self, chunk_id: &str, raw: Option<&str>) -> Result<()> {
        let mut tables = self.write()?;
        let stored = tables
            .chunks
            .iter_mut()
            .find(|sc| sc.chunk.chunk_id == chunk_id)
            .ok_or_else(|| anyhow!("unknown chunk {}", chunk_id))?;
        stored.embedding = raw.map(str::to_string);
        Ok(())
    }
}

fn chunks_of(tables: &Tables, document_id: &str) -> Vec<ChunkRecord> {
    let mut chunks: Vec<ChunkRecord> = tables
        .chunks
        .iter()
        .filter(|sc| sc.chunk.document_id == document_id)
        .map(|sc| sc.chunk.record())
        .collect();
    chunks.sort_by_key(|c| c.chunk_start);
    chunks
}

#[async_trait]
impl Store for InMemoryStore {
    async fn lexical_candidates(&self, query: &LexicalQuery<'_>) -> Result<Vec<LexicalCandidate>> {
        let tables = self.read()?;
        let candidates = tables
            .chunks
            .iter()
            .filter_map(|sc| {
                let doc = tables.documents.get(&sc.chunk.document_id)?;
                if query.category.is_some_and(|c| c != doc.category) {
                    return None;
                }
                if query
                    .subcategory
                    .is_some_and(|s| doc.subcategory.as_deref() != Some(s))
                {
                    return None;
                }
                let lexical_score = query.matcher.lexical_score(
                    &sc.chunk.bm25_text,
                    &sc.chunk.content,
                    &doc.document_title,
                    &doc.file_name,
                );
                Some(LexicalCandidate {
                    chunk_id: sc.chunk.chunk_id.clone(),
                    chunk_sequence: sc.chunk.chunk_sequence,
                    chunk_start: sc.chunk.chunk_start,
                    chunk_end: sc.chunk.chunk_end,
                    content: sc.chunk.content.clone(),
                    embedding: sc.embedding.clone(),
                    lexical_score,
                    document: doc.summary(),
                })
            })
            .collect();
        Ok(rank_candidates(candidates, query.limit))
    }

    async fn document_chunks(&self, document_id: &str) -> Result<Vec<ChunkRecord>> {
        let tables = self.read()?;
        Ok(chunks_of(&tables, document_id))
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<DocumentResponse>> {
        let tables = self.read()?;
        Ok(tables
            .documents
            .get(document_id)
            .map(|doc| doc.to_response(chunks_of(&tables, document_id))))
    }

    async fn stats(&self) -> Result<IndexStats> {
        let tables = self.read()?;
        let mut by_category: BTreeMap<String, CategoryStats> = BTreeMap::new();

        for doc in tables.documents.values() {
            let entry = by_category
                .entry(doc.category.clone())
                .or_insert_with(|| CategoryStats {
                    category: doc.category.clone(),
                    ..Default::default()
                });
            entry.documents += 1;
        }
        for sc in &tables.chunks {
            let Some(doc) = tables.documents.get(&sc.chunk.document_id) else {
                continue;
            };
            if let Some(entry) = by_category.get_mut(&doc.category) {
                entry.chunks += 1;
                if sc.embedding.is_some() {
                    entry.embedded_chunks += 1;
                }
            }
        }

        let categories: Vec<CategoryStats> = by_category.into_values().collect();
        Ok(IndexStats {
            documents: categories.iter().map(|c| c.documents).sum(),
            chunks: categories.iter().map(|c| c.chunks).sum(),
            embedded_chunks: categories.iter().map(|c| c.embedded_chunks).sum(),
            categories,
        })
    }
}

#[async_trait]
impl IndexSink for InMemoryStore {
    async fn previous_versions(&self) -> Result<HashMap<String, PreviousVersion>> {
        let tables = self.read()?;
        Ok(tables
            .documents
            .values()
            .map(|d| {
                (
                    d.document_id.clone(),
                    PreviousVersion {
                        document_hash: d.document_hash.clone(),
                        document_version: d.document_version,
                    },
                )
            })
            .collect())
    }

    async fn reset(&self) -> Result<()> {
        let mut tables = self.write()?;
        tables.documents.clear();
        tables.chunks.clear();
        Ok(())
    }

    async fn write_document(&self, document: &Document, chunks: &[Chunk]) -> Result<()> {
        let mut tables = self.write()?;
        let doc_id = &document.document_id;
        tables.chunks.retain(|sc| &sc.chunk.document_id != doc_id);
        tables.chunks.extend(chunks.iter().map(|c| StoredChunk {
            chunk: c.clone(),
            embedding: c.embedding.as_deref().map(embedding_to_json),
        }));
        tables.documents.insert(doc_id.clone(), document.clone());
        Ok(())
    }
}
