//! SQLite-backed [`Store`] and [`IndexSink`] implementation.
//!
//! SQLite has no regex operator, so lexical retrieval runs in two passes:
//! a parameterized `LIKE` prefilter selects chunks where any keyword occurs
//! in any scored field, then the exact weighted counts are computed with the
//! core [`KeywordMatcher`](docwindow_core::text::KeywordMatcher) and ranked
//! with [`rank_candidates`]. Keywords and filter values are always bound as
//! parameters; only placeholder text is assembled into SQL.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use docwindow_core::embedding::embedding_to_json;
use docwindow_core::models::{
    CategoryStats, ChangeType, Chunk, ChunkRecord, Document, DocumentResponse, DocumentSummary,
    IndexStats, PreviousVersion,
};
use docwindow_core::store::{
    rank_candidates, IndexSink, LexicalCandidate, LexicalQuery, Store,
};

use crate::migrate;

/// SQLite implementation of [`Store`] and [`IndexSink`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the schema if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        migrate::create_schema(&mut conn).await
    }
}

const CANDIDATE_COLUMNS: &str = r#"
    c.chunk_id, c.chunk_sequence, c.chunk_start, c.chunk_end, c.content, c.bm25_text,
    c.embedding, d.document_id, d.document_title, d.relative_path, d.file_name,
    d.category, d.subcategory, d.source_url, d.last_modified, d.chunk_count
"#;

/// `WHERE` clause for the lexical prefilter, with one `LIKE` group per keyword.
fn lexical_sql(keyword_count: usize) -> String {
    let per_keyword = "(c.bm25_text LIKE ? OR c.content LIKE ? OR d.document_title LIKE ? OR d.file_name LIKE ?)";
    let keyword_clause = vec![per_keyword; keyword_count].join(" OR ");
    format!(
        "SELECT {} FROM chunks c JOIN documents d ON d.document_id = c.document_id \
         WHERE (? IS NULL OR d.category = ?) \
           AND (? IS NULL OR d.subcategory = ?) \
           AND ({})",
        CANDIDATE_COLUMNS, keyword_clause
    )
}

fn summary_from_row(row: &SqliteRow) -> DocumentSummary {
    DocumentSummary {
        document_id: row.get("document_id"),
        document_title: row.get("document_title"),
        relative_path: row.get("relative_path"),
        file_name: row.get("file_name"),
        category: row.get("category"),
        subcategory: row.get("subcategory"),
        source_url: row.get("source_url"),
        last_modified: row.get("last_modified"),
        chunk_count: row.get("chunk_count"),
    }
}

fn chunk_record_from_row(row: &SqliteRow) -> ChunkRecord {
    ChunkRecord {
        chunk_id: row.get("chunk_id"),
        chunk_sequence: row.get("chunk_sequence"),
        chunk_start: row.get("chunk_start"),
        chunk_end: row.get("chunk_end"),
        content: row.get("content"),
    }
}

fn document_from_row(row: &SqliteRow) -> Result<Document> {
    let change: String = row.get("change_type");
    let change_type = ChangeType::parse(&change)
        .with_context(|| format!("Unknown change_type in documents table: {}", change))?;
    Ok(Document {
        document_id: row.get("document_id"),
        document_hash: row.get("document_hash"),
        relative_path: row.get("relative_path"),
        file_name: row.get("file_name"),
        file_extension: row.get("file_extension"),
        category: row.get("category"),
        subcategory: row.get("subcategory"),
        document_title: row.get("document_title"),
        content_type: row.get("content_type"),
        full_content: row.get("full_content"),
        chunk_count: row.get("chunk_count"),
        source_url: row.get("source_url"),
        last_modified: row.get("last_modified"),
        document_version: row.get("document_version"),
        is_latest_version: row.get("is_latest_version"),
        change_type,
        indexed_at: row.get("indexed_at"),
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn lexical_candidates(&self, query: &LexicalQuery<'_>) -> Result<Vec<LexicalCandidate>> {
        let keywords = query.matcher.keywords();
        let sql = lexical_sql(keywords.len());

        let mut q = sqlx::query(&sql)
            .bind(query.category)
            .bind(query.category)
            .bind(query.subcategory)
            .bind(query.subcategory);
        for keyword in keywords {
            let pattern = format!("%{}%", keyword);
            for _ in 0..4 {
                q = q.bind(pattern.clone());
            }
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .context("Lexical candidate query failed")?;

        let candidates = rows
            .iter()
            .map(|row| {
                let document = summary_from_row(row);
                let bm25_text: String = row.get("bm25_text");
                let content: String = row.get("content");
                let lexical_score = query.matcher.lexical_score(
                    &bm25_text,
                    &content,
                    &document.document_title,
                    &document.file_name,
                );
                LexicalCandidate {
                    chunk_id: row.get("chunk_id"),
                    chunk_sequence: row.get("chunk_sequence"),
                    chunk_start: row.get("chunk_start"),
                    chunk_end: row.get("chunk_end"),
                    content,
                    embedding: row.get("embedding"),
                    lexical_score,
                    document,
                }
            })
            .collect();

        Ok(rank_candidates(candidates, query.limit))
    }

    async fn document_chunks(&self, document_id: &str) -> Result<Vec<ChunkRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT chunk_id, chunk_sequence, chunk_start, chunk_end, content
            FROM chunks
            WHERE document_id = ?
            ORDER BY chunk_start ASC, chunk_sequence ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(chunk_record_from_row).collect())
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<DocumentResponse>> {
        let row = sqlx::query("SELECT * FROM documents WHERE document_id = ?")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let doc = document_from_row(&row)?;
        let chunks = self.document_chunks(document_id).await?;
        Ok(Some(doc.to_response(chunks)))
    }

    async fn stats(&self) -> Result<IndexStats> {
        let rows = sqlx::query(
            r#"
            SELECT d.category AS category,
                   COUNT(DISTINCT d.document_id) AS documents,
                   COUNT(c.chunk_id) AS chunks,
                   COUNT(c.embedding) AS embedded_chunks
            FROM documents d
            LEFT JOIN chunks c ON c.document_id = d.document_id
            GROUP BY d.category
            ORDER BY d.category ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let categories: Vec<CategoryStats> = rows
            .iter()
            .map(|row| CategoryStats {
                category: row.get("category"),
                documents: row.get("documents"),
                chunks: row.get("chunks"),
                embedded_chunks: row.get("embedded_chunks"),
            })
            .collect();

        Ok(IndexStats {
            documents: categories.iter().map(|c| c.documents).sum(),
            chunks: categories.iter().map(|c| c.chunks).sum(),
            embedded_chunks: categories.iter().map(|c| c.embedded_chunks).sum(),
            categories,
        })
    }
}

#[async_trait]
impl IndexSink for SqliteStore {
    async fn previous_versions(&self) -> Result<HashMap<String, PreviousVersion>> {
        let rows = sqlx::query("SELECT document_id, document_hash, document_version FROM documents")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                (
                    row.get("document_id"),
                    PreviousVersion {
                        document_hash: row.get("document_hash"),
                        document_version: row.get("document_version"),
                    },
                )
            })
            .collect())
    }

    async fn reset(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        migrate::drop_schema(&mut tx).await?;
        migrate::create_schema(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn write_document(&self, document: &Document, chunks: &[Chunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Replace wholesale; the cascade removes any previous chunks.
        sqlx::query("DELETE FROM documents WHERE document_id = ?")
            .bind(&document.document_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO documents (document_id, document_hash, relative_path, file_name,
                                   file_extension, category, subcategory, document_title,
                                   content_type, full_content, chunk_count, source_url,
                                   last_modified, document_version, is_latest_version,
                                   change_type, indexed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&document.document_id)
        .bind(&document.document_hash)
        .bind(&document.relative_path)
        .bind(&document.file_name)
        .bind(&document.file_extension)
        .bind(&document.category)
        .bind(&document.subcategory)
        .bind(&document.document_title)
        .bind(&document.content_type)
        .bind(&document.full_content)
        .bind(document.chunk_count)
        .bind(&document.source_url)
        .bind(document.last_modified)
        .bind(document.document_version)
        .bind(document.is_latest_version)
        .bind(document.change_type.as_str())
        .bind(document.indexed_at)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to write document {}", document.relative_path))?;

        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT INTO chunks (chunk_id, document_id, chunk_sequence, total_chunks,
                                    chunk_start, chunk_end, content, bm25_text, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.document_id)
            .bind(chunk.chunk_sequence)
            .bind(chunk.total_chunks)
            .bind(chunk.chunk_start)
            .bind(chunk.chunk_end)
            .bind(&chunk.content)
            .bind(&chunk.bm25_text)
            .bind(chunk.embedding.as_deref().map(embedding_to_json))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
