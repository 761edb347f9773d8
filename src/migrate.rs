//! Schema for the two-table store.
//!
//! `documents` holds one row per source file; `chunks` holds its retrieval
//! units and is owned by it (`ON DELETE CASCADE`). Creation is idempotent.
//! A full rebuild drops `documents` first, then `chunks`, and recreates both.

use anyhow::Result;
use sqlx::SqliteConnection;

use crate::config::Config;
use crate::db;

const CREATE_DOCUMENTS: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        document_id TEXT PRIMARY KEY,
        document_hash TEXT NOT NULL,
        relative_path TEXT NOT NULL UNIQUE,
        file_name TEXT NOT NULL,
        file_extension TEXT NOT NULL,
        category TEXT NOT NULL,
        subcategory TEXT,
        document_title TEXT NOT NULL,
        content_type TEXT NOT NULL DEFAULT 'text/plain',
        full_content TEXT NOT NULL,
        chunk_count INTEGER NOT NULL,
        source_url TEXT,
        last_modified INTEGER NOT NULL,
        document_version INTEGER NOT NULL DEFAULT 1,
        is_latest_version INTEGER NOT NULL DEFAULT 1,
        change_type TEXT NOT NULL DEFAULT 'added',
        indexed_at INTEGER NOT NULL
    )
"#;

const CREATE_CHUNKS: &str = r#"
    CREATE TABLE IF NOT EXISTS chunks (
        chunk_id TEXT PRIMARY KEY,
        document_id TEXT NOT NULL,
        chunk_sequence INTEGER NOT NULL,
        total_chunks INTEGER NOT NULL,
        chunk_start INTEGER NOT NULL,
        chunk_end INTEGER NOT NULL,
        content TEXT NOT NULL,
        bm25_text TEXT NOT NULL,
        embedding TEXT,
        UNIQUE(document_id, chunk_sequence),
        FOREIGN KEY (document_id) REFERENCES documents(document_id) ON DELETE CASCADE
    )
"#;

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id, chunk_start)",
    "CREATE INDEX IF NOT EXISTS idx_documents_category ON documents(category, subcategory)",
];

/// Create both tables and their indexes if missing.
pub async fn create_schema(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(CREATE_DOCUMENTS).execute(&mut *conn).await?;
    sqlx::query(CREATE_CHUNKS).execute(&mut *conn).await?;
    for stmt in CREATE_INDEXES {
        sqlx::query(stmt).execute(&mut *conn).await?;
    }
    Ok(())
}

/// Drop `documents`, then `chunks`.
pub async fn drop_schema(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS documents")
        .execute(&mut *conn)
        .await?;
    sqlx::query("DROP TABLE IF EXISTS chunks")
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let mut conn = pool.acquire().await?;
    create_schema(&mut conn).await?;
    drop(conn);
    pool.close().await;
    Ok(())
}
