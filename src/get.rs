//! Document retrieval by ID.
//!
//! Used by both the `dw get` CLI command and `GET /documents/{id}`.

use anyhow::Result;

use docwindow_core::models::DocumentResponse;
use docwindow_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Fetch a document with its chunks. `None` when the id is unknown.
pub async fn get_document(config: &Config, id: &str) -> Result<Option<DocumentResponse>> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    store.ensure_schema().await?;
    let doc = store.get_document(id).await?;
    pool.close().await;
    Ok(doc)
}

/// CLI entry point: print the document or fail when it does not exist.
pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let Some(doc) = get_document(config, id).await? else {
        anyhow::bail!("document not found: {}", id);
    };

    println!("--- Document ---");
    println!("id:           {}", doc.document_id);
    println!("title:        {}", doc.document_title);
    println!("path:         {}", doc.relative_path);
    match doc.subcategory {
        Some(ref sub) => println!("category:     {} / {}", doc.category, sub),
        None => println!("category:     {}", doc.category),
    }
    if let Some(ref url) = doc.source_url {
        println!("source_url:   {}", url);
    }
    println!("content_type: {}", doc.content_type);
    println!("modified:     {}", doc.last_modified);
    println!("indexed:      {}", doc.indexed_at);
    println!(
        "version:      {} ({})",
        doc.document_version,
        doc.change_type.as_str()
    );
    println!();

    println!("--- Chunks ({}) ---", doc.chunks.len());
    for chunk in &doc.chunks {
        println!(
            "[chunk {}] chars {}..{}",
            chunk.chunk_sequence, chunk.chunk_start, chunk.chunk_end
        );
        println!("{}", chunk.content);
        println!();
    }

    Ok(())
}
