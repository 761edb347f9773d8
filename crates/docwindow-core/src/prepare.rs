//! Turn a crawled [`SourceFile`] into a document row and its chunk rows.
//!
//! Preparation is pure: it chunks the text, derives path metadata, and
//! builds ids and hashes. Embedding and version bookkeeping happen later in
//! the indexing pipeline, which owns the provider and the store.

use crate::chunk::Chunker;
use crate::ids;
use crate::metadata::{content_type_for, MetadataExtractor};
use crate::models::{ChangeType, Chunk, Document, SourceFile};
use crate::text::bm25_text;

/// A document and its chunks, ready to embed and write.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub document: Document,
    pub chunks: Vec<Chunk>,
}

/// Build the rows for one file. `None` when the file has no content to chunk.
pub fn prepare_document(
    file: &SourceFile,
    extractor: &MetadataExtractor,
    chunker: &Chunker,
    source_url_base: Option<&str>,
    indexed_at: i64,
) -> Option<PreparedDocument> {
    let spans = chunker.split(&file.text);
    if spans.is_empty() {
        return None;
    }

    let relative_path = ids::normalize_path(&file.relative_path);
    let document_id = ids::document_id(&relative_path);
    let meta = extractor.extract(&relative_path);

    let chunks: Vec<Chunk> = spans
        .iter()
        .map(|span| Chunk {
            chunk_id: ids::chunk_id(&document_id, span.sequence),
            document_id: document_id.clone(),
            chunk_sequence: span.sequence as i64,
            total_chunks: span.total as i64,
            chunk_start: span.start as i64,
            chunk_end: span.end as i64,
            content: span.content.clone(),
            bm25_text: bm25_text(&span.content),
            embedding: None,
        })
        .collect();

    let full_content = spans
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join(crate::context::CONTEXT_SEPARATOR);

    let source_url = source_url_base.map(|base| {
        format!("{}/{}", base.trim_end_matches('/'), relative_path)
    });

    let document = Document {
        document_id,
        document_hash: ids::content_hash(&file.text),
        content_type: content_type_for(&meta.file_extension).to_string(),
        relative_path,
        file_name: meta.file_name,
        file_extension: meta.file_extension,
        category: meta.category,
        subcategory: meta.subcategory,
        document_title: meta.document_title,
        full_content,
        chunk_count: chunks.len() as i64,
        source_url,
        last_modified: file.modified_at,
        document_version: 1,
        is_latest_version: true,
        change_type: ChangeType::Added,
        indexed_at,
    };

    Some(PreparedDocument { document, chunks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::CategoryPattern;

    fn setup() -> (MetadataExtractor, Chunker) {
        (
            MetadataExtractor::new(
                vec![CategoryPattern::new("table-context", "table-context/")],
                "general",
            ),
            Chunker::new(40, 10).unwrap(),
        )
    }

    fn file(path: &str, text: &str) -> SourceFile {
        SourceFile {
            relative_path: path.to_string(),
            text: text.to_string(),
            modified_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_prepare_builds_rows() {
        let (extractor, chunker) = setup();
        let text = "Orders table holds one row per order. Refunded orders keep their id.";
        let prepared = prepare_document(
            &file("./table-context/sales/orders.md", text),
            &extractor,
            &chunker,
            Some("https://docs.example.com/"),
            42,
        )
        .unwrap();

        let doc = &prepared.document;
        assert_eq!(doc.relative_path, "table-context/sales/orders.md");
        assert_eq!(doc.document_id, ids::document_id("table-context/sales/orders.md"));
        assert_eq!(doc.category, "table-context");
        assert_eq!(doc.subcategory.as_deref(), Some("sales"));
        assert_eq!(doc.document_title, "orders.md");
        assert_eq!(doc.content_type, "text/markdown");
        assert_eq!(
            doc.source_url.as_deref(),
            Some("https://docs.example.com/table-context/sales/orders.md")
        );
        assert_eq!(doc.indexed_at, 42);
        assert_eq!(doc.chunk_count as usize, prepared.chunks.len());
        assert!(prepared.chunks.len() > 1);

        for (i, c) in prepared.chunks.iter().enumerate() {
            assert_eq!(c.chunk_sequence, i as i64);
            assert_eq!(c.total_chunks, doc.chunk_count);
            assert_eq!(c.document_id, doc.document_id);
            assert_eq!(c.chunk_id, ids::chunk_id(&doc.document_id, i));
            assert!(c.embedding.is_none());
        }
        let joined: Vec<&str> = prepared.chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(doc.full_content, joined.join("\n\n"));
    }

    #[test]
    fn test_prepare_skips_empty_file() {
        let (extractor, chunker) = setup();
        assert!(prepare_document(&file("a.md", " \n "), &extractor, &chunker, None, 0).is_none());
    }

    #[test]
    fn test_hash_tracks_content() {
        let (extractor, chunker) = setup();
        let a = prepare_document(&file("a.md", "one"), &extractor, &chunker, None, 0).unwrap();
        let b = prepare_document(&file("a.md", "two"), &extractor, &chunker, None, 0).unwrap();
        assert_eq!(a.document.document_id, b.document.document_id);
        assert_ne!(a.document.document_hash, b.document.document_hash);
        assert!(a.document.source_url.is_none());
    }
}
