//! Core data models: the two-table document/chunk schema.
//!
//! A [`Document`] is one row per source file; its [`Chunk`]s are the units
//! of retrieval. Both are written once per indexing run and are read-only
//! afterwards.

use serde::{Deserialize, Serialize};

/// Raw file handed to the indexing pipeline by a crawler.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the crawl root, `/`-separated.
    pub relative_path: String,
    pub text: String,
    /// Modification time, Unix seconds.
    pub modified_at: i64,
}

/// How a document changed relative to the previous indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Modified,
    Unchanged,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Modified => "modified",
            ChangeType::Unchanged => "unchanged",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "added" => Some(ChangeType::Added),
            "modified" => Some(ChangeType::Modified),
            "unchanged" => Some(ChangeType::Unchanged),
            _ => None,
        }
    }
}

/// Version bookkeeping carried over from the previous indexing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousVersion {
    pub document_hash: String,
    pub document_version: i64,
}

/// One row per source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub document_id: String,
    pub document_hash: String,
    pub relative_path: String,
    pub file_name: String,
    pub file_extension: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub document_title: String,
    pub content_type: String,
    /// Chunk contents in `chunk_start` order, joined by a blank line.
    pub full_content: String,
    pub chunk_count: i64,
    pub source_url: Option<String>,
    /// Unix seconds.
    pub last_modified: i64,
    pub document_version: i64,
    pub is_latest_version: bool,
    pub change_type: ChangeType,
    /// Unix seconds.
    pub indexed_at: i64,
}

impl Document {
    /// Set version fields by comparing against the previous run's row.
    pub fn apply_previous(&mut self, previous: Option<&PreviousVersion>) {
        let (version, change) = match previous {
            None => (1, ChangeType::Added),
            Some(p) if p.document_hash == self.document_hash => {
                (p.document_version, ChangeType::Unchanged)
            }
            Some(p) => (p.document_version + 1, ChangeType::Modified),
        };
        self.document_version = version;
        self.change_type = change;
        self.is_latest_version = true;
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            document_id: self.document_id.clone(),
            document_title: self.document_title.clone(),
            relative_path: self.relative_path.clone(),
            file_name: self.file_name.clone(),
            category: self.category.clone(),
            subcategory: self.subcategory.clone(),
            source_url: self.source_url.clone(),
            last_modified: self.last_modified,
            chunk_count: self.chunk_count,
        }
    }

    /// Full view of this document with the given chunks attached.
    pub fn to_response(&self, chunks: Vec<ChunkRecord>) -> DocumentResponse {
        DocumentResponse {
            document_id: self.document_id.clone(),
            document_title: self.document_title.clone(),
            relative_path: self.relative_path.clone(),
            file_name: self.file_name.clone(),
            file_extension: self.file_extension.clone(),
            category: self.category.clone(),
            subcategory: self.subcategory.clone(),
            content_type: self.content_type.clone(),
            source_url: self.source_url.clone(),
            last_modified: format_ts_iso(self.last_modified),
            indexed_at: format_ts_iso(self.indexed_at),
            document_version: self.document_version,
            is_latest_version: self.is_latest_version,
            change_type: self.change_type,
            chunk_count: self.chunk_count,
            full_content: self.full_content.clone(),
            chunks,
        }
    }
}

impl Chunk {
    pub fn record(&self) -> ChunkRecord {
        ChunkRecord {
            chunk_id: self.chunk_id.clone(),
            chunk_sequence: self.chunk_sequence,
            chunk_start: self.chunk_start,
            chunk_end: self.chunk_end,
            content: self.content.clone(),
        }
    }
}

/// Many rows per document; deleted with their document.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub chunk_id: String,
    pub document_id: String,
    pub chunk_sequence: i64,
    pub total_chunks: i64,
    pub chunk_start: i64,
    pub chunk_end: i64,
    pub content: String,
    pub bm25_text: String,
    /// L2-normalized vector, `None` when embedding was unavailable.
    pub embedding: Option<Vec<f32>>,
}

/// A chunk as returned to callers in context windows and document views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub chunk_sequence: i64,
    pub chunk_start: i64,
    pub chunk_end: i64,
    pub content: String,
}

/// Document fields needed to score and present a search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    pub document_id: String,
    pub document_title: String,
    pub relative_path: String,
    pub file_name: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub source_url: Option<String>,
    pub last_modified: i64,
    pub chunk_count: i64,
}

/// Full document view for `get`.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    pub document_id: String,
    pub document_title: String,
    pub relative_path: String,
    pub file_name: String,
    pub file_extension: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub content_type: String,
    pub source_url: Option<String>,
    pub last_modified: String,
    pub indexed_at: String,
    pub document_version: i64,
    pub is_latest_version: bool,
    pub change_type: ChangeType,
    pub chunk_count: i64,
    pub full_content: String,
    pub chunks: Vec<ChunkRecord>,
}

/// Per-category counts for `stats`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub documents: i64,
    pub chunks: i64,
    pub embedded_chunks: i64,
}

/// Index-wide counts for `stats`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub documents: i64,
    pub chunks: i64,
    pub embedded_chunks: i64,
    pub categories: Vec<CategoryStats>,
}

/// Format a Unix timestamp as ISO 8601.
pub fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(hash: &str) -> Document {
        Document {
            document_id: "d".into(),
            document_hash: hash.into(),
            relative_path: "a.md".into(),
            file_name: "a.md".into(),
            file_extension: "md".into(),
            category: "general".into(),
            subcategory: None,
            document_title: "a".into(),
            content_type: "text/markdown".into(),
            full_content: String::new(),
            chunk_count: 0,
            source_url: None,
            last_modified: 0,
            document_version: 1,
            is_latest_version: true,
            change_type: ChangeType::Added,
            indexed_at: 0,
        }
    }

    #[test]
    fn test_apply_previous_versions() {
        let mut d = doc("h1");
        d.apply_previous(None);
        assert_eq!((d.document_version, d.change_type), (1, ChangeType::Added));

        let prev = PreviousVersion {
            document_hash: "h1".into(),
            document_version: 3,
        };
        d.apply_previous(Some(&prev));
        assert_eq!((d.document_version, d.change_type), (3, ChangeType::Unchanged));

        let mut changed = doc("h2");
        changed.apply_previous(Some(&prev));
        assert_eq!(
            (changed.document_version, changed.change_type),
            (4, ChangeType::Modified)
        );
    }

    #[test]
    fn test_change_type_round_trip() {
        for c in [ChangeType::Added, ChangeType::Modified, ChangeType::Unchanged] {
            assert_eq!(ChangeType::parse(c.as_str()), Some(c));
        }
        assert_eq!(ChangeType::parse("deleted"), None);
    }

    #[test]
    fn test_format_ts_iso() {
        assert_eq!(format_ts_iso(0), "1970-01-01T00:00:00Z");
    }
}
