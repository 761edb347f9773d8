//! Deterministic identifiers.
//!
//! Document and chunk ids are content-derived so a full rebuild of the index
//! produces the same keys for the same paths. Both are lowercase hex SHA-256.

use sha2::{Digest, Sha256};

/// Normalize a relative path to forward slashes without a leading `./`.
pub fn normalize_path(relative_path: &str) -> String {
    let path = relative_path.replace('\\', "/");
    path.trim_start_matches("./").trim_start_matches('/').to_string()
}

/// Stable document id: SHA-256 of the normalized relative path.
pub fn document_id(relative_path: &str) -> String {
    sha256_hex(normalize_path(relative_path).as_bytes())
}

/// Stable chunk id: SHA-256 of `"{document_id}:{sequence}"`.
pub fn chunk_id(document_id: &str, sequence: usize) -> String {
    sha256_hex(format!("{}:{}", document_id, sequence).as_bytes())
}

/// Content hash used to detect changed documents between indexing runs.
pub fn content_hash(text: &str) -> String {
    sha256_hex(text.as_bytes())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
