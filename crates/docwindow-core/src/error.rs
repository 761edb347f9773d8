//! Typed errors for the core crate.
//!
//! Storage traits return `anyhow::Result` so backends can attach their own
//! context; the types here cover the places where callers need to branch on
//! the failure kind.

use serde::Serialize;
use thiserror::Error;

/// Invalid chunker parameters. Raised at construction, never mid-run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("chunk size must be greater than zero")]
    ZeroSize,

    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    InvalidOverlap { size: usize, overlap: usize },
}

/// Why a search could not consult the storage backend.
///
/// Attached to a [`SearchStatus::Failed`](crate::search::SearchStatus::Failed)
/// outcome; the result list of such an outcome is always empty.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchFailure {
    #[error("storage backend error: {message}")]
    Backend { message: String },

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },
}

impl SearchFailure {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        SearchFailure::Backend {
            message: err.to_string(),
        }
    }
}
