//! Context-window selection around a matched chunk.
//!
//! A chunk's order is its 1-based rank by `chunk_start` among all chunks of
//! its document. Small documents are returned whole; larger ones return the
//! chunks whose order lies within `half_width` of the match, clamped to the
//! document's bounds.

use crate::models::ChunkRecord;

/// Documents with at most this many chunks are returned in full.
pub const FULL_DOCUMENT_THRESHOLD: usize = 5;

/// Separator placed between chunks in `context_content`.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Inclusive 1-based order range of a context window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub start_order: usize,
    pub end_order: usize,
    pub is_full_document: bool,
}

/// Compute the window for the chunk at `chunk_order` (1-based).
pub fn window_bounds(chunk_order: usize, chunk_count: usize, half_width: usize) -> WindowBounds {
    if chunk_count <= FULL_DOCUMENT_THRESHOLD {
        return WindowBounds {
            start_order: 1,
            end_order: chunk_count,
            is_full_document: true,
        };
    }
    WindowBounds {
        start_order: chunk_order.saturating_sub(half_width).max(1),
        end_order: chunk_order.saturating_add(half_width).min(chunk_count),
        is_full_document: false,
    }
}

/// A selected context window.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextWindow {
    pub bounds: WindowBounds,
    pub chunks: Vec<ChunkRecord>,
}

impl ContextWindow {
    /// Chunk contents joined with a blank line.
    pub fn content(&self) -> String {
        join_contents(&self.chunks)
    }
}

/// Select the window around `chunk_id` from all chunks of its document.
///
/// `chunks` may arrive in any order; they are ranked by `chunk_start`.
/// Returns `None` when `chunk_id` is not among them.
pub fn select_window(
    chunks: &[ChunkRecord],
    chunk_id: &str,
    half_width: usize,
) -> Option<ContextWindow> {
    let mut ordered: Vec<&ChunkRecord> = chunks.iter().collect();
    ordered.sort_by_key(|c| (c.chunk_start, c.chunk_sequence));

    let chunk_order = ordered.iter().position(|c| c.chunk_id == chunk_id)? + 1;
    let bounds = window_bounds(chunk_order, ordered.len(), half_width);

    let selected = ordered[bounds.start_order - 1..bounds.end_order]
        .iter()
        .map(|c| (*c).clone())
        .collect();

    Some(ContextWindow {
        bounds,
        chunks: selected,
    })
}

pub fn join_contents(chunks: &[ChunkRecord]) -> String {
    chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}
