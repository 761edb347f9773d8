//! Overlapping fixed-size text chunker.
//!
//! Splits document text into [`ChunkSpan`]s of at most `chunk_size`
//! characters, with consecutive spans sharing up to `overlap` characters.
//! Offsets are character offsets into the original text, so
//! `text.chars().skip(start).take(end - start)` reproduces `content`.
//!
//! # Algorithm
//!
//! 1. Text no longer than `chunk_size` becomes a single span.
//! 2. Otherwise a window of `chunk_size` characters slides over the text.
//! 3. When the window ends inside the text, its right edge snaps back to the
//!    last whitespace character, provided that whitespace lies at least
//!    `chunk_size / 2` characters into the window.
//! 4. The next window starts `overlap` characters before the previous end,
//!    or at the previous end if that would not move forward.
//!    This differs from advancing to `max(start + size - overlap, end)`,
//!    which never overlaps; see "Chunk advance" in `DESIGN.md`.
//! 5. Each segment is trimmed; empty segments are dropped without consuming
//!    a sequence number.
//!
//! # Example
//!
//! ```rust
//! use docwindow_core::chunk::Chunker;
//!
//! let chunker = Chunker::new(1000, 200).unwrap();
//! let spans = chunker.split("Hello world.");
//! assert_eq!(spans.len(), 1);
//! assert_eq!(spans[0].content, "Hello world.");
//! assert_eq!(spans[0].total, 1);
//! ```

use crate::error::ChunkError;

/// One chunk of a document, before ids and embeddings are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    /// 0-based sequence number among the document's non-empty chunks.
    pub sequence: usize,
    /// Character offset of the first character of `content`.
    pub start: usize,
    /// Character offset one past the last character of `content`.
    pub end: usize,
    /// Trimmed text of the segment.
    pub content: String,
    /// Number of chunks produced for the whole document.
    pub total: usize,
}

/// Sliding-window chunker with word-boundary snapping.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker. `overlap` must be strictly smaller than `size`.
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if size == 0 {
            return Err(ChunkError::ZeroSize);
        }
        if overlap >= size {
            return Err(ChunkError::InvalidOverlap { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into ordered spans. Empty or whitespace-only text yields
    /// no spans.
    pub fn split(&self, text: &str) -> Vec<ChunkSpan> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut spans = Vec::new();

        if len <= self.size {
            push_trimmed(&mut spans, &chars, 0, len);
            fix_totals(&mut spans);
            return spans;
        }

        let mut start = 0;
        while start < len {
            let mut end = (start + self.size).min(len);

            if end < len {
                // Never snap to `start` itself, that would produce an empty window.
                let floor = (start + self.size / 2).max(start + 1);
                if let Some(ws) = (floor..end).rev().find(|&i| chars[i].is_whitespace()) {
                    end = ws;
                }
            }

            push_trimmed(&mut spans, &chars, start, end);

            if end >= len {
                break;
            }

            let next = end.saturating_sub(self.overlap);
            start = if next > start { next } else { end };
        }

        fix_totals(&mut spans);
        spans
    }
}

/// Trim whitespace off `chars[start..end]` and record it if anything is left.
fn push_trimmed(spans: &mut Vec<ChunkSpan>, chars: &[char], start: usize, end: usize) {
    let mut lo = start;
    let mut hi = end;
    while lo < hi && chars[lo].is_whitespace() {
        lo += 1;
    }
    while hi > lo && chars[hi - 1].is_whitespace() {
        hi -= 1;
    }
    if lo == hi {
        return;
    }

    spans.push(ChunkSpan {
        sequence: spans.len(),
        start: lo,
        end: hi,
        content: chars[lo..hi].iter().collect(),
        total: 0,
    });
}

fn fix_totals(spans: &mut [ChunkSpan]) {
    let total = spans.len();
    for span in spans.iter_mut() {
        span.total = total;
    }
}
