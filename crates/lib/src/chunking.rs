//! # Text Chunking
//!
//! Splits a document's extracted text into overlapping windows suitable for
//! embedding. A window that does not reach the end of the text is cut at the
//! last sentence terminator (`.`) or line break inside it, provided that break
//! lies past 70% of the window; otherwise it is cut exactly at the window edge.
//! Consecutive chunks share `overlap` characters so that context is not lost at
//! the cut points.
//!
//! All positions are counted in characters, never bytes, so multi-byte text
//! (e.g. Portuguese accents) is never split inside a code point.

use crate::constants::{CHUNK_OVERLAP, CHUNK_SIZE, MIN_CHUNK_CHARS};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Invalid chunk parameters: size {size}, overlap {overlap}")]
    InvalidParams { size: usize, overlap: usize },
}

/// Window parameters for `chunk_text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    pub size: usize,
    pub overlap: usize,
}

impl ChunkOptions {
    /// The window must be non-empty and must advance, so `overlap < size`.
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.size == 0 || self.overlap >= self.size {
            return Err(ChunkError::InvalidParams {
                size: self.size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            size: CHUNK_SIZE,
            overlap: CHUNK_OVERLAP,
        }
    }
}

/// Splits `text` into chunks of at most `options.size` characters.
///
/// Text no longer than the window comes back as a single trimmed chunk (or no
/// chunk at all when it is blank). Longer text is windowed as described in the
/// module documentation and chunks of `MIN_CHUNK_CHARS` characters or fewer are
/// dropped. The output depends only on the input and the options.
pub fn chunk_text(text: &str, options: ChunkOptions) -> Result<Vec<String>, ChunkError> {
    options.validate()?;
    let ChunkOptions { size, overlap } = options;

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= size {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        return Ok(vec![trimmed.to_string()]);
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = usize::min(start + size, chars.len());
        let window = &chars[start..end];

        if end == chars.len() {
            chunks.push(collect_trimmed(window));
            break;
        }

        match natural_break(window, size) {
            Some(break_point) => {
                chunks.push(collect_trimmed(&window[..=break_point]));
                let next = (start + break_point + 1).saturating_sub(overlap);
                start = if next > start { next } else { end - overlap };
            }
            None => {
                chunks.push(collect_trimmed(window));
                start = end - overlap;
            }
        }
    }

    let before = chunks.len();
    chunks.retain(|chunk| chunk.chars().count() > MIN_CHUNK_CHARS);
    debug!(
        "Chunked {} characters into {} chunks ({} dropped as noise).",
        chars.len(),
        chunks.len(),
        before - chunks.len()
    );

    Ok(chunks)
}

/// The window-relative index of the last `.` or `\n`, if it lies past 70% of the window.
fn natural_break(window: &[char], size: usize) -> Option<usize> {
    let break_point = window.iter().rposition(|c| *c == '.' || *c == '\n')?;
    (break_point * 10 > size * 7).then_some(break_point)
}

fn collect_trimmed(chars: &[char]) -> String {
    chars.iter().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        let err = chunk_text("abc", ChunkOptions { size: 10, overlap: 10 }).unwrap_err();
        assert_eq!(err, ChunkError::InvalidParams { size: 10, overlap: 10 });
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(chunk_text("   \n ", ChunkOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn break_point_must_pass_seventy_percent() {
        let window: Vec<char> = "aaaa.aaaaa".chars().collect();
        assert_eq!(natural_break(&window, 10), None);
        let window: Vec<char> = "aaaaaaaa.a".chars().collect();
        assert_eq!(natural_break(&window, 10), Some(8));
    }
}
