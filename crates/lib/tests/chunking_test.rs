//! # Chunking Tests
//!
//! Exercises `chunk_text` on realistic inputs: short documents, long runs
//! without punctuation, and prose with sentence boundaries.

mod common;

use common::setup_tracing;
use maxrag::chunking::{chunk_text, ChunkError, ChunkOptions};

/// Text that fits in one window comes back as one trimmed chunk.
#[test]
fn test_short_text_is_a_single_chunk() {
    setup_tracing();
    let chunks = chunk_text("  Política de férias: 30 dias corridos.  ", ChunkOptions::default())
        .expect("chunking should succeed");
    assert_eq!(chunks, vec!["Política de férias: 30 dias corridos.".to_string()]);
}

/// Without natural breaks the windows advance by `size - overlap` and
/// consecutive chunks share exactly `overlap` characters.
#[test]
fn test_windows_overlap_without_natural_breaks() {
    setup_tracing();
    // 1. Arrange: 2600 characters, no '.' and no newline.
    let text = "abcdefghijklmnopqrstuvwxyz".repeat(100);
    let chars: Vec<char> = text.chars().collect();

    // 2. Act
    let chunks = chunk_text(&text, ChunkOptions { size: 800, overlap: 150 })
        .expect("chunking should succeed");

    // 3. Assert: windows [0,800), [650,1450), [1300,2100), [1950,2600).
    assert_eq!(chunks.len(), 4);
    for (i, chunk) in chunks.iter().enumerate() {
        let start = i * 650;
        let end = usize::min(start + 800, chars.len());
        let expected: String = chars[start..end].iter().collect();
        assert_eq!(chunk, &expected, "chunk {i} has the wrong window");
    }

    // Dropping each overlap rebuilds the original text.
    let mut rebuilt = chunks[0].clone();
    for chunk in &chunks[1..] {
        rebuilt.extend(chunk.chars().skip(150));
    }
    assert_eq!(rebuilt, text);
}

/// Prose is cut at the last sentence end inside each window.
#[test]
fn test_chunks_end_at_sentence_boundaries() {
    setup_tracing();
    let text = (0..60)
        .map(|i| format!("O colaborador número {i:02} deve registrar o ponto diariamente."))
        .collect::<Vec<_>>()
        .join(" ");

    let chunks = chunk_text(&text, ChunkOptions::default()).expect("chunking should succeed");

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= 800);
        assert!(chunk.ends_with('.'), "chunk should end on a sentence: {chunk:?}");
    }
    assert!(chunks[0].starts_with("O colaborador número 00"));
    assert!(chunks.last().unwrap().ends_with("número 59 deve registrar o ponto diariamente."));
}

/// Multi-byte characters are counted as characters, never split.
#[test]
fn test_chunking_counts_characters_not_bytes() {
    setup_tracing();
    let text = "ção".repeat(400);
    let chunks = chunk_text(&text, ChunkOptions { size: 300, overlap: 50 })
        .expect("chunking should succeed");
    assert!(chunks.iter().all(|c| c.chars().count() <= 300));
    assert_eq!(chunks[0].chars().count(), 300);
}

/// Same input and options always yield the same chunks.
#[test]
fn test_chunking_is_deterministic() {
    setup_tracing();
    let text = common::filler("benefícios", 80);
    let first = chunk_text(&text, ChunkOptions::default()).unwrap();
    let second = chunk_text(&text, ChunkOptions::default()).unwrap();
    assert_eq!(first, second);
}

/// Fragments of ten characters or fewer are dropped as noise.
#[test]
fn test_tiny_trailing_fragments_are_dropped() {
    setup_tracing();
    // The final window holds four overlapping 'x' and trailing whitespace.
    let text = format!("{}\n{}", "x".repeat(95), " ".repeat(10));
    let chunks = chunk_text(&text, ChunkOptions { size: 100, overlap: 5 }).unwrap();
    assert_eq!(chunks, vec!["x".repeat(95)]);
}

#[test]
fn test_invalid_options_are_rejected() {
    let err = chunk_text("abc", ChunkOptions { size: 0, overlap: 0 }).unwrap_err();
    assert!(matches!(err, ChunkError::InvalidParams { size: 0, .. }));
    let err = chunk_text("abc", ChunkOptions { size: 100, overlap: 150 }).unwrap_err();
    assert!(matches!(err, ChunkError::InvalidParams { overlap: 150, .. }));
}
