//! Page-number recovery for chunks of PDF text.
//!
//! The PDF extractor writes a `--- Página N ---` line before every page, and
//! documents imported from elsewhere often carry `Page N`, `Pág. N` or `p. N`
//! references. Patterns are tried in that order of priority.

use regex::Regex;
use std::sync::LazyLock;

static PAGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:—|-{2,3})\s*Página\s+(\d+)\s*(?:—|-{2,3})",
        r"(?i)\bPage\s+(\d+)",
        r"(?i)\bPág\.\s*(\d+)",
        r"(?i)\bp\.\s*(\d+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// The page referenced by the first marker of the highest-priority pattern found in `chunk`.
pub fn first_page_marker(chunk: &str) -> Option<i64> {
    PAGE_PATTERNS
        .iter()
        .find_map(|re| re.captures(chunk))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn last_page_marker(chunk: &str) -> Option<i64> {
    PAGE_PATTERNS
        .iter()
        .find_map(|re| re.captures_iter(chunk).last())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Assigns a page to every chunk, in order.
///
/// A chunk containing a marker takes the page of its first marker. A chunk
/// without one inherits the page in effect where the previous chunk ended.
pub fn assign_pages(chunks: &[String]) -> Vec<Option<i64>> {
    let mut current = None;
    chunks
        .iter()
        .map(|chunk| match first_page_marker(chunk) {
            Some(page) => {
                current = last_page_marker(chunk);
                Some(page)
            }
            None => current,
        })
        .collect()
}
