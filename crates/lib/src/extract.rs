//! # Text Extraction
//!
//! Turns an uploaded file into normalized text plus metadata. Each supported
//! format is handled by a plugin crate implementing [`Extractor`]; the
//! [`ExtractorRegistry`] dispatches on the lower-cased file extension and applies
//! the shared post-processing (whitespace normalization and truncation to the
//! character ceiling) so every format behaves the same way.
//!
//! Extraction is pure: it never touches the store, so a failure leaves nothing
//! behind.

use crate::constants::{MAX_EXTRACTED_CHARS, MAX_FILE_BYTES, MAX_PDF_PAGES};
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::{collections::HashMap, path::Path, sync::Arc, sync::LazyLock};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Tipo de arquivo não suportado: {0}")]
    UnsupportedType(String),
    #[error("Arquivo muito grande ({size_mb:.1}MB). Limite: {limit_mb}MB")]
    FileTooLarge { size_mb: f64, limit_mb: u64 },
    #[error("Failed to parse '{filename}': {reason}")]
    Parse { filename: String, reason: String },
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ExtractError {
    pub fn parse(filename: &str, reason: impl ToString) -> Self {
        Self::Parse {
            filename: filename.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Ceilings applied while extracting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractLimits {
    pub max_file_bytes: u64,
    pub max_chars: usize,
    pub max_pdf_pages: usize,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: MAX_FILE_BYTES,
            max_chars: MAX_EXTRACTED_CHARS,
            max_pdf_pages: MAX_PDF_PAGES,
        }
    }
}

/// What a plugin hands back before the shared normalization runs.
#[derive(Debug, Clone, Default)]
pub struct RawExtraction {
    pub text: String,
    /// True page count of a paged document, even when fewer pages were read.
    pub pages: Option<usize>,
    /// Names of every sheet visited, in workbook order.
    pub sheets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
    pub mime_type: Option<String>,
    pub ext: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sheets: Vec<String>,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExtractedFile {
    pub text: String,
    pub meta: FileMeta,
}

/// A file-format plugin.
///
/// Implementations must not perform I/O beyond reading `bytes`; CPU-heavy
/// parsers are expected to move their work onto `tokio::task::spawn_blocking`.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Lower-cased extensions handled by this plugin, including the dot (e.g. `.pdf`).
    fn extensions(&self) -> &'static [&'static str];

    async fn extract(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        limits: ExtractLimits,
    ) -> Result<RawExtraction, ExtractError>;
}

/// Maps extensions to their extractor.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<&'static str, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `extractor` for each extension it declares, replacing any earlier plugin.
    pub fn register(&mut self, extractor: Arc<dyn Extractor>) {
        for ext in extractor.extensions() {
            self.extractors.insert(ext, extractor.clone());
        }
    }

    pub fn with(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.register(extractor);
        self
    }

    pub fn supports(&self, filename: &str) -> bool {
        self.extractors.contains_key(extension(filename).as_str())
    }

    /// Sorted list of every registered extension.
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut exts: Vec<_> = self.extractors.keys().copied().collect();
        exts.sort_unstable();
        exts
    }

    /// Extracts `bytes` using the plugin registered for the file's extension.
    ///
    /// The size ceiling is checked before any parsing. The returned text is
    /// normalized and cut to `limits.max_chars` characters.
    pub async fn extract(
        &self,
        filename: &str,
        mime_type: Option<String>,
        bytes: Vec<u8>,
        limits: ExtractLimits,
    ) -> Result<ExtractedFile, ExtractError> {
        let size = bytes.len() as u64;
        if size > limits.max_file_bytes {
            return Err(ExtractError::FileTooLarge {
                size_mb: size as f64 / 1024.0 / 1024.0,
                limit_mb: limits.max_file_bytes / 1024 / 1024,
            });
        }

        let ext = extension(filename);
        let extractor = self
            .extractors
            .get(ext.as_str())
            .ok_or_else(|| ExtractError::UnsupportedType(ext.clone()))?;

        debug!("Extracting '{filename}' ({size} bytes) as {ext}");
        let raw = extractor.extract(filename, bytes, limits).await?;

        let (text, truncated) = truncate_chars(&normalize_text(&raw.text), limits.max_chars);
        info!(
            "Extracted {} characters from '{}' (truncated: {}).",
            text.chars().count(),
            filename,
            truncated
        );

        Ok(ExtractedFile {
            text,
            meta: FileMeta {
                name: filename.to_string(),
                size,
                mime_type,
                ext,
                pages: raw.pages,
                sheets: raw.sheets,
                truncated,
            },
        })
    }
}

/// Lower-cased extension of `filename` including the leading dot, or an empty string.
pub fn extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// CRLF/CR become LF, runs of spaces and tabs collapse to one space, three or
/// more line breaks collapse to two, and the result is trimmed.
pub fn normalize_text(text: &str) -> String {
    let unix = text.replace("\r\n", "\n").replace('\r', "\n");
    let spaced = SPACES_RE.replace_all(&unix, " ");
    BLANK_LINES_RE
        .replace_all(&spaced, "\n\n")
        .trim()
        .to_string()
}

/// Cuts `text` to at most `max_chars` characters.
///
/// The flag is true when the result reached the ceiling.
pub fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (text[..byte_idx].to_string(), true),
        None => {
            let reached = text.chars().count() >= max_chars;
            (text.to_string(), reached)
        }
    }
}
