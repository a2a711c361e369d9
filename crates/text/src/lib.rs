//! # `maxrag-text`: Plain Text Extraction Plugin
//!
//! This crate provides extraction of `.txt` and `.csv` files as a
//! self-contained plugin for the `maxrag` ecosystem. It implements the
//! `Extractor` trait from the core `maxrag` library. CSV files are kept as
//! their raw text; the ingestion pipeline chunks them like any other document.

use async_trait::async_trait;
use maxrag::extract::{ExtractError, ExtractLimits, Extractor, RawExtraction};
use std::borrow::Cow;
use tracing::{debug, warn};

const UTF8_BOM: &str = "\u{feff}";

/// Decodes `bytes` as UTF-8, replacing invalid sequences and dropping a leading BOM.
pub fn decode_text(filename: &str, bytes: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(bytes);
    if let Cow::Owned(_) = decoded {
        warn!(
            "'{}' is not valid UTF-8; invalid sequences were replaced.",
            filename
        );
    }
    match decoded.strip_prefix(UTF8_BOM) {
        Some(rest) => rest.to_string(),
        None => decoded.into_owned(),
    }
}

/// The `Extractor` implementation for plain text and CSV.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtractor;

#[async_trait]
impl Extractor for TextExtractor {
    fn extensions(&self) -> &'static [&'static str] {
        &[".txt", ".csv"]
    }

    async fn extract(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        _limits: ExtractLimits,
    ) -> Result<RawExtraction, ExtractError> {
        let text = decode_text(filename, &bytes);
        debug!("Decoded {} bytes of '{}'.", bytes.len(), filename);
        Ok(RawExtraction {
            text,
            ..Default::default()
        })
    }
}
