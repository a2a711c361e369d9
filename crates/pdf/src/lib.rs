//! # maxrag-pdf: PDF Extraction Plugin
//!
//! This crate provides text extraction for PDF documents, acting as a plugin
//! for the `maxrag` ecosystem. It implements the `Extractor` trait from the
//! core library.
//!
//! The output starts with a header line naming the file and its true page
//! count, followed by one `--- Página N ---` section per page read. Reading
//! stops at the page ceiling or once the text passes the character ceiling;
//! those markers are what the ingestion pipeline later uses to attribute
//! chunks to pages.

use async_trait::async_trait;
use maxrag::extract::{ExtractError, ExtractLimits, Extractor, RawExtraction};
use pdf::{
    content::{Op, TextDrawAdjusted},
    file::FileOptions,
};
use thiserror::Error;
use tracing::{debug, info, instrument};

// --- Error Definitions ---

#[derive(Error, Debug)]
pub enum PdfExtractError {
    #[error("Failed to parse PDF content: {0}")]
    PdfParse(String),
    #[error("PDF extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PdfExtractError {
    fn into_extract_error(self, filename: &str) -> ExtractError {
        match self {
            PdfExtractError::PdfParse(reason) => ExtractError::parse(filename, reason),
            PdfExtractError::Task(e) => ExtractError::Internal(e.to_string()),
        }
    }
}

// --- Core Extraction Logic ---

/// Text of the pages read plus the document's true page count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfText {
    pub text: String,
    pub total_pages: usize,
    pub pages_read: usize,
}

/// The text items drawn on one page, in content-stream order.
fn page_text_items(operations: &[Op]) -> Vec<String> {
    let mut items = Vec::new();
    for op in operations {
        match op {
            Op::TextDraw { text } => items.push(text.to_string_lossy().into()),
            Op::TextDrawAdjusted { array } => {
                let joined: String = array
                    .iter()
                    .filter_map(|part| match part {
                        TextDrawAdjusted::Text(text) => Some(text.to_string_lossy()),
                        _ => None,
                    })
                    .collect();
                items.push(joined);
            }
            _ => {}
        }
    }
    items.retain(|item| !item.trim().is_empty());
    items
}

/// Extracts page text synchronously; callers run this on a blocking thread.
pub fn extract_pdf_text(
    filename: &str,
    data: &[u8],
    limits: ExtractLimits,
) -> Result<PdfText, PdfExtractError> {
    let file = FileOptions::cached()
        .load(data)
        .map_err(|e| PdfExtractError::PdfParse(e.to_string()))?;
    let resolver = file.resolver();
    let total_pages = file.num_pages() as usize;

    let mut text = format!("PDF: {filename} | Páginas: {total_pages}\n");
    let mut pages_read = 0;

    for page_num in 0..total_pages.min(limits.max_pdf_pages) {
        let page = file
            .get_page(page_num as u32)
            .map_err(|e| PdfExtractError::PdfParse(e.to_string()))?;
        let items = match &page.contents {
            Some(content) => {
                let operations = content
                    .operations(&resolver)
                    .map_err(|e| PdfExtractError::PdfParse(e.to_string()))?;
                page_text_items(&operations)
            }
            None => Vec::new(),
        };

        text.push_str(&format!(
            "\n--- Página {} ---\n{}\n",
            page_num + 1,
            items.join(" ")
        ));
        pages_read += 1;

        if text.chars().count() > limits.max_chars {
            debug!("Stopping at page {} of {}: character ceiling reached", page_num + 1, total_pages);
            break;
        }
    }

    Ok(PdfText {
        text,
        total_pages,
        pages_read,
    })
}

// --- Extractor Implementation ---

/// The `Extractor` implementation for `.pdf` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

#[async_trait]
impl Extractor for PdfExtractor {
    fn extensions(&self) -> &'static [&'static str] {
        &[".pdf"]
    }

    #[instrument(skip(self, bytes, limits), fields(bytes = bytes.len()))]
    async fn extract(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        limits: ExtractLimits,
    ) -> Result<RawExtraction, ExtractError> {
        let name = filename.to_string();
        let result = tokio::task::spawn_blocking(move || extract_pdf_text(&name, &bytes, limits))
            .await
            .map_err(PdfExtractError::from)
            .and_then(|inner| inner)
            .map_err(|e| e.into_extract_error(filename))?;

        info!(
            "Read {} of {} pages from '{}'.",
            result.pages_read, result.total_pages, filename
        );

        Ok(RawExtraction {
            text: result.text,
            pages: Some(result.total_pages),
            sheets: Vec::new(),
        })
    }
}
