//! # Upload Processing
//!
//! Extracts a batch of uploaded files concurrently. Every file settles on its
//! own (one failure never cancels a sibling); only after all of them settle are
//! the results partitioned into processed files, in-batch duplicates and
//! failures.

use crate::{
    constants::{CONTENT_HASH_PREFIX_CHARS, MAX_UPLOAD_FILES, MAX_UPLOAD_TOTAL_BYTES},
    extract::{ExtractLimits, ExtractedFile, ExtractorRegistry},
    types::NewDocument,
};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_total_bytes: u64,
    pub extract: ExtractLimits,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_files: MAX_UPLOAD_FILES,
            max_total_bytes: MAX_UPLOAD_TOTAL_BYTES,
            extract: ExtractLimits::default(),
        }
    }
}

/// A file as received from the client.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProcessedFile {
    #[serde(flatten)]
    pub file: ExtractedFile,
    pub content_hash: String,
}

impl ProcessedFile {
    pub fn into_new_document(self, uploaded_by: Option<String>) -> NewDocument {
        let meta = self.file.meta;
        NewDocument {
            filename: meta.name,
            content: self.file.text,
            file_type: meta.ext,
            mime_type: meta.mime_type,
            size_bytes: meta.size as i64,
            pages: meta.pages.map(|p| p as i64),
            sheets: meta.sheets,
            truncated: meta.truncated,
            content_hash: self.content_hash,
            uploaded_by,
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileFailure {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DuplicateFile {
    pub filename: String,
    /// The file of the same batch (or stored document) that was kept.
    pub duplicate_of: String,
    pub content_hash: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct UploadReport {
    pub processed: Vec<ProcessedFile>,
    pub duplicates: Vec<DuplicateFile>,
    pub failures: Vec<FileFailure>,
}

/// `md5("<filename>|<size>|<first 1000 characters of text>")` as lowercase hex.
pub fn content_hash(filename: &str, size: u64, text: &str) -> String {
    let prefix: String = text.chars().take(CONTENT_HASH_PREFIX_CHARS).collect();
    format!("{:x}", md5::compute(format!("{filename}|{size}|{prefix}")))
}

/// Rejects the batch as a whole before anything is extracted.
pub fn validate_batch(files: &[IncomingFile], limits: &UploadLimits) -> Result<(), UploadError> {
    if files.is_empty() {
        return Err(UploadError::InvalidArgument(
            "Nenhum arquivo enviado".to_string(),
        ));
    }
    if files.len() > limits.max_files {
        return Err(UploadError::InvalidArgument(format!(
            "Máximo de {} arquivos por envio",
            limits.max_files
        )));
    }
    let total: u64 = files.iter().map(|f| f.bytes.len() as u64).sum();
    if total > limits.max_total_bytes {
        return Err(UploadError::InvalidArgument(format!(
            "Tamanho total ({:.1}MB) excede o limite de {}MB",
            total as f64 / 1024.0 / 1024.0,
            limits.max_total_bytes / 1024 / 1024
        )));
    }
    Ok(())
}

/// Splits settled extraction results, keeping the first file of each content hash.
pub fn partition_results(
    results: Vec<(String, Result<ExtractedFile, String>)>,
) -> UploadReport {
    let mut report = UploadReport::default();
    let mut seen: HashMap<String, String> = HashMap::new();

    for (filename, result) in results {
        match result {
            Ok(file) => {
                let hash = content_hash(&file.meta.name, file.meta.size, &file.text);
                if let Some(kept) = seen.get(&hash) {
                    report.duplicates.push(DuplicateFile {
                        filename,
                        duplicate_of: kept.clone(),
                        content_hash: hash,
                    });
                    continue;
                }
                seen.insert(hash.clone(), filename);
                report.processed.push(ProcessedFile {
                    file,
                    content_hash: hash,
                });
            }
            Err(error) => report.failures.push(FileFailure { filename, error }),
        }
    }
    report
}

/// Validates the batch, extracts every file concurrently and partitions the results.
pub async fn process_uploads(
    registry: &ExtractorRegistry,
    files: Vec<IncomingFile>,
    limits: UploadLimits,
) -> Result<UploadReport, UploadError> {
    validate_batch(&files, &limits)?;
    info!("Processing upload batch of {} files", files.len());

    let results = join_all(files.into_iter().map(|file| async move {
        let result = registry
            .extract(&file.filename, file.mime_type, file.bytes, limits.extract)
            .await
            .map_err(|e| {
                warn!("Failed to process '{}': {}", file.filename, e);
                e.to_string()
            });
        (file.filename, result)
    }))
    .await;

    let report = partition_results(results);
    info!(
        "Upload batch settled: {} processed, {} duplicates, {} failed",
        report.processed.len(),
        report.duplicates.len(),
        report.failures.len()
    );
    Ok(report)
}
