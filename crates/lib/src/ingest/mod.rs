//! # Ingestion Pipeline
//!
//! Turns stored documents into embedded chunks. For each requested document,
//! sequentially:
//!
//! 1.  **Load** the document row.
//! 2.  **Clear** its existing chunks (a failure here is logged, not fatal).
//! 3.  **Chunk** the stored text with overlap.
//! 4.  **Embed** each batch of chunks concurrently; a failed chunk is dropped
//!     and counted, the rest of the batch carries on.
//! 5.  **Persist** the valid chunks of the batch together, then pause before
//!     the next batch.
//!
//! Per-document and per-chunk failures never abort the run; they are tallied
//! in the returned [`IngestionSummary`].

pub mod locks;
pub mod pages;

use crate::{
    chunking::{chunk_text, ChunkError, ChunkOptions},
    constants::{INGEST_BATCH_DELAY_MS, INGEST_BATCH_SIZE},
    providers::{
        ai::Embedder,
        db::storage::{ChunkStore, DocumentStore},
    },
    types::{Document, NewChunk},
};
use futures::future::join_all;
pub use locks::DocumentLocks;
use serde::Serialize;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Invalid chunking configuration: {0}")]
    Chunking(#[from] ChunkError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub chunk: ChunkOptions,
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk: ChunkOptions::default(),
            batch_size: INGEST_BATCH_SIZE,
            batch_delay: Duration::from_millis(INGEST_BATCH_DELAY_MS),
        }
    }
}

/// Totals reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct IngestionSummary {
    pub total_chunks: usize,
    pub total_errors: usize,
    /// The number of ids requested, whether or not they succeeded.
    pub processed_documents: usize,
}

#[derive(Debug, Default)]
struct DocumentOutcome {
    chunks: usize,
    errors: usize,
}

impl DocumentOutcome {
    fn failed() -> Self {
        Self {
            chunks: 0,
            errors: 1,
        }
    }
}

/// Reads `document_ids` out of a request body.
///
/// The field must be present and must be an array; string elements are used
/// as-is and any other element is kept in its JSON form (it will simply not be
/// found).
pub fn parse_document_ids(body: &Value) -> Result<Vec<String>, IngestError> {
    let ids = body
        .get("document_ids")
        .and_then(Value::as_array)
        .ok_or_else(|| IngestError::InvalidArgument("document_ids deve ser um array".into()))?;

    Ok(ids
        .iter()
        .map(|id| match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect())
}

#[derive(Clone, Debug)]
pub struct IngestionPipeline {
    documents: Arc<dyn DocumentStore>,
    chunks: Arc<dyn ChunkStore>,
    embedder: Arc<dyn Embedder>,
    options: IngestOptions,
    locks: DocumentLocks,
}

impl IngestionPipeline {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        chunks: Arc<dyn ChunkStore>,
        embedder: Arc<dyn Embedder>,
        options: IngestOptions,
    ) -> Result<Self, IngestError> {
        options.chunk.validate()?;
        if options.batch_size == 0 {
            return Err(IngestError::InvalidArgument(
                "batch_size must be greater than zero".into(),
            ));
        }
        Ok(Self {
            documents,
            chunks,
            embedder,
            options,
            locks: DocumentLocks::default(),
        })
    }

    /// Shares a lock table with another pipeline, e.g. one built per request.
    pub fn with_locks(mut self, locks: DocumentLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Ingests every document in `document_ids`, one after the other.
    #[instrument(skip(self), fields(documents = document_ids.len()))]
    pub async fn ingest(&self, document_ids: &[String]) -> IngestionSummary {
        info!("Starting ingestion of {} documents", document_ids.len());
        let mut summary = IngestionSummary {
            processed_documents: document_ids.len(),
            ..Default::default()
        };

        for document_id in document_ids {
            let handle = self.locks.handle(document_id);
            let outcome = {
                let _guard = handle.lock().await;
                self.ingest_document(document_id).await
            };
            self.locks.release(document_id, handle);

            summary.total_chunks += outcome.chunks;
            summary.total_errors += outcome.errors;
        }

        info!(
            "Ingestion finished: {} chunks created, {} errors",
            summary.total_chunks, summary.total_errors
        );
        summary
    }

    async fn ingest_document(&self, document_id: &str) -> DocumentOutcome {
        debug!("Processing document {document_id}");
        let document = match self.documents.get_document(document_id).await {
            Ok(Some(document)) => document,
            Ok(None) => {
                error!("Document not found: {document_id}");
                return DocumentOutcome::failed();
            }
            Err(e) => {
                error!("Failed to load document {document_id}: {e}");
                return DocumentOutcome::failed();
            }
        };

        match self.chunks.delete_chunks(document_id).await {
            Ok(removed) if removed > 0 => debug!("Removed {removed} stale chunks"),
            Ok(_) => {}
            Err(e) => warn!("Failed to delete existing chunks for {document_id}: {e}"),
        }

        let pieces = match chunk_text(&document.content, self.options.chunk) {
            Ok(pieces) => pieces,
            Err(e) => {
                error!("Failed to chunk document {document_id}: {e}");
                return DocumentOutcome::failed();
            }
        };
        info!("Document '{}' split into {} chunks", document.filename, pieces.len());

        let pages = if document.is_pdf() {
            pages::assign_pages(&pieces)
        } else {
            vec![None; pieces.len()]
        };

        let mut outcome = DocumentOutcome::default();
        let batch_size = self.options.batch_size;

        for (batch_no, batch) in pieces.chunks(batch_size).enumerate() {
            if batch_no > 0 {
                tokio::time::sleep(self.options.batch_delay).await;
            }
            let offset = batch_no * batch_size;

            let results = join_all(batch.iter().enumerate().map(|(i, content)| {
                let index = offset + i;
                self.embed_chunk(&document, index, content, pages[index])
            }))
            .await;

            let mut valid = Vec::with_capacity(results.len());
            for result in results {
                match result {
                    Some(chunk) => valid.push(chunk),
                    None => outcome.errors += 1,
                }
            }

            if valid.is_empty() {
                continue;
            }
            match self.chunks.insert_chunks(&valid).await {
                Ok(inserted) => {
                    outcome.chunks += inserted;
                    debug!("Inserted {} chunks from batch {}", inserted, batch_no + 1);
                }
                Err(e) => {
                    error!("Failed to insert chunks for {document_id}: {e}");
                    outcome.errors += 1;
                }
            }
        }

        outcome
    }

    async fn embed_chunk(
        &self,
        document: &Document,
        index: usize,
        content: &str,
        page: Option<i64>,
    ) -> Option<NewChunk> {
        match self.embedder.embed(content).await {
            Ok(embedding) => Some(NewChunk {
                document_id: document.id.clone(),
                chunk_index: index as i64,
                content: content.to_string(),
                embedding,
                model_name: self.embedder.model_name().to_string(),
                page,
                filename: document.filename.clone(),
                path: document.path.clone(),
            }),
            Err(e) => {
                error!("Failed to embed chunk {index} of {}: {e}", document.id);
                None
            }
        }
    }
}
