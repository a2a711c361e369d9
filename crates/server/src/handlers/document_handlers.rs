//! # Document Route Handlers
//!
//! Listing is open to every signed-in user; uploading and deleting require
//! the admin role.

use crate::{
    auth::{AdminUser, AuthenticatedUser},
    errors::AppError,
    state::AppState,
    types::UploadResponse,
};
use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::Multipart;
use maxrag::{
    providers::db::storage::DocumentStore,
    types::DocumentSummary,
    upload::{process_uploads, IncomingFile},
};
use serde_json::{json, Value};
use tracing::{info, warn};

/// Handler for `GET /documents`, newest first.
pub async fn list_documents_handler(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<DocumentSummary>>, AppError> {
    info!("User '{}' is fetching documents.", user.id);
    let documents = app_state.store.list_documents().await?;
    Ok(Json(documents))
}

/// Reads every part of the form that carries a file name.
async fn read_files(mut multipart: Multipart) -> Result<Vec<IncomingFile>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            // Ignore plain form fields.
            continue;
        };
        let mime_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        info!("Received file upload: {} ({} bytes)", filename, bytes.len());
        files.push(IncomingFile {
            filename,
            mime_type,
            bytes: bytes.to_vec(),
        });
    }
    Ok(files)
}

/// Handler for `POST /documents` (multipart).
///
/// Extracts every file, skips duplicates within the batch and content the
/// store already holds, saves the rest and, when `ingestion.auto_ingest` is
/// set and an embedder is configured, ingests them right away.
pub async fn upload_documents_handler(
    State(app_state): State<AppState>,
    AdminUser(user): AdminUser,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let files = read_files(multipart).await?;
    let report = process_uploads(
        &app_state.extractors,
        files,
        app_state.config.upload.limits(),
    )
    .await?;

    let hashes: Vec<String> = report
        .processed
        .iter()
        .map(|p| p.content_hash.clone())
        .collect();
    let existing = app_state.store.existing_hashes(&hashes).await?;

    let mut uploaded = Vec::new();
    let mut already_stored = Vec::new();
    for processed in report.processed {
        if existing.contains(&processed.content_hash) {
            info!(
                "Skipping '{}': identical content is already stored.",
                processed.file.meta.name
            );
            already_stored.push(processed.file.meta.name);
            continue;
        }
        let document = app_state
            .store
            .insert_document(processed.into_new_document(Some(user.id.clone())))
            .await?;
        uploaded.push(DocumentSummary {
            id: document.id,
            filename: document.filename,
            file_type: document.file_type,
            created_at: document.created_at,
        });
    }

    let ingestion = if app_state.config.ingestion.auto_ingest && !uploaded.is_empty() {
        if app_state.embedder.is_some() {
            let ids: Vec<String> = uploaded.iter().map(|d| d.id.clone()).collect();
            Some(app_state.ingestion_pipeline()?.ingest(&ids).await)
        } else {
            warn!("Auto-ingest skipped: no embedding client is configured.");
            None
        }
    } else {
        None
    };

    Ok(Json(UploadResponse {
        uploaded,
        duplicates: report.duplicates,
        already_stored,
        failures: report.failures,
        ingestion,
    }))
}

/// Handler for `DELETE /documents/{id}`. Chunks go with the document.
pub async fn delete_document_handler(
    State(app_state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(document_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !app_state.store.delete_document(&document_id).await? {
        return Err(AppError::NotFound("Documento não encontrado".to_string()));
    }
    info!("User '{}' deleted document '{}'.", user.id, document_id);
    Ok(Json(json!({ "success": true, "id": document_id })))
}
