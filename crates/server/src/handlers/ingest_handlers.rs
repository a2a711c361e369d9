//! # Ingestion Route Handler

use crate::{auth::AdminUser, errors::AppError, state::AppState, types::IngestResponse};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use maxrag::ingest::parse_document_ids;
use serde_json::Value;
use tracing::info;

/// Handler for `POST /ingest` with `{"document_ids": [...]}`.
///
/// Chunks, embeds and stores each listed document, replacing its previous
/// chunks. Per-document failures are counted in `total_errors`, never raised.
pub async fn ingest_handler(
    State(app_state): State<AppState>,
    AdminUser(user): AdminUser,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<IngestResponse>, AppError> {
    let Json(body) = payload?;
    let document_ids = parse_document_ids(&body)?;
    info!(
        "User '{}' requested ingestion of {} documents.",
        user.id,
        document_ids.len()
    );

    let summary = app_state.ingestion_pipeline()?.ingest(&document_ids).await;
    Ok(Json(IngestResponse::from(summary)))
}
