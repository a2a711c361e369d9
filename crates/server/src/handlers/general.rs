//! Unauthenticated handlers.

use crate::{state::AppState, types::ModelsResponse};
use axum::{extract::State, Json};
use maxrag::models::MODEL_CATALOGUE;
use serde_json::{json, Value};

pub async fn root() -> &'static str {
    "Max server is running."
}

pub async fn health_check(State(app_state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "chat_configured": app_state.ai_provider.is_some(),
        "embeddings_configured": app_state.embedder.is_some(),
        "supported_types": app_state.extractors.supported_extensions(),
    }))
}

/// The model catalogue shown in the settings screens.
pub async fn models_handler(State(app_state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: MODEL_CATALOGUE,
        default_model: app_state.config.chat.default_model.clone(),
    })
}
