//! Request and response payloads of the HTTP API.

use maxrag::{
    ingest::IngestionSummary,
    models::ModelInfo,
    types::{DocumentSummary, Profile},
    upload::{DuplicateFile, FileFailure},
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct IngestResponse {
    pub success: bool,
    pub message: String,
    pub total_chunks: usize,
    pub total_errors: usize,
    pub processed_documents: usize,
}

impl From<IngestionSummary> for IngestResponse {
    fn from(summary: IngestionSummary) -> Self {
        Self {
            success: true,
            message: format!(
                "Ingestão concluída: {} chunks criados",
                summary.total_chunks
            ),
            total_chunks: summary.total_chunks,
            total_errors: summary.total_errors,
            processed_documents: summary.processed_documents,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChatCompleteResponse {
    pub response: String,
    pub tokens: u32,
    pub conversation_id: String,
    pub model: String,
    pub session_id: String,
}

/// One SSE frame of `POST /chat`, before the final `[DONE]`.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatStreamFrame {
    Chunk {
        content: String,
    },
    #[serde(rename_all = "camelCase")]
    Usage {
        tokens: u32,
        model: String,
        conversation_id: String,
        session_id: String,
    },
}

#[derive(Serialize, Debug)]
pub struct UploadResponse {
    pub uploaded: Vec<DocumentSummary>,
    /// Files repeated within the batch.
    pub duplicates: Vec<DuplicateFile>,
    /// Files whose content is already in the store.
    pub already_stored: Vec<String>,
    pub failures: Vec<FileFailure>,
    /// Present when the new documents were ingested right away.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingestion: Option<IngestionSummary>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateAiSettingsRequest {
    #[serde(default)]
    pub current_model: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateModelRequest {
    /// `None` clears the preference.
    pub preferred_model: Option<String>,
}

/// Body of `PUT /admin/profiles/{user_id}`. Omitted fields keep their
/// current value and an empty string clears one.
#[derive(Deserialize, Debug, Default)]
pub struct AdminProfileUpdate {
    pub area: Option<String>,
    pub preferred_model: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct ModelsResponse {
    pub models: &'static [ModelInfo],
    pub default_model: String,
}

#[derive(Serialize, Debug)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub is_admin: bool,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            is_admin: profile.is_admin(),
            profile,
        }
    }
}
