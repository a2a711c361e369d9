use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use maxrag::{
    chat::ChatError, ingest::IngestError, search::SearchError, upload::UploadError, PromptError,
};
use serde_json::json;
use tracing::{error, warn};

/// A custom error type for the server application.
///
/// Every variant becomes a `{"error": "..."}` body with a matching status code.
#[derive(Debug)]
pub enum AppError {
    /// Errors from the AI providers and the store.
    Prompt(PromptError),
    Chat(ChatError),
    Ingest(IngestError),
    Upload(UploadError),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<PromptError> for AppError {
    fn from(err: PromptError) -> Self {
        AppError::Prompt(err)
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        AppError::Chat(err)
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        AppError::Ingest(err)
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        AppError::Upload(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

fn prompt_status(err: &PromptError) -> (StatusCode, String) {
    match err {
        PromptError::MissingApiKey => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "OpenAI API key não configurada".to_string(),
        ),
        PromptError::Upstream { status, .. } => (
            StatusCode::BAD_GATEWAY,
            format!("Erro na API OpenAI: {status}"),
        ),
        PromptError::EmbeddingFailed { .. }
        | PromptError::EmptyEmbedding
        | PromptError::AiRequest(_)
        | PromptError::AiDeserialization(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        PromptError::ReqwestClientBuild(_)
        | PromptError::StorageConnection(_)
        | PromptError::StorageOperationFailed(_)
        | PromptError::Database(_)
        | PromptError::JsonSerialization(_)
        | PromptError::Regex(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Erro interno do servidor".to_string(),
        ),
    }
}

impl AppError {
    /// The status code and client-facing message for this error.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Prompt(err) => prompt_status(err),
            AppError::Chat(err) => match err {
                ChatError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                ChatError::Unauthorized => (StatusCode::UNAUTHORIZED, err.to_string()),
                ChatError::Configuration(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
                ChatError::Upstream { .. } => (StatusCode::BAD_GATEWAY, err.to_string()),
                ChatError::Provider(inner) | ChatError::Storage(inner) => prompt_status(inner),
                ChatError::Search(SearchError::Embedding(inner))
                | ChatError::Search(SearchError::VectorSearch(inner))
                | ChatError::Search(SearchError::Storage(inner)) => prompt_status(inner),
            },
            AppError::Ingest(err) => match err {
                IngestError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                IngestError::Chunking(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            },
            AppError::Upload(UploadError::InvalidArgument(msg)) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Erro interno do servidor".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = self.status_and_message();

        // Log the original error for debugging purposes.
        if status_code.is_server_error() {
            error!("Request failed ({}): {:?}", status_code, self);
        } else {
            warn!("Request rejected ({}): {}", status_code, error_message);
        }

        let body = Json(json!({
            "error": error_message,
        }));

        (status_code, body).into_response()
    }
}
