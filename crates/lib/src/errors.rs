use thiserror::Error;

/// Errors raised by the upstream AI providers and the storage provider.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Failed to send request to AI provider: {0}")]
    AiRequest(reqwest::Error),
    #[error("Failed to deserialize AI provider response: {0}")]
    AiDeserialization(reqwest::Error),
    #[error("AI provider returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Embedding request failed with {status}: {body}")]
    EmbeddingFailed { status: u16, body: String },
    #[error("Embedding response contained no vectors")]
    EmptyEmbedding,
    #[error("API key is missing")]
    MissingApiKey,
    #[error("Storage provider connection error: {0}")]
    StorageConnection(String),
    #[error("Storage operation failed: {0}")]
    StorageOperationFailed(String),
    #[error("Database error: {0}")]
    Database(#[from] turso::Error),
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}
