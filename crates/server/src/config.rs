//! # Application Configuration
//!
//! This module defines the configuration structure for `maxrag-server` and the
//! logic for loading it. Every field has a default, so the server starts with
//! no file at all; a `config.yml` next to the crate (or an explicit path) and
//! environment variables are layered on top.

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use maxrag::{
    chat::ChatOptions,
    chunking::ChunkOptions,
    constants::{
        CHUNK_OVERLAP, CHUNK_SIZE, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL, HISTORY_LIMIT,
        INGEST_BATCH_DELAY_MS, INGEST_BATCH_SIZE, KEYWORD_CONTENT_CHARS, KEYWORD_TOP_N,
        MAX_EXTRACTED_CHARS, MAX_FILE_BYTES, MAX_OUTPUT_TOKENS, MAX_PDF_PAGES, MAX_UPLOAD_FILES,
        MAX_UPLOAD_TOTAL_BYTES, OPENAI_CHAT_COMPLETIONS_URL, OPENAI_EMBEDDINGS_URL, VECTOR_TOP_K,
    },
    extract::ExtractLimits,
    ingest::IngestOptions,
    upload::UploadLimits,
};
use regex::Regex;
use serde::Deserialize;
use std::{env, fs, path::Path, sync::LazyLock, time::Duration};
use tracing::info;

static ENV_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}").unwrap());

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates an explicitly requested configuration file was not found.
    NotFound(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Overridden by `PORT`.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The path to the SQLite database file. Overridden by `DB_URL`.
    #[serde(default = "default_db_url")]
    pub db_url: String,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            db_url: default_db_url(),
            openai: OpenAiConfig::default(),
            embedding: EmbeddingConfig::default(),
            chat: ChatConfig::default(),
            ingestion: IngestionConfig::default(),
            upload: UploadConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

fn default_port() -> u16 {
    9090
}

fn default_db_url() -> String {
    "db/max.db".to_string()
}

/// The chat-completions endpoint.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_url: String,
    /// Falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_url: OPENAI_CHAT_COMPLETIONS_URL.to_string(),
            api_key: None,
        }
    }
}

/// Configuration for the embedding model provider.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub api_url: String,
    pub model_name: String,
    /// Falls back to the chat key.
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: OPENAI_EMBEDDINGS_URL.to_string(),
            model_name: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    /// Used when neither the profile nor the AI settings name a model.
    pub default_model: String,
    pub history_limit: usize,
    pub max_output_tokens: u32,
    pub vector_top_k: u32,
    pub keyword_top_n: usize,
    pub keyword_content_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_CHAT_MODEL.to_string(),
            history_limit: HISTORY_LIMIT,
            max_output_tokens: MAX_OUTPUT_TOKENS,
            vector_top_k: VECTOR_TOP_K,
            keyword_top_n: KEYWORD_TOP_N,
            keyword_content_chars: KEYWORD_CONTENT_CHARS,
        }
    }
}

impl ChatConfig {
    pub fn options(&self) -> ChatOptions {
        ChatOptions {
            default_model: self.default_model.clone(),
            history_limit: self.history_limit,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IngestionConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    /// Run the ingestion pipeline on freshly uploaded documents.
    pub auto_ingest: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            chunk_overlap: CHUNK_OVERLAP,
            batch_size: INGEST_BATCH_SIZE,
            batch_delay_ms: INGEST_BATCH_DELAY_MS,
            auto_ingest: true,
        }
    }
}

impl IngestionConfig {
    pub fn options(&self) -> IngestOptions {
        IngestOptions {
            chunk: ChunkOptions {
                size: self.chunk_size,
                overlap: self.chunk_overlap,
            },
            batch_size: self.batch_size,
            batch_delay: Duration::from_millis(self.batch_delay_ms),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UploadConfig {
    pub max_files: usize,
    pub max_total_bytes: u64,
    pub max_file_bytes: u64,
    pub max_chars: usize,
    pub max_pdf_pages: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_files: MAX_UPLOAD_FILES,
            max_total_bytes: MAX_UPLOAD_TOTAL_BYTES,
            max_file_bytes: MAX_FILE_BYTES,
            max_chars: MAX_EXTRACTED_CHARS,
            max_pdf_pages: MAX_PDF_PAGES,
        }
    }
}

impl UploadConfig {
    pub fn limits(&self) -> UploadLimits {
        UploadLimits {
            max_files: self.max_files,
            max_total_bytes: self.max_total_bytes,
            extract: ExtractLimits {
                max_file_bytes: self.max_file_bytes,
                max_chars: self.max_chars,
                max_pdf_pages: self.max_pdf_pages,
            },
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret for bearer tokens. Falls back to `JWT_SECRET`.
    pub jwt_secret: Option<String>,
    /// Token subjects whose profile is given the admin role.
    pub admin_users: Vec<String>,
}

// Reads a file and substitutes `${VAR}` placeholders with environment values.
// Returns Ok(None) if the file does not exist.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let expanded = ENV_PLACEHOLDER.replace_all(&content, |caps: &regex::Captures| {
        env::var(&caps["var"]).unwrap_or_default()
    });

    Ok(Some(expanded.into_owned()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn env_non_empty(name: &str) -> Option<String> {
    non_empty(env::var(name).ok())
}

/// Loads the application configuration from a file and environment variables.
///
/// Layers, lowest to highest precedence:
/// - serde defaults,
/// - the YAML file (`config_path_override`, or `config.yml` next to the crate when present),
/// - `PORT` and `DB_URL`,
/// - `MAX_...` variables with `__` nesting (e.g. `MAX_CHAT__DEFAULT_MODEL`).
///
/// `OPENAI_API_KEY` and `JWT_SECRET` are used when the layers above leave the
/// key or the secret empty.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder();

    let config_path = match config_path_override {
        Some(path) => Some(path.to_string()),
        None => {
            let default_path = format!("{}/config.yml", env!("CARGO_MANIFEST_DIR"));
            Path::new(&default_path).exists().then_some(default_path)
        }
    };

    if let Some(path) = config_path {
        let content = read_and_substitute(&path)?
            .ok_or_else(|| ConfigError::NotFound(format!("Config file not found at '{path}'.")))?;
        info!("Loading configuration from '{path}'.");
        builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
    }

    let settings = builder
        .set_override_option("port", env_non_empty("PORT"))?
        .set_override_option("db_url", env_non_empty("DB_URL"))?
        .add_source(
            Environment::with_prefix("MAX")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("auth.admin_users"),
        )
        .build()?;

    let mut config: AppConfig = settings.try_deserialize()?;

    config.openai.api_key =
        non_empty(config.openai.api_key.take()).or_else(|| env_non_empty("OPENAI_API_KEY"));
    config.embedding.api_key =
        non_empty(config.embedding.api_key.take()).or_else(|| config.openai.api_key.clone());
    config.auth.jwt_secret =
        non_empty(config.auth.jwt_secret.take()).or_else(|| env_non_empty("JWT_SECRET"));

    Ok(config)
}
