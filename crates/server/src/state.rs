//! # Application State
//!
//! This module defines the shared application state (`AppState`) and the logic
//! for building it at startup. The `AppState` holds the configuration, the
//! store, the upstream AI clients and the extractor registry, making them
//! accessible to all request handlers.
//!
//! AI settings and profiles are *not* cached here: handlers read them from the
//! store on every request.

use crate::{config::AppConfig, errors::AppError};
use maxrag::{
    chat::{ChatError, ChatOrchestrator},
    extract::ExtractorRegistry,
    ingest::{DocumentLocks, IngestionPipeline},
    providers::{
        ai::{AiProvider, Embedder, OpenAiEmbedder, OpenAiProvider},
        db::{
            sqlite::SqliteProvider,
            storage::{DocumentStore, VectorSearch},
        },
    },
    search::{FallbackRetriever, KeywordRetriever, Retriever, VectorRetriever},
    PromptError,
};
use std::sync::Arc;
use tracing::{info, warn};

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<AppConfig>,
    pub store: Arc<SqliteProvider>,
    /// `None` when no API key is configured; chat then fails with a configuration error.
    pub ai_provider: Option<Box<dyn AiProvider>>,
    /// `None` when no API key is configured; retrieval falls back to keywords.
    pub embedder: Option<Arc<dyn Embedder>>,
    pub extractors: ExtractorRegistry,
    /// Serializes concurrent ingestion of the same document across requests.
    pub ingest_locks: DocumentLocks,
}

/// Registers every extractor compiled into this build.
pub fn default_extractors() -> ExtractorRegistry {
    #[allow(unused_mut)]
    let mut registry = ExtractorRegistry::new();
    #[cfg(feature = "text")]
    registry.register(Arc::new(maxrag_text::TextExtractor));
    #[cfg(feature = "pdf")]
    registry.register(Arc::new(maxrag_pdf::PdfExtractor));
    #[cfg(feature = "sheets")]
    registry.register(Arc::new(maxrag_sheets::SheetExtractor));
    registry
}

/// A missing key is tolerated at startup; any other client error is fatal.
fn optional_client<T>(result: Result<T, PromptError>, what: &str) -> anyhow::Result<Option<T>> {
    match result {
        Ok(client) => Ok(Some(client)),
        Err(PromptError::MissingApiKey) => {
            warn!("No API key configured; the {what} client is disabled.");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Builds the shared application state from the configuration.
///
/// Opens the database, ensures the schema exists and instantiates the
/// completion and embedding clients.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let ai_provider = optional_client(
        OpenAiProvider::new(config.openai.api_url.clone(), config.openai.api_key.clone()),
        "chat completion",
    )?
    .map(|p| Box::new(p) as Box<dyn AiProvider>);

    let embedder = optional_client(
        OpenAiEmbedder::new(
            config.embedding.api_url.clone(),
            config.embedding.model_name.clone(),
            config.embedding.api_key.clone(),
        ),
        "embedding",
    )?
    .map(|e| Arc::new(e) as Arc<dyn Embedder>);

    let store = SqliteProvider::new(&config.db_url).await?;
    info!(db_path = %config.db_url, "Initialized local storage provider (SQLite).");
    // Ensure the database schema is up-to-date on startup.
    store.initialize_schema().await?;

    let extractors = default_extractors();
    info!(
        "Supported upload types: {}",
        extractors.supported_extensions().join(", ")
    );

    Ok(AppState {
        config: Arc::new(config),
        store: Arc::new(store),
        ai_provider,
        embedder,
        extractors,
        ingest_locks: DocumentLocks::default(),
    })
}

impl AppState {
    /// The retrieval strategy for a chat turn: vector search with the keyword
    /// ranker as fallback, or keywords only when no embedder is configured.
    pub fn retriever(&self) -> Arc<dyn Retriever> {
        let chat = &self.config.chat;
        let keyword: Arc<dyn Retriever> = Arc::new(KeywordRetriever::new(
            self.store.clone() as Arc<dyn DocumentStore>,
            chat.keyword_top_n,
            chat.keyword_content_chars,
        ));

        match &self.embedder {
            Some(embedder) => {
                let vector: Arc<dyn Retriever> = Arc::new(VectorRetriever::new(
                    embedder.clone(),
                    self.store.clone() as Arc<dyn VectorSearch>,
                    chat.vector_top_k,
                ));
                Arc::new(FallbackRetriever::new(vector, keyword))
            }
            None => keyword,
        }
    }

    pub fn chat_orchestrator(&self) -> Result<ChatOrchestrator, AppError> {
        let provider = self
            .ai_provider
            .clone()
            .ok_or_else(|| ChatError::from(PromptError::MissingApiKey))?;
        Ok(ChatOrchestrator::new(
            provider,
            self.retriever(),
            self.store.clone(),
            self.config.chat.options(),
        ))
    }

    pub fn ingestion_pipeline(&self) -> Result<IngestionPipeline, AppError> {
        let embedder = self.embedder.clone().ok_or(PromptError::MissingApiKey)?;
        let pipeline = IngestionPipeline::new(
            self.store.clone(),
            self.store.clone(),
            embedder,
            self.config.ingestion.options(),
        )?;
        Ok(pipeline.with_locks(self.ingest_locks.clone()))
    }
}
