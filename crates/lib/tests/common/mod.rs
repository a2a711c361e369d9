#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Shared doubles for the library's integration tests: a scripted completion
//! provider, a deterministic embedder and an in-memory store with the schema
//! already created.

use async_trait::async_trait;
use maxrag::{
    providers::{
        ai::{AiProvider, Completion, CompletionContent, CompletionRequest, Embedder},
        db::{sqlite::SqliteProvider, storage::DocumentStore},
    },
    search::query_tokens,
    types::{Document, NewDocument},
    PromptError,
};
use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Once, RwLock,
    },
};

static INIT: Once = Once::new();

/// Initializes the tracing subscriber once per test binary.
pub fn setup_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// An in-memory database with every table created.
pub async fn new_store() -> Arc<SqliteProvider> {
    let store = SqliteProvider::new(":memory:")
        .await
        .expect("Failed to create SqliteProvider");
    store
        .initialize_schema()
        .await
        .expect("Failed to initialize schema");
    Arc::new(store)
}

pub async fn insert_document(
    store: &SqliteProvider,
    filename: &str,
    file_type: &str,
    content: &str,
) -> Document {
    store
        .insert_document(NewDocument {
            filename: filename.to_string(),
            content: content.to_string(),
            file_type: file_type.to_string(),
            size_bytes: content.len() as i64,
            content_hash: format!("hash-{filename}"),
            ..Default::default()
        })
        .await
        .expect("Failed to insert document")
}

/// Text shaped like the PDF extractor's output: a header line, then each page
/// behind a `--- Página N ---` marker.
pub fn pdf_like_text(filename: &str, pages: &[String]) -> String {
    let mut text = format!("PDF: {filename} | Páginas: {}\n", pages.len());
    for (i, page) in pages.iter().enumerate() {
        text.push_str(&format!("\n--- Página {} ---\n{}\n", i + 1, page));
    }
    text
}

/// Filler sentences long enough to span several chunks.
pub fn filler(topic: &str, sentences: usize) -> String {
    (0..sentences)
        .map(|i| format!("Esta é a frase {i} sobre {topic} e seus procedimentos internos."))
        .collect::<Vec<_>>()
        .join(" ")
}

// --- Mock completion provider ---

#[derive(Clone, Debug, Default)]
pub struct MockAiProvider {
    pub requests: Arc<RwLock<Vec<CompletionRequest>>>,
    responses: Arc<RwLock<Vec<Result<Completion, (u16, String)>>>>,
}

impl MockAiProvider {
    pub fn new(responses: Vec<Completion>) -> Self {
        Self {
            requests: Arc::default(),
            responses: Arc::new(RwLock::new(responses.into_iter().map(Ok).rev().collect())),
        }
    }

    pub fn text(text: &str, tokens: u32) -> Self {
        Self::new(vec![Completion {
            content: CompletionContent::Text(text.to_string()),
            total_tokens: tokens,
        }])
    }

    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            requests: Arc::default(),
            responses: Arc::new(RwLock::new(vec![Err((status, body.to_string()))])),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.read().unwrap().len()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, PromptError> {
        self.requests.write().unwrap().push(request.clone());
        match self.responses.write().unwrap().pop() {
            Some(Ok(completion)) => Ok(completion),
            Some(Err((status, body))) => Err(PromptError::Upstream { status, body }),
            None => Ok(Completion {
                content: CompletionContent::Text("Default mock response".to_string()),
                total_tokens: 0,
            }),
        }
    }
}

// --- Mock embedder ---

pub const MOCK_DIMENSIONS: usize = 256;

/// Hashes the normalized, stop-word-free tokens of a text into a unit vector,
/// so texts sharing rare words end up close together.
#[derive(Clone, Debug)]
pub struct MockEmbedder {
    model: String,
    fail_on: Option<String>,
    pub calls: Arc<AtomicUsize>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            model: "mock-embedding".to_string(),
            fail_on: None,
            calls: Arc::default(),
        }
    }

    /// Fails every text containing `needle`.
    pub fn failing_on(needle: &str) -> Self {
        Self {
            fail_on: Some(needle.to_string()),
            ..Self::new()
        }
    }

    pub fn with_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..Self::new()
        }
    }
}

pub fn hashed_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; MOCK_DIMENSIONS];
    for token in query_tokens(text) {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        vector[(hasher.finish() as usize) % MOCK_DIMENSIONS] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        vector[0] = 1.0;
        return vector;
    }
    vector.iter().map(|v| v / norm).collect()
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PromptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(needle) = &self.fail_on {
            if text.contains(needle.as_str()) {
                return Err(PromptError::EmbeddingFailed {
                    status: 500,
                    body: "mock embedding failure".to_string(),
                });
            }
        }
        Ok(hashed_embedding(text))
    }
}
