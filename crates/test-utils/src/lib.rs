//! Shared test harness for the `maxrag` workspace: an in-memory store with
//! the schema applied, scripted completion and embedding providers, and PDF
//! fixtures behind the `pdf` feature.

use anyhow::Result;
use async_trait::async_trait;
use maxrag::{
    errors::PromptError,
    providers::{
        ai::{AiProvider, Completion, CompletionContent, CompletionRequest, Embedder},
        db::sqlite::SqliteProvider,
    },
};
use std::{
    collections::VecDeque,
    fmt::Debug,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, Once,
    },
};

// --- Test Setup ---

static TRACING: Once = Once::new();

pub fn setup_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A helper struct to manage database creation for each test.
pub struct TestSetup {
    pub store: Arc<SqliteProvider>,
}

impl TestSetup {
    /// Creates a new, isolated in-memory database and initializes the schema.
    pub async fn new() -> Result<Self> {
        let store = SqliteProvider::new(":memory:").await?;
        store.initialize_schema().await?;
        Ok(Self {
            store: Arc::new(store),
        })
    }
}

// --- Mock AI Provider ---

/// Replies from a queue and records every request.
///
/// An empty queue answers with an empty completion; a queued error is
/// returned as `PromptError::Upstream`.
#[derive(Clone, Debug, Default)]
pub struct MockAiProvider {
    responses: Arc<Mutex<VecDeque<Result<Completion, (u16, String)>>>>,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockAiProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_response(&self, text: &str, total_tokens: u32) {
        self.responses.lock().unwrap().push_back(Ok(Completion {
            content: CompletionContent::Text(text.to_string()),
            total_tokens,
        }));
    }

    pub fn add_error(&self, status: u16, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err((status, body.to_string())));
    }

    /// Retrieves the recorded calls for assertion.
    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, PromptError> {
        self.calls.lock().unwrap().push(request.clone());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(completion)) => Ok(completion),
            Some(Err((status, body))) => Err(PromptError::Upstream { status, body }),
            None => Ok(Completion::default()),
        }
    }
}

// --- Mock Embedder ---

/// Embeds every text as the same small unit vector and counts the calls.
#[derive(Clone, Debug)]
pub struct MockEmbedder {
    model: String,
    vector: Vec<f32>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockEmbedder {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            vector: vec![1.0, 0.0, 0.0],
            fail: false,
            calls: Arc::default(),
        }
    }

    /// An embedder whose every call fails, as when the upstream API is down.
    pub fn failing(model: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(model)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, PromptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PromptError::EmbeddingFailed {
                status: 503,
                body: "embedding service unavailable".to_string(),
            });
        }
        Ok(self.vector.clone())
    }
}

// --- Test-Specific Helpers ---
#[cfg(feature = "pdf")]
pub mod helpers {
    use anyhow::Result;
    use printpdf::{
        BuiltinFont, Layer, Mm, Op, ParsedFont, PdfDocument, PdfPage, PdfSaveOptions, Pt, TextItem,
        TextMatrix, TextRenderingMode,
    };

    /// Generates a PDF with one page per entry of `pages`, compatible with printpdf v0.8.2.
    pub fn generate_test_pdf(pages: &[&str]) -> Result<Vec<u8>> {
        let mut doc = PdfDocument::new("Test PDF");
        let layer_def = Layer::new("Layer 1");
        let layer_id = doc.add_layer(&layer_def);

        // Get the font bytes for a built-in font and parse it.
        let font_bytes = BuiltinFont::Helvetica.get_subset_font().bytes;
        let font = ParsedFont::from_bytes(&font_bytes, 0, &mut Vec::new())
            .ok_or_else(|| anyhow::anyhow!("Failed to parse built-in font"))?;
        let font_id = doc.add_font(&font);

        for text in pages {
            let mut page = PdfPage::new(Mm(210.0), Mm(297.0), vec![]);
            page.ops = vec![
                Op::BeginLayer {
                    layer_id: layer_id.clone(),
                },
                Op::SetFontSize {
                    size: Pt(12.0),
                    font: font_id.clone(),
                },
                Op::StartTextSection,
                Op::SetTextMatrix {
                    matrix: TextMatrix::Translate(Mm(10.0).into(), Mm(280.0).into()),
                },
                Op::SetTextRenderingMode {
                    mode: TextRenderingMode::Fill,
                },
                Op::WriteText {
                    items: vec![TextItem::Text(text.to_string())],
                    font: font_id.clone(),
                },
                Op::EndTextSection,
                Op::EndLayer {
                    layer_id: layer_id.clone(),
                },
            ];
            doc.pages.push(page);
        }

        let mut warnings = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            // In a test context, it's fine to just print warnings.
            eprintln!("PDF generation warnings: {warnings:?}");
        }

        Ok(bytes)
    }
}
