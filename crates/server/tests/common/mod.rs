//! # Common Test Utilities
//!
//! This module centralizes the harness used across the `maxrag-server`
//! integration tests:
//!
//! - `TestApp`: spawns the real router on a random port, backed by a temporary
//!   SQLite file and an `httpmock::MockServer` standing in for the OpenAI
//!   chat-completions and embeddings endpoints.
//! - Helpers for minting bearer tokens and mocking upstream replies.

// Not every test file uses every helper.
#![allow(unused)]

use anyhow::Result;
use axum::serve;
use httpmock::{Method::POST, Mock, MockServer};
use jsonwebtoken::{encode, EncodingKey, Header};
use maxrag::{
    extract::extension, providers::db::storage::DocumentStore, types::NewDocument, Document,
};
use maxrag_server::{
    auth::Claims,
    config::{get_config, AppConfig},
    router,
    state::{build_app_state, AppState},
};
use reqwest::Client;
use serde_json::json;
use std::{
    fs,
    net::SocketAddr,
    time::{SystemTime, UNIX_EPOCH},
};
use tempfile::{tempdir, NamedTempFile, TempDir};
use tokio::{net::TcpListener, task::JoinHandle};

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const ADMIN_SUB: &str = "admin@max.test";
pub const EMBEDDING_MODEL: &str = "mock-embedding-model";

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub app_state: AppState,
    _db_file: NamedTempFile,
    _config_dir: TempDir,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the application server with the default test configuration.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    /// Spawns the server after letting the caller adjust the loaded configuration.
    pub async fn spawn_with(customize: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .with_test_writer()
            .try_init();

        let mock_server = MockServer::start();
        let db_file = NamedTempFile::new()?;
        let db_path = db_file.path().to_string_lossy().to_string();

        let config_dir = tempdir()?;
        let config_path = config_dir.path().join("config.yml");
        let config_content = format!(
            r#"
port: 0
db_url: "{db_path}"
openai:
  api_url: "{chat_url}"
  api_key: "test-key"
embedding:
  api_url: "{embedding_url}"
  model_name: "{EMBEDDING_MODEL}"
ingestion:
  batch_delay_ms: 0
auth:
  jwt_secret: "{JWT_SECRET}"
  admin_users: ["{ADMIN_SUB}"]
"#,
            chat_url = mock_server.url("/v1/chat/completions"),
            embedding_url = mock_server.url("/v1/embeddings"),
        );
        fs::write(&config_path, config_content)?;

        let mut config = get_config(Some(&config_path.to_string_lossy()))?;
        customize(&mut config);
        let app_state = build_app_state(config).await?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let app = router::create_router(app_state.clone());
        let server_handle = tokio::spawn(async move {
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            app_state,
            _db_file: db_file,
            _config_dir: config_dir,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Mocks one chat completion answer.
    pub fn mock_chat(&self, content: &str, total_tokens: u32) -> Mock<'_> {
        let content = content.to_string();
        self.mock_server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": content } }],
                "usage": { "total_tokens": total_tokens }
            }));
        })
    }

    /// Mocks the embeddings endpoint with the same vector for every input.
    pub fn mock_embeddings(&self) -> Mock<'_> {
        self.mock_server.mock(|when, then| {
            when.method(POST).path("/v1/embeddings");
            then.status(200).json_body(json!({
                "data": [{ "embedding": [0.6, 0.8, 0.0] }]
            }));
        })
    }

    /// Inserts a document directly, bypassing upload and ingestion.
    pub async fn seed_document(&self, filename: &str, content: &str) -> Result<Document> {
        let document = self
            .app_state
            .store
            .insert_document(NewDocument {
                filename: filename.to_string(),
                content: content.to_string(),
                file_type: extension(filename),
                size_bytes: content.len() as i64,
                content_hash: format!("hash-{filename}"),
                ..Default::default()
            })
            .await?;
        Ok(document)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Generates a valid JWT for a given user identifier (subject).
pub fn generate_jwt(sub: &str) -> Result<String> {
    generate_jwt_with_expiry(sub, 3600)
}

/// Generates a JWT with `exp` offset from now by `offset_secs` (negative for expired tokens).
pub fn generate_jwt_with_expiry(sub: &str, offset_secs: i64) -> Result<String> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;
    let claims = Claims {
        sub: sub.to_string(),
        exp: (now + offset_secs) as usize,
        name: None,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )?;
    Ok(token)
}

/// Splits an SSE body into the payloads of its `data:` lines.
pub fn sse_payloads(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")))
        .map(str::to_string)
        .collect()
}
