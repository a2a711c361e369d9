//! # OpenAI Provider Tests
//!
//! Runs the completion and embedding clients against a `wiremock` server to
//! verify the request body they send and how they read each response shape.

mod common;

use anyhow::Result;
use common::setup_tracing;
use maxrag::{
    providers::ai::{
        AiProvider, ChatMessage, CompletionContent, CompletionRequest, Embedder, OpenAiEmbedder,
        OpenAiProvider,
    },
    PromptError, Role,
};
use serde_json::{json, Value};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn request(model: &str) -> CompletionRequest {
    CompletionRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::new(Role::System, "Você é o MAX."),
            ChatMessage::new(Role::User, "Olá"),
        ],
        max_output_tokens: 1000,
    }
}

async fn mount_completion(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn provider(server: &MockServer) -> OpenAiProvider {
    OpenAiProvider::new(
        format!("{}/v1/chat/completions", server.uri()),
        Some("test-key".into()),
    )
    .expect("provider should build")
}

async fn sent_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.expect("recording is on");
    serde_json::from_slice(&requests[0].body).expect("request body is JSON")
}

/// Newer models receive `max_completion_tokens`; `max_tokens` is absent.
#[tokio::test]
async fn test_new_models_use_max_completion_tokens() -> Result<()> {
    // 1. Setup
    setup_tracing();
    let server = MockServer::start().await;
    mount_completion(
        &server,
        json!({
            "choices": [{ "message": { "role": "assistant", "content": "  Olá! Como posso ajudar?  " } }],
            "usage": { "total_tokens": 42 }
        }),
    )
    .await;

    // 2. Act
    let completion = provider(&server).complete(&request("gpt-5-2025-08-07")).await?;

    // 3. Assert
    assert_eq!(completion.content.to_text(), "Olá! Como posso ajudar?");
    assert_eq!(completion.total_tokens, 42);

    let body = sent_body(&server).await;
    assert_eq!(body["model"], "gpt-5-2025-08-07");
    assert_eq!(body["max_completion_tokens"], 1000);
    assert!(body.get("max_tokens").is_none());
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "Olá");
    Ok(())
}

/// `gpt-4o*`, `gpt-4-*` and `gpt-3.5*` models still receive `max_tokens`.
#[tokio::test]
async fn test_legacy_models_use_max_tokens() -> Result<()> {
    setup_tracing();
    let server = MockServer::start().await;
    mount_completion(
        &server,
        json!({ "choices": [{ "message": { "content": "ok" } }], "usage": { "total_tokens": 3 } }),
    )
    .await;

    provider(&server).complete(&request("gpt-4o-mini")).await?;

    let body = sent_body(&server).await;
    assert_eq!(body["max_tokens"], 1000);
    assert!(body.get("max_completion_tokens").is_none());
    Ok(())
}

/// Content returned as a list of parts is concatenated in order.
#[tokio::test]
async fn test_parts_content_is_concatenated() -> Result<()> {
    setup_tracing();
    let server = MockServer::start().await;
    mount_completion(
        &server,
        json!({
            "choices": [{ "message": { "content": [
                { "type": "output_text", "text": "Férias são " },
                { "type": "refusal" },
                { "type": "output_text", "text": "de 30 dias." }
            ] } }]
        }),
    )
    .await;

    let completion = provider(&server).complete(&request("gpt-4.1-2025-04-14")).await?;

    assert!(matches!(completion.content, CompletionContent::Parts(_)));
    assert_eq!(completion.content.to_text(), "Férias são de 30 dias.");
    // No usage object means zero tokens.
    assert_eq!(completion.total_tokens, 0);
    Ok(())
}

/// A `null` content (or no choice at all) normalizes to empty text.
#[tokio::test]
async fn test_null_content_is_empty_text() -> Result<()> {
    setup_tracing();
    let server = MockServer::start().await;
    mount_completion(
        &server,
        json!({ "choices": [{ "message": { "content": null } }], "usage": { "total_tokens": 9 } }),
    )
    .await;

    let completion = provider(&server).complete(&request("gpt-5-mini-2025-08-07")).await?;

    assert_eq!(completion.content.to_text(), "");
    assert_eq!(completion.total_tokens, 9);
    Ok(())
}

/// A non-success status surfaces as `Upstream` with the status and raw body.
#[tokio::test]
async fn test_upstream_error_keeps_status_and_body() {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429).set_body_string(r#"{"error":{"message":"rate limited"}}"#),
        )
        .mount(&server)
        .await;

    let err = provider(&server)
        .complete(&request("gpt-4.1-2025-04-14"))
        .await
        .unwrap_err();

    match err {
        PromptError::Upstream { status, body } => {
            assert_eq!(status, 429);
            assert!(body.contains("rate limited"));
        }
        other => panic!("Expected Upstream error, got {other:?}"),
    }
}

/// The embedder posts `{model, input}` and returns the first vector.
#[tokio::test]
async fn test_embedder_returns_first_vector() -> Result<()> {
    // 1. Setup
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "embedding": [0.1, 0.2, 0.3] }]
        })))
        .mount(&server)
        .await;
    let embedder = OpenAiEmbedder::new(
        format!("{}/v1/embeddings", server.uri()),
        "text-embedding-3-small".into(),
        Some("test-key".into()),
    )?;

    // 2. Act
    let vector = embedder.embed("regras de férias").await?;

    // 3. Assert
    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    assert_eq!(embedder.model_name(), "text-embedding-3-small");
    let body = sent_body(&server).await;
    assert_eq!(body, json!({ "model": "text-embedding-3-small", "input": "regras de férias" }));
    Ok(())
}

/// Error statuses and empty results are both embedding failures.
#[tokio::test]
async fn test_embedder_failures() -> Result<()> {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let failing = OpenAiEmbedder::new(
        format!("{}/v1/embeddings", server.uri()),
        "text-embedding-3-small".into(),
        Some("test-key".into()),
    )?;
    let err = failing.embed("x").await.unwrap_err();
    assert!(matches!(err, PromptError::EmbeddingFailed { status: 500, .. }));

    let empty = OpenAiEmbedder::new(
        format!("{}/v1/empty", server.uri()),
        "text-embedding-3-small".into(),
        Some("test-key".into()),
    )?;
    let err = empty.embed("x").await.unwrap_err();
    assert!(matches!(err, PromptError::EmptyEmbedding));
    Ok(())
}

#[test]
fn test_missing_key_is_rejected() {
    let err = OpenAiEmbedder::new("http://localhost".into(), "m".into(), None).unwrap_err();
    assert!(matches!(err, PromptError::MissingApiKey));
}
