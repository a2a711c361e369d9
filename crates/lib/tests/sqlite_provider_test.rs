//! # SQLite Provider Tests
//!
//! Integration tests for every store trait implemented by `SqliteProvider`,
//! each against its own in-memory database.

mod common;

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use common::{insert_document, new_store, setup_tracing};
use maxrag::{
    providers::db::storage::{
        ChatStore, ChunkStore, DocumentStore, SettingsStore, UsageStore, VectorSearch,
    },
    types::{AiSettings, NewChunk, NewDocument, Profile, ProfileRole, Role},
    usage::{record_usage, UsageEvent},
};
use std::time::Duration;
use tokio::{task::JoinSet, time::sleep};

fn chunk(document_id: &str, index: i64, embedding: Vec<f32>, model: &str) -> NewChunk {
    NewChunk {
        document_id: document_id.to_string(),
        chunk_index: index,
        content: format!("conteúdo do trecho {index}"),
        embedding,
        model_name: model.to_string(),
        page: Some(index + 1),
        filename: "manual.pdf".to_string(),
        path: None,
    }
}

/// A document round-trips every column, including the sheet list.
#[tokio::test]
async fn test_document_round_trip() -> Result<()> {
    // 1. Setup
    setup_tracing();
    let store = new_store().await;

    // 2. Act
    let inserted = store
        .insert_document(NewDocument {
            filename: "planilha.xlsx".into(),
            content: "\n--- Folha1 ---\na,b\n".into(),
            file_type: ".xlsx".into(),
            mime_type: Some("application/vnd.ms-excel".into()),
            size_bytes: 2048,
            pages: None,
            sheets: vec!["Folha1".into(), "Resumo".into()],
            truncated: true,
            content_hash: "abc123".into(),
            uploaded_by: Some("user-1".into()),
            path: None,
        })
        .await?;
    let fetched = store
        .get_document(&inserted.id)
        .await?
        .expect("document should exist");

    // 3. Assert
    assert_eq!(fetched.filename, "planilha.xlsx");
    assert_eq!(fetched.sheets, vec!["Folha1".to_string(), "Resumo".to_string()]);
    assert!(fetched.truncated);
    assert_eq!(fetched.size_bytes, 2048);
    assert_eq!(fetched.uploaded_by.as_deref(), Some("user-1"));
    assert_eq!(fetched.created_at, inserted.created_at);
    assert!(store.get_document("missing").await?.is_none());
    Ok(())
}

/// Listing is newest first; the full scan is ordered by filename.
#[tokio::test]
async fn test_document_listing_order() -> Result<()> {
    setup_tracing();
    let store = new_store().await;
    insert_document(&store, "b.txt", ".txt", "segundo").await;
    sleep(Duration::from_millis(5)).await;
    insert_document(&store, "a.txt", ".txt", "primeiro").await;

    let listed: Vec<String> = store
        .list_documents()
        .await?
        .into_iter()
        .map(|d| d.filename)
        .collect();
    assert_eq!(listed, vec!["a.txt", "b.txt"]);

    let all: Vec<String> = store
        .all_documents()
        .await?
        .into_iter()
        .map(|d| d.filename)
        .collect();
    assert_eq!(all, vec!["a.txt", "b.txt"]);

    // Reverse the insertion order and listing follows creation time, not name.
    let store = new_store().await;
    insert_document(&store, "a.txt", ".txt", "primeiro").await;
    sleep(Duration::from_millis(5)).await;
    insert_document(&store, "b.txt", ".txt", "segundo").await;
    let listed: Vec<String> = store
        .list_documents()
        .await?
        .into_iter()
        .map(|d| d.filename)
        .collect();
    assert_eq!(listed, vec!["b.txt", "a.txt"]);
    Ok(())
}

/// Only hashes already stored are reported.
#[tokio::test]
async fn test_existing_hashes() -> Result<()> {
    setup_tracing();
    let store = new_store().await;
    insert_document(&store, "a.txt", ".txt", "x").await;

    let found = store
        .existing_hashes(&["hash-a.txt".to_string(), "hash-zzz".to_string()])
        .await?;
    assert_eq!(found.len(), 1);
    assert!(found.contains("hash-a.txt"));
    assert!(store.existing_hashes(&[]).await?.is_empty());
    Ok(())
}

/// Deleting a document removes its chunks with it.
#[tokio::test]
async fn test_delete_document_cascades_to_chunks() -> Result<()> {
    // 1. Setup
    setup_tracing();
    let store = new_store().await;
    let doc = insert_document(&store, "manual.pdf", ".pdf", "conteúdo").await;
    store
        .insert_chunks(&[
            chunk(&doc.id, 0, vec![1.0, 0.0, 0.0], "m"),
            chunk(&doc.id, 1, vec![0.0, 1.0, 0.0], "m"),
        ])
        .await?;
    assert_eq!(store.list_chunks(&doc.id).await?.len(), 2);

    // 2. Act
    let deleted = store.delete_document(&doc.id).await?;

    // 3. Assert
    assert!(deleted);
    assert!(store.get_document(&doc.id).await?.is_none());
    assert!(store.list_chunks(&doc.id).await?.is_empty());
    assert!(!store.delete_document(&doc.id).await?);
    Ok(())
}

/// Chunks keep their order, page, model and vector.
#[tokio::test]
async fn test_chunks_round_trip() -> Result<()> {
    setup_tracing();
    let store = new_store().await;
    let doc = insert_document(&store, "manual.pdf", ".pdf", "conteúdo").await;

    let inserted = store
        .insert_chunks(&[
            chunk(&doc.id, 1, vec![0.0, 1.0, 0.0], "m"),
            chunk(&doc.id, 0, vec![0.25, -0.5, 1.0], "m"),
        ])
        .await?;
    assert_eq!(inserted, 2);

    let chunks = store.list_chunks(&doc.id).await?;
    assert_eq!(chunks[0].chunk_index, 0);
    assert_eq!(chunks[0].embedding, vec![0.25, -0.5, 1.0]);
    assert_eq!(chunks[0].page, Some(1));
    assert_eq!(chunks[1].model_name, "m");

    assert_eq!(store.delete_chunks(&doc.id).await?, 2);
    assert_eq!(store.delete_chunks(&doc.id).await?, 0);
    Ok(())
}

/// Only chunks of the same model and dimensionality are compared, closest first.
#[tokio::test]
async fn test_similarity_search_filters_model_and_dimensions() -> Result<()> {
    // 1. Setup
    setup_tracing();
    let store = new_store().await;
    let doc = insert_document(&store, "manual.pdf", ".pdf", "conteúdo").await;
    store
        .insert_chunks(&[
            chunk(&doc.id, 0, vec![0.0, 1.0, 0.0], "m"),
            chunk(&doc.id, 1, vec![1.0, 0.0, 0.0], "m"),
            chunk(&doc.id, 2, vec![1.0, 0.0, 0.0], "other-model"),
            chunk(&doc.id, 3, vec![1.0, 0.0, 0.0, 0.0], "m"),
        ])
        .await?;

    // 2. Act
    let matches = store.similarity_search(&[1.0, 0.0, 0.0], "m", 8).await?;

    // 3. Assert
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].content, "conteúdo do trecho 1");
    assert!((matches[0].similarity - 1.0).abs() < 1e-6);
    assert_eq!(matches[0].page, Some(2));
    assert_eq!(matches[0].filename, "manual.pdf");
    assert!(matches[1].similarity.abs() < 1e-6);

    let limited = store.similarity_search(&[1.0, 0.0, 0.0], "m", 1).await?;
    assert_eq!(limited.len(), 1);
    Ok(())
}

/// Appending a message bumps the conversation to the top of the list.
#[tokio::test]
async fn test_conversations_and_messages() -> Result<()> {
    // 1. Setup
    setup_tracing();
    let store = new_store().await;
    let first = store.create_conversation("user-1", "Férias").await?;
    sleep(Duration::from_millis(5)).await;
    let second = store.create_conversation("user-1", "Benefícios").await?;
    store.create_conversation("user-2", "Outro usuário").await?;

    let listed = store.list_conversations("user-1").await?;
    assert_eq!(listed[0].id, second.id);

    // 2. Act
    sleep(Duration::from_millis(5)).await;
    store
        .append_message(&first.id, Role::User, "Quantos dias de férias?", 0)
        .await?;
    store
        .append_message(&first.id, Role::Assistant, "São 30 dias.", 57)
        .await?;

    // 3. Assert
    let listed = store.list_conversations("user-1").await?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, first.id);
    assert!(listed[0].updated_at > listed[0].created_at);

    let messages = store.list_messages(&first.id).await?;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].tokens, 57);

    let orphan = store.append_message("missing", Role::User, "x", 0).await;
    assert!(orphan.is_err());
    Ok(())
}

/// Increments for one (user, session) accumulate into a single row.
#[tokio::test]
async fn test_usage_upsert() -> Result<()> {
    setup_tracing();
    let store = new_store().await;
    assert!(store.get_usage("u", "s").await?.is_none());

    let first = record_usage(
        store.as_ref(),
        "u",
        "s",
        UsageEvent::Success {
            tokens: 100,
            elapsed: Duration::from_millis(300),
        },
    )
    .await?;
    assert_eq!(first.messages_count, 1);
    assert_eq!(first.success_rate, 100.0);
    record_usage(store.as_ref(), "u", "s", UsageEvent::Error).await?;

    let saved = store.get_usage("u", "s").await?.expect("usage row");
    assert_eq!(saved.messages_count, 1);
    assert_eq!(saved.tokens_count, 100);
    assert_eq!(saved.error_count, 1);
    assert_eq!(saved.success_rate, 50.0);
    // An error keeps the last measured response time.
    assert_eq!(saved.response_time_ms, 300);
    assert_eq!(saved.session_start, first.session_start);
    assert!(saved.session_end.is_some());
    Ok(())
}

/// A session that only failed reports a 0% success rate, not a negative one.
#[tokio::test]
async fn test_usage_error_only_session() -> Result<()> {
    setup_tracing();
    let store = new_store().await;

    record_usage(store.as_ref(), "u", "s", UsageEvent::Error).await?;
    let stat = record_usage(store.as_ref(), "u", "s", UsageEvent::Error).await?;

    assert_eq!(stat.messages_count, 0);
    assert_eq!(stat.error_count, 2);
    assert_eq!(stat.success_rate, 0.0);
    assert_eq!(stat.response_time_ms, 0);
    Ok(())
}

/// Concurrent requests for the same session never lose an increment.
#[tokio::test]
async fn test_usage_concurrent_increments() -> Result<()> {
    setup_tracing();
    let store = new_store().await;
    let mut tasks = JoinSet::new();
    for i in 0..16u32 {
        let store = store.clone();
        tasks.spawn(async move {
            let event = if i % 4 == 0 {
                UsageEvent::Error
            } else {
                UsageEvent::Success {
                    tokens: 10,
                    elapsed: Duration::from_millis(100),
                }
            };
            record_usage(store.as_ref(), "u", "s", event).await
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined??;
    }

    let stat = store.get_usage("u", "s").await?.expect("usage row");
    assert_eq!(stat.messages_count, 12);
    assert_eq!(stat.error_count, 4);
    assert_eq!(stat.tokens_count, 120);
    assert_eq!(stat.success_rate, 75.0);
    Ok(())
}

/// Settings default to empty and the singleton is overwritten in place.
#[tokio::test]
async fn test_ai_settings_and_profiles() -> Result<()> {
    setup_tracing();
    let store = new_store().await;
    assert_eq!(store.get_ai_settings().await?, AiSettings::default());

    for model in ["gpt-4.1-2025-04-14", "gpt-5-2025-08-07"] {
        store
            .save_ai_settings(&AiSettings {
                current_model: Some(model.into()),
                avatar_url: None,
                updated_by: Some("admin-1".into()),
            })
            .await?;
    }
    let settings = store.get_ai_settings().await?;
    assert_eq!(settings.current_model.as_deref(), Some("gpt-5-2025-08-07"));
    assert_eq!(settings.updated_by.as_deref(), Some("admin-1"));

    assert!(store.get_profile("admin-1").await?.is_none());
    let mut profile = Profile {
        user_id: "admin-1".into(),
        name: Some("Ana".into()),
        role: ProfileRole::Admin,
        area: Some("RH".into()),
        preferred_model: None,
    };
    store.save_profile(&profile).await?;
    profile.preferred_model = Some("gpt-4o-mini".into());
    store.save_profile(&profile).await?;

    let saved = store.get_profile("admin-1").await?.expect("profile");
    assert!(saved.is_admin());
    assert_eq!(saved.preferred_model.as_deref(), Some("gpt-4o-mini"));

    store
        .save_profile(&Profile {
            user_id: "0-first".into(),
            ..Default::default()
        })
        .await?;
    let all = store.list_profiles().await?;
    let ids: Vec<&str> = all.iter().map(|p| p.user_id.as_str()).collect();
    assert_eq!(ids, vec!["0-first", "admin-1"]);
    assert_eq!(all[1], saved);
    Ok(())
}

/// Chunk aggregates only average over documents that were chunked.
#[tokio::test]
async fn test_rag_stats() -> Result<()> {
    setup_tracing();
    let store = new_store().await;
    let empty = store.rag_stats().await?;
    assert_eq!(empty.total_chunks, 0);
    assert_eq!(empty.avg_chunks_per_document, 0.0);

    let a = insert_document(&store, "a.txt", ".txt", "a").await;
    let b = insert_document(&store, "b.txt", ".txt", "b").await;
    insert_document(&store, "c.txt", ".txt", "c").await;
    store
        .insert_chunks(&[
            chunk(&a.id, 0, vec![1.0, 0.0], "m"),
            chunk(&a.id, 1, vec![0.0, 1.0], "m"),
            chunk(&a.id, 2, vec![1.0, 1.0], "m"),
            chunk(&b.id, 0, vec![1.0, 0.0], "m"),
        ])
        .await?;

    let stats = store.rag_stats().await?;
    assert_eq!(stats.total_chunks, 4);
    assert_eq!(stats.documents_with_chunks, 2);
    assert_eq!(stats.avg_chunks_per_document, 2.0);
    Ok(())
}

/// Dashboard totals aggregate messages, recent owners, documents and recent usage.
#[tokio::test]
async fn test_dashboard_stats() -> Result<()> {
    // 1. Setup
    setup_tracing();
    let store = new_store().await;
    insert_document(&store, "a.txt", ".txt", "x").await;
    store.create_conversation("user-3", "antiga").await?;
    sleep(Duration::from_millis(5)).await;
    let since = Utc::now();
    sleep(Duration::from_millis(5)).await;

    let conv = store.create_conversation("user-1", "t").await?;
    store.create_conversation("user-2", "t").await?;
    store.create_conversation("user-2", "t2").await?;
    store.append_message(&conv.id, Role::User, "oi", 0).await?;
    store.append_message(&conv.id, Role::Assistant, "olá", 40).await?;

    let success = |tokens, ms| UsageEvent::Success {
        tokens,
        elapsed: Duration::from_millis(ms),
    };
    record_usage(store.as_ref(), "user-1", "s1", success(40, 200)).await?;
    record_usage(store.as_ref(), "user-1", "s1", UsageEvent::Error).await?;
    record_usage(store.as_ref(), "user-2", "s2", success(10, 400)).await?;
    record_usage(store.as_ref(), "user-3", "s3", UsageEvent::Error).await?;

    // 2. Act
    let stats = store.dashboard_stats(since).await?;

    // 3. Assert
    assert_eq!(stats.total_messages, 2);
    assert_eq!(stats.total_tokens, 40);
    // user-3 only owns a conversation last touched before the window.
    assert_eq!(stats.active_users, 2);
    assert_eq!(stats.total_documents, 1);
    assert_eq!(stats.total_conversations, 4);
    // The error-only session has no response time and stays out of the average.
    assert_eq!(stats.avg_response_time_ms, 300);
    assert_eq!(stats.errors_last_30_days, 2);

    // Nothing started after now counts toward the recent window.
    let future = store
        .dashboard_stats(Utc::now() + ChronoDuration::days(1))
        .await?;
    assert_eq!(future.errors_last_30_days, 0);
    assert_eq!(future.avg_response_time_ms, 0);
    assert_eq!(future.active_users, 0);
    assert_eq!(future.total_conversations, 4);
    Ok(())
}
