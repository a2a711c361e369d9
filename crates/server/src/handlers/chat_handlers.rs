//! # Chat Route Handlers
//!
//! `POST /chat` answers as Server-Sent Events, `POST /chat/complete` as a
//! single JSON body. Both run the same turn: answer, persist the exchange in
//! the caller's conversation and account usage for the client session.
//!
//! The completion itself is requested without upstream streaming; the SSE
//! frames are cut from the finished answer.

use crate::{
    auth::AuthenticatedUser,
    errors::AppError,
    handlers::conversation_handlers::owned_conversation,
    state::AppState,
    types::{ChatCompleteResponse, ChatStreamFrame},
};
use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, State},
    http::request::Parts,
    response::sse::{Event, Sse},
    Json,
};
use futures::{stream, Stream};
use maxrag::{
    chat::{conversation_title, ChatReply, ChatRequest},
    providers::db::storage::{ChatStore, SettingsStore},
    types::Role,
    usage::{record_usage, UsageEvent},
    PromptError,
};
use std::{convert::Infallible, time::Instant};
use tracing::{info, warn};
use uuid::Uuid;

pub const SESSION_HEADER: &str = "x-session-id";
pub const DONE_FRAME: &str = "[DONE]";

/// The client session a request belongs to, from the `x-session-id` header.
/// A fresh id is generated when the header is absent or blank.
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for SessionId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Ok(SessionId(id))
    }
}

/// A finished turn and the conversation it was stored in.
#[derive(Debug)]
pub struct ChatOutcome {
    pub reply: ChatReply,
    pub conversation_id: String,
}

async fn answer(
    state: &AppState,
    user: &AuthenticatedUser,
    request: &ChatRequest,
) -> Result<ChatOutcome, AppError> {
    // An explicit conversation is checked before any tokens are spent.
    let existing = match request.conversation_id.as_deref() {
        Some(id) => Some(owned_conversation(state, &user.id, id).await?),
        None => None,
    };

    let settings = state.store.get_ai_settings().await?;
    let reply = state
        .chat_orchestrator()?
        .respond(request, &user.id, Some(&user.profile), &settings)
        .await?;

    let message = request.message.trim();
    let conversation = match existing {
        Some(conversation) => conversation,
        None => {
            state
                .store
                .create_conversation(&user.id, &conversation_title(message))
                .await?
        }
    };
    state
        .store
        .append_message(&conversation.id, Role::User, message, 0)
        .await?;
    state
        .store
        .append_message(
            &conversation.id,
            Role::Assistant,
            &reply.response,
            i64::from(reply.tokens),
        )
        .await?;

    Ok(ChatOutcome {
        reply,
        conversation_id: conversation.id,
    })
}

/// Runs one chat turn and records its outcome against the session.
pub async fn run_chat_turn(
    state: &AppState,
    user: &AuthenticatedUser,
    session_id: &str,
    request: &ChatRequest,
) -> Result<ChatOutcome, AppError> {
    let started = Instant::now();
    let result = answer(state, user, request).await;

    let event = match &result {
        Ok(outcome) => UsageEvent::Success {
            tokens: outcome.reply.tokens,
            elapsed: started.elapsed(),
        },
        Err(_) => UsageEvent::Error,
    };
    // A failed usage write never fails the turn itself.
    if let Err(e) = record_usage(state.store.as_ref(), &user.id, session_id, event).await {
        warn!("Failed to record usage for session {session_id}: {e}");
    }

    result
}

/// Splits an answer into word-sized pieces that concatenate back to it.
pub fn stream_pieces(text: &str) -> Vec<&str> {
    text.split_inclusive(char::is_whitespace).collect()
}

/// The JSON payloads of every frame except the final `[DONE]`.
pub fn stream_frames(outcome: &ChatOutcome, session_id: &str) -> Result<Vec<String>, PromptError> {
    let mut frames = stream_pieces(&outcome.reply.response)
        .into_iter()
        .map(|piece| {
            serde_json::to_string(&ChatStreamFrame::Chunk {
                content: piece.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    frames.push(serde_json::to_string(&ChatStreamFrame::Usage {
        tokens: outcome.reply.tokens,
        model: outcome.reply.model.clone(),
        conversation_id: outcome.conversation_id.clone(),
        session_id: session_id.to_string(),
    })?);
    Ok(frames)
}

/// Handler for `POST /chat`.
pub async fn chat_stream_handler(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    SessionId(session_id): SessionId,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let Json(request) = payload?;
    info!("Streaming chat turn for user '{}'.", user.id);

    let outcome = run_chat_turn(&app_state, &user, &session_id, &request).await?;
    let frames = stream_frames(&outcome, &session_id)?;

    let events = frames
        .into_iter()
        .chain(std::iter::once(DONE_FRAME.to_string()))
        .map(|data| Ok(Event::default().data(data)));
    Ok(Sse::new(stream::iter(events)))
}

/// Handler for `POST /chat/complete`.
pub async fn chat_complete_handler(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    SessionId(session_id): SessionId,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatCompleteResponse>, AppError> {
    let Json(request) = payload?;
    info!("Chat turn for user '{}'.", user.id);

    let outcome = run_chat_turn(&app_state, &user, &session_id, &request).await?;
    Ok(Json(ChatCompleteResponse {
        response: outcome.reply.response,
        tokens: outcome.reply.tokens,
        conversation_id: outcome.conversation_id,
        model: outcome.reply.model,
        session_id,
    }))
}
