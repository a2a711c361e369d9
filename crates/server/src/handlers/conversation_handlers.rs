//! # Conversation Route Handlers

use crate::{
    auth::AuthenticatedUser, errors::AppError, state::AppState, types::CreateConversationRequest,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use maxrag::{
    chat::conversation_title,
    prompts::chat::NEW_CONVERSATION_TITLE,
    providers::db::storage::ChatStore,
    types::{Conversation, Message},
};
use tracing::info;

/// Loads a conversation, answering 404 when it is missing or owned by someone else.
pub(crate) async fn owned_conversation(
    state: &AppState,
    user_id: &str,
    conversation_id: &str,
) -> Result<Conversation, AppError> {
    match state.store.get_conversation(conversation_id).await? {
        Some(conversation) if conversation.user_id == user_id => Ok(conversation),
        _ => Err(AppError::NotFound("Conversa não encontrada".to_string())),
    }
}

/// Handler for `GET /conversations`: the caller's conversations, most recent first.
pub async fn list_conversations_handler(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Conversation>>, AppError> {
    let conversations = app_state.store.list_conversations(&user.id).await?;
    Ok(Json(conversations))
}

/// Handler for `POST /conversations`. The body is optional.
pub async fn create_conversation_handler(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    payload: Option<Json<CreateConversationRequest>>,
) -> Result<(StatusCode, Json<Conversation>), AppError> {
    let title = payload
        .and_then(|Json(body)| body.title)
        .filter(|t| !t.trim().is_empty())
        .map(|t| conversation_title(&t))
        .unwrap_or_else(|| NEW_CONVERSATION_TITLE.to_string());

    let conversation = app_state
        .store
        .create_conversation(&user.id, &title)
        .await?;
    info!(
        "User '{}' created conversation '{}'.",
        user.id, conversation.id
    );
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// Handler for `GET /conversations/{id}/messages`, oldest first.
pub async fn list_messages_handler(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<Message>>, AppError> {
    let conversation = owned_conversation(&app_state, &user.id, &conversation_id).await?;
    let messages = app_state.store.list_messages(&conversation.id).await?;
    Ok(Json(messages))
}
