//! # Chat Orchestration
//!
//! One chat turn, from the user's message to the normalized answer:
//!
//! `Received → intent check → { list documents | retrieve → build prompt → complete → normalize } → Responded`
//!
//! Settings and the caller's profile are loaded by the caller for every request
//! and passed in explicitly, so a model change is visible to the next turn.

use crate::{
    constants::{DEFAULT_CHAT_MODEL, HISTORY_LIMIT, MAX_OUTPUT_TOKENS, TITLE_MAX_CHARS},
    errors::PromptError,
    prompts::chat::{
        build_emoji_note, build_system_prompt, DOCUMENT_LIST_EMPTY, DOCUMENT_LIST_HEADER,
        FALLBACK_ANSWER,
    },
    providers::{
        ai::{AiProvider, ChatMessage, CompletionRequest},
        db::storage::DocumentStore,
    },
    search::{normalize_for_search, Retriever, SearchError, SearchStrategy},
    types::{AiSettings, ChatTurn, Profile, Role},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, sync::Arc, sync::LazyLock};
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Configuration(String),
    #[error("Erro na API OpenAI: {status}")]
    Upstream { status: u16, body: String },
    #[error("Failed to reach the completion provider: {0}")]
    Provider(PromptError),
    #[error("Retrieval failed: {0}")]
    Search(#[from] SearchError),
    #[error("Storage error: {0}")]
    Storage(PromptError),
}

impl From<PromptError> for ChatError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::MissingApiKey => {
                ChatError::Configuration("OpenAI API key não configurada".into())
            }
            PromptError::Upstream { status, body } => ChatError::Upstream { status, body },
            PromptError::StorageConnection(_)
            | PromptError::StorageOperationFailed(_)
            | PromptError::Database(_) => ChatError::Storage(err),
            other => ChatError::Provider(other),
        }
    }
}

/// One incoming chat turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatReply {
    pub response: String,
    pub tokens: u32,
    pub model: String,
    /// `None` when the turn was answered without retrieval.
    pub strategy: Option<SearchStrategy>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOptions {
    pub default_model: String,
    pub history_limit: usize,
    pub max_output_tokens: u32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_CHAT_MODEL.to_string(),
            history_limit: HISTORY_LIMIT,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        }
    }
}

/// Profile preference first, then the global setting, then the configured default.
pub fn resolve_model(profile: Option<&Profile>, settings: &AiSettings, default: &str) -> String {
    let nonblank = |m: &&str| !m.trim().is_empty();
    profile
        .and_then(|p| p.preferred_model.as_deref())
        .filter(nonblank)
        .or(settings.current_model.as_deref().filter(nonblank))
        .unwrap_or(default)
        .to_string()
}

// Only articles and pronouns may sit between the verb and "documentos", and
// the sentence must end there or continue with an availability word.
static LIST_DOCUMENTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(quais|listar|liste|lista|mostre|mostrar)\b(\s+(os|as|me|todos|todas|seus|voces))*\s+documentos\b\s*([?.!]|$|(voces|vcs?|disponiveis|cadastrados|existem|tem|ha|possui|possuem)\b)|\b(base|banco) de documentos?\b",
    )
    .unwrap()
});

/// True for inventory questions such as "quais documentos vocês têm?", false
/// for questions about a document's content.
pub fn is_list_documents_intent(message: &str) -> bool {
    LIST_DOCUMENTS_RE.is_match(&normalize_for_search(message))
}

fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F300..=0x1F5FF
            | 0x1F600..=0x1F64F
            | 0x1F680..=0x1F6FF
            | 0x1F900..=0x1F9FF
            | 0x1FA70..=0x1FAFF
            | 0x2600..=0x26FF
            | 0x2700..=0x27BF
    )
}

/// Distinct emojis in `text`, in order of first use.
pub fn emojis_in(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for c in text.chars().filter(|c| is_emoji(*c)) {
        let emoji = c.to_string();
        if !found.contains(&emoji) {
            found.push(emoji);
        }
    }
    found
}

/// The first user message cut to the title length, with `...` when cut.
pub fn conversation_title(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        let head: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        trimmed.to_string()
    }
}

/// Assembles the message list sent to the completion endpoint.
///
/// Order: system prompt, the last `history_limit` user/assistant turns, an
/// emoji note when the previous answer used emojis, then the new message.
pub fn build_messages(
    context: &str,
    history: &[ChatTurn],
    message: &str,
    history_limit: usize,
) -> Vec<ChatMessage> {
    let turns: Vec<&ChatTurn> = history.iter().filter(|t| t.role != Role::System).collect();
    let recent = &turns[turns.len().saturating_sub(history_limit)..];

    let mut messages = Vec::with_capacity(recent.len() + 3);
    messages.push(ChatMessage::new(Role::System, build_system_prompt(context)));
    messages.extend(
        recent
            .iter()
            .map(|t| ChatMessage::new(t.role, t.content.clone())),
    );

    if let Some(last_answer) = turns.iter().rev().find(|t| t.role == Role::Assistant) {
        let used = emojis_in(&last_answer.content);
        if !used.is_empty() {
            messages.push(ChatMessage::new(Role::System, build_emoji_note(&used)));
        }
    }

    messages.push(ChatMessage::new(Role::User, message));
    messages
}

#[derive(Debug, Clone)]
pub struct ChatOrchestrator {
    provider: Box<dyn AiProvider>,
    retriever: Arc<dyn Retriever>,
    documents: Arc<dyn DocumentStore>,
    options: ChatOptions,
}

impl ChatOrchestrator {
    pub fn new(
        provider: Box<dyn AiProvider>,
        retriever: Arc<dyn Retriever>,
        documents: Arc<dyn DocumentStore>,
        options: ChatOptions,
    ) -> Self {
        Self {
            provider,
            retriever,
            documents,
            options,
        }
    }

    /// Answers one chat turn for `user_id`.
    #[instrument(skip(self, request, profile, settings), fields(conversation = ?request.conversation_id))]
    pub async fn respond(
        &self,
        request: &ChatRequest,
        user_id: &str,
        profile: Option<&Profile>,
        settings: &AiSettings,
    ) -> Result<ChatReply, ChatError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ChatError::InvalidArgument("Mensagem é obrigatória".into()));
        }

        let model = resolve_model(profile, settings, &self.options.default_model);
        info!("Chat turn for user {user_id} using model {model}");

        if is_list_documents_intent(message) {
            info!("List-documents intent detected, skipping completion");
            return Ok(ChatReply {
                response: self.document_list().await?,
                tokens: 0,
                model,
                strategy: None,
            });
        }

        let context = self.retriever.search(message).await?;
        info!(
            "Retrieved context via {:?} with {} matches",
            context.strategy, context.matches
        );

        let completion = self
            .provider
            .complete(&CompletionRequest {
                model: model.clone(),
                messages: build_messages(
                    &context.text,
                    &request.conversation_history,
                    message,
                    self.options.history_limit,
                ),
                max_output_tokens: self.options.max_output_tokens,
            })
            .await?;

        let text = completion.content.to_text();
        let response = if text.is_empty() {
            FALLBACK_ANSWER.to_string()
        } else {
            text
        };

        Ok(ChatReply {
            response,
            tokens: completion.total_tokens,
            model,
            strategy: Some(context.strategy),
        })
    }

    async fn document_list(&self) -> Result<String, ChatError> {
        let mut filenames: Vec<String> = self
            .documents
            .list_documents()
            .await
            .map_err(ChatError::Storage)?
            .into_iter()
            .map(|d| d.filename)
            .collect();
        if filenames.is_empty() {
            return Ok(DOCUMENT_LIST_EMPTY.to_string());
        }
        filenames.sort();

        let lines: Vec<String> = filenames
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{}. {}", i + 1, name))
            .collect();
        Ok(format!("{}\n\n{}", DOCUMENT_LIST_HEADER, lines.join("\n")))
    }
}
