pub mod embedding;
pub mod openai;

use crate::{errors::PromptError, types::Role};
use async_trait::async_trait;
use dyn_clone::DynClone;
pub use embedding::{Embedder, OpenAiEmbedder};
pub use openai::OpenAiProvider;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A single message sent to the completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_output_tokens: u32,
}

/// One element of a multi-part message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ContentPart {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// The `message.content` of a completion, which providers return either as a
/// plain string or as a list of typed parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CompletionContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Default for CompletionContent {
    fn default() -> Self {
        CompletionContent::Text(String::new())
    }
}

impl CompletionContent {
    /// Flattens the content to trimmed text. Parts without text are skipped.
    pub fn to_text(&self) -> String {
        match self {
            CompletionContent::Text(text) => text.trim().to_string(),
            CompletionContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<String>()
                .trim()
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Completion {
    pub content: CompletionContent,
    /// `usage.total_tokens` as reported upstream, `0` when absent.
    pub total_tokens: u32,
}

/// A chat-completion backend.
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, PromptError>;
}

dyn_clone::clone_trait_object!(AiProvider);
