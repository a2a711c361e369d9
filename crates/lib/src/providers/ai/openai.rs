use super::{AiProvider, ChatMessage, Completion, CompletionContent, CompletionRequest};
use crate::errors::PromptError;
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use tracing::{debug, error};

// --- OpenAI chat-completions request and response structures ---

#[derive(Serialize, Debug)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize, Debug)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize, Debug)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<CompletionContent>,
}

#[derive(Deserialize, Debug)]
struct OpenAiUsage {
    #[serde(default)]
    total_tokens: u32,
}

/// Older models only accept `max_tokens`; newer ones require `max_completion_tokens`.
pub fn uses_legacy_token_field(model: &str) -> bool {
    model == "gpt-4"
        || model.starts_with("gpt-4-")
        || model.starts_with("gpt-4o")
        || model.starts_with("gpt-3.5")
}

/// A provider for the OpenAI chat-completions API (or any compatible endpoint).
#[derive(Clone)]
pub struct OpenAiProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: String,
}

impl Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// Creates a new `OpenAiProvider`. A blank key is rejected up front.
    pub fn new(api_url: String, api_key: Option<String>) -> Result<Self, PromptError> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(PromptError::MissingApiKey)?;
        let client = ReqwestClient::builder()
            .build()
            .map_err(PromptError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, PromptError> {
        let legacy = uses_legacy_token_field(&request.model);
        let body = OpenAiRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: legacy.then_some(request.max_output_tokens),
            max_completion_tokens: (!legacy).then_some(request.max_output_tokens),
        };
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "--> Sending request to chat completions API"
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(PromptError::AiRequest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Chat completions API returned {}: {}", status, body);
            return Err(PromptError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(PromptError::AiDeserialization)?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        let total_tokens = parsed.usage.map(|u| u.total_tokens).unwrap_or(0);

        Ok(Completion {
            content,
            total_tokens,
        })
    }
}
