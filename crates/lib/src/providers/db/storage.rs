use crate::{
    errors::PromptError,
    types::{
        AiSettings, ChunkMatch, Conversation, DashboardStats, Document, DocumentChunk,
        DocumentSummary, Message, NewChunk, NewDocument, Profile, RagStats, Role, UsageDelta,
        UsageStat,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{collections::HashSet, fmt::Debug};

/// Uploaded documents and their extracted text.
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    async fn insert_document(&self, document: NewDocument) -> Result<Document, PromptError>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>, PromptError>;

    /// Newest first.
    async fn list_documents(&self) -> Result<Vec<DocumentSummary>, PromptError>;

    /// Every document with its content, ordered by filename.
    async fn all_documents(&self) -> Result<Vec<Document>, PromptError>;

    /// Removes the document and its chunks. Returns `false` when it did not exist.
    async fn delete_document(&self, id: &str) -> Result<bool, PromptError>;

    /// The subset of `hashes` already present in the store.
    async fn existing_hashes(&self, hashes: &[String]) -> Result<HashSet<String>, PromptError>;
}

/// Embedded chunks of documents.
#[async_trait]
pub trait ChunkStore: Send + Sync + Debug {
    /// Returns the number of chunks removed.
    async fn delete_chunks(&self, document_id: &str) -> Result<u64, PromptError>;

    /// Inserts all chunks in one transaction; either every row lands or none does.
    async fn insert_chunks(&self, chunks: &[NewChunk]) -> Result<usize, PromptError>;

    /// Ordered by `chunk_index`.
    async fn list_chunks(&self, document_id: &str) -> Result<Vec<DocumentChunk>, PromptError>;

    async fn rag_stats(&self) -> Result<RagStats, PromptError>;
}

/// Nearest-neighbour search over chunk embeddings.
#[async_trait]
pub trait VectorSearch: Send + Sync + Debug {
    /// Returns at most `top_k` chunks embedded with `model_name` and the same
    /// dimensionality as `query`, most similar first.
    async fn similarity_search(
        &self,
        query: &[f32],
        model_name: &str,
        top_k: u32,
    ) -> Result<Vec<ChunkMatch>, PromptError>;
}

/// Conversations and their append-only message log.
#[async_trait]
pub trait ChatStore: Send + Sync + Debug {
    async fn create_conversation(
        &self,
        user_id: &str,
        title: &str,
    ) -> Result<Conversation, PromptError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, PromptError>;

    /// Conversations owned by `user_id`, most recently updated first.
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, PromptError>;

    /// Appends a message and bumps the conversation's `updated_at`.
    async fn append_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
        tokens: i64,
    ) -> Result<Message, PromptError>;

    /// Oldest first.
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, PromptError>;
}

#[async_trait]
pub trait UsageStore: Send + Sync + Debug {
    async fn get_usage(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<UsageStat>, PromptError>;

    /// Adds `delta` to the row keyed by `(user_id, session_id)`, creating it
    /// on first use, and returns the row as stored afterwards. Concurrent
    /// calls for the same key must not lose increments.
    async fn apply_usage(
        &self,
        user_id: &str,
        session_id: &str,
        delta: &UsageDelta,
    ) -> Result<UsageStat, PromptError>;
}

/// The AI settings singleton, user profiles and the dashboard aggregates.
#[async_trait]
pub trait SettingsStore: Send + Sync + Debug {
    /// Returns the default (all empty) settings when none were ever saved.
    async fn get_ai_settings(&self) -> Result<AiSettings, PromptError>;

    async fn save_ai_settings(&self, settings: &AiSettings) -> Result<(), PromptError>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, PromptError>;

    async fn save_profile(&self, profile: &Profile) -> Result<(), PromptError>;

    /// Every profile, ordered by `user_id`.
    async fn list_profiles(&self) -> Result<Vec<Profile>, PromptError>;

    async fn dashboard_stats(&self, since: DateTime<Utc>) -> Result<DashboardStats, PromptError>;
}
