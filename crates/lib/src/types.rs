//! # Domain Types
//!
//! Rows persisted by the store and the small value types passed between the
//! retrieval and chat layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An uploaded file after text extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub content: String,
    /// Lower-cased extension including the dot, e.g. `.pdf`.
    pub file_type: String,
    pub mime_type: Option<String>,
    pub size_bytes: i64,
    pub pages: Option<i64>,
    #[serde(default)]
    pub sheets: Vec<String>,
    pub truncated: bool,
    pub content_hash: String,
    pub uploaded_by: Option<String>,
    pub path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn is_pdf(&self) -> bool {
        self.file_type == ".pdf"
    }
}

/// The fields needed to create a `Document`; id and timestamp are assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub filename: String,
    pub content: String,
    pub file_type: String,
    pub mime_type: Option<String>,
    pub size_bytes: i64,
    pub pages: Option<i64>,
    pub sheets: Vec<String>,
    pub truncated: bool,
    pub content_hash: String,
    pub uploaded_by: Option<String>,
    pub path: Option<String>,
}

/// Listing view of a document, without its content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    pub file_type: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted chunk of a document together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub content: String,
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
    pub model_name: String,
    pub page: Option<i64>,
    pub filename: String,
    pub path: Option<String>,
}

/// A chunk ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub document_id: String,
    pub chunk_index: i64,
    pub content: String,
    pub embedding: Vec<f32>,
    pub model_name: String,
    pub page: Option<i64>,
    pub filename: String,
    pub path: Option<String>,
}

/// A row returned by the similarity search.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChunkMatch {
    pub document_id: String,
    pub filename: String,
    pub content: String,
    pub page: Option<i64>,
    /// Cosine similarity in `[-1, 1]`; `1.0` means identical direction.
    pub similarity: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of conversation history as sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    pub tokens: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProfileRole {
    Admin,
    #[default]
    User,
}

impl ProfileRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileRole::Admin => "admin",
            ProfileRole::User => "user",
        }
    }

    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("admin") {
            ProfileRole::Admin
        } else {
            ProfileRole::User
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Profile {
    pub user_id: String,
    pub name: Option<String>,
    pub role: ProfileRole,
    pub area: Option<String>,
    pub preferred_model: Option<String>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == ProfileRole::Admin
    }
}

/// The global assistant settings row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AiSettings {
    pub current_model: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_by: Option<String>,
}

/// Usage counters for one client session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageStat {
    pub user_id: String,
    pub session_id: String,
    pub messages_count: i64,
    pub tokens_count: i64,
    pub error_count: i64,
    pub success_rate: f64,
    pub response_time_ms: i64,
    pub session_start: DateTime<Utc>,
    pub session_end: Option<DateTime<Utc>>,
}

/// An increment applied to one `(user_id, session_id)` usage row.
///
/// Counters are added to the stored ones; `response_time_ms` replaces the
/// stored value only when present.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageDelta {
    pub messages: i64,
    pub tokens: i64,
    pub errors: i64,
    pub response_time_ms: Option<i64>,
    pub at: DateTime<Utc>,
}

/// Aggregates shown on the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DashboardStats {
    pub total_messages: i64,
    pub total_tokens: i64,
    pub active_users: i64,
    pub total_documents: i64,
    pub total_conversations: i64,
    pub avg_response_time_ms: i64,
    pub errors_last_30_days: i64,
}

/// Chunk coverage of the document base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RagStats {
    pub total_chunks: i64,
    pub documents_with_chunks: i64,
    /// Over the documents that have at least one chunk; `0` when none do.
    pub avg_chunks_per_document: f64,
}
