//! # Max: Retrieval-Augmented Company Assistant
//!
//! This crate holds the core of the Max assistant: turning uploaded files into
//! text, splitting that text into overlapping chunks, embedding and persisting
//! the chunks, retrieving relevant context for a question, and assembling the
//! prompt sent to the chat-completion provider.
//!
//! The HTTP surface lives in `maxrag-server`; the file-format plugins live in
//! `maxrag-text`, `maxrag-pdf` and `maxrag-sheets`.

pub mod chat;
pub mod chunking;
pub mod constants;
pub mod errors;
pub mod extract;
pub mod ingest;
pub mod models;
pub mod prompts;
pub mod providers;
pub mod search;
pub mod types;
pub mod upload;
pub mod usage;

pub use chat::{ChatError, ChatOrchestrator, ChatReply, ChatRequest};
pub use errors::PromptError;
pub use ingest::{IngestError, IngestionPipeline, IngestionSummary};
pub use search::{ContextBlock, FallbackRetriever, KeywordRetriever, Retriever, VectorRetriever};
pub use types::{
    AiSettings, ChatTurn, Conversation, Document, DocumentChunk, Message, Profile, Role,
    UsageDelta, UsageStat,
};
