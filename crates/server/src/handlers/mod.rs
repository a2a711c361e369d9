//! # API Route Handlers
//!
//! This module organizes all the Axum route handlers for `maxrag-server`.
//! The handlers are split into logical sub-modules based on their functionality.

pub mod admin_handlers;
pub mod chat_handlers;
pub mod conversation_handlers;
pub mod document_handlers;
pub mod general;
pub mod ingest_handlers;
pub mod settings_handlers;

// Re-export all handlers so the router can reach them under `handlers::`.
pub use admin_handlers::*;
pub use chat_handlers::*;
pub use conversation_handlers::*;
pub use document_handlers::*;
pub use general::*;
pub use ingest_handlers::*;
pub use settings_handlers::*;
