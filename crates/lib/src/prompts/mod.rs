//! # Prompt Template Modules
//!
//! Every piece of text the assistant shows or sends to the model lives here,
//! split by where it is used.

pub mod chat;
pub mod retrieval;
