//! The chat models an administrator or user may select.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub label: &'static str,
    /// Older models that still take `max_tokens`.
    pub legacy: bool,
}

pub const MODEL_CATALOGUE: &[ModelInfo] = &[
    ModelInfo {
        id: "gpt-5-2025-08-07",
        label: "GPT-5",
        legacy: false,
    },
    ModelInfo {
        id: "gpt-5-mini-2025-08-07",
        label: "GPT-5 Mini",
        legacy: false,
    },
    ModelInfo {
        id: "gpt-4.1-2025-04-14",
        label: "GPT-4.1",
        legacy: false,
    },
    ModelInfo {
        id: "gpt-4.1-mini-2025-04-14",
        label: "GPT-4.1 Mini",
        legacy: false,
    },
    ModelInfo {
        id: "gpt-4o-mini",
        label: "GPT-4o Mini",
        legacy: true,
    },
];

pub fn is_supported_model(model: &str) -> bool {
    MODEL_CATALOGUE.iter().any(|m| m.id == model)
}
