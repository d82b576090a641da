//! Quiz content producer settings.

use serde::{Deserialize, Serialize};

/// Content producer settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentSettings {
    /// Base URL of the Ollama-compatible generation service.
    pub base_url: String,
    /// Primary model name.
    pub model: String,
    /// Model tried when the primary fails, before the local template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_model: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Questions per generated quiz.
    pub question_count: usize,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "mistral:7b".to_string(),
            fallback_model: None,
            timeout_ms: 30_000,
            question_count: 3,
        }
    }
}
