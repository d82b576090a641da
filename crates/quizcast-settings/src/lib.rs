//! # quizcast-settings
//!
//! Configuration management with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`QuizcastSettings::default()`]
//! 2. **Settings file**: `~/.quizcast/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `QUIZCAST_*`, plus `REDIS_URL`, `PORT`,
//!    `OLLAMA_URL`, `OLLAMA_MODEL_NAME`, `FALLBACK_MODEL_NAME` (highest priority)
//!
//! The loaded value is passed explicitly to whatever needs it; there is no
//! global settings instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;
