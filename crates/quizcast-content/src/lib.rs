//! # quizcast-content
//!
//! Produces [`Quiz`] content for newly created rooms.
//!
//! - [`OllamaGenerator`]: asks an Ollama-compatible `/api/generate` endpoint
//!   for a JSON quiz and validates it
//! - [`FallbackGenerator`]: primary model, then optional fallback model, then
//!   [`deterministic_quiz`]; never fails
//!
//! [`Quiz`]: quizcast_core::Quiz

#![deny(unsafe_code)]

pub mod errors;
pub mod fallback;
pub mod ollama;
pub mod template;

use async_trait::async_trait;
use quizcast_core::Quiz;

pub use errors::ContentError;
pub use fallback::FallbackGenerator;
pub use ollama::OllamaGenerator;
pub use template::deterministic_quiz;

/// Something that can produce a quiz for a topic.
#[async_trait]
pub trait QuizGenerator: Send + Sync {
    /// Generate a validated quiz.
    async fn generate(&self, topic: &str, difficulty: &str) -> Result<Quiz, ContentError>;
}
