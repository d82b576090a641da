//! Layered generation: remote models first, local template last.

use std::sync::Arc;

use async_trait::async_trait;
use quizcast_core::Quiz;
use quizcast_settings::ContentSettings;
use tracing::{info, warn};

use crate::errors::ContentError;
use crate::ollama::OllamaGenerator;
use crate::template::deterministic_quiz;
use crate::QuizGenerator;

/// Tries each generator in order and falls back to [`deterministic_quiz`].
pub struct FallbackGenerator {
    chain: Vec<Arc<dyn QuizGenerator>>,
    question_count: usize,
}

impl FallbackGenerator {
    /// Build from an explicit chain of generators.
    pub fn new(chain: Vec<Arc<dyn QuizGenerator>>, question_count: usize) -> Self {
        Self {
            chain,
            question_count,
        }
    }

    /// Primary model plus the optional fallback model from settings.
    pub fn from_settings(settings: &ContentSettings) -> Self {
        let client = reqwest::Client::new();
        let mut chain: Vec<Arc<dyn QuizGenerator>> = vec![Arc::new(OllamaGenerator::from_settings(
            client.clone(),
            settings,
        ))];
        if let Some(model) = settings.fallback_model.as_deref() {
            chain.push(Arc::new(
                OllamaGenerator::from_settings(client, settings).with_model(model),
            ));
        }
        Self::new(chain, settings.question_count)
    }

    /// Template only; no network.
    pub fn offline(question_count: usize) -> Self {
        Self::new(Vec::new(), question_count)
    }

    /// Produce a quiz, never failing.
    pub async fn generate_or_fallback(&self, topic: &str, difficulty: &str) -> Quiz {
        for (attempt, generator) in self.chain.iter().enumerate() {
            match generator.generate(topic, difficulty).await {
                Ok(quiz) => return quiz,
                Err(error) => {
                    warn!(attempt, %error, topic, "quiz generation failed, falling back");
                }
            }
        }
        info!(topic, difficulty, "using deterministic quiz template");
        deterministic_quiz(topic, difficulty, self.question_count)
    }
}

#[async_trait]
impl QuizGenerator for FallbackGenerator {
    async fn generate(&self, topic: &str, difficulty: &str) -> Result<Quiz, ContentError> {
        Ok(self.generate_or_fallback(topic, difficulty).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Failing(AtomicUsize);

    #[async_trait]
    impl QuizGenerator for Failing {
        async fn generate(&self, _: &str, _: &str) -> Result<Quiz, ContentError> {
            let _ = self.0.fetch_add(1, Ordering::SeqCst);
            Err(ContentError::InvalidOutput("nope".into()))
        }
    }

    struct Fixed;

    #[async_trait]
    impl QuizGenerator for Fixed {
        async fn generate(&self, topic: &str, difficulty: &str) -> Result<Quiz, ContentError> {
            let mut quiz = deterministic_quiz(topic, difficulty, 1);
            quiz.quiz_id = "fixed".into();
            Ok(quiz)
        }
    }

    #[tokio::test]
    async fn offline_uses_template() {
        let quiz = FallbackGenerator::offline(3)
            .generate_or_fallback("rust", "medium")
            .await;
        assert_eq!(quiz.questions.len(), 3);
        assert_eq!(quiz.topic, "rust");
    }

    #[tokio::test]
    async fn first_success_wins() {
        let failing = Arc::new(Failing(AtomicUsize::new(0)));
        let chain: Vec<Arc<dyn QuizGenerator>> = vec![failing.clone(), Arc::new(Fixed)];
        let quiz = FallbackGenerator::new(chain, 3)
            .generate("rust", "easy")
            .await
            .unwrap();
        assert_eq!(quiz.quiz_id, "fixed");
        assert_eq!(failing.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_failures_fall_through_to_template() {
        let a = Arc::new(Failing(AtomicUsize::new(0)));
        let b = Arc::new(Failing(AtomicUsize::new(0)));
        let chain: Vec<Arc<dyn QuizGenerator>> = vec![a.clone(), b.clone()];
        let quiz = FallbackGenerator::new(chain, 2)
            .generate_or_fallback("t", "hard")
            .await;
        assert_eq!(quiz.questions.len(), 2);
        assert_eq!(a.0.load(Ordering::SeqCst), 1);
        assert_eq!(b.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_service_falls_back() {
        let settings = ContentSettings {
            base_url: "http://127.0.0.1:1".into(),
            fallback_model: Some("llama3".into()),
            timeout_ms: 500,
            ..ContentSettings::default()
        };
        let quiz = FallbackGenerator::from_settings(&settings)
            .generate_or_fallback("rust", "medium")
            .await;
        assert_eq!(quiz.questions.len(), 3);
    }
}
