//! Ollama-compatible generation client.

use std::time::Duration;

use async_trait::async_trait;
use quizcast_core::{Quiz, RoomId};
use quizcast_settings::ContentSettings;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::QuizGenerator;
use crate::errors::ContentError;

/// Request body for `POST /api/generate`.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    system: String,
    stream: bool,
    format: &'a str,
}

/// Quiz generator backed by one model on an Ollama-compatible server.
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
    question_count: usize,
}

impl OllamaGenerator {
    /// Create a generator for `model`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, model)
    }

    /// Create a generator with a shared HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            model: model.into(),
            timeout: Duration::from_secs(30),
            question_count: 3,
        }
    }

    /// Build the primary generator from settings.
    pub fn from_settings(client: reqwest::Client, settings: &ContentSettings) -> Self {
        Self::with_client(client, &settings.base_url, &settings.model)
            .timeout(Duration::from_millis(settings.timeout_ms))
            .question_count(settings.question_count)
    }

    /// Same endpoint and limits, different model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of questions requested.
    #[must_use]
    pub fn question_count(mut self, count: usize) -> Self {
        self.question_count = count;
        self
    }

    /// Model this generator calls.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self, topic: &str) -> String {
        format!(
            "You are an expert quiz generator. Respond with a single JSON object and nothing else, \
             shaped as: {{\"quiz_id\": string, \"topic\": string, \"difficulty\": string, \
             \"questions\": [{{\"id\": string, \"question_text\": string, \
             \"options\": [string, string, string, string], \
             \"correct_answer_index\": integer 0-3, \"explanation\": string}}]}}. \
             No markdown fences or commentary. The quiz must contain exactly {} questions about: {topic}.",
            self.question_count
        )
    }
}

#[async_trait]
impl QuizGenerator for OllamaGenerator {
    #[instrument(skip(self), fields(model = %self.model))]
    async fn generate(&self, topic: &str, difficulty: &str) -> Result<Quiz, ContentError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt: format!(
                "User Request: Topic: {topic}, Difficulty: {difficulty}. Generate {} questions.",
                self.question_count
            ),
            system: self.system_prompt(topic),
            stream: false,
            format: "json",
        };

        info!(url, "requesting quiz from content service");
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ContentError::Status { status, body });
        }

        let raw: Value = response.json().await?;
        let quiz = parse_generate_response(raw)?;
        debug!(quiz_id = %quiz.quiz_id, questions = quiz.questions.len(), "quiz generated");
        Ok(quiz)
    }
}

/// Extract and validate a quiz from a `/api/generate` response body.
///
/// The `response` field is normally a JSON string (possibly wrapped in
/// markdown fences); an object is accepted as-is, and a body without
/// `response` is treated as the quiz itself. A quiz id that is not a valid
/// room id is replaced with a fresh UUID.
pub fn parse_generate_response(raw: Value) -> Result<Quiz, ContentError> {
    let data = match raw.get("response") {
        Some(Value::String(text)) => {
            let cleaned = strip_fences(text);
            serde_json::from_str::<Value>(cleaned)
                .map_err(|e| ContentError::InvalidOutput(format!("response is not JSON: {e}")))?
        }
        Some(obj @ Value::Object(_)) => obj.clone(),
        Some(other) => {
            return Err(ContentError::InvalidOutput(format!(
                "unexpected response field type: {other}"
            )));
        }
        None => raw,
    };

    let mut quiz: Quiz = serde_json::from_value(data)
        .map_err(|e| ContentError::InvalidOutput(format!("not a quiz: {e}")))?;
    if RoomId::parse(quiz.quiz_id.clone()).is_err() {
        debug!(quiz_id = %quiz.quiz_id, "model produced unusable quiz id, assigning one");
        quiz.quiz_id = uuid::Uuid::new_v4().to_string();
    }
    let _ = quiz.validate()?;
    Ok(quiz)
}

fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}
