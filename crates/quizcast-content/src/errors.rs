//! Content producer errors.

use quizcast_core::QuizValidationError;
use thiserror::Error;

/// Reasons a generation attempt failed.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("content request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("content service returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },
    /// The model output was not a JSON quiz.
    #[error("invalid model output: {0}")]
    InvalidOutput(String),
    /// The quiz parsed but failed schema validation.
    #[error("quiz failed validation: {0}")]
    Validation(#[from] QuizValidationError),
}
