//! Server error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quizcast_bus::BusError;
use quizcast_content::ContentError;
use quizcast_core::{RoomId, RoomIdError};
use thiserror::Error;

use crate::rooms::connection::Liveness;

/// A push to one connection failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The connection is closing or closed, or its writer is gone.
    #[error("connection closed")]
    Closed,
    /// The outbound queue stayed full for the whole send timeout.
    #[error("send timed out under backpressure")]
    Timeout,
}

/// Closing a connection failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CloseError {
    /// Close was already requested.
    #[error("connection already closed")]
    AlreadyClosed,
    /// The writer task had already exited; no close frame could be queued.
    #[error("connection transport already gone")]
    TransportGone,
}

/// A connection could not be admitted to a room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The connection is not in the `Connected` state.
    #[error("connection is {state:?}, not open")]
    NotOpen {
        /// Observed liveness.
        state: Liveness,
    },
    /// The connection is scoped to another room.
    #[error("connection belongs to room {actual}, not {expected}")]
    RoomMismatch {
        /// Room the caller asked for.
        expected: RoomId,
        /// Room the connection was created for.
        actual: RoomId,
    },
}

/// The fanout engine stopped on an unrecoverable error.
#[derive(Debug, Error)]
pub enum FanoutError {
    /// The bus rejected the pattern subscription.
    #[error("pattern subscription rejected: {0}")]
    Subscribe(BusError),
}

/// Error returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request.
    #[error("{0}")]
    BadRequest(String),
    /// Path segment is not a valid room id.
    #[error("invalid quiz id: {0}")]
    InvalidRoom(#[from] RoomIdError),
    /// The content producer failed.
    #[error("quiz generation failed: {0}")]
    Content(#[from] ContentError),
    /// Publishing to the bus failed.
    #[error("publish failed: {0}")]
    Bus(#[from] BusError),
    /// Event could not be serialized.
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InvalidRoom(_) => StatusCode::BAD_REQUEST,
            Self::Content(_) => StatusCode::BAD_GATEWAY,
            Self::Bus(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
