//! Quiz creation and room event publishing.
//!
//! These handlers only publish to the bus. Delivery to sockets happens
//! through the fanout engine like any other bus traffic.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use metrics::counter;
use quizcast_core::{QuizEvent, RoomId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::ApiError;
use crate::metrics::EVENTS_PUBLISHED_TOTAL;
use crate::server::AppState;

/// Difficulty used when a request omits it.
pub const DEFAULT_DIFFICULTY: &str = "medium";

/// `POST /quizzes` body.
#[derive(Debug, Default, Deserialize)]
pub struct CreateQuizRequest {
    /// Quiz topic (required, non-blank).
    #[serde(default)]
    pub topic: Option<String>,
    /// Difficulty, default `"medium"`.
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// `POST /quizzes` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateQuizResponse {
    /// Id of the room the quiz was published to.
    pub quiz_id: String,
}

/// `POST /quizzes/{quiz_id}/players` body.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    /// Player identifier.
    pub player_id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// `POST /quizzes/{quiz_id}/scores` body.
#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    /// Player identifier.
    pub player_id: String,
    /// New score.
    pub score: i64,
}

/// Response for publish-only routes.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublishResponse {
    /// Bus subscribers the event was handed to.
    pub delivered_to: usize,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Serialize `event` and publish it on its room's channel.
pub async fn publish_event(state: &AppState, event: &QuizEvent) -> Result<usize, ApiError> {
    let room_id = RoomId::parse(event.quiz_id())?;
    let channel = state.config.channel.channel_for(&room_id);
    let payload = event.to_payload()?;
    let delivered_to = state.bus.publish(&channel, &payload).await?;
    let kind = event.kind().as_str();
    counter!(EVENTS_PUBLISHED_TOTAL, "type" => kind).increment(1);
    info!(room_id = %room_id, kind, delivered_to, "event published");
    Ok(delivered_to)
}

/// POST /quizzes
pub async fn create_quiz(
    State(state): State<AppState>,
    Json(req): Json<CreateQuizRequest>,
) -> Result<Json<CreateQuizResponse>, ApiError> {
    let topic = non_blank(req.topic.as_deref())
        .ok_or_else(|| ApiError::BadRequest("topic required".into()))?;
    let difficulty = non_blank(req.difficulty.as_deref()).unwrap_or(DEFAULT_DIFFICULTY);

    let quiz = state.content.generate(topic, difficulty).await?;
    let quiz_id = quiz.quiz_id.clone();
    let _ = publish_event(&state, &QuizEvent::QuizData(quiz)).await?;
    Ok(Json(CreateQuizResponse { quiz_id }))
}

/// POST /quizzes/{quiz_id}/players
pub async fn join_quiz(
    State(state): State<AppState>,
    Path(quiz_id): Path<String>,
    Json(req): Json<JoinRequest>,
) -> Result<(StatusCode, Json<PublishResponse>), ApiError> {
    let room_id = RoomId::parse(quiz_id)?;
    let player_id = non_blank(Some(&req.player_id))
        .ok_or_else(|| ApiError::BadRequest("player_id required".into()))?;
    let event = QuizEvent::PlayerJoined {
        quiz_id: room_id.to_string(),
        player_id: player_id.to_owned(),
        name: req.name,
    };
    let delivered_to = publish_event(&state, &event).await?;
    Ok((StatusCode::ACCEPTED, Json(PublishResponse { delivered_to })))
}

/// POST /quizzes/{quiz_id}/scores
pub async fn update_score(
    State(state): State<AppState>,
    Path(quiz_id): Path<String>,
    Json(req): Json<ScoreRequest>,
) -> Result<(StatusCode, Json<PublishResponse>), ApiError> {
    let room_id = RoomId::parse(quiz_id)?;
    let player_id = non_blank(Some(&req.player_id))
        .ok_or_else(|| ApiError::BadRequest("player_id required".into()))?;
    let event = QuizEvent::ScoreUpdate {
        quiz_id: room_id.to_string(),
        player_id: player_id.to_owned(),
        score: req.score,
    };
    let delivered_to = publish_event(&state, &event).await?;
    Ok((StatusCode::ACCEPTED, Json(PublishResponse { delivered_to })))
}
