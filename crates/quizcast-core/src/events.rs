//! Event payloads published onto room channels.
//!
//! The fanout path never inspects these: it forwards the serialized text
//! verbatim. They exist so publishers produce the `{"type": ..., ...}` shape
//! clients expect.

use serde::{Deserialize, Serialize};

use crate::quiz::Quiz;

/// Discriminant of a [`QuizEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Full quiz content.
    QuizData,
    /// A player joined the room.
    PlayerJoined,
    /// A player's score changed.
    ScoreUpdate,
}

impl EventKind {
    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QuizData => "QUIZ_DATA",
            Self::PlayerJoined => "PLAYER_JOINED",
            Self::ScoreUpdate => "SCORE_UPDATE",
        }
    }
}

/// An event for one room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizEvent {
    /// Quiz content, fields flattened next to `type`.
    QuizData(Quiz),
    /// A player joined.
    PlayerJoined {
        /// Room the player joined.
        quiz_id: String,
        /// Player identifier.
        player_id: String,
        /// Display name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// A player's score changed.
    ScoreUpdate {
        /// Room the score belongs to.
        quiz_id: String,
        /// Player identifier.
        player_id: String,
        /// New score.
        score: i64,
    },
}

impl QuizEvent {
    /// Event discriminant.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::QuizData(_) => EventKind::QuizData,
            Self::PlayerJoined { .. } => EventKind::PlayerJoined,
            Self::ScoreUpdate { .. } => EventKind::ScoreUpdate,
        }
    }

    /// Room id the event targets.
    pub fn quiz_id(&self) -> &str {
        match self {
            Self::QuizData(quiz) => &quiz.quiz_id,
            Self::PlayerJoined { quiz_id, .. } | Self::ScoreUpdate { quiz_id, .. } => quiz_id,
        }
    }

    /// Serialize to the text payload carried on the bus.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn sample_quiz() -> Quiz {
        serde_json::from_value(json!({
            "quiz_id": "q1",
            "topic": "rust",
            "difficulty": "medium",
            "questions": []
        }))
        .unwrap()
    }

    #[test]
    fn quiz_data_flattens_fields() {
        let payload = QuizEvent::QuizData(sample_quiz()).to_payload().unwrap();
        let v: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(v["type"], "QUIZ_DATA");
        assert_eq!(v["quiz_id"], "q1");
        assert_eq!(v["topic"], "rust");
    }

    #[test]
    fn player_joined_shape() {
        let ev = QuizEvent::PlayerJoined {
            quiz_id: "q1".into(),
            player_id: "p1".into(),
            name: None,
        };
        let v: Value = serde_json::from_str(&ev.to_payload().unwrap()).unwrap();
        assert_eq!(v, json!({"type": "PLAYER_JOINED", "quiz_id": "q1", "player_id": "p1"}));
    }

    #[test]
    fn score_update_shape() {
        let ev = QuizEvent::ScoreUpdate {
            quiz_id: "q1".into(),
            player_id: "p1".into(),
            score: 42,
        };
        let v: Value = serde_json::from_str(&ev.to_payload().unwrap()).unwrap();
        assert_eq!(v["type"], "SCORE_UPDATE");
        assert_eq!(v["score"], 42);
    }

    #[test]
    fn kind_matches_wire_tag() {
        let ev = QuizEvent::ScoreUpdate {
            quiz_id: "q1".into(),
            player_id: "p1".into(),
            score: 1,
        };
        let v: Value = serde_json::from_str(&ev.to_payload().unwrap()).unwrap();
        assert_eq!(v["type"], ev.kind().as_str());
        assert_eq!(ev.quiz_id(), "q1");
    }

    #[test]
    fn event_kind_serde_names() {
        assert_eq!(serde_json::to_string(&EventKind::QuizData).unwrap(), r#""QUIZ_DATA""#);
        assert_eq!(EventKind::PlayerJoined.as_str(), "PLAYER_JOINED");
    }
}
