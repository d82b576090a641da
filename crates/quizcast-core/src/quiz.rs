//! Quiz content records.
//!
//! Field names are the wire names used by the content producer and by
//! clients reading `QUIZ_DATA` events.

use serde::{Deserialize, Serialize};

use crate::errors::QuizValidationError;
use crate::ids::RoomId;

/// Default time limit for a quiz, in seconds.
pub const DEFAULT_TIME_LIMIT_SECONDS: u32 = 600;

/// Number of options every question carries.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// A single multiple-choice question.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique question id.
    pub id: String,
    /// The question itself.
    pub question_text: String,
    /// Exactly four answer options.
    pub options: Vec<String>,
    /// Index of the correct option (`0..=3`).
    pub correct_answer_index: i64,
    /// Optional explanation shown after answering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Free-form metadata.
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_time_limit() -> Option<u32> {
    Some(DEFAULT_TIME_LIMIT_SECONDS)
}

/// A generated quiz.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    /// Quiz id, also the room id clients join.
    pub quiz_id: String,
    /// Topic the quiz covers.
    pub topic: String,
    /// Difficulty label (`easy`, `medium`, `hard`, ...).
    pub difficulty: String,
    /// Questions in presentation order.
    pub questions: Vec<Question>,
    /// Time limit in seconds.
    #[serde(default = "default_time_limit")]
    pub time_limit_seconds: Option<u32>,
    /// Who created the quiz, if known.
    #[serde(default)]
    pub created_by: Option<String>,
}

impl Quiz {
    /// Check every question and the quiz id, returning the room to publish to.
    pub fn validate(&self) -> Result<RoomId, QuizValidationError> {
        for q in &self.questions {
            if q.options.len() != OPTIONS_PER_QUESTION {
                return Err(QuizValidationError::OptionCount {
                    question_id: q.id.clone(),
                    count: q.options.len(),
                });
            }
            if !(0..OPTIONS_PER_QUESTION as i64).contains(&q.correct_answer_index) {
                return Err(QuizValidationError::AnswerIndex {
                    question_id: q.id.clone(),
                    index: q.correct_answer_index,
                });
            }
        }
        Ok(RoomId::parse(self.quiz_id.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn question(id: &str, options: usize, answer: i64) -> Question {
        Question {
            id: id.into(),
            question_text: "What?".into(),
            options: (0..options).map(|i| format!("opt{i}")).collect(),
            correct_answer_index: answer,
            explanation: None,
            metadata: empty_object(),
        }
    }

    fn quiz(questions: Vec<Question>) -> Quiz {
        Quiz {
            quiz_id: "q1".into(),
            topic: "rust".into(),
            difficulty: "easy".into(),
            questions,
            time_limit_seconds: Some(DEFAULT_TIME_LIMIT_SECONDS),
            created_by: None,
        }
    }

    #[test]
    fn valid_quiz_returns_room() {
        let room = quiz(vec![question("a", 4, 0), question("b", 4, 3)])
            .validate()
            .unwrap();
        assert_eq!(room.as_str(), "q1");
    }

    #[test]
    fn wrong_option_count_rejected() {
        assert_matches!(
            quiz(vec![question("a", 3, 0)]).validate(),
            Err(QuizValidationError::OptionCount { count: 3, .. })
        );
    }

    #[test]
    fn answer_index_out_of_range_rejected() {
        assert_matches!(
            quiz(vec![question("a", 4, 4)]).validate(),
            Err(QuizValidationError::AnswerIndex { index: 4, .. })
        );
        assert_matches!(
            quiz(vec![question("a", 4, -1)]).validate(),
            Err(QuizValidationError::AnswerIndex { index: -1, .. })
        );
    }

    #[test]
    fn bad_quiz_id_rejected() {
        let mut q = quiz(vec![]);
        q.quiz_id = "not a room".into();
        assert_matches!(q.validate(), Err(QuizValidationError::QuizId(_)));
    }

    #[test]
    fn deserialize_applies_defaults() {
        let q: Quiz = serde_json::from_value(json!({
            "quiz_id": "q9",
            "topic": "maths",
            "difficulty": "hard",
            "questions": [{
                "id": "q9-0",
                "question_text": "1+1?",
                "options": ["1", "2", "3", "4"],
                "correct_answer_index": 1
            }]
        }))
        .unwrap();
        assert_eq!(q.time_limit_seconds, Some(600));
        assert!(q.created_by.is_none());
        assert_eq!(q.questions[0].metadata, json!({}));
        assert!(q.questions[0].explanation.is_none());
    }
}
