//! Deterministic local quiz template.

use quizcast_core::quiz::DEFAULT_TIME_LIMIT_SECONDS;
use quizcast_core::{Question, Quiz};
use uuid::Uuid;

/// Build a quiz without any external service.
///
/// Questions are `Sample <difficulty> question <n> about <topic>` with
/// options `A`–`D` and the first option correct. The quiz id is a fresh
/// UUID v4.
pub fn deterministic_quiz(topic: &str, difficulty: &str, question_count: usize) -> Quiz {
    let quiz_id = Uuid::new_v4().to_string();
    let questions = (0..question_count)
        .map(|i| Question {
            id: format!("{quiz_id}-{i}"),
            question_text: format!("Sample {difficulty} question {} about {topic}", i + 1),
            options: ["A", "B", "C", "D"].map(String::from).to_vec(),
            correct_answer_index: 0,
            explanation: Some(format!("Explanation for question {}", i + 1)),
            metadata: serde_json::json!({}),
        })
        .collect();

    Quiz {
        quiz_id,
        topic: topic.to_owned(),
        difficulty: difficulty.to_owned(),
        questions,
        time_limit_seconds: Some(DEFAULT_TIME_LIMIT_SECONDS),
        created_by: None,
    }
}
