//! Error types for ids, channel names, and quiz content.

use thiserror::Error;

/// A string could not be used as a room id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomIdError {
    /// The id was empty.
    #[error("room id is empty")]
    Empty,
    /// The id exceeded the maximum length.
    #[error("room id is {len} characters, maximum is {max}")]
    TooLong {
        /// Actual length.
        len: usize,
        /// Allowed maximum.
        max: usize,
    },
    /// The id contained a character outside `[A-Za-z0-9_.-]`.
    #[error("room id contains invalid character {ch:?} at index {index}")]
    InvalidChar {
        /// The offending character.
        ch: char,
        /// Character index of the offender.
        index: usize,
    },
}

/// A bus channel name did not resolve to a room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelParseError {
    /// The channel does not start with the configured prefix.
    #[error("channel {channel:?} does not start with prefix {prefix:?}")]
    MissingPrefix {
        /// The channel received.
        channel: String,
        /// The expected prefix.
        prefix: String,
    },
    /// The remainder after the prefix is not a valid room id.
    #[error("invalid room id in channel: {0}")]
    InvalidRoom(#[from] RoomIdError),
}

/// Quiz content failed schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizValidationError {
    /// A question did not have exactly four options.
    #[error("question {question_id} has {count} options, expected 4")]
    OptionCount {
        /// Question id.
        question_id: String,
        /// Number of options found.
        count: usize,
    },
    /// The correct answer index is outside `0..=3`.
    #[error("question {question_id} has correct_answer_index {index}, expected 0..=3")]
    AnswerIndex {
        /// Question id.
        question_id: String,
        /// Index found.
        index: i64,
    },
    /// The quiz id is not usable as a room id.
    #[error("quiz id is not a valid room id: {0}")]
    QuizId(#[from] RoomIdError),
}
