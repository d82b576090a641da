//! # quizcast-core
//!
//! Foundation types shared by every quizcast crate:
//!
//! - **IDs**: [`RoomId`] (validated room grammar) and [`ConnectionId`]
//! - **Channel naming**: [`RoomChannel`] builds and parses `quiz_channel:<room>`
//! - **Events**: [`QuizEvent`] payloads published by the request layer
//! - **Quiz schema**: [`Quiz`] / [`Question`] with validation
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` subscriber

#![deny(unsafe_code)]

pub mod channel;
pub mod constants;
pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;
pub mod quiz;

pub use channel::RoomChannel;
pub use errors::{ChannelParseError, QuizValidationError, RoomIdError};
pub use events::{EventKind, QuizEvent};
pub use ids::{ConnectionId, RoomId};
pub use quiz::{Question, Quiz};
