//! Package-level constants.

/// Current version of quizcast (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "quizcast";

/// Default bus channel prefix. A room's channel is this prefix followed
/// directly by the room id.
pub const DEFAULT_CHANNEL_PREFIX: &str = "quiz_channel:";

/// Maximum length of a room id in characters.
pub const MAX_ROOM_ID_LEN: usize = 128;
