//! Bus channel naming.
//!
//! Grammar: `channel := prefix room_id`, where `room_id` follows the
//! [`RoomId`] rules. Nothing is trimmed: a channel carrying anything other
//! than the exact prefix followed by a valid room id is rejected.

use crate::constants::DEFAULT_CHANNEL_PREFIX;
use crate::errors::ChannelParseError;
use crate::ids::RoomId;

/// Builds room channel names and resolves them back to rooms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomChannel {
    prefix: String,
}

impl RoomChannel {
    /// Create a codec for the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The channel prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Channel name for a room (`<prefix><room_id>`).
    pub fn channel_for(&self, room_id: &RoomId) -> String {
        format!("{}{}", self.prefix, room_id)
    }

    /// Pattern matching every room channel (`<prefix>*`).
    pub fn pattern(&self) -> String {
        format!("{}*", self.prefix)
    }

    /// Resolve a channel name to its room.
    pub fn parse(&self, channel: &str) -> Result<RoomId, ChannelParseError> {
        let rest = channel
            .strip_prefix(self.prefix.as_str())
            .ok_or_else(|| ChannelParseError::MissingPrefix {
                channel: channel.to_owned(),
                prefix: self.prefix.clone(),
            })?;
        Ok(RoomId::parse(rest)?)
    }
}

impl Default for RoomChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_PREFIX)
    }
}
