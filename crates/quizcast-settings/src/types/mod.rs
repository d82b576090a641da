//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file may be partial: missing fields get their default during
//! deserialization.

mod content;
mod fanout;
mod server;

pub use content::*;
pub use fanout::*;
pub use server::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9000 },
///   "bus": { "backend": "redis", "url": "redis://cache:6379" },
///   "fanout": { "restartPolicy": "onCrash" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizcastSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// HTTP / WebSocket server settings.
    pub server: ServerSettings,
    /// Event bus settings.
    pub bus: BusSettings,
    /// Fanout engine and listener supervisor settings.
    pub fanout: FanoutSettings,
    /// Quiz content producer settings.
    pub content: ContentSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for QuizcastSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: quizcast_core::constants::NAME.to_string(),
            server: ServerSettings::default(),
            bus: BusSettings::default(),
            fanout: FanoutSettings::default(),
            content: ContentSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl QuizcastSettings {
    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.bus.channel_prefix.is_empty() {
            return Err(SettingsError::InvalidValue("bus.channelPrefix is empty".into()));
        }
        if self.bus.channel_prefix.contains('*') {
            return Err(SettingsError::InvalidValue(
                "bus.channelPrefix must not contain '*'".into(),
            ));
        }
        if self.fanout.poll_interval_ms == 0 {
            return Err(SettingsError::InvalidValue("fanout.pollIntervalMs must be > 0".into()));
        }
        if self.fanout.send_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue("fanout.sendTimeoutMs must be > 0".into()));
        }
        if self.server.send_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "server.sendQueueCapacity must be > 0".into(),
            ));
        }
        if self.bus.capacity == 0 {
            return Err(SettingsError::InvalidValue("bus.capacity must be > 0".into()));
        }
        Ok(())
    }
}
