//! Server, bus, and logging settings.

use serde::{Deserialize, Serialize};

/// HTTP / WebSocket server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` for auto-assign).
    pub port: u16,
    /// Per-connection outbound queue capacity.
    pub send_queue_capacity: usize,
    /// Interval between server Ping frames in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Disconnect a client silent for longer than this, in milliseconds.
    pub heartbeat_timeout_ms: u64,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            send_queue_capacity: 256,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 90_000,
            max_message_size: 64 * 1024,
        }
    }
}

/// Which pub/sub implementation backs the bus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusBackend {
    /// In-process bus (single node, no external service).
    #[default]
    Memory,
    /// Redis pub/sub (requires the `redis` feature).
    Redis,
}

/// Event bus settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusSettings {
    /// Backend selection.
    pub backend: BusBackend,
    /// Bus endpoint URL (used by the Redis backend).
    pub url: String,
    /// Prefix preceding the room id in channel names.
    pub channel_prefix: String,
    /// Per-subscriber buffer of the in-process bus.
    pub capacity: usize,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            backend: BusBackend::Memory,
            url: "redis://localhost:6379".to_string(),
            channel_prefix: quizcast_core::constants::DEFAULT_CHANNEL_PREFIX.to_string(),
            capacity: 1024,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
