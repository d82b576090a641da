//! Server configuration.

use std::time::Duration;

use quizcast_core::RoomChannel;
use quizcast_settings::{QuizcastSettings, RestartPolicySetting};

use crate::fanout::engine::FanoutConfig;
use crate::fanout::supervisor::RestartPolicy;

/// Runtime configuration for [`QuizcastServer`](crate::server::QuizcastServer).
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Outbound queue length per connection.
    pub send_queue_capacity: usize,
    /// Interval between server Ping frames.
    pub heartbeat_interval: Duration,
    /// Disconnect a client silent for longer than this.
    pub heartbeat_timeout: Duration,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Bus channel naming.
    pub channel: RoomChannel,
    /// Fanout engine knobs.
    pub fanout: FanoutConfig,
    /// Listener restart policy.
    pub restart_policy: RestartPolicy,
    /// How long shutdown waits for background tasks.
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Derive the runtime config from loaded settings.
    pub fn from_settings(settings: &QuizcastSettings) -> Self {
        let restart_policy = match settings.fanout.restart_policy {
            RestartPolicySetting::Never => RestartPolicy::Never,
            RestartPolicySetting::OnCrash => RestartPolicy::OnCrash {
                delay: Duration::from_millis(settings.fanout.restart_delay_ms),
            },
        };
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            send_queue_capacity: settings.server.send_queue_capacity,
            heartbeat_interval: Duration::from_millis(settings.server.heartbeat_interval_ms),
            heartbeat_timeout: Duration::from_millis(settings.server.heartbeat_timeout_ms),
            max_message_size: settings.server.max_message_size,
            channel: RoomChannel::new(settings.bus.channel_prefix.clone()),
            fanout: FanoutConfig {
                poll_interval: Duration::from_millis(settings.fanout.poll_interval_ms),
                recovery_delay: Duration::from_millis(settings.fanout.recovery_delay_ms),
                send_timeout: Duration::from_millis(settings.fanout.send_timeout_ms),
                verbose_delivery: settings.fanout.verbose_delivery,
            },
            restart_policy,
            shutdown_timeout: Duration::from_millis(settings.fanout.shutdown_timeout_ms),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            ..Self::from_settings(&QuizcastSettings::default())
        }
    }
}
