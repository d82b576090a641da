//! Fanout engine and listener supervisor settings.

use serde::{Deserialize, Serialize};

/// What the listener supervisor does when the fanout task crashes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RestartPolicySetting {
    /// Log the crash and leave the listener stopped until `ensure_started`.
    #[default]
    Never,
    /// Restart after `restartDelayMs`.
    OnCrash,
}

/// Fanout settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FanoutSettings {
    /// Upper bound on one bus receive wait, in milliseconds.
    pub poll_interval_ms: u64,
    /// Fixed delay before re-subscribing after a bus connectivity error.
    pub recovery_delay_ms: u64,
    /// Upper bound on one per-connection send under backpressure.
    pub send_timeout_ms: u64,
    /// Log every fanout pass at info instead of debug.
    pub verbose_delivery: bool,
    /// Crash handling policy.
    pub restart_policy: RestartPolicySetting,
    /// Delay before a crash restart, in milliseconds.
    pub restart_delay_ms: u64,
    /// How long shutdown waits for the listener task.
    pub shutdown_timeout_ms: u64,
}

impl Default for FanoutSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            recovery_delay_ms: 1000,
            send_timeout_ms: 5000,
            verbose_delivery: false,
            restart_policy: RestartPolicySetting::Never,
            restart_delay_ms: 5000,
            shutdown_timeout_ms: 10_000,
        }
    }
}
