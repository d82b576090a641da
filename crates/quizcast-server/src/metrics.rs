//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render `/metrics`. Fails if a recorder is
/// already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

// Metric name constants.

/// Bus messages addressed to a room (counter).
pub const FANOUT_MESSAGES_TOTAL: &str = "fanout_messages_total";
/// Successful per-connection deliveries (counter).
pub const FANOUT_DELIVERIES_TOTAL: &str = "fanout_deliveries_total";
/// Failed per-connection sends (counter).
pub const FANOUT_SEND_FAILURES_TOTAL: &str = "fanout_send_failures_total";
/// Bus messages on unrecognised channels (counter).
pub const FANOUT_IGNORED_MESSAGES_TOTAL: &str = "fanout_ignored_messages_total";
/// Re-subscriptions after a bus connectivity failure (counter).
pub const FANOUT_RECOVERIES_TOTAL: &str = "fanout_recoveries_total";
/// Fanout engine restarts by the supervisor (counter).
pub const FANOUT_RESTARTS_TOTAL: &str = "fanout_restarts_total";
/// WebSocket connections opened (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// WebSocket disconnections (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// WebSocket connection duration seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Rooms with at least one connection (gauge).
pub const ROOMS_ACTIVE: &str = "rooms_active";
/// Events published through the HTTP surface (counter, labels: type).
pub const EVENTS_PUBLISHED_TOTAL: &str = "events_published_total";
