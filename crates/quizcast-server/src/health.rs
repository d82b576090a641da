//! `/health` endpoint.

use std::time::Instant;

use quizcast_core::RoomId;
use serde::Serialize;

use crate::fanout::engine::FanoutState;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `"ok"` while the fanout listener is running, `"degraded"` otherwise.
    pub status: &'static str,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Number of non-empty rooms.
    pub rooms: usize,
    /// Ids of the non-empty rooms, sorted.
    pub room_ids: Vec<RoomId>,
    /// Connections across all rooms.
    pub connections: usize,
    /// Fanout engine state.
    pub listener: FanoutState,
    /// Whether the fanout task is alive.
    pub listener_running: bool,
}

/// Build a health response from live counters.
pub fn health_check(
    start_time: Instant,
    room_ids: Vec<RoomId>,
    connections: usize,
    listener: FanoutState,
    listener_running: bool,
) -> HealthResponse {
    HealthResponse {
        status: if listener_running { "ok" } else { "degraded" },
        uptime_secs: start_time.elapsed().as_secs(),
        rooms: room_ids.len(),
        room_ids,
        connections,
        listener,
        listener_running,
    }
}
