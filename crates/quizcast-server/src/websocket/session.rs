//! WebSocket session lifecycle: one connected client from upgrade through
//! disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use quizcast_core::{ConnectionId, RoomId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::ServerConfig;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};
use crate::rooms::connection::ClientConnection;
use crate::rooms::lifecycle::ConnectionManager;

/// How long the writer gets to flush a close frame after disconnect.
const WRITER_DRAIN: Duration = Duration::from_secs(1);

/// Per-session limits.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Outbound queue length.
    pub send_queue_capacity: usize,
    /// Interval between Ping frames.
    pub heartbeat_interval: Duration,
    /// Disconnect after this long without any inbound frame.
    pub heartbeat_timeout: Duration,
    /// Bound on queueing an echo reply.
    pub send_timeout: Duration,
}

impl From<&ServerConfig> for SessionConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            send_queue_capacity: config.send_queue_capacity.max(1),
            heartbeat_interval: config.heartbeat_interval.max(Duration::from_millis(1)),
            heartbeat_timeout: config.heartbeat_timeout,
            send_timeout: config.fanout.send_timeout,
        }
    }
}

/// Text sent back for an inbound text frame.
pub fn echo_reply(text: &str) -> String {
    format!("server echo: {text}")
}

/// Run a WebSocket session for a client joining `room_id`.
///
/// 1. Builds the [`ClientConnection`] and admits it via `connect`
/// 2. Spawns the writer: drains the outbound queue, sends Pings, closes on
///    request or heartbeat timeout
/// 3. Echoes inbound text frames to this client only
/// 4. Calls `disconnect` when the client leaves, the writer dies, or the
///    server shuts down
#[instrument(skip_all, fields(room_id = %room_id, conn_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    room_id: RoomId,
    manager: Arc<ConnectionManager>,
    config: SessionConfig,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<Arc<str>>(config.send_queue_capacity);
    let connection = Arc::new(ClientConnection::new(
        ConnectionId::new(),
        room_id.clone(),
        send_tx,
    ));
    let _ = tracing::Span::current().record("conn_id", connection.id.as_str());

    if let Err(error) = manager.connect(&room_id, connection.clone()) {
        warn!(%error, "connection rejected");
        let _ = ws_tx.send(Message::Close(None)).await;
        return;
    }

    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    // Cancelled when the writer exits for any reason.
    let writer_done = CancellationToken::new();
    let close = connection.close_token();
    let mut writer = tokio::spawn({
        let connection = connection.clone();
        let writer_done = writer_done.clone();
        let config = config.clone();
        async move {
            let _guard = writer_done.drop_guard();
            let mut ping_interval = tokio::time::interval(config.heartbeat_interval);
            // Skip the immediate first tick
            let _ = ping_interval.tick().await;

            loop {
                tokio::select! {
                    biased;
                    () = close.cancelled() => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                    msg = send_rx.recv() => {
                        let Some(text) = msg else { break };
                        if ws_tx.send(Message::Text(String::from(&*text).into())).await.is_err() {
                            break;
                        }
                    }
                    _ = ping_interval.tick() => {
                        if !connection.check_alive()
                            && connection.last_pong_elapsed() > config.heartbeat_timeout
                        {
                            warn!(timeout = ?config.heartbeat_timeout, "client unresponsive, disconnecting");
                            break;
                        }
                        if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });

    let close = connection.close_token();
    loop {
        let frame = tokio::select! {
            () = close.cancelled() => break,
            () = writer_done.cancelled() => break,
            () = shutdown.cancelled() => {
                debug!("server shutting down, closing session");
                break;
            }
            frame = ws_rx.next() => frame,
        };
        let msg = match frame {
            Some(Ok(msg)) => msg,
            Some(Err(error)) => {
                debug!(%error, "websocket read error");
                break;
            }
            None => break,
        };
        connection.mark_alive();
        match msg {
            Message::Text(text) => {
                let reply: Arc<str> = Arc::from(echo_reply(text.as_str()));
                if let Err(error) = connection.send(reply, config.send_timeout).await {
                    debug!(%error, "failed to queue echo");
                    break;
                }
            }
            Message::Binary(data) => {
                debug!(len = data.len(), "ignoring binary frame");
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
        }
    }

    let _ = manager.disconnect(&room_id, &connection);
    if tokio::time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
        writer.abort();
    }

    info!(dropped = connection.drop_count(), "client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS)
        .record(connection.connected_at.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    // Socket-level behavior is covered by tests/integration.rs.
    use super::*;

    #[test]
    fn echo_format() {
        assert_eq!(echo_reply("hi"), "server echo: hi");
        assert_eq!(echo_reply(""), "server echo: ");
    }

    #[test]
    fn session_config_from_server_config() {
        let server = ServerConfig {
            send_queue_capacity: 0,
            ..ServerConfig::default()
        };
        let cfg = SessionConfig::from(&server);
        assert_eq!(cfg.send_queue_capacity, 1);
        assert_eq!(cfg.heartbeat_interval, server.heartbeat_interval);
        assert_eq!(cfg.send_timeout, server.fanout.send_timeout);
    }
}
