//! Client connection handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use quizcast_core::{ConnectionId, RoomId};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio_util::sync::CancellationToken;

use crate::errors::{CloseError, SendError};

/// Liveness of a [`ClientConnection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Liveness {
    /// Accepting sends.
    Connected,
    /// Close requested; the writer is flushing a close frame.
    Closing,
    /// Fully closed.
    Closed,
}

impl Liveness {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Connected,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Connected => 0,
            Self::Closing => 1,
            Self::Closed => 2,
        }
    }
}

/// A live client socket, scoped to one room for its whole lifetime.
///
/// Outbound text goes through a bounded queue drained by the session's
/// writer task. Closing cancels [`close_token`](Self::close_token), which
/// tells the writer to send a close frame and exit.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: ConnectionId,
    room: RoomId,
    tx: mpsc::Sender<Arc<str>>,
    state: AtomicU8,
    close: CancellationToken,
    /// When this connection was established.
    pub connected_at: Instant,
    is_alive: AtomicBool,
    last_pong: Mutex<Instant>,
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a connection for `room` writing into `tx`.
    pub fn new(id: ConnectionId, room: RoomId, tx: mpsc::Sender<Arc<str>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            room,
            tx,
            state: AtomicU8::new(Liveness::Connected.as_u8()),
            close: CancellationToken::new(),
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Room this connection belongs to.
    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// Current liveness.
    pub fn liveness(&self) -> Liveness {
        Liveness::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Queue `payload` for the client, waiting at most `timeout` for room in
    /// the outbound queue.
    pub async fn send(&self, payload: Arc<str>, timeout: Duration) -> Result<(), SendError> {
        if self.liveness() != Liveness::Connected {
            return Err(SendError::Closed);
        }
        match self.tx.send_timeout(payload, timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => {
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                Err(SendError::Timeout)
            }
            Err(SendTimeoutError::Closed(_)) => {
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                Err(SendError::Closed)
            }
        }
    }

    /// Request close.
    ///
    /// The first call moves the connection out of `Connected` and signals
    /// the writer. Later calls return [`CloseError::AlreadyClosed`].
    pub fn close(&self) -> Result<(), CloseError> {
        if self
            .state
            .compare_exchange(
                Liveness::Connected.as_u8(),
                Liveness::Closing.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(CloseError::AlreadyClosed);
        }
        let writer_gone = self.tx.is_closed();
        self.close.cancel();
        self.state.store(Liveness::Closed.as_u8(), Ordering::Release);
        if writer_gone {
            Err(CloseError::TransportGone)
        } else {
            Ok(())
        }
    }

    /// Token cancelled once close is requested.
    pub fn close_token(&self) -> CancellationToken {
        self.close.clone()
    }

    /// Total messages this connection failed to accept.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Mark the connection as alive (pong or any inbound frame).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Duration since the last pong (or connection establishment).
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Check and reset the alive flag for heartbeat.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("room", &self.room)
            .field("liveness", &self.liveness())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const WAIT: Duration = Duration::from_millis(50);

    fn make_connection(capacity: usize) -> (ClientConnection, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity);
        let room = RoomId::parse("q1").unwrap();
        (ClientConnection::new(ConnectionId::from("conn_1"), room, tx), rx)
    }

    #[test]
    fn new_connection_is_connected() {
        let (conn, _rx) = make_connection(4);
        assert_eq!(conn.liveness(), Liveness::Connected);
        assert_eq!(conn.room().as_str(), "q1");
    }

    #[tokio::test]
    async fn send_delivers_payload() {
        let (conn, mut rx) = make_connection(4);
        conn.send(Arc::from("hello"), WAIT).await.unwrap();
        assert_eq!(&*rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn send_to_dropped_receiver_is_closed() {
        let (conn, rx) = make_connection(4);
        drop(rx);
        assert_matches!(conn.send(Arc::from("x"), WAIT).await, Err(SendError::Closed));
        assert_eq!(conn.drop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn send_to_full_queue_times_out() {
        let (conn, _rx) = make_connection(1);
        conn.send(Arc::from("first"), WAIT).await.unwrap();
        assert_matches!(
            conn.send(Arc::from("second"), WAIT).await,
            Err(SendError::Timeout)
        );
    }

    #[tokio::test]
    async fn send_after_close_is_rejected() {
        let (conn, _rx) = make_connection(4);
        conn.close().unwrap();
        assert_matches!(conn.send(Arc::from("x"), WAIT).await, Err(SendError::Closed));
    }

    #[test]
    fn close_twice_reports_already_closed() {
        let (conn, _rx) = make_connection(4);
        assert!(conn.close().is_ok());
        assert_eq!(conn.liveness(), Liveness::Closed);
        assert_eq!(conn.close(), Err(CloseError::AlreadyClosed));
    }

    #[test]
    fn close_cancels_token() {
        let (conn, _rx) = make_connection(4);
        let token = conn.close_token();
        assert!(!token.is_cancelled());
        conn.close().unwrap();
        assert!(token.is_cancelled());
    }

    #[test]
    fn close_with_writer_gone() {
        let (conn, rx) = make_connection(4);
        drop(rx);
        assert_eq!(conn.close(), Err(CloseError::TransportGone));
        assert_eq!(conn.liveness(), Liveness::Closed);
        assert_eq!(conn.close(), Err(CloseError::AlreadyClosed));
    }

    #[test]
    fn mark_alive_and_check() {
        let (conn, _rx) = make_connection(4);
        assert!(conn.check_alive());
        assert!(!conn.check_alive());
        conn.mark_alive();
        assert!(conn.check_alive());
    }
}
