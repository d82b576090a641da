//! Admission and removal of connections.

use std::sync::Arc;

use quizcast_core::RoomId;
use tracing::debug;

use crate::errors::{CloseError, LifecycleError};
use crate::rooms::connection::{ClientConnection, Liveness};
use crate::rooms::registry::RoomRegistry;

/// The only path by which connections enter or leave the [`RoomRegistry`].
pub struct ConnectionManager {
    registry: Arc<RoomRegistry>,
}

impl ConnectionManager {
    /// Create a manager over `registry`.
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// The underlying registry (read access for fanout and health).
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Admit an open connection into `room_id`.
    pub fn connect(
        &self,
        room_id: &RoomId,
        connection: Arc<ClientConnection>,
    ) -> Result<(), LifecycleError> {
        if connection.room() != room_id {
            return Err(LifecycleError::RoomMismatch {
                expected: room_id.clone(),
                actual: connection.room().clone(),
            });
        }
        let state = connection.liveness();
        if state != Liveness::Connected {
            return Err(LifecycleError::NotOpen { state });
        }
        let conn_id = connection.id.clone();
        if self.registry.attach(room_id, connection) {
            debug!(room_id = %room_id, conn_id = %conn_id, "connection attached");
        }
        Ok(())
    }

    /// Detach and close `connection`. Safe to call any number of times.
    ///
    /// Returns whether the connection was still registered.
    pub fn disconnect(&self, room_id: &RoomId, connection: &ClientConnection) -> bool {
        let removed = self.registry.detach(room_id, &connection.id);
        match connection.close() {
            Ok(()) | Err(CloseError::AlreadyClosed) => {}
            Err(error) => {
                debug!(room_id = %room_id, conn_id = %connection.id, %error, "close failed");
            }
        }
        if removed {
            debug!(room_id = %room_id, conn_id = %connection.id, "connection detached");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use quizcast_core::ConnectionId;
    use tokio::sync::mpsc;

    fn room(id: &str) -> RoomId {
        RoomId::parse(id).unwrap()
    }

    fn setup() -> (ConnectionManager, Arc<ClientConnection>, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(4);
        let conn = Arc::new(ClientConnection::new(ConnectionId::new(), room("q1"), tx));
        (
            ConnectionManager::new(Arc::new(RoomRegistry::new())),
            conn,
            rx,
        )
    }

    #[test]
    fn connect_attaches() {
        let (mgr, conn, _rx) = setup();
        mgr.connect(&room("q1"), conn).unwrap();
        assert_eq!(mgr.registry().snapshot(&room("q1")).len(), 1);
    }

    #[test]
    fn connect_rejects_closed_connection() {
        let (mgr, conn, _rx) = setup();
        conn.close().unwrap();
        assert_matches!(
            mgr.connect(&room("q1"), conn),
            Err(LifecycleError::NotOpen {
                state: Liveness::Closed
            })
        );
        assert_eq!(mgr.registry().room_count(), 0);
    }

    #[test]
    fn connect_rejects_other_room() {
        let (mgr, conn, _rx) = setup();
        assert_matches!(
            mgr.connect(&room("q2"), conn),
            Err(LifecycleError::RoomMismatch { .. })
        );
    }

    #[test]
    fn disconnect_detaches_and_closes() {
        let (mgr, conn, _rx) = setup();
        mgr.connect(&room("q1"), conn.clone()).unwrap();
        assert!(mgr.disconnect(&room("q1"), &conn));
        assert_eq!(conn.liveness(), Liveness::Closed);
        assert!(!mgr.registry().contains_room(&room("q1")));
    }

    #[test]
    fn disconnect_twice_equals_once() {
        let (mgr, conn, _rx) = setup();
        let other = {
            let (tx, _rx) = mpsc::channel(1);
            Arc::new(ClientConnection::new(ConnectionId::new(), room("q1"), tx))
        };
        mgr.connect(&room("q1"), conn.clone()).unwrap();
        mgr.connect(&room("q1"), other).unwrap();

        assert!(mgr.disconnect(&room("q1"), &conn));
        assert!(!mgr.disconnect(&room("q1"), &conn));
        assert_eq!(mgr.registry().connection_count(), 1);
        assert_eq!(conn.liveness(), Liveness::Closed);
    }

    #[test]
    fn disconnect_with_dead_writer_is_quiet() {
        let (mgr, conn, rx) = setup();
        mgr.connect(&room("q1"), conn.clone()).unwrap();
        drop(rx);
        assert!(mgr.disconnect(&room("q1"), &conn));
        assert_eq!(mgr.registry().connection_count(), 0);
    }

    #[test]
    fn disconnect_unregistered_connection_closes_it() {
        let (mgr, conn, _rx) = setup();
        assert!(!mgr.disconnect(&room("q1"), &conn));
        assert_eq!(conn.liveness(), Liveness::Closed);
    }
}
