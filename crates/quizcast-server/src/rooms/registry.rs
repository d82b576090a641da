//! Room id → connection set mapping.

use std::collections::HashMap;
use std::collections::hash_map;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use metrics::gauge;
use quizcast_core::{ConnectionId, RoomId};

use crate::metrics::ROOMS_ACTIVE;
use crate::rooms::connection::ClientConnection;

type ConnectionSet = HashMap<ConnectionId, Arc<ClientConnection>>;

/// Concurrent registry of rooms and their connections.
///
/// Backed by a sharded map, so mutations on different rooms rarely contend.
/// A room exists only while it has at least one connection.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, ConnectionSet>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `connection` to `room_id`, creating the room if needed.
    ///
    /// Returns `false` if a connection with the same id was already there.
    pub fn attach(&self, room_id: &RoomId, connection: Arc<ClientConnection>) -> bool {
        match self.rooms.entry(room_id.clone()) {
            Entry::Occupied(mut room) => match room.get_mut().entry(connection.id.clone()) {
                hash_map::Entry::Occupied(_) => false,
                hash_map::Entry::Vacant(slot) => {
                    let _ = slot.insert(connection);
                    true
                }
            },
            Entry::Vacant(slot) => {
                let mut set = ConnectionSet::new();
                let _ = set.insert(connection.id.clone(), connection);
                let _ = slot.insert(set);
                gauge!(ROOMS_ACTIVE).increment(1.0);
                true
            }
        }
    }

    /// Remove `connection_id` from `room_id`, dropping the room once empty.
    ///
    /// Returns whether a connection was removed.
    pub fn detach(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool {
        let removed = match self.rooms.get_mut(room_id) {
            Some(mut room) => room.remove(connection_id).is_some(),
            None => return false,
        };
        // Re-checked under the shard lock so a concurrent attach keeps the room.
        if self
            .rooms
            .remove_if(room_id, |_, set| set.is_empty())
            .is_some()
        {
            gauge!(ROOMS_ACTIVE).decrement(1.0);
        }
        removed
    }

    /// Copy of the room's current connections. Never creates a room.
    pub fn snapshot(&self, room_id: &RoomId) -> Vec<Arc<ClientConnection>> {
        self.rooms
            .get(room_id)
            .map(|room| room.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `room_id` currently has connections.
    pub fn contains_room(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Number of non-empty rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Total connections across all rooms.
    pub fn connection_count(&self) -> usize {
        self.rooms.iter().map(|room| room.len()).sum()
    }

    /// Ids of all non-empty rooms, sorted.
    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.rooms.iter().map(|room| room.key().clone()).collect();
        ids.sort();
        ids
    }
}
