// ============================
// crates/backend-lib/src/room.rs
// ============================
//! Room registry: room id -> live actor handle plus occupancy count.
//!
//! Rooms are created lazily on first join and removed exactly when their
//! last occupant releases them. The occupancy count lives in the registry
//! entry and is only touched under the map's entry guard, so a release
//! that observes zero can never interleave with a concurrent
//! `get_or_create` for the same id. Nothing is persisted; removing a room
//! discards its files.

use crate::execute::ExecutionGateway;
use crate::room_actor::{spawn_room_actor, RoomHandle};
use dashmap::DashMap;
use metrics::{counter, gauge};
use std::sync::Arc;

pub type RoomId = String;

struct RoomSlot {
    handle: RoomHandle,
    occupants: usize,
}

/// Registry of all active rooms
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<DashMap<RoomId, RoomSlot>>,
    gateway: Arc<dyn ExecutionGateway>,
}

impl RoomRegistry {
    pub fn new(gateway: Arc<dyn ExecutionGateway>) -> Self {
        RoomRegistry {
            rooms: Arc::new(DashMap::new()),
            gateway,
        }
    }

    /// Return the room for `room_id` and count the caller as an occupant,
    /// spawning a fresh actor seeded with the default file on first use.
    /// Any non-empty id is accepted. Callers must pair this with exactly
    /// one `release`.
    pub fn get_or_create(&self, room_id: &str) -> RoomHandle {
        let mut slot = self.rooms.entry(room_id.to_string()).or_insert_with(|| {
            counter!(crate::metrics::ROOM_CREATED).increment(1);
            tracing::info!(room = %room_id, "room created");
            RoomSlot {
                handle: spawn_room_actor(room_id, self.gateway.clone()),
                occupants: 0,
            }
        });
        slot.occupants += 1;
        let handle = slot.handle.clone();
        drop(slot);
        gauge!(crate::metrics::ROOM_ACTIVE).set(self.rooms.len() as f64);
        handle
    }

    /// Look up a room without creating it. Data events for an unknown
    /// room resolve to `None` and are dropped by the caller.
    pub fn get(&self, room_id: &str) -> Option<RoomHandle> {
        self.rooms.get(room_id).map(|slot| slot.handle.clone())
    }

    /// Drop one occupancy; the room is removed when the last occupant
    /// releases it. The decrement and the removal run under the same
    /// entry guard as `get_or_create`, so a join that lands between an
    /// actor-level leave and this call keeps the room registered.
    pub fn release(&self, room_id: &str) {
        let removed = self.rooms.remove_if_mut(room_id, |_, slot| {
            slot.occupants = slot.occupants.saturating_sub(1);
            slot.occupants == 0
        });
        if removed.is_some() {
            counter!(crate::metrics::ROOM_EVICTED).increment(1);
            tracing::info!(room = %room_id, "room evicted");
        }
        gauge!(crate::metrics::ROOM_ACTIVE).set(self.rooms.len() as f64);
    }

    /// Number of active rooms, for the status query
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execute::DefaultGateway;
    use crate::room_actor::RoomCmd;
    use coderoom_common::User;
    use tokio::sync::mpsc;

    fn registry() -> RoomRegistry {
        RoomRegistry::new(Arc::new(DefaultGateway))
    }

    fn join_user(handle: &RoomHandle, id: &str) {
        let (tx, _rx) = mpsc::channel(8);
        handle.send(RoomCmd::Join {
            conn_id: id.to_string(),
            user: User {
                id: id.to_string(),
                username: format!("user-{id}"),
                color: "#000000".to_string(),
            },
            tx,
        });
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent_per_id() {
        let registry = registry();
        let first = registry.get_or_create("r1");
        let _second = registry.get_or_create("r1");
        assert_eq!(registry.len(), 1);

        // both handles drive the same actor
        join_user(&first, "a");
        let snapshot = registry.get("r1").unwrap().snapshot().await.unwrap();
        assert_eq!(snapshot.users.len(), 1);
    }

    #[tokio::test]
    async fn test_get_does_not_create() {
        let registry = registry();
        assert!(registry.get("nope").is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_released_room_comes_back_pristine() {
        let registry = registry();
        let handle = registry.get_or_create("r1");
        handle.send(RoomCmd::CodeChange {
            conn_id: "a".to_string(),
            file_id: "default".to_string(),
            code: "mutated".to_string(),
        });
        handle.snapshot().await.unwrap();

        registry.release("r1");
        assert_eq!(registry.len(), 0);

        let fresh = registry.get_or_create("r1").snapshot().await.unwrap();
        assert_eq!(fresh.files[0].code, crate::state::DEFAULT_FILE_CODE);
    }

    #[tokio::test]
    async fn test_release_unknown_room_is_noop() {
        let registry = registry();
        registry.release("nope");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_join_between_leave_and_release_keeps_room_live() {
        let registry = registry();

        // first occupant joins, then its user leaves the actor; the
        // registry release has not happened yet
        let first = registry.get_or_create("r1");
        join_user(&first, "a");
        let remaining = first.leave("a").await.unwrap();
        assert_eq!(remaining, 0);

        // a second connection joins in that gap, then the first
        // connection's cleanup finishes
        let second = registry.get_or_create("r1");
        join_user(&second, "b");
        registry.release("r1");

        // the occupied room stays registered and both handles still
        // address the same actor
        let handle = registry
            .get("r1")
            .expect("occupied room must stay registered");
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.users[0].id, "b");
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_release_of_last_occupant_removes_room() {
        let registry = registry();
        let handle = registry.get_or_create("r1");
        join_user(&handle, "a");
        handle.leave("a").await.unwrap();
        registry.release("r1");
        assert!(registry.is_empty());
        assert!(registry.get("r1").is_none());
    }
}
