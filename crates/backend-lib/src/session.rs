// ============================
// crates/backend-lib/src/session.rs
// ============================
//! Session directory: which room and user identity each live connection
//! belongs to, with O(1) reverse lookup on disconnect.

use coderoom_common::User;
use dashmap::DashMap;
use metrics::gauge;
use std::sync::Arc;

/// What the directory records per connection
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub room_id: String,
    pub user: User,
}

/// Directory of all live connections. One entry per connection;
/// re-registering the same connection is not a supported operation
/// (one join per connection).
#[derive(Clone)]
pub struct SessionDirectory {
    entries: Arc<DashMap<String, SessionEntry>>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        SessionDirectory {
            entries: Arc::new(DashMap::new()),
        }
    }

    pub fn register(&self, conn_id: &str, room_id: String, user: User) {
        self.entries
            .insert(conn_id.to_string(), SessionEntry { room_id, user });
        gauge!(crate::metrics::SESSION_ACTIVE).set(self.entries.len() as f64);
    }

    /// Resolve a connection to its room and user identity
    pub fn resolve(&self, conn_id: &str) -> Option<SessionEntry> {
        self.entries.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Remove a connection's entry; idempotent
    pub fn unregister(&self, conn_id: &str) {
        self.entries.remove(conn_id);
        gauge!(crate::metrics::SESSION_ACTIVE).set(self.entries.len() as f64);
    }

    /// Number of live connections, for the status query
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SessionDirectory {
    fn default() -> Self {
        Self::new()
    }
}
