// ============================
// crates/backend-lib/src/roster.rs
// ============================
//! Connection roster for one room and the broadcast fan-out over it.
//!
//! Delivery is fire-and-forget: no acknowledgment, no retry. A target
//! whose channel is closed or full is silently skipped, which is the
//! at-most-once contract every relay in the system follows.

use coderoom_common::ServerMessage;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Outbound senders of the connections currently joined to a room
pub struct Roster {
    senders: HashMap<String, mpsc::Sender<ServerMessage>>,
}

impl Roster {
    pub fn new() -> Self {
        Roster {
            senders: HashMap::new(),
        }
    }

    pub fn insert(&mut self, conn_id: String, tx: mpsc::Sender<ServerMessage>) {
        self.senders.insert(conn_id, tx);
    }

    pub fn remove(&mut self, conn_id: &str) {
        self.senders.remove(conn_id);
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Deliver to one named connection only
    pub fn send_to(&self, target: &str, msg: ServerMessage) {
        if let Some(tx) = self.senders.get(target) {
            let _ = tx.try_send(msg);
        }
    }

    /// Deliver to every connection in the room
    pub fn broadcast(&self, msg: &ServerMessage) {
        for tx in self.senders.values() {
            let _ = tx.try_send(msg.clone());
        }
    }

    /// Deliver to every connection except the origin
    pub fn broadcast_except(&self, origin: &str, msg: &ServerMessage) {
        for (conn_id, tx) in &self.senders {
            if conn_id != origin {
                let _ = tx.try_send(msg.clone());
            }
        }
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}
