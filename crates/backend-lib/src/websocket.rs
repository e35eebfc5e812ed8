// ============================
// crates/backend-lib/src/websocket.rs
// ============================
//! Per-connection message handling.
//!
//! One `ConnectionHandler` is instantiated per WebSocket connection. It
//! owns the connection's identity, routes inbound events to the room
//! actor named by the payload, and drives cleanup on disconnect.
//!
//! Data events trust the payload's `roomId` and the connection's own id
//! without a membership check, reproducing the reference behavior; the
//! session directory is consulted only for disconnect cleanup. Cursor
//! updates additionally require the user to exist in the room.

use crate::error::AppError;
use crate::room_actor::{RoomCmd, RoomHandle};
use crate::AppState;
use coderoom_common::{ClientMessage, ServerMessage, User};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Handler for a single client connection
pub struct ConnectionHandler {
    state: Arc<AppState>,
    conn_id: String,
    tx: mpsc::Sender<ServerMessage>,
    /// Set by the first (and only) join
    room: Option<(String, RoomHandle)>,
}

impl ConnectionHandler {
    pub fn new(state: Arc<AppState>, tx: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            state,
            conn_id: Uuid::new_v4().to_string(),
            tx,
            room: None,
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.conn_id
    }

    /// Route one inbound event. Unknown room ids and malformed
    /// references are silent no-ops, never connection-fatal.
    pub async fn handle_message(&mut self, msg: ClientMessage) -> Result<(), AppError> {
        match msg {
            ClientMessage::JoinRoom {
                room_id,
                username,
                color,
            } => self.handle_join(room_id, username, color),
            ClientMessage::CodeChange {
                room_id,
                file_id,
                code,
            } => self.forward(
                &room_id,
                RoomCmd::CodeChange {
                    conn_id: self.conn_id.clone(),
                    file_id,
                    code,
                },
            ),
            ClientMessage::FileCreate { room_id, file } => self.forward(
                &room_id,
                RoomCmd::FileCreate {
                    conn_id: self.conn_id.clone(),
                    file,
                },
            ),
            ClientMessage::FileDelete { room_id, file_id } => self.forward(
                &room_id,
                RoomCmd::FileDelete {
                    conn_id: self.conn_id.clone(),
                    file_id,
                },
            ),
            ClientMessage::FileRename {
                room_id,
                file_id,
                new_name,
            } => self.forward(
                &room_id,
                RoomCmd::FileRename {
                    conn_id: self.conn_id.clone(),
                    file_id,
                    new_name,
                },
            ),
            ClientMessage::FileSelect { room_id, file_id } => self.forward(
                &room_id,
                RoomCmd::FileSelect {
                    conn_id: self.conn_id.clone(),
                    file_id,
                },
            ),
            ClientMessage::LanguageChange {
                room_id,
                file_id,
                language,
            } => self.forward(
                &room_id,
                RoomCmd::LanguageChange {
                    conn_id: self.conn_id.clone(),
                    file_id,
                    language,
                },
            ),
            ClientMessage::CursorPosition {
                room_id,
                file_id,
                position,
                selection,
            } => self.forward(
                &room_id,
                RoomCmd::CursorUpdate {
                    conn_id: self.conn_id.clone(),
                    file_id,
                    position,
                    selection,
                },
            ),
            ClientMessage::ExecuteCode {
                room_id,
                code,
                language,
            } => self.forward(&room_id, RoomCmd::Execute { code, language }),
            ClientMessage::Chat { room_id, message } => self.forward(
                &room_id,
                RoomCmd::Chat {
                    conn_id: self.conn_id.clone(),
                    message,
                },
            ),
            ClientMessage::Signal {
                room_id,
                to,
                signal,
            } => self.forward(
                &room_id,
                RoomCmd::Signal {
                    conn_id: self.conn_id.clone(),
                    to,
                    signal,
                },
            ),
        }
    }

    fn handle_join(
        &mut self,
        room_id: String,
        username: String,
        color: String,
    ) -> Result<(), AppError> {
        if self.room.is_some() {
            // one join per connection
            tracing::warn!(conn = %self.conn_id, "duplicate join ignored");
            return Ok(());
        }

        let username = if username.is_empty() {
            format!("User-{}", &self.conn_id[..4])
        } else {
            username
        };
        let color = if color.is_empty() {
            random_color()
        } else {
            color
        };
        let user = User {
            id: self.conn_id.clone(),
            username,
            color,
        };

        let handle = self.state.rooms.get_or_create(&room_id);
        self.state
            .sessions
            .register(&self.conn_id, room_id.clone(), user.clone());
        handle.send(RoomCmd::Join {
            conn_id: self.conn_id.clone(),
            user,
            tx: self.tx.clone(),
        });
        self.room = Some((room_id, handle));
        Ok(())
    }

    /// Send a command to the room the payload names; unknown rooms are
    /// "nothing to do" (join is the only creation path)
    fn forward(&self, room_id: &str, cmd: RoomCmd) -> Result<(), AppError> {
        if let Some(handle) = self.state.rooms.get(room_id) {
            handle.send(cmd);
        }
        Ok(())
    }

    /// Disconnect cleanup, driven by the session directory's reverse
    /// lookup: remove the user and cursor, notify the room, release the
    /// registry occupancy (which removes the room at zero), then drop
    /// the directory entry.
    pub async fn disconnect(&mut self) {
        let Some(entry) = self.state.sessions.resolve(&self.conn_id) else {
            return;
        };
        if let Some(handle) = self.state.rooms.get(&entry.room_id) {
            match handle.leave(&self.conn_id).await {
                Ok(remaining) => {
                    tracing::debug!(room = %entry.room_id, remaining, "left room");
                },
                Err(e) => tracing::warn!(conn = %self.conn_id, error = %e, "leave failed"),
            }
        }
        self.state.rooms.release(&entry.room_id);
        self.state.sessions.unregister(&self.conn_id);
        self.room = None;
        tracing::info!(conn = %self.conn_id, user = %entry.user.username, "client disconnected");
    }
}

fn random_color() -> String {
    let mut rng = rand::rng();
    format!("#{:06x}", rng.random_range(0..0x100_0000u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use coderoom_common::File;

    fn connect(state: &Arc<AppState>) -> (ConnectionHandler, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(64);
        (ConnectionHandler::new(state.clone(), tx), rx)
    }

    fn join(room_id: &str, username: &str) -> ClientMessage {
        ClientMessage::JoinRoom {
            room_id: room_id.to_string(),
            username: username.to_string(),
            color: "#112233".to_string(),
        }
    }

    async fn barrier(state: &Arc<AppState>, room_id: &str) -> coderoom_common::RoomSnapshot {
        state
            .rooms
            .get(room_id)
            .expect("room exists")
            .snapshot()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_join_registers_session_and_delivers_snapshot() {
        let state = Arc::new(AppState::new_default());
        let (mut handler, mut rx) = connect(&state);

        handler.handle_message(join("r1", "ada")).await.unwrap();
        barrier(&state, "r1").await;

        let entry = state.sessions.resolve(handler.connection_id()).unwrap();
        assert_eq!(entry.room_id, "r1");
        assert_eq!(entry.user.username, "ada");

        let msg = rx.try_recv().unwrap();
        let ServerMessage::RoomState(snapshot) = msg else {
            panic!("expected RoomState")
        };
        assert_eq!(snapshot.files[0].name, "main.js");
        assert_eq!(state.rooms.len(), 1);
        assert_eq!(state.sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_join_defaults_empty_username_and_color() {
        let state = Arc::new(AppState::new_default());
        let (mut handler, _rx) = connect(&state);

        handler
            .handle_message(ClientMessage::JoinRoom {
                room_id: "r1".to_string(),
                username: String::new(),
                color: String::new(),
            })
            .await
            .unwrap();

        let entry = state.sessions.resolve(handler.connection_id()).unwrap();
        let expected_prefix = format!("User-{}", &handler.connection_id()[..4]);
        assert_eq!(entry.user.username, expected_prefix);
        assert!(entry.user.color.starts_with('#'));
        assert_eq!(entry.user.color.len(), 7);
    }

    #[tokio::test]
    async fn test_second_join_on_same_connection_is_ignored() {
        let state = Arc::new(AppState::new_default());
        let (mut handler, _rx) = connect(&state);

        handler.handle_message(join("r1", "ada")).await.unwrap();
        handler.handle_message(join("r2", "ada")).await.unwrap();

        assert_eq!(state.rooms.len(), 1);
        assert!(state.rooms.get("r2").is_none());
        let entry = state.sessions.resolve(handler.connection_id()).unwrap();
        assert_eq!(entry.room_id, "r1");
    }

    #[tokio::test]
    async fn test_data_event_for_unknown_room_does_not_create_it() {
        let state = Arc::new(AppState::new_default());
        let (mut handler, _rx) = connect(&state);

        handler
            .handle_message(ClientMessage::CodeChange {
                room_id: "nope".to_string(),
                file_id: "default".to_string(),
                code: "x=1".to_string(),
            })
            .await
            .unwrap();

        assert!(state.rooms.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_removes_user_and_notifies_once() {
        let state = Arc::new(AppState::new_default());
        let (mut h1, mut rx1) = connect(&state);
        let (mut h2, _rx2) = connect(&state);

        h1.handle_message(join("r1", "ada")).await.unwrap();
        h2.handle_message(join("r1", "bob")).await.unwrap();
        barrier(&state, "r1").await;
        while rx1.try_recv().is_ok() {}

        let bob_id = h2.connection_id().to_string();
        h2.disconnect().await;
        let snapshot = barrier(&state, "r1").await;

        assert_eq!(snapshot.users.len(), 1);
        assert!(state.sessions.resolve(&bob_id).is_none());
        assert_eq!(state.sessions.len(), 1);

        let mut left_notices = 0;
        while let Ok(msg) = rx1.try_recv() {
            if let ServerMessage::UserLeft { user_id, username } = msg {
                assert_eq!(user_id, bob_id);
                assert_eq!(username, "bob");
                left_notices += 1;
            }
        }
        assert_eq!(left_notices, 1);
    }

    #[tokio::test]
    async fn test_last_leave_evicts_room_and_rejoin_is_pristine() {
        let state = Arc::new(AppState::new_default());
        let (mut h1, _rx1) = connect(&state);

        h1.handle_message(join("r1", "ada")).await.unwrap();
        h1.handle_message(ClientMessage::FileDelete {
            room_id: "r1".to_string(),
            file_id: "default".to_string(),
        })
        .await
        .unwrap();
        h1.handle_message(ClientMessage::FileCreate {
            room_id: "r1".to_string(),
            file: File {
                id: "scratch".to_string(),
                name: "scratch.py".to_string(),
                code: "pass".to_string(),
                language: "python".to_string(),
            },
        })
        .await
        .unwrap();
        let mutated = barrier(&state, "r1").await;
        assert_eq!(mutated.files.len(), 1);
        assert_eq!(mutated.files[0].id, "scratch");

        h1.disconnect().await;
        assert!(state.rooms.is_empty());
        assert!(state.sessions.is_empty());

        // file contents were not preserved across eviction
        let (mut h2, _rx2) = connect(&state);
        h2.handle_message(join("r1", "bob")).await.unwrap();
        let fresh = barrier(&state, "r1").await;
        assert_eq!(fresh.files.len(), 1);
        assert_eq!(fresh.files[0].id, "default");
        assert_eq!(fresh.files[0].code, crate::state::DEFAULT_FILE_CODE);
    }

    #[tokio::test]
    async fn test_disconnect_without_join_is_a_noop() {
        let state = Arc::new(AppState::new_default());
        let (mut handler, _rx) = connect(&state);
        handler.disconnect().await;
        assert!(state.rooms.is_empty());
        assert!(state.sessions.is_empty());
    }
}
