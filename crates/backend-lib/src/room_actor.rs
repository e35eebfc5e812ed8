// ============================
// crates/backend-lib/src/room_actor.rs
// ============================
//! Per-room actor: one mailbox per room serializes every mutation and
//! its broadcast, so two events touching the same room never interleave
//! their read-modify-write. Different rooms run on independent tasks.
//!
//! Execution requests are the one asynchronous step: the actor hands
//! them to the gateway on a separate task and the completed result
//! re-enters the mailbox as an ordinary event, broadcast to the entire
//! room including the requester.

use crate::error::AppError;
use crate::execute::ExecutionGateway;
use crate::roster::Roster;
use crate::state::RoomState;
use coderoom_common::{
    ChatMessage, CursorEntry, ExecutionResult, File, Position, RoomSnapshot, Selection,
    ServerMessage, User,
};
use metrics::counter;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Message sent *into* the actor
#[derive(Debug)]
pub enum RoomCmd {
    Join {
        conn_id: String,
        user: User,
        tx: mpsc::Sender<ServerMessage>,
    },
    Leave {
        conn_id: String,
        resp_tx: mpsc::UnboundedSender<usize>,
    },
    CodeChange {
        conn_id: String,
        file_id: String,
        code: String,
    },
    FileCreate {
        conn_id: String,
        file: File,
    },
    FileDelete {
        conn_id: String,
        file_id: String,
    },
    FileRename {
        conn_id: String,
        file_id: String,
        new_name: String,
    },
    FileSelect {
        conn_id: String,
        file_id: String,
    },
    LanguageChange {
        conn_id: String,
        file_id: String,
        language: String,
    },
    CursorUpdate {
        conn_id: String,
        file_id: String,
        position: Position,
        selection: Option<Selection>,
    },
    Execute {
        code: String,
        language: String,
    },
    /// Gateway completion re-entering the event stream
    ExecutionFinished {
        result: ExecutionResult,
    },
    Chat {
        conn_id: String,
        message: ChatMessage,
    },
    Signal {
        conn_id: String,
        to: String,
        signal: serde_json::Value,
    },
    Snapshot {
        resp_tx: mpsc::UnboundedSender<RoomSnapshot>,
    },
}

/// Handle that other components keep: the room's command channel
#[derive(Clone)]
pub struct RoomHandle {
    cmd_tx: mpsc::UnboundedSender<RoomCmd>,
}

impl RoomHandle {
    /// Fire-and-forget command send; a closed mailbox means the room is
    /// gone and the event is dropped, per the at-most-once contract.
    pub fn send(&self, cmd: RoomCmd) {
        let _ = self.cmd_tx.send(cmd);
    }

    /// Remove a connection from the room. Returns the remaining user
    /// count so the caller can drive eviction.
    pub async fn leave(&self, conn_id: &str) -> Result<usize, AppError> {
        let (resp_tx, mut resp_rx) = mpsc::unbounded_channel();
        self.cmd_tx
            .send(RoomCmd::Leave {
                conn_id: conn_id.to_string(),
                resp_tx,
            })
            .map_err(|e| AppError::MailboxClosed(e.to_string()))?;
        resp_rx
            .recv()
            .await
            .ok_or_else(|| AppError::Internal("room actor dropped leave response".to_string()))
    }

    /// Current room state. Doubles as a mailbox barrier in tests: every
    /// command sent before it has been applied once it returns.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, AppError> {
        let (resp_tx, mut resp_rx) = mpsc::unbounded_channel();
        self.cmd_tx
            .send(RoomCmd::Snapshot { resp_tx })
            .map_err(|e| AppError::MailboxClosed(e.to_string()))?;
        resp_rx
            .recv()
            .await
            .ok_or_else(|| AppError::Internal("room actor dropped snapshot response".to_string()))
    }
}

/// State and roster of one room, driven by its mailbox
pub struct RoomActor {
    room_id: String,
    state: RoomState,
    roster: Roster,
    gateway: Arc<dyn ExecutionGateway>,
    /// For re-injecting execution completions. Weak so the actor's own
    /// sender does not keep its mailbox open after the room is removed.
    cmd_tx: mpsc::WeakUnboundedSender<RoomCmd>,
}

impl RoomActor {
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<RoomCmd>) {
        while let Some(cmd) = rx.recv().await {
            counter!(crate::metrics::EVENT_PROCESSED).increment(1);
            self.handle_cmd(cmd);
        }
    }

    fn handle_cmd(&mut self, cmd: RoomCmd) {
        match cmd {
            RoomCmd::Join { conn_id, user, tx } => {
                self.roster.insert(conn_id.clone(), tx);
                self.state.add_user(user.clone());
                // full snapshot to the joiner only, lightweight notices
                // to everyone else
                self.roster
                    .send_to(&conn_id, ServerMessage::RoomState(self.state.snapshot()));
                self.roster
                    .broadcast_except(&conn_id, &ServerMessage::UserJoined(user.clone()));
                self.roster.broadcast_except(
                    &conn_id,
                    &ServerMessage::UserJoinedChat {
                        username: user.username.clone(),
                    },
                );
                tracing::info!(room = %self.room_id, user = %user.username, "user joined");
            },
            RoomCmd::Leave { conn_id, resp_tx } => {
                self.roster.remove(&conn_id);
                if let Some(user) = self.state.remove_user(&conn_id) {
                    self.roster.broadcast(&ServerMessage::UserLeft {
                        user_id: conn_id.clone(),
                        username: user.username.clone(),
                    });
                    self.roster.broadcast(&ServerMessage::UserLeftChat {
                        username: user.username,
                    });
                }
                let _ = resp_tx.send(self.state.user_count());
            },
            RoomCmd::CodeChange {
                conn_id,
                file_id,
                code,
            } => {
                // last write wins; unknown file ids mutate nothing but
                // the broadcast still goes out with the supplied id
                self.state.set_code(&file_id, code.clone());
                self.roster.broadcast_except(
                    &conn_id,
                    &ServerMessage::CodeUpdate {
                        file_id,
                        code,
                        user_id: conn_id.clone(),
                    },
                );
            },
            RoomCmd::FileCreate { conn_id, file } => {
                self.state.create_file(file.clone());
                self.roster
                    .broadcast_except(&conn_id, &ServerMessage::FileCreated { file });
            },
            RoomCmd::FileDelete { conn_id, file_id } => {
                self.state.delete_file(&file_id);
                self.roster
                    .broadcast_except(&conn_id, &ServerMessage::FileDeleted { file_id });
            },
            RoomCmd::FileRename {
                conn_id,
                file_id,
                new_name,
            } => {
                self.state.rename_file(&file_id, new_name.clone());
                self.roster
                    .broadcast_except(&conn_id, &ServerMessage::FileRenamed { file_id, new_name });
            },
            RoomCmd::FileSelect { conn_id, file_id } => {
                self.state.select_file(file_id.clone());
                self.roster
                    .broadcast_except(&conn_id, &ServerMessage::FileSelected { file_id });
            },
            RoomCmd::LanguageChange {
                conn_id,
                file_id,
                language,
            } => {
                self.state.set_language(&file_id, language.clone());
                self.roster.broadcast_except(
                    &conn_id,
                    &ServerMessage::LanguageUpdate { file_id, language },
                );
            },
            RoomCmd::CursorUpdate {
                conn_id,
                file_id,
                position,
                selection,
            } => {
                // requires a registered user; the stored cursor embeds
                // the full user so receivers need no second lookup
                if let Some(cursor) = self.state.set_cursor(&conn_id, file_id, position, selection)
                {
                    self.roster.broadcast_except(
                        &conn_id,
                        &ServerMessage::CursorUpdate(CursorEntry {
                            user_id: conn_id.clone(),
                            cursor,
                        }),
                    );
                }
            },
            RoomCmd::Execute { code, language } => {
                counter!(crate::metrics::EXECUTE_REQUESTED).increment(1);
                let gateway = self.gateway.clone();
                let cmd_tx = self.cmd_tx.clone();
                tokio::spawn(async move {
                    let result = gateway.execute(&code, &language).await;
                    if let Some(tx) = cmd_tx.upgrade() {
                        let _ = tx.send(RoomCmd::ExecutionFinished { result });
                    }
                });
            },
            RoomCmd::ExecutionFinished { result } => {
                // the requester also wants to see the result, so this is
                // the one inclusive delivery
                self.roster
                    .broadcast(&ServerMessage::ExecutionResult(result));
            },
            RoomCmd::Chat { conn_id, message } => {
                self.roster
                    .broadcast_except(&conn_id, &ServerMessage::Chat { message });
            },
            RoomCmd::Signal {
                conn_id,
                to,
                signal,
            } => {
                self.roster.send_to(
                    &to,
                    ServerMessage::Signal {
                        from: conn_id,
                        signal,
                    },
                );
            },
            RoomCmd::Snapshot { resp_tx } => {
                let _ = resp_tx.send(self.state.snapshot());
            },
        }
    }
}

/// Spawn a new room actor seeded with the default file set
pub fn spawn_room_actor(room_id: &str, gateway: Arc<dyn ExecutionGateway>) -> RoomHandle {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let actor = RoomActor {
        room_id: room_id.to_string(),
        state: RoomState::new(),
        roster: Roster::new(),
        gateway,
        cmd_tx: cmd_tx.downgrade(),
    };
    tokio::spawn(async move {
        actor.run(cmd_rx).await;
    });
    RoomHandle { cmd_tx }
}
