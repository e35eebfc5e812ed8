// ================
// crates/common/src/lib.rs
// ================
//! Common types shared between the coderoom client and server.
//! This module defines the WebSocket protocol messages and the entity
//! model for a collaborative editing room.

use serde::{Deserialize, Serialize};

/// Identifier of a room, chosen by the client on join.
pub type RoomId = String;

/// Stable identifier of one live connection, assigned by the server.
pub type ConnectionId = String;

/// A connected participant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Connection identifier of this participant
    pub id: ConnectionId,
    /// Display name (defaulted by the server when empty)
    pub username: String,
    /// Display color hint, e.g. `#1a2b3c`
    pub color: String,
}

/// One file in a room. The server treats `code` as opaque text and
/// `language` as an open string tag; neither is validated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: String,
    pub name: String,
    pub code: String,
    pub language: String,
}

/// A line/column text position.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// An optional selection range attached to a cursor.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub start: Position,
    pub end: Position,
}

/// A participant's current cursor within one file. The owning `User` is
/// embedded so receivers can render the cursor without joining against
/// the user list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub file_id: String,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
    pub user: User,
}

/// A cursor keyed by its owning connection, as delivered to clients.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CursorEntry {
    pub user_id: ConnectionId,
    #[serde(flatten)]
    pub cursor: Cursor,
}

/// Full state of a room, sent to a joining connection only.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub files: Vec<File>,
    /// The room-wide selected file (a single shared selection)
    pub active_file: String,
    pub users: Vec<User>,
    pub cursors: Vec<CursorEntry>,
}

/// Kind of a chat message.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    System,
    User,
}

/// A chat message, relayed by the server without inspection or storage.
/// Timestamps are client-supplied milliseconds; the server keeps no
/// transcript, so late joiners receive no backlog.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub kind: ChatKind,
    pub content: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<ConnectionId>,
}

/// Outcome of one code execution request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Wall time in milliseconds, present on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<u64>,
}

impl ExecutionResult {
    /// A successful run. Empty output is reported as `(no output)`.
    pub fn completed(output: String, execution_time_ms: u64) -> Self {
        let output = if output.is_empty() {
            "(no output)".to_string()
        } else {
            output
        };
        ExecutionResult {
            success: true,
            output: Some(output),
            error: None,
            stack: None,
            execution_time: Some(execution_time_ms),
        }
    }

    /// A failed run, carrying the runtime's error and stack trace.
    pub fn failed(error: String, stack: String) -> Self {
        ExecutionResult {
            success: false,
            output: None,
            error: Some(error),
            stack: Some(stack),
            execution_time: None,
        }
    }
}

/// Messages sent from client to server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "msgType", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Join a room, creating it on first use. One join per connection.
    /// Empty `username`/`color` are defaulted by the server.
    JoinRoom {
        room_id: RoomId,
        #[serde(default)]
        username: String,
        #[serde(default)]
        color: String,
    },
    /// Replace a file's full text (last write wins)
    CodeChange {
        room_id: RoomId,
        file_id: String,
        code: String,
    },
    /// Append a caller-supplied file record to the room
    FileCreate { room_id: RoomId, file: File },
    /// Remove a file; the server keeps no minimum-file guard
    FileDelete { room_id: RoomId, file_id: String },
    FileRename {
        room_id: RoomId,
        file_id: String,
        new_name: String,
    },
    /// Move the room-wide shared selection
    FileSelect { room_id: RoomId, file_id: String },
    LanguageChange {
        room_id: RoomId,
        file_id: String,
        language: String,
    },
    /// Replace the sender's cursor record (never merged field-by-field)
    CursorPosition {
        room_id: RoomId,
        file_id: String,
        position: Position,
        #[serde(default)]
        selection: Option<Selection>,
    },
    /// Run code through the execution gateway
    ExecuteCode {
        room_id: RoomId,
        code: String,
        language: String,
    },
    /// Relay a chat message to the rest of the room
    #[serde(rename = "chat-message")]
    Chat { room_id: RoomId, message: ChatMessage },
    /// Relay an opaque negotiation payload to one named connection
    #[serde(rename = "webrtc-signal")]
    Signal {
        room_id: RoomId,
        to: ConnectionId,
        signal: serde_json::Value,
    },
}

/// Messages sent from server to client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "msgType", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Full room state, delivered to the joining connection only
    RoomState(RoomSnapshot),
    /// A participant joined (delivered to everyone else)
    UserJoined(User),
    UserJoinedChat { username: String },
    CodeUpdate {
        file_id: String,
        code: String,
        user_id: ConnectionId,
    },
    FileCreated { file: File },
    FileDeleted { file_id: String },
    FileRenamed { file_id: String, new_name: String },
    FileSelected { file_id: String },
    LanguageUpdate { file_id: String, language: String },
    CursorUpdate(CursorEntry),
    /// Execution outcome, delivered to the entire room including the
    /// requester
    ExecutionResult(ExecutionResult),
    #[serde(rename = "chat-message")]
    Chat { message: ChatMessage },
    #[serde(rename = "webrtc-signal")]
    Signal {
        from: ConnectionId,
        signal: serde_json::Value,
    },
    UserLeft {
        user_id: ConnectionId,
        username: String,
    },
    UserLeftChat { username: String },
    /// Error reply for unparseable frames; never fatal to the connection
    MalformedMessage { err_msg: String },
}
