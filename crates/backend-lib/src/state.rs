// ============================
// crates/backend-lib/src/state.rs
// ============================
//! In-memory state of a single room: files, users, and live cursors.
//!
//! All mutations are last-write-wins with no merging or causal ordering;
//! the owning room actor serializes access, so nothing here needs a lock.
//! Mutations that reference an unknown file id are silent no-ops — the
//! caller still broadcasts the event, which clients rely on.

use coderoom_common::{Cursor, CursorEntry, File, Position, RoomSnapshot, Selection, User};
use std::collections::HashMap;

/// Seed file every room starts with
pub const DEFAULT_FILE_ID: &str = "default";
pub const DEFAULT_FILE_NAME: &str = "main.js";
pub const DEFAULT_FILE_CODE: &str = "// Start coding together!\n";
pub const DEFAULT_FILE_LANGUAGE: &str = "javascript";

/// Mutable state owned by one room actor
pub struct RoomState {
    /// Files in creation order
    files: Vec<File>,
    /// The single room-wide selected file id
    active_file: String,
    users: HashMap<String, User>,
    cursors: HashMap<String, Cursor>,
}

impl RoomState {
    /// Fresh room seeded with exactly one default file. The non-empty
    /// file invariant holds at creation only; deletes are never refused.
    pub fn new() -> Self {
        RoomState {
            files: vec![File {
                id: DEFAULT_FILE_ID.to_string(),
                name: DEFAULT_FILE_NAME.to_string(),
                code: DEFAULT_FILE_CODE.to_string(),
                language: DEFAULT_FILE_LANGUAGE.to_string(),
            }],
            active_file: DEFAULT_FILE_ID.to_string(),
            users: HashMap::new(),
            cursors: HashMap::new(),
        }
    }

    pub fn add_user(&mut self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    /// Remove a user and their cursor. Returns the removed user so the
    /// caller can build the participant-left notice.
    pub fn remove_user(&mut self, conn_id: &str) -> Option<User> {
        self.cursors.remove(conn_id);
        self.users.remove(conn_id)
    }

    pub fn user(&self, conn_id: &str) -> Option<&User> {
        self.users.get(conn_id)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn file(&self, file_id: &str) -> Option<&File> {
        self.files.iter().find(|f| f.id == file_id)
    }

    /// Last-write-wins overwrite of a file's full text
    pub fn set_code(&mut self, file_id: &str, code: String) {
        if let Some(file) = self.files.iter_mut().find(|f| f.id == file_id) {
            file.code = code;
        }
    }

    /// Append a caller-supplied file record, preserving creation order
    pub fn create_file(&mut self, file: File) {
        self.files.push(file);
    }

    /// Remove by id; no minimum-file guard (that lives in the UI layer)
    pub fn delete_file(&mut self, file_id: &str) {
        self.files.retain(|f| f.id != file_id);
    }

    pub fn rename_file(&mut self, file_id: &str, new_name: String) {
        if let Some(file) = self.files.iter_mut().find(|f| f.id == file_id) {
            file.name = new_name;
        }
    }

    /// Move the shared selection. Room-wide, so concurrent selects race
    /// and the last one processed wins.
    pub fn select_file(&mut self, file_id: String) {
        self.active_file = file_id;
    }

    pub fn set_language(&mut self, file_id: &str, language: String) {
        if let Some(file) = self.files.iter_mut().find(|f| f.id == file_id) {
            file.language = language;
        }
    }

    /// Replace the connection's cursor record whole. Returns `None` when
    /// the connection has no registered user, in which case nothing is
    /// stored or broadcast.
    pub fn set_cursor(
        &mut self,
        conn_id: &str,
        file_id: String,
        position: Position,
        selection: Option<Selection>,
    ) -> Option<Cursor> {
        let user = self.users.get(conn_id)?.clone();
        let cursor = Cursor {
            file_id,
            position,
            selection,
            user,
        };
        self.cursors.insert(conn_id.to_string(), cursor.clone());
        Some(cursor)
    }

    /// Full state as delivered to a joining connection
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            files: self.files.clone(),
            active_file: self.active_file.clone(),
            users: self.users.values().cloned().collect(),
            cursors: self
                .cursors
                .iter()
                .map(|(id, cursor)| CursorEntry {
                    user_id: id.clone(),
                    cursor: cursor.clone(),
                })
                .collect(),
        }
    }
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new()
    }
}
