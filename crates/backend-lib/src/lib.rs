// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core library for the coderoom WebSocket server: room registry,
//! per-room sync actors, session directory, and the axum surface.

pub mod config;
pub mod error;
pub mod execute;
pub mod metrics;
pub mod room;
pub mod room_actor;
pub mod roster;
pub mod session;
pub mod state;
pub mod websocket;
pub mod ws_router;

use std::sync::Arc;

use crate::config::Settings;
use crate::execute::ExecutionGateway;
use crate::room::RoomRegistry;
use crate::session::SessionDirectory;

/// Application state shared across all connections
#[derive(Clone)]
pub struct AppState {
    /// Active rooms, keyed by room id
    pub rooms: RoomRegistry,
    /// Live connection -> (room, user) directory
    pub sessions: SessionDirectory,
    /// Settings manager
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create a new application state around the given execution gateway
    pub fn new(settings: Settings, gateway: Arc<dyn ExecutionGateway>) -> Self {
        Self {
            rooms: RoomRegistry::new(gateway),
            sessions: SessionDirectory::new(),
            settings: Arc::new(settings),
        }
    }

    /// State with default settings and the fallback-only gateway
    pub fn new_default() -> Self {
        Self::new(
            Settings::default(),
            Arc::new(crate::execute::DefaultGateway),
        )
    }
}
