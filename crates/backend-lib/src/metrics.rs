// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const WS_CONNECTION: &str = "ws.connection";
pub const WS_ACTIVE: &str = "ws.active";
pub const ROOM_CREATED: &str = "room.created";
pub const ROOM_EVICTED: &str = "room.evicted";
pub const ROOM_ACTIVE: &str = "room.active";
pub const SESSION_ACTIVE: &str = "session.active";
pub const EVENT_PROCESSED: &str = "event.processed";
pub const EXECUTE_REQUESTED: &str = "execute.requested";
