// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level filter passed to tracing
    pub log_level: String,
    /// Origin allowed by CORS (the editing UI)
    pub client_origin: String,
    /// Per-connection outbound message buffer. Delivery is at-most-once
    /// with no backpressure on the room actor: when a slow client's
    /// buffer is full, further messages to it are dropped.
    pub send_buffer: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".parse().expect("static addr"),
            log_level: "info".to_string(),
            client_origin: "http://localhost:3000".to_string(),
            send_buffer: 32,
        }
    }
}

impl Settings {
    /// Load settings from `coderoom.toml` and `CODEROOM_`-prefixed
    /// environment variables, on top of the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from("coderoom.toml")
    }

    /// Load settings from an explicit config file path
    pub fn load_from(path: &str) -> Result<Self> {
        let settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CODEROOM_"))
            .extract()?;
        Ok(settings)
    }
}
