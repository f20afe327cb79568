//! Configuration module for Javelin.
//!
//! Loads host configuration from environment variables with sensible defaults.
//! Monitor settings (credentials, default interval, theme) live in the
//! persisted document instead.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the control API (default: 8080)
    pub http_port: u16,
    /// Path to the persisted state document (default: "javelin.json")
    pub state_path: PathBuf,
    /// Quiet period before state is written to disk (default: 1000ms)
    pub persist_debounce: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            state_path: PathBuf::from("javelin.json"),
            persist_debounce: Duration::from_millis(1000),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `JAVELIN_HTTP_PORT`: HTTP port (default: 8080)
    /// - `JAVELIN_STATE_PATH`: State document path (default: "javelin.json")
    /// - `JAVELIN_PERSIST_DEBOUNCE_MS`: Save debounce in ms (default: 1000)
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(port) = lookup("JAVELIN_HTTP_PORT").and_then(|v| v.parse().ok()) {
            cfg.http_port = port;
        }

        if let Some(path) = lookup("JAVELIN_STATE_PATH").filter(|v| !v.trim().is_empty()) {
            cfg.state_path = PathBuf::from(path);
        }

        let debounce_ms = lookup("JAVELIN_PERSIST_DEBOUNCE_MS").and_then(|v| v.parse::<u64>().ok());
        if let Some(ms) = debounce_ms {
            cfg.persist_debounce = Duration::from_millis(ms);
        }

        cfg
    }
}
