//! Server configuration from environment variables.

use std::net::SocketAddr;

/// Which store backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Embedded aurora-db database (the default).
    Aurora,
    /// Volatile in-process store, for development and demos.
    Memory,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub db_path: String,
    pub store_backend: StoreBackend,
}

impl ServerConfig {
    /// Environment variables:
    /// - `HUDDLE_BIND_ADDR`: listen address (default: "0.0.0.0:8080")
    /// - `HUDDLE_DB_PATH`: aurora-db directory (default: "huddle_db_data")
    /// - `HUDDLE_STORE`: "aurora" | "memory" (default: "aurora")
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("HUDDLE_BIND_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

        let db_path =
            std::env::var("HUDDLE_DB_PATH").unwrap_or_else(|_| "huddle_db_data".to_string());

        let store_backend = match std::env::var("HUDDLE_STORE")
            .unwrap_or_else(|_| "aurora".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            _ => StoreBackend::Aurora,
        };

        Self {
            bind_addr,
            db_path,
            store_backend,
        }
    }
}
