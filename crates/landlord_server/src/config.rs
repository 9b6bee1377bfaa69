//! Server configuration types and defaults.

use crate::messaging::codec::DEFAULT_MAX_FRAME_LEN;
use crate::table::{TableConfig, DEFAULT_INITIAL_K};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Configuration for a [`crate::GameServer`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,

    /// Capacity of the channel feeding the table actor
    pub event_queue_capacity: usize,

    /// Largest accepted frame body in bytes
    pub max_frame_len: usize,

    /// Rating multiplier at the start of every game
    pub initial_k: u32,

    /// Fixed shuffle seed, mostly for tests
    pub seed: Option<u64>,

    /// Rating file; ratings are kept in memory only when unset
    pub rating_store: Option<PathBuf>,
}

impl ServerConfig {
    pub fn table_config(&self) -> TableConfig {
        TableConfig {
            initial_k: self.initial_k,
            seed: self.seed,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 2333)),
            max_connections: 64,
            event_queue_capacity: 256,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            initial_k: DEFAULT_INITIAL_K,
            seed: None,
            rating_store: None,
        }
    }
}
