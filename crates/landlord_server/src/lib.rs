//! # Landlord Server - networked Dou Dizhu tables
//!
//! A session server for the three- or four-player card game Landlord.
//! Clients connect over TCP, join under a unique name and then chat, issue
//! commands and play cards. The server deals, enforces turn order and hand
//! ownership, keeps a rating per player name and tells everyone what
//! happened.
//!
//! ## Architecture Overview
//!
//! * **Card model** ([`card`]) - ranks, symbols, bomb detection
//! * **Wire protocol** ([`messaging`]) - length-prefixed JSON envelopes and
//!   the broadcast router
//! * **Sessions** ([`connection`]) - per-player state composed with the
//!   outward half of the connection
//! * **Rating engine** ([`rating`]) - pairwise Elo updates over a pluggable
//!   store
//! * **Table** ([`table`]) - the deal / claim / play state machine, owned by
//!   a single actor task
//! * **Server** ([`server`]) - accept loop and connection handling
//!
//! ### Message Flow
//!
//! 1. A connection task reads one frame and decodes the envelope
//! 2. The envelope is forwarded to the table actor over a bounded channel
//! 3. The actor applies it, syncing and broadcasting the results
//! 4. Only then does the actor look at the next event
//!
//! Rules about which card combinations beat which are not enforced; the
//! server only checks that the cards played are actually held.

pub use config::ServerConfig;
pub use error::ServerError;
pub use server::GameServer;

pub mod card;
pub mod config;
pub mod connection;
pub mod error;
pub mod messaging;
pub mod rating;
pub mod server;
pub mod table;

/// Creates a server with default configuration.
pub fn create_server() -> GameServer {
    GameServer::new(ServerConfig::default())
}

/// Creates a server with the given configuration.
pub fn create_server_with_config(config: ServerConfig) -> GameServer {
    GameServer::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_config() {
        let server = create_server();
        let config = server.config();
        assert_eq!(config.bind_address.port(), 2333);
        assert_eq!(config.initial_k, 64);
        assert!(config.rating_store.is_none());
        assert_eq!(config.table_config().initial_k, 64);
    }
}
