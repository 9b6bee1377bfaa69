//! Player sessions and the registry that holds them.
//!
//! A session lives from a successful join handshake until its connection
//! closes.

pub mod registry;
pub mod session;

pub use registry::Registry;
pub use session::{Outbox, PlayerData, Role, Session, SyncKey};
