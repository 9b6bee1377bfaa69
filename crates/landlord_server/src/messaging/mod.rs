//! Wire protocol: framing, envelopes and broadcast routing.

pub mod codec;
pub mod router;
pub mod types;

pub use types::{ClientMessage, RatingDelta, RosterEntry, ServerMessage, SyncAttr};
