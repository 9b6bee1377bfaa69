//! Envelope definitions for client-server communication.
//!
//! Every frame carries one JSON object whose `type` field selects the
//! schema. Client and server share the tag names `chat` and `play` with
//! different payloads, so each direction has its own enum.
//!
//! # Example
//!
//! ```json
//! { "type": "play", "cards": "3334" }
//! { "type": "play", "player": "alice", "cards": "3334" }
//! ```

use crate::card::{self, Card};
use crate::connection::Role;
use serde::{Deserialize, Serialize};

/// A message sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Must be the first frame on a connection.
    Join { name: String },
    Chat { content: String },
    /// Cards as concatenated rank symbols. Parsed by the table so that bad
    /// symbols are reported to the player instead of closing the connection.
    Play { cards: String },
    /// A free-text command line such as `rating alice bob`.
    Cmd { cmd: String },
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "join",
            ClientMessage::Chat { .. } => "chat",
            ClientMessage::Play { .. } => "play",
            ClientMessage::Cmd { .. } => "cmd",
        }
    }
}

/// A message sent from the server to one or all clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Server-written informational text.
    Tell { content: String },
    /// Overwrites the receiver's mirror of the listed attributes, in order.
    Sync { attr: Vec<SyncAttr> },
    Chat { author: String, content: String },
    Play { player: String, cards: String },
    /// Final roster once a landlord has been chosen, landlord first.
    Start { players: Vec<RosterEntry> },
    RatingUpdate { k: u32, delta: Vec<RatingDelta> },
    Error { what: String },
}

/// One attribute of a player's mirrored state.
///
/// The set of keys is closed; a `sync` entry with any other key fails to
/// decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "key", content = "val", rename_all = "snake_case")]
pub enum SyncAttr {
    Role(Role),
    Hand(#[serde(with = "card::symbols")] Vec<Card>),
    AlwaysSpectator(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub role: Role,
}

/// A participant's rating change after a finished game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingDelta {
    pub name: String,
    pub delta: f64,
    pub rating: f64,
}

impl ServerMessage {
    pub fn tell(content: impl Into<String>) -> Self {
        ServerMessage::Tell {
            content: content.into(),
        }
    }

    pub fn error(what: impl ToString) -> Self {
        ServerMessage::Error {
            what: what.to_string(),
        }
    }

    pub fn chat(author: &str, content: &str) -> Self {
        ServerMessage::Chat {
            author: author.to_string(),
            content: content.to_string(),
        }
    }

    pub fn play(player: &str, cards: &[Card]) -> Self {
        ServerMessage::Play {
            player: player.to_string(),
            cards: card::format_cards(cards),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_envelopes_use_type_tag() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "cmd", "cmd": "rating bob"})).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Cmd {
                cmd: "rating bob".to_string()
            }
        );
        assert!(serde_json::from_value::<ClientMessage>(json!({"type": "dance"})).is_err());
    }

    #[test]
    fn test_sync_wire_shape() {
        let msg = ServerMessage::Sync {
            attr: vec![
                SyncAttr::Role(Role::Peasant(2)),
                SyncAttr::Hand(card::parse_cards("33Z").unwrap()),
                SyncAttr::AlwaysSpectator(false),
            ],
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "sync",
                "attr": [
                    {"key": "role", "val": "peasant-2"},
                    {"key": "hand", "val": "33Z"},
                    {"key": "always_spectator", "val": false}
                ]
            })
        );
    }

    #[test]
    fn test_sync_rejects_unknown_keys() {
        let bad = json!({"type": "sync", "attr": [{"key": "chips", "val": 10}]});
        assert!(serde_json::from_value::<ServerMessage>(bad).is_err());
    }

    #[test]
    fn test_rating_update_wire_shape() {
        let msg = ServerMessage::RatingUpdate {
            k: 64,
            delta: vec![RatingDelta {
                name: "alice".to_string(),
                delta: 32.0,
                rating: 1532.0,
            }],
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "rating_update");
        assert_eq!(value["k"], 64);
        assert_eq!(value["delta"][0]["rating"], 1532.0);
    }
}
