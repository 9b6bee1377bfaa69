//! Per-connection player state.
//!
//! A [`Session`] composes the game-facing [`PlayerData`] with the outward
//! half of the connection. Hands and roles are only ever changed by the
//! table that owns the session.

use crate::card::{self, Card};
use crate::error::ProtocolError;
use crate::messaging::{codec, ServerMessage, SyncAttr};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Outward byte stream of a connection.
pub type Outbox = Box<dyn AsyncWrite + Send + Unpin>;

/// A player's part in the current deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Dealt into the game, landlord not yet chosen.
    Unassigned,
    Landlord,
    /// Peasants are numbered from 1 in seat order.
    Peasant(u8),
    Spectator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Unassigned => write!(f, "unassigned"),
            Role::Landlord => write!(f, "landlord"),
            Role::Peasant(n) => write!(f, "peasant-{n}"),
            Role::Spectator => write!(f, "spectator"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unassigned" => Ok(Role::Unassigned),
            "landlord" => Ok(Role::Landlord),
            "spectator" => Ok(Role::Spectator),
            other => other
                .strip_prefix("peasant-")
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| *n > 0)
                .map(Role::Peasant)
                .ok_or_else(|| format!("unknown role '{other}'")),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Attributes that can be mirrored to a client with a `sync` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKey {
    Role,
    Hand,
    AlwaysSpectator,
}

/// Game-facing state of one registered player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerData {
    pub name: String,
    /// Always kept sorted by rank.
    pub hand: Vec<Card>,
    pub role: Role,
    /// Opted out of being dealt into games.
    pub always_spectator: bool,
}

impl PlayerData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hand: Vec::new(),
            role: Role::Spectator,
            always_spectator: false,
        }
    }

    /// `true` when `candidate` is a sub-multiset of the hand.
    pub fn has_cards(&self, candidate: &[Card]) -> bool {
        card::is_sub_multiset(candidate, &self.hand)
    }

    pub fn add_cards(&mut self, cards: &[Card]) {
        self.hand.extend_from_slice(cards);
        card::sort_by_rank(&mut self.hand);
    }

    /// Removes one copy of each card in `cards`.
    ///
    /// Returns `false` and leaves the hand untouched when a card is missing.
    pub fn remove_cards(&mut self, cards: &[Card]) -> bool {
        if !self.has_cards(cards) {
            return false;
        }
        for played in cards {
            if let Some(pos) = self.hand.iter().position(|held| held == played) {
                self.hand.remove(pos);
            }
        }
        card::sort_by_rank(&mut self.hand);
        true
    }

    pub fn set_hand(&mut self, cards: Vec<Card>) {
        self.hand = cards;
        card::sort_by_rank(&mut self.hand);
    }

    /// Back to watching: spectator role, empty hand.
    pub fn release(&mut self) {
        self.role = Role::Spectator;
        self.hand.clear();
    }

    /// `true` for anyone dealt into the current game.
    pub fn is_engaged(&self) -> bool {
        self.role != Role::Spectator
    }

    /// Short roster tag used by the `list` command.
    pub fn status_abbr(&self) -> String {
        match self.role {
            Role::Spectator if self.always_spectator => "AS".to_string(),
            Role::Spectator => "S".to_string(),
            Role::Landlord => "L".to_string(),
            Role::Peasant(n) => format!("P{n}"),
            Role::Unassigned => "U".to_string(),
        }
    }

    pub fn attribute(&self, key: SyncKey) -> SyncAttr {
        match key {
            SyncKey::Role => SyncAttr::Role(self.role),
            SyncKey::Hand => SyncAttr::Hand(self.hand.clone()),
            SyncKey::AlwaysSpectator => SyncAttr::AlwaysSpectator(self.always_spectator),
        }
    }
}

/// A registered player together with the outward half of its connection.
pub struct Session {
    pub data: PlayerData,
    outbox: Outbox,
}

impl Session {
    pub fn new(name: impl Into<String>, outbox: Outbox) -> Self {
        Self {
            data: PlayerData::new(name),
            outbox,
        }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// Writes an already encoded frame.
    pub async fn send_raw(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.outbox.write_all(frame).await?;
        self.outbox.flush().await
    }

    /// Encodes and writes a single envelope.
    pub async fn send(&mut self, message: &ServerMessage) -> Result<(), ProtocolError> {
        let frame = codec::encode(message)?;
        self.send_raw(&frame).await?;
        Ok(())
    }

    /// Sends a private informational message.
    pub async fn tell(&mut self, text: impl Into<String>) -> Result<(), ProtocolError> {
        self.send(&ServerMessage::tell(text)).await
    }

    /// Mirrors the current value of each attribute in `keys`, in order, in a
    /// single `sync` envelope.
    pub async fn sync(&mut self, keys: &[SyncKey]) -> Result<(), ProtocolError> {
        let attr = keys.iter().map(|key| self.data.attribute(*key)).collect();
        self.send(&ServerMessage::Sync { attr }).await
    }

    /// Closes the outward half of the connection.
    pub async fn close(mut self) {
        let _ = self.outbox.shutdown().await;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("data", &self.data).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::parse_cards;
    use crate::messaging::codec::{read_frame, DEFAULT_MAX_FRAME_LEN};
    use tokio::io::duplex;

    #[test]
    fn test_role_text_forms() {
        for role in [Role::Unassigned, Role::Landlord, Role::Peasant(3), Role::Spectator] {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
        assert!("peasant-0".parse::<Role>().is_err());
        assert!("king".parse::<Role>().is_err());
    }

    #[test]
    fn test_add_and_remove_keep_hand_sorted() {
        let mut player = PlayerData::new("alice");
        player.add_cards(&parse_cards("Z93").unwrap());
        player.add_cards(&parse_cards("4").unwrap());
        assert_eq!(crate::card::format_cards(&player.hand), "349Z");

        assert!(player.remove_cards(&parse_cards("94").unwrap()));
        assert_eq!(crate::card::format_cards(&player.hand), "3Z");
        assert!(!player.remove_cards(&parse_cards("33").unwrap()));
        assert_eq!(player.hand.len(), 2);
    }

    #[test]
    fn test_status_abbreviations() {
        let mut player = PlayerData::new("bob");
        assert_eq!(player.status_abbr(), "S");
        player.always_spectator = true;
        assert_eq!(player.status_abbr(), "AS");
        player.role = Role::Peasant(2);
        assert_eq!(player.status_abbr(), "P2");
        player.role = Role::Unassigned;
        assert_eq!(player.status_abbr(), "U");
    }

    #[tokio::test]
    async fn test_sync_sends_requested_attributes_in_order() {
        let (outbox, mut inbox) = duplex(4096);
        let mut session = Session::new("carol", Box::new(outbox));
        session.data.set_hand(parse_cards("K3").unwrap());
        session.data.role = Role::Landlord;

        session.sync(&[SyncKey::Hand, SyncKey::Role]).await.unwrap();

        let msg: Option<ServerMessage> = read_frame(&mut inbox, DEFAULT_MAX_FRAME_LEN).await.unwrap();
        assert_eq!(
            msg,
            Some(ServerMessage::Sync {
                attr: vec![
                    SyncAttr::Hand(parse_cards("3K").unwrap()),
                    SyncAttr::Role(Role::Landlord),
                ]
            })
        );
    }
}
