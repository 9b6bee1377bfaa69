//! Local mirror of synced state and plain-text rendering of envelopes.

use landlord_server::card::{format_cards, Card};
use landlord_server::connection::Role;
use landlord_server::messaging::{ServerMessage, SyncAttr};

/// What the server has told us about ourselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Mirror {
    pub role: Role,
    pub hand: Vec<Card>,
    pub always_spectator: bool,
}

impl Default for Mirror {
    fn default() -> Self {
        Self {
            role: Role::Spectator,
            hand: Vec::new(),
            always_spectator: false,
        }
    }
}

impl Mirror {
    /// Applies a `sync` envelope in order and returns the lines to print.
    pub fn apply(&mut self, attrs: &[SyncAttr]) -> Vec<String> {
        let mut lines = Vec::new();
        for attr in attrs {
            match attr {
                SyncAttr::Role(role) => {
                    self.role = *role;
                    lines.push(format!("You are {role} now"));
                }
                SyncAttr::Hand(hand) => {
                    self.hand = hand.clone();
                    lines.push(self.hand_line());
                }
                SyncAttr::AlwaysSpectator(flag) => {
                    self.always_spectator = *flag;
                    lines.push(if *flag {
                        "You are an always spectator now.".to_string()
                    } else {
                        "You are a normal player now.".to_string()
                    });
                }
            }
        }
        lines
    }

    pub fn hand_line(&self) -> String {
        format!("{} ({})", format_cards(&self.hand), self.hand.len())
    }
}

/// Renders an envelope as printable lines, updating `mirror` on `sync`.
pub fn render(message: &ServerMessage, mirror: &mut Mirror) -> Vec<String> {
    match message {
        ServerMessage::Tell { content } => content.lines().map(|l| format!("[server] {l}")).collect(),
        ServerMessage::Chat { author, content } => content.lines().map(|l| format!("{author}> {l}")).collect(),
        ServerMessage::Play { player, cards } if cards.is_empty() => vec![format!("{player} passes")],
        ServerMessage::Play { player, cards } => vec![format!("{player} {cards}")],
        ServerMessage::Start { players } => players
            .iter()
            .map(|p| format!("{}\t{}", p.role, p.name))
            .collect(),
        ServerMessage::RatingUpdate { k, delta } => {
            let mut lines = vec![format!("k = {k}")];
            lines.extend(
                delta
                    .iter()
                    .map(|d| format!("{}\t{:+.3}\t{:.3}", d.name, d.delta, d.rating)),
            );
            lines
        }
        ServerMessage::Error { what } => vec![format!("[error] {what}")],
        ServerMessage::Sync { attr } => mirror.apply(attr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landlord_server::card::parse_cards;
    use landlord_server::messaging::{RatingDelta, RosterEntry};

    #[test]
    fn test_sync_updates_mirror_in_order() {
        let mut mirror = Mirror::default();
        let lines = render(
            &ServerMessage::Sync {
                attr: vec![
                    SyncAttr::Role(Role::Landlord),
                    SyncAttr::Hand(parse_cards("33K").unwrap()),
                ],
            },
            &mut mirror,
        );
        assert_eq!(mirror.role, Role::Landlord);
        assert_eq!(mirror.hand.len(), 3);
        assert_eq!(lines, vec!["You are landlord now", "33K (3)"]);
    }

    #[test]
    fn test_render_table_events() {
        let mut mirror = Mirror::default();
        assert_eq!(
            render(&ServerMessage::tell("a\nb"), &mut mirror),
            vec!["[server] a", "[server] b"]
        );
        assert_eq!(
            render(&ServerMessage::play("bob", &[]), &mut mirror),
            vec!["bob passes"]
        );
        assert_eq!(
            render(
                &ServerMessage::Start {
                    players: vec![RosterEntry {
                        name: "bob".into(),
                        role: Role::Landlord
                    }]
                },
                &mut mirror
            ),
            vec!["landlord\tbob"]
        );
        assert_eq!(
            render(
                &ServerMessage::RatingUpdate {
                    k: 64,
                    delta: vec![RatingDelta {
                        name: "bob".into(),
                        delta: 32.0,
                        rating: 1532.0
                    }]
                },
                &mut mirror
            ),
            vec!["k = 64", "bob\t+32.000\t1532.000"]
        );
    }
}
