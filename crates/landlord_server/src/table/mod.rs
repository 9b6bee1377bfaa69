//! The game table: roster, game state and rating store behind one owner.
//!
//! [`Table`] turns client envelopes into [`Game`] transitions and tells the
//! roster about the results. It is driven by a single task (see
//! [`actor`]), so every method runs to completion, broadcasts included,
//! before the next event is looked at.

pub mod actor;
pub mod commands;
pub mod game;

pub use actor::{TableEvent, TableHandle};
pub use commands::Command;
pub use game::{Game, Phase, SeatCount};

use crate::card::{self, Card};
use crate::connection::{Registry, Session, SyncKey};
use crate::error::{ProtocolError, TableResult};
use crate::messaging::{router, ClientMessage, RosterEntry, ServerMessage};
use crate::rating::{self, RatingStore};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

/// Multiplier a fresh table starts with.
pub const DEFAULT_INITIAL_K: u32 = 64;

/// Per-table settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConfig {
    pub initial_k: u32,
    /// Fixed shuffle seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_k: DEFAULT_INITIAL_K,
            seed: None,
        }
    }
}

pub struct Table {
    registry: Registry,
    game: Game,
    ratings: Box<dyn RatingStore>,
    rng: StdRng,
}

impl Table {
    pub fn new(config: TableConfig, ratings: Box<dyn RatingStore>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            registry: Registry::new(),
            game: Game::new(config.initial_k),
            ratings,
            rng,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Registers a new session and announces it.
    ///
    /// A refused session is handed back unregistered, together with the
    /// reason.
    pub async fn join(&mut self, session: Session) -> Result<(), (Session, ProtocolError)> {
        let name = session.name().to_string();
        self.registry.insert(session)?;

        info!("👋 {} joined the table ({} connected)", name, self.registry.len());
        self.sync(&name, &[SyncKey::Role, SyncKey::Hand, SyncKey::AlwaysSpectator])
            .await;
        router::send_all(&mut self.registry, &ServerMessage::tell(format!("{name} joined"))).await;
        Ok(())
    }

    /// Removes a session after its connection ended.
    ///
    /// Losing an engaged player aborts the game in progress.
    pub async fn leave(&mut self, name: &str) {
        let Some(session) = self.registry.remove(name) else {
            debug!("Leave for unknown player {}", name);
            return;
        };
        let engaged = session.data.is_engaged();
        session.close().await;

        info!("👋 {} left the table ({} connected)", name, self.registry.len());
        router::send_all(&mut self.registry, &ServerMessage::tell(format!("{name} left"))).await;

        if engaged && self.game.phase() != Phase::Idle {
            router::send_all(
                &mut self.registry,
                &ServerMessage::tell(format!("{name} left during the game, the table is reset")),
            )
            .await;
            self.reset().await;
        }
    }

    /// Handles one envelope from the registered session `name`.
    ///
    /// Rejections are reported to `name` alone as an `error` envelope.
    pub async fn handle_message(&mut self, name: &str, message: ClientMessage) {
        let result = match message {
            ClientMessage::Join { .. } => {
                router::send_to(&mut self.registry, name, &ServerMessage::error("already joined")).await;
                Ok(())
            }
            ClientMessage::Chat { content } => {
                router::send_all(&mut self.registry, &ServerMessage::chat(name, &content)).await;
                Ok(())
            }
            ClientMessage::Play { cards } => self.play(name, &cards).await,
            ClientMessage::Cmd { cmd } => self.command(name, &cmd).await,
        };

        if let Err(e) = result {
            debug!("Rejected request from {}: {}", name, e);
            router::send_to(&mut self.registry, name, &ServerMessage::error(e)).await;
        }
    }

    async fn play(&mut self, name: &str, text: &str) -> TableResult<()> {
        let cards = card::parse_cards(text)?;
        let outcome = self.game.play(&mut self.registry, name, &cards)?;

        self.sync(name, &[SyncKey::Hand]).await;
        router::send_all(&mut self.registry, &ServerMessage::play(name, &cards)).await;
        if outcome.bomb {
            let notice = format!("bomb! K is now {}", self.game.k());
            router::send_all(&mut self.registry, &ServerMessage::tell(notice)).await;
        }

        match outcome.remaining {
            0 => self.finish(name).await,
            1 | 2 => {
                let notice = format!("{name} has only {} card(s) left", outcome.remaining);
                router::send_all(&mut self.registry, &ServerMessage::tell(notice)).await;
            }
            _ => {}
        }
        Ok(())
    }

    async fn command(&mut self, name: &str, line: &str) -> TableResult<()> {
        let Some(command) = Command::parse(line)? else {
            return Ok(());
        };
        debug!("{} issued {:?}", name, command);

        match command {
            Command::Start => self.deal(SeatCount::Three).await?,
            Command::Start4 => self.deal(SeatCount::Four).await?,
            Command::BecomeLandlord => self.claim_landlord(name).await?,
            Command::Undo => self.undo(name).await?,
            Command::ToggleSpectator => {
                let flag = self.game.toggle_spectator(&mut self.registry, name)?;
                info!("{} is {} dealt into games", name, if flag { "no longer" } else { "again" });
                self.sync(name, &[SyncKey::AlwaysSpectator]).await;
            }
            Command::List => {
                let listing = self
                    .registry
                    .players()
                    .map(|p| format!("{}\t{}", p.name, p.status_abbr()))
                    .collect::<Vec<_>>()
                    .join("\n");
                self.tell(name, listing).await;
            }
            Command::Rating(names) => {
                let names = if names.is_empty() { vec![name.to_string()] } else { names };
                let mut lines = Vec::with_capacity(names.len());
                for target in &names {
                    let value = self.ratings.get(target).await?;
                    lines.push(format!("{target}\t{value:.3}"));
                }
                self.tell(name, lines.join("\n")).await;
            }
            Command::Remain(names) => {
                let names = if names.is_empty() { vec![name.to_string()] } else { names };
                let lines: Vec<String> = names
                    .iter()
                    .filter_map(|target| self.registry.player(target))
                    .map(|p| format!("{}\t{}", p.name, p.hand.len()))
                    .collect();
                self.tell(name, lines.join("\n")).await;
            }
            Command::Help => self.tell(name, commands::HELP).await,
        }
        Ok(())
    }

    async fn deal(&mut self, count: SeatCount) -> TableResult<()> {
        let deal = self.game.deal(&mut self.registry, count, &mut self.rng)?;
        info!("🃏 New {}-player deal: {}", count.players(), deal.seats.join(", "));

        for released in &deal.released {
            self.sync(released, &[SyncKey::Role, SyncKey::Hand]).await;
        }
        for seat in &deal.seats {
            self.sync(seat, &[SyncKey::Role, SyncKey::Hand]).await;
        }
        let notice = format!(
            "cards dealt to {}, waiting for someone to become landlord",
            deal.seats.join(", ")
        );
        router::send_all(&mut self.registry, &ServerMessage::tell(notice)).await;
        Ok(())
    }

    async fn claim_landlord(&mut self, name: &str) -> TableResult<()> {
        self.game.claim_landlord(&mut self.registry, name)?;
        info!("👑 {} became landlord", name);

        let seats = self.game.seats().to_vec();
        for seat in &seats {
            self.sync(seat, &[SyncKey::Role, SyncKey::Hand]).await;
        }
        let players = seats
            .iter()
            .filter_map(|seat| self.registry.player(seat))
            .map(|p| RosterEntry {
                name: p.name.clone(),
                role: p.role,
            })
            .collect();
        router::send_all(&mut self.registry, &ServerMessage::Start { players }).await;
        Ok(())
    }

    async fn undo(&mut self, name: &str) -> TableResult<()> {
        let record = self.game.undo(&mut self.registry, name)?;

        self.sync(name, &[SyncKey::Hand]).await;
        let notice = format!("{} took back {}", name, describe(&record.cards));
        router::send_all(&mut self.registry, &ServerMessage::tell(notice)).await;
        Ok(())
    }

    /// Resolves ratings for a game won by `winner` and returns to idle.
    ///
    /// A failed resolution is announced to everyone; the table resets anyway.
    async fn finish(&mut self, winner: &str) {
        let participants = self.game.participants(&self.registry);
        let k = self.game.k();

        match rating::resolve(self.ratings.as_mut(), &participants, winner, k).await {
            Ok(delta) => {
                router::send_all(&mut self.registry, &ServerMessage::RatingUpdate { k, delta }).await;
            }
            Err(e) => {
                warn!("Rating resolution failed: {}", e);
                router::send_all(&mut self.registry, &ServerMessage::error(e)).await;
            }
        }
        self.reset().await;
    }

    async fn reset(&mut self) {
        let released = self.game.reset(&mut self.registry);
        for name in &released {
            self.sync(name, &[SyncKey::Role, SyncKey::Hand]).await;
        }
        info!("🔄 Table reset, {} player(s) released", released.len());
    }

    async fn tell(&mut self, name: &str, text: impl Into<String>) {
        if let Some(session) = self.registry.get_mut(name) {
            if let Err(e) = session.tell(text).await {
                warn!("Failed to tell {}: {}", name, e);
            }
        }
    }

    async fn sync(&mut self, name: &str, keys: &[SyncKey]) {
        if let Some(session) = self.registry.get_mut(name) {
            if let Err(e) = session.sync(keys).await {
                warn!("Failed to sync {}: {}", name, e);
            }
        }
    }
}

fn describe(cards: &[Card]) -> String {
    if cards.is_empty() {
        "a pass".to_string()
    } else {
        card::format_cards(cards)
    }
}
