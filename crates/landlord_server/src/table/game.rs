//! The deal / claim / play state machine.
//!
//! [`Game`] holds everything about the current hand that is not per-player:
//! the phase, the seat order, the reserve, the turn cursor, the undo stack
//! and the rating multiplier. Per-player state (hands, roles) lives in the
//! [`Registry`] and is updated here, but nothing in this module performs
//! I/O. Callers decide what to sync and broadcast from the returned values.

use crate::card::{self, Card};
use crate::connection::{Registry, Role};
use crate::error::{GameError, GameResult};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Where the table is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No active deal.
    Idle,
    /// Hands dealt, reserve set aside, waiting for a claim.
    WaitingForLandlord,
    /// A landlord has been chosen and plays are accepted.
    Started,
}

/// Table sizes supported by the deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatCount {
    Three,
    Four,
}

impl SeatCount {
    pub fn players(self) -> usize {
        match self {
            SeatCount::Three => 3,
            SeatCount::Four => 4,
        }
    }

    pub fn decks(self) -> usize {
        match self {
            SeatCount::Three => 1,
            SeatCount::Four => 2,
        }
    }

    /// Cards dealt to each seat.
    pub fn share(self) -> usize {
        match self {
            SeatCount::Three => 17,
            SeatCount::Four => 25,
        }
    }

    /// Cards set aside for the landlord.
    pub fn reserve(self) -> usize {
        self.decks() * card::DECK_SIZE - self.players() * self.share()
    }
}

/// One accepted play, kept for undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRecord {
    pub player: String,
    pub cards: Vec<Card>,
    pub bomb: bool,
    /// Whether the bomb actually doubled K; false once K has reached its
    /// highest power of two.
    pub doubled: bool,
}

/// Result of a successful deal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deal {
    /// Seated players in turn order.
    pub seats: Vec<String>,
    /// Players released by the reset that preceded the deal and not dealt
    /// back in.
    pub released: Vec<String>,
}

/// Result of a successful play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayOutcome {
    pub bomb: bool,
    /// Cards left in the player's hand.
    pub remaining: usize,
    /// The player emptied their hand; the game must be resolved.
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct Game {
    phase: Phase,
    seats: Vec<String>,
    reserve: Vec<Card>,
    turn: usize,
    history: Vec<PlayRecord>,
    k: u32,
    initial_k: u32,
}

impl Game {
    /// Creates an idle game. `initial_k` is clamped to at least 1.
    pub fn new(initial_k: u32) -> Self {
        let initial_k = initial_k.max(1);
        Self {
            phase: Phase::Idle,
            seats: Vec::new(),
            reserve: Vec::new(),
            turn: 0,
            history: Vec::new(),
            k: initial_k,
            initial_k,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn seats(&self) -> &[String] {
        &self.seats
    }

    pub fn reserve(&self) -> &[Card] {
        &self.reserve
    }

    pub fn turn(&self) -> usize {
        self.turn
    }

    /// Name of the seat holding the turn, once the game has started.
    pub fn current_player(&self) -> Option<&str> {
        match self.phase {
            Phase::Started => self.seats.get(self.turn).map(String::as_str),
            _ => None,
        }
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn history(&self) -> &[PlayRecord] {
        &self.history
    }

    /// Deals a new game to `count` randomly chosen eligible players.
    ///
    /// A player is eligible unless they opted out with the always-spectator
    /// flag. Any deal in progress is abandoned first, but only once enough
    /// players are known to be available.
    pub fn deal<R: Rng + ?Sized>(
        &mut self,
        registry: &mut Registry,
        count: SeatCount,
        rng: &mut R,
    ) -> GameResult<Deal> {
        let eligible: Vec<String> = registry
            .players()
            .filter(|p| !p.always_spectator)
            .map(|p| p.name.clone())
            .collect();
        if eligible.len() < count.players() {
            return Err(GameError::NotEnoughPlayers {
                needed: count.players(),
                available: eligible.len(),
            });
        }

        let previous = self.reset(registry);

        let mut seats: Vec<String> = eligible
            .choose_multiple(rng, count.players())
            .cloned()
            .collect();
        seats.shuffle(rng);

        let mut deck = card::deck(count.decks());
        deck.shuffle(rng);

        let mut hands = deck.chunks(count.share());
        for name in &seats {
            let hand = hands.next().map(<[Card]>::to_vec).unwrap_or_default();
            if let Some(player) = registry.player_mut(name) {
                player.set_hand(hand);
                player.role = Role::Unassigned;
            }
        }
        self.reserve = deck[count.players() * count.share()..].to_vec();
        card::sort_by_rank(&mut self.reserve);

        let released = previous
            .into_iter()
            .filter(|name| !seats.contains(name))
            .collect();

        debug!("Dealt {:?} with {} reserve cards", seats, self.reserve.len());
        self.seats = seats.clone();
        self.phase = Phase::WaitingForLandlord;
        Ok(Deal { seats, released })
    }

    /// Gives the reserve to `name` and starts the game with them as landlord.
    ///
    /// The claimant moves to the first seat and the others keep their
    /// relative order, numbered as peasants from 1.
    pub fn claim_landlord(&mut self, registry: &mut Registry, name: &str) -> GameResult<()> {
        if self.phase != Phase::WaitingForLandlord {
            return Err(GameError::NotWaitingForLandlord);
        }
        let pos = self
            .seats
            .iter()
            .position(|seat| seat == name)
            .ok_or(GameError::NotSeated)?;
        let claimant = registry
            .player_mut(name)
            .ok_or_else(|| GameError::UnknownPlayer(name.to_string()))?;
        if claimant.role != Role::Unassigned {
            return Err(GameError::AlreadyAssigned);
        }

        claimant.add_cards(&self.reserve);
        self.reserve.clear();

        let landlord = self.seats.remove(pos);
        self.seats.insert(0, landlord);
        for (index, seat) in self.seats.iter().enumerate() {
            if let Some(player) = registry.player_mut(seat) {
                player.role = if index == 0 {
                    Role::Landlord
                } else {
                    Role::Peasant(index as u8)
                };
            }
        }

        self.k = self.initial_k;
        self.turn = 0;
        self.phase = Phase::Started;
        Ok(())
    }

    /// Plays `cards` from the hand of `name`.
    ///
    /// An empty play is a pass. Nothing changes when the play is rejected.
    pub fn play(&mut self, registry: &mut Registry, name: &str, cards: &[Card]) -> GameResult<PlayOutcome> {
        if self.phase != Phase::Started {
            return Err(GameError::NotStarted);
        }
        if self.current_player() != Some(name) {
            return Err(GameError::NotYourTurn);
        }
        let player = registry
            .player_mut(name)
            .ok_or_else(|| GameError::UnknownPlayer(name.to_string()))?;
        if !player.remove_cards(cards) {
            return Err(GameError::MissingCards);
        }
        let remaining = player.hand.len();

        let bomb = card::classify_bomb(cards);
        // K saturates at the top bit; undo halves only a K that was doubled
        let doubled = bomb && self.k.leading_zeros() > 0;
        if doubled {
            self.k <<= 1;
        }

        let mut played = cards.to_vec();
        card::sort_by_rank(&mut played);
        self.history.push(PlayRecord {
            player: name.to_string(),
            cards: played,
            bomb,
            doubled,
        });
        self.turn = (self.turn + 1) % self.seats.len();

        Ok(PlayOutcome {
            bomb,
            remaining,
            finished: remaining == 0,
        })
    }

    /// Takes back the most recent play, which must belong to `name`.
    pub fn undo(&mut self, registry: &mut Registry, name: &str) -> GameResult<PlayRecord> {
        let last = self.history.last().ok_or(GameError::NothingToUndo)?;
        if last.player != name {
            return Err(GameError::NotLastPlayer);
        }
        let player = registry
            .player_mut(name)
            .ok_or_else(|| GameError::UnknownPlayer(name.to_string()))?;

        let Some(record) = self.history.pop() else {
            return Err(GameError::NothingToUndo);
        };
        player.add_cards(&record.cards);
        if record.doubled {
            self.k = (self.k >> 1).max(1);
        }
        let seats = self.seats.len();
        self.turn = (self.turn + seats - 1) % seats;
        Ok(record)
    }

    /// Flips the always-spectator flag of `name` and returns the new value.
    pub fn toggle_spectator(&self, registry: &mut Registry, name: &str) -> GameResult<bool> {
        let player = registry
            .player_mut(name)
            .ok_or_else(|| GameError::UnknownPlayer(name.to_string()))?;
        player.always_spectator = !player.always_spectator;
        Ok(player.always_spectator)
    }

    /// Engaged players and their roles, in join order.
    pub fn participants(&self, registry: &Registry) -> Vec<(String, Role)> {
        registry
            .players()
            .filter(|p| p.is_engaged())
            .map(|p| (p.name.clone(), p.role))
            .collect()
    }

    /// Returns to idle. Every seated player still registered becomes a
    /// spectator with an empty hand.
    ///
    /// # Returns
    ///
    /// The names of the released players, for syncing.
    pub fn reset(&mut self, registry: &mut Registry) -> Vec<String> {
        let mut released = Vec::new();
        for name in self.seats.drain(..) {
            if let Some(player) = registry.player_mut(&name) {
                player.release();
                released.push(name);
            }
        }
        self.reserve.clear();
        self.history.clear();
        self.turn = 0;
        self.k = self.initial_k;
        self.phase = Phase::Idle;
        released
    }
}
