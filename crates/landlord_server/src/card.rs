//! Card model for Landlord tables.
//!
//! Suits are not modelled: a card is one of fifteen ranks, written on the
//! wire as a single symbol. The thirteen ordinary ranks appear four times per
//! deck, the two jokers once each.
//!
//! | symbol | rank |
//! |--------|------|
//! | `3`..`9` | three to nine |
//! | `X` | ten |
//! | `J` `Q` `K` `A` | face cards and ace |
//! | `2` | two (highest ordinary rank) |
//! | `Y` | black joker |
//! | `Z` | red joker |

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single card rank, ordered from lowest (`3`) to highest (`Z`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Card {
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
    Two,
    BlackJoker,
    RedJoker,
}

/// Errors produced while reading card symbols.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    #[error("unknown card '{0}'")]
    UnknownSymbol(char),
}

/// Number of cards in a single deck: 13 ranks x 4 copies + 2 jokers.
pub const DECK_SIZE: usize = 54;

impl Card {
    /// Every rank in ascending order.
    pub const ALL: [Card; 15] = [
        Card::Three,
        Card::Four,
        Card::Five,
        Card::Six,
        Card::Seven,
        Card::Eight,
        Card::Nine,
        Card::Ten,
        Card::Jack,
        Card::Queen,
        Card::King,
        Card::Ace,
        Card::Two,
        Card::BlackJoker,
        Card::RedJoker,
    ];

    /// Position in the fixed rank table, `0` for `3` up to `14` for `Z`.
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn symbol(self) -> char {
        match self {
            Card::Three => '3',
            Card::Four => '4',
            Card::Five => '5',
            Card::Six => '6',
            Card::Seven => '7',
            Card::Eight => '8',
            Card::Nine => '9',
            Card::Ten => 'X',
            Card::Jack => 'J',
            Card::Queen => 'Q',
            Card::King => 'K',
            Card::Ace => 'A',
            Card::Two => '2',
            Card::BlackJoker => 'Y',
            Card::RedJoker => 'Z',
        }
    }

    /// Looks up a card by symbol. Letters are accepted in either case.
    pub fn from_symbol(symbol: char) -> Option<Card> {
        let upper = symbol.to_ascii_uppercase();
        Card::ALL.iter().copied().find(|card| card.symbol() == upper)
    }

    pub fn is_joker(self) -> bool {
        matches!(self, Card::BlackJoker | Card::RedJoker)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl TryFrom<char> for Card {
    type Error = CardError;

    fn try_from(symbol: char) -> Result<Self, Self::Error> {
        Card::from_symbol(symbol).ok_or(CardError::UnknownSymbol(symbol))
    }
}

/// Parses a concatenated symbol string such as `"3345Z"`.
///
/// Whitespace between symbols is ignored so that `"33 44"` and `"3344"` name
/// the same cards.
pub fn parse_cards(text: &str) -> Result<Vec<Card>, CardError> {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(Card::try_from)
        .collect()
}

/// Renders cards back into their concatenated symbol form.
pub fn format_cards(cards: &[Card]) -> String {
    cards.iter().map(|card| card.symbol()).collect()
}

/// Builds `copies` full decks in rank order, ready to be shuffled.
pub fn deck(copies: usize) -> Vec<Card> {
    let mut cards = Vec::with_capacity(DECK_SIZE * copies);
    for _ in 0..copies {
        for card in Card::ALL {
            let count = if card.is_joker() { 1 } else { 4 };
            cards.extend(std::iter::repeat(card).take(count));
        }
    }
    cards
}

/// Stable ascending sort by rank.
pub fn sort_by_rank(cards: &mut [Card]) {
    cards.sort_by_key(|card| card.rank());
}

/// Returns `true` when a play counts as a bomb.
///
/// Two shapes qualify:
///
/// * four or more cards of a single rank;
/// * a play made only of jokers that contains both the black and the red
///   joker. The length is not bounded, so with two decks `YYZ` or `YYZZ`
///   also qualify.
pub fn classify_bomb(cards: &[Card]) -> bool {
    if cards.len() < 2 {
        return false;
    }

    let same_rank = cards.windows(2).all(|pair| pair[0] == pair[1]);
    if same_rank && cards.len() >= 4 {
        return true;
    }

    cards.iter().all(|card| card.is_joker())
        && cards.contains(&Card::BlackJoker)
        && cards.contains(&Card::RedJoker)
}

/// Returns `true` when every card of `candidate` can be taken from `hand`,
/// counting duplicates.
pub fn is_sub_multiset(candidate: &[Card], hand: &[Card]) -> bool {
    let mut counts = [0usize; 15];
    for card in hand {
        counts[card.rank() as usize] += 1;
    }
    for card in candidate {
        let slot = &mut counts[card.rank() as usize];
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
    }
    true
}

/// Serde adapter that stores a card list as its concatenated symbol string.
pub mod symbols {
    use super::{format_cards, parse_cards, Card};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(cards: &[Card], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_cards(cards))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Card>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        parse_cards(&text).map_err(D::Error::custom)
    }
}

impl Serialize for Card {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_char(self.symbol())
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let symbol = char::deserialize(deserializer)?;
        Card::try_from(symbol).map_err(serde::de::Error::custom)
    }
}
