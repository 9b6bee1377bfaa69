//! Error types for the Landlord server.
//!
//! Errors are grouped by how they are surfaced:
//!
//! * [`ProtocolError`] - the connection is closed, nobody else is told.
//! * [`GameError`], [`CommandError`] and [`crate::card::CardError`] - reported
//!   privately to the issuing player, table state untouched.
//! * [`RatingError`] - broadcast to the whole table, which still resets.
//! * [`ServerError`] - orchestrator failures (binding, actor shutdown).

use crate::card::CardError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Framing and handshake failures. Any of these ends the connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("stream closed after {read} of {expected} frame bytes")]
    Truncated { expected: usize, read: usize },

    #[error("frame of {0} bytes exceeds the {1} byte limit")]
    FrameTooLarge(usize, usize),

    #[error("frame body is not valid UTF-8")]
    InvalidUtf8,

    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a join message, got {0}")]
    ExpectedJoin(&'static str),

    #[error("player name cannot be empty")]
    EmptyName,

    #[error("name {0} is already taken")]
    DuplicateName(String),
}

/// Rejections from the game state machine.
///
/// The display strings are sent verbatim to players in `error` envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("not enough players: {needed} needed, {available} available")]
    NotEnoughPlayers { needed: usize, available: usize },

    #[error("not waiting for a landlord")]
    NotWaitingForLandlord,

    #[error("you are not seated in this game")]
    NotSeated,

    #[error("a landlord has already been chosen")]
    AlreadyAssigned,

    #[error("game not started")]
    NotStarted,

    #[error("not your turn")]
    NotYourTurn,

    #[error("you don't have these cards")]
    MissingCards,

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("the last player is not you")]
    NotLastPlayer,

    #[error("no player named {0}")]
    UnknownPlayer(String),
}

/// Command-line parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}', use help to list available commands")]
    Unknown(String),
}

/// Rating store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read rating store {0}: {1}")]
    Read(PathBuf, io::Error),

    #[error("failed to write rating store {0}: {1}")]
    Write(PathBuf, io::Error),

    #[error("rating store {0} is corrupt: {1}")]
    Corrupt(PathBuf, serde_json::Error),

    #[error("stored rating for {name} is not a number: {value}")]
    InvalidValue { name: String, value: String },
}

/// Rating resolution failures. No rating is written when one occurs.
#[derive(Debug, Error)]
pub enum RatingError {
    #[error("no landlord, cannot calculate rating")]
    NoLandlord,

    #[error("{0} landlords, cannot calculate rating")]
    MultipleLandlords(usize),

    #[error("no peasants, cannot calculate rating")]
    NoPeasants,

    #[error("rating store error: {0}")]
    Store(#[from] StoreError),
}

/// Everything that can go wrong while handling one player request.
#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Card(#[from] CardError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Orchestrator-level failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type TableResult<T> = Result<T, TableError>;
pub type GameResult<T> = Result<T, GameError>;
