//! Error types.
//!
//! Illegal actions are not errors: the reducer drops them and returns the
//! state unchanged. These types cover misconfiguration (fail fast at
//! construction) and the external collaborators.

use thiserror::Error;

/// A game definition that cannot be compiled.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// No setup function was provided.
    #[error("game `{0}` has no setup function")]
    MissingSetup(String),

    /// Two moves share a name.
    #[error("move `{0}` is declared twice")]
    DuplicateMove(String),

    /// Two phases share a name.
    #[error("phase `{0}` is declared twice")]
    DuplicatePhase(String),

    /// A phase lists a move the game never declares.
    #[error("phase `{phase}` allows undeclared move `{name}`")]
    UnknownPhaseMove {
        /// Phase naming the move.
        phase: String,
        /// The undeclared move.
        name: String,
    },

    /// `undoable_moves` names a move the game never declares.
    #[error("undoable move `{0}` is not declared")]
    UnknownUndoableMove(String),

    /// A phase transition or start phase names an undeclared phase.
    #[error("phase `{0}` is not declared")]
    UnknownPhase(String),

    /// A move or phase name is reserved or empty.
    #[error("`{0}` is not a valid name")]
    InvalidName(String),

    /// Player count outside the definition's bounds.
    #[error("{requested} players requested, game supports {min}..={max}")]
    PlayerCount {
        /// Requested seats.
        requested: usize,
        /// Minimum seats.
        min: usize,
        /// Maximum seats.
        max: usize,
    },

    /// A custom turn order names a seat that does not exist.
    #[error("turn order names seat {seat} but the match has {num_players} players")]
    TurnOrderSeat {
        /// Offending seat.
        seat: u8,
        /// Seats in the match.
        num_players: usize,
    },
}

/// Failure applying a flow event. The reducer absorbs these as rejections.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FlowError {
    /// Event not enabled for this game.
    #[error("event `{0}` is not enabled")]
    UnknownEvent(String),

    /// Event arguments could not be interpreted.
    #[error("invalid arguments for `{event}`: {reason}")]
    InvalidArgs {
        /// Event name.
        event: String,
        /// What was wrong.
        reason: String,
    },

    /// `endPhase` named a phase that does not exist.
    #[error("phase `{0}` is not declared")]
    UnknownPhase(String),
}

/// Persistence backend failure.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding failure.
    #[error("snapshot encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Match identifiers become file names and must be simple.
    #[error("invalid match id `{0}`")]
    InvalidMatchId(String),
}

/// Transport failure.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport has no channel to the authoritative copy.
    #[error("transport is not connected")]
    NotConnected,

    /// The authoritative copy does not know the match.
    #[error("match `{0}` not found")]
    MatchNotFound(String),

    /// Storage failure on the authoritative side.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The match could not be set up.
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Client construction or configuration failure.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Definition rejected the configured player count.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// Configuration could not be parsed.
    #[error("invalid client config: {0}")]
    Config(#[from] serde_json::Error),
}
