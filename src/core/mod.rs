//! Core engine types: players, context, actions, snapshots, RNG, errors.
//!
//! This module contains the fundamental building blocks that are
//! game-agnostic. Games describe themselves via `GameDefinition` rather than
//! modifying the core.

pub mod player;
pub mod context;
pub mod action;
pub mod state;
pub mod rng;
pub mod error;

pub use player::{PlayerId, PlayerMap, PlayerSet};
pub use context::{Ctx, GameResult};
pub use action::{Action, ActionPayload, Args, LogEntry};
pub use state::{Checkpoint, StateSnapshot};
pub use rng::{GameRng, GameRngState};
pub use error::{ClientError, DefinitionError, FlowError, StorageError, TransportError};
