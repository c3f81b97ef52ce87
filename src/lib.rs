//! # rust-tbg
//!
//! A deterministic engine for turn-based, multi-phase games.
//!
//! ## Design Principles
//!
//! 1. **Pure Reduction**: every state change is `reduce(state, action)`.
//!    The same snapshot and action always give the same snapshot.
//!
//! 2. **Game-Agnostic**: games supply a setup function, named moves, and a
//!    flow configuration. Turns, phases, and the end of the game are the
//!    engine's business.
//!
//! 3. **N-Player First**: every API takes the player count as context.
//!
//! 4. **Illegal Means Ignored**: a rejected action leaves the state
//!    untouched and is never surfaced as an error.
//!
//! ## Architecture
//!
//! - **Persistent Data Structures**: O(1) snapshot clones via `im-rs`, so
//!   undo checkpoints and tree search are cheap.
//!
//! - **One Writer**: a `Store` serializes reductions behind a mutex; any
//!   number of readers and subscribers.
//!
//! - **Optimistic Networking**: clients reduce locally and forward each
//!   accepted action; authoritative snapshots replace local state
//!   wholesale.
//!
//! ## Modules
//!
//! - `core`: players, context, actions, snapshots, RNG, errors
//! - `flow`: phases, turn order, events, automatic end conditions
//! - `game`: game definitions and the reducer
//! - `dispatch`: the state container and dispatcher tables
//! - `agent`: search agents and selection policies, including MCTS
//! - `client`: the client facade
//! - `net`: transport and persistence boundaries
//! - `games`: reference games

pub mod core;
pub mod flow;
pub mod game;
pub mod dispatch;
pub mod agent;
pub mod client;
pub mod net;
pub mod games;

// Re-export commonly used types
pub use crate::core::{
    Action, ActionPayload, Args, Checkpoint, Ctx, GameResult, GameRng, LogEntry, PlayerId,
    PlayerMap, PlayerSet, StateSnapshot,
};

pub use crate::core::{ClientError, DefinitionError, FlowError, StorageError, TransportError};

pub use crate::flow::{EventToggles, FlowConfig, PhaseConfig, PhaseCycle, TurnOrder};

pub use crate::game::{Game, GameData, GameDefinition, MoveContext, Rejection};

pub use crate::dispatch::{
    create_event_dispatchers, create_move_dispatchers, Applied, Dispatchers, Enhancer,
    IdentityPolicy, Store,
};

pub use crate::agent::{
    Agent, Candidate, FirstCandidate, Mcts, MctsConfig, SearchAgent, SelectionPolicy,
    UniformRandom,
};

pub use crate::client::{Client, ClientConfig, ClientState, PlayerBinding};

pub use crate::net::{
    FlatFileStorage, InMemoryStorage, LocalServer, LocalTransport, Master, Storage, Transport,
};
