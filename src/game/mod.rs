//! Game definitions and the reducer.
//!
//! A game is a `GameDefinition` compiled into a `Game`. The `Game` owns the
//! move table and the compiled flow, and exposes the pure reducer that every
//! other layer (dispatch, agents, the authoritative master) goes through.

pub mod definition;
pub mod reducer;

use std::fmt::Debug;

use serde::Serialize;

pub use definition::{Game, GameDefinition, MoveContext, MoveFn, SetupFn};
pub use reducer::Rejection;

/// Bounds every game payload `G` satisfies.
///
/// Snapshots are cloned on every reduction and compared by tests and the
/// authoritative copy; `Serialize` feeds persistence and state digests.
pub trait GameData: Clone + PartialEq + Debug + Serialize + Send + Sync + 'static {}

impl<T> GameData for T where T: Clone + PartialEq + Debug + Serialize + Send + Sync + 'static {}
