//! Game definitions: the declarative input to the engine.
//!
//! A `GameDefinition` names the game's moves, its flow, its terminal check,
//! and which moves can be undone. `build()` validates everything once and
//! produces an immutable `Game` that the reducer, dispatch layer, and
//! agents share through an `Arc`.
//!
//! ## Example
//!
//! ```
//! use rust_tbg::core::{GameResult, PlayerId};
//! use rust_tbg::game::GameDefinition;
//!
//! let game = GameDefinition::new("counter")
//!     .with_setup(|_| 0i32)
//!     .with_move("inc", |g: &i32, _, _| g + 1)
//!     .end_game_if(|g: &i32, _| (*g >= 3).then_some(GameResult::Winner(PlayerId::new(0))))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(game.move_names(), ["inc"]);
//! assert_eq!(game.event_names(), ["endTurn"]);
//! ```

use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;

use crate::core::{Ctx, DefinitionError, GameResult, PlayerId, StateSnapshot};
use crate::flow::{Flow, FlowConfig};

use super::GameData;

/// Produces the initial `G` for a player count.
pub type SetupFn<G> = Arc<dyn Fn(usize) -> G + Send + Sync>;

/// A move handler. `None` marks the move invalid for these arguments.
pub type MoveFn<G> = Arc<dyn Fn(&G, &MoveContext<'_>, &[Value]) -> Option<G> + Send + Sync>;

/// What a move handler sees besides `G` and its arguments.
#[derive(Clone, Copy, Debug)]
pub struct MoveContext<'a> {
    /// Engine metadata before the move.
    pub ctx: &'a Ctx,

    /// Acting seat as resolved by the dispatch layer.
    pub player_id: Option<PlayerId>,
}

/// Builder for a game.
pub struct GameDefinition<G> {
    name: String,
    setup: Option<SetupFn<G>>,
    moves: Vec<(String, MoveFn<G>)>,
    flow: FlowConfig<G>,
    undoable: Vec<String>,
    num_players: usize,
    min_players: usize,
    max_players: usize,
}

impl<G: GameData> GameDefinition<G> {
    /// Start a definition with no moves and an empty flow.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            setup: None,
            moves: Vec::new(),
            flow: FlowConfig::default(),
            undoable: Vec::new(),
            num_players: 2,
            min_players: 1,
            max_players: 255,
        }
    }

    /// Set the function producing the initial `G`.
    #[must_use]
    pub fn with_setup(mut self, setup: impl Fn(usize) -> G + Send + Sync + 'static) -> Self {
        self.setup = Some(Arc::new(setup));
        self
    }

    /// Declare a move that always succeeds.
    #[must_use]
    pub fn with_move(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&G, &MoveContext<'_>, &[Value]) -> G + Send + Sync + 'static,
    ) -> Self {
        self.moves.push((
            name.into(),
            Arc::new(move |g: &G, ctx: &MoveContext<'_>, args: &[Value]| Some(handler(g, ctx, args))),
        ));
        self
    }

    /// Declare a move that may reject its arguments by returning `None`.
    #[must_use]
    pub fn with_fallible_move(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&G, &MoveContext<'_>, &[Value]) -> Option<G> + Send + Sync + 'static,
    ) -> Self {
        self.moves.push((name.into(), Arc::new(handler)));
        self
    }

    /// Set the flow configuration.
    #[must_use]
    pub fn with_flow(mut self, flow: FlowConfig<G>) -> Self {
        let end_game_if = self.flow.end_game_if.take();
        self.flow = flow;
        if self.flow.end_game_if.is_none() {
            self.flow.end_game_if = end_game_if;
        }
        self
    }

    /// Set the terminal check.
    #[must_use]
    pub fn end_game_if(
        mut self,
        f: impl Fn(&G, &Ctx) -> Option<GameResult> + Send + Sync + 'static,
    ) -> Self {
        self.flow.end_game_if = Some(Arc::new(f));
        self
    }

    /// Mark moves as undoable.
    #[must_use]
    pub fn undoable_moves<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.undoable.extend(names.into_iter().map(Into::into));
        self
    }

    /// Default player count for new matches.
    #[must_use]
    pub fn with_num_players(mut self, n: usize) -> Self {
        self.num_players = n;
        self
    }

    /// Supported player count range.
    #[must_use]
    pub fn with_player_range(mut self, min: usize, max: usize) -> Self {
        self.min_players = min;
        self.max_players = max;
        self
    }

    /// Validate the definition and compile its flow.
    pub fn build(self) -> Result<Game<G>, DefinitionError> {
        let setup = self
            .setup
            .ok_or_else(|| DefinitionError::MissingSetup(self.name.clone()))?;

        let mut moves = FxHashMap::default();
        let mut move_names = Vec::with_capacity(self.moves.len());
        for (name, handler) in self.moves {
            if name.is_empty() {
                return Err(DefinitionError::InvalidName(name));
            }
            if moves.insert(name.clone(), handler).is_some() {
                return Err(DefinitionError::DuplicateMove(name));
            }
            move_names.push(name);
        }

        let mut undoable = FxHashSet::default();
        for name in self.undoable {
            if !moves.contains_key(&name) {
                return Err(DefinitionError::UnknownUndoableMove(name));
            }
            undoable.insert(name);
        }

        let flow = Flow::compile(self.flow, &move_names)?;

        let game = Game {
            name: self.name,
            setup,
            moves,
            move_names,
            flow,
            undoable,
            num_players: self.num_players,
            min_players: self.min_players.max(1),
            max_players: self.max_players.min(255),
        };
        game.check_player_count(game.num_players)?;
        Ok(game)
    }
}

/// A compiled, immutable game.
pub struct Game<G> {
    name: String,
    setup: SetupFn<G>,
    pub(crate) moves: FxHashMap<String, MoveFn<G>>,
    move_names: Vec<String>,
    pub(crate) flow: Flow<G>,
    pub(crate) undoable: FxHashSet<String>,
    num_players: usize,
    min_players: usize,
    max_players: usize,
}

impl<G: GameData> Game<G> {
    /// Game name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared moves, in declaration order.
    #[must_use]
    pub fn move_names(&self) -> &[String] {
        &self.move_names
    }

    /// Enabled events, in canonical order.
    #[must_use]
    pub fn event_names(&self) -> Vec<&'static str> {
        self.flow.event_names().iter().map(|e| e.as_str()).collect()
    }

    /// The compiled flow.
    #[must_use]
    pub fn flow(&self) -> &Flow<G> {
        &self.flow
    }

    /// Check whether a move pushes an undo checkpoint.
    #[must_use]
    pub fn is_undoable(&self, move_name: &str) -> bool {
        self.undoable.contains(move_name)
    }

    /// Default player count.
    #[must_use]
    pub fn num_players(&self) -> usize {
        self.num_players
    }

    /// Build the initial snapshot for a match.
    ///
    /// Fails before any state exists if the player count is out of range or
    /// a turn order names a seat that does not exist.
    pub fn initial_state(&self, num_players: usize) -> Result<StateSnapshot<G>, DefinitionError> {
        self.check_player_count(num_players)?;
        let ctx = self.flow.initial_ctx(num_players)?;
        let g = (self.setup)(num_players);
        Ok(StateSnapshot::new(g, ctx))
    }

    fn check_player_count(&self, requested: usize) -> Result<(), DefinitionError> {
        if (self.min_players..=self.max_players).contains(&requested) {
            Ok(())
        } else {
            Err(DefinitionError::PlayerCount {
                requested,
                min: self.min_players,
                max: self.max_players,
            })
        }
    }
}

impl<G> fmt::Debug for Game<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("name", &self.name)
            .field("moves", &self.move_names)
            .field("flow", &self.flow)
            .field("num_players", &self.num_players)
            .finish_non_exhaustive()
    }
}
