//! Declarative flow configuration.
//!
//! Games describe their turn structure with a `FlowConfig`: event toggles,
//! phases with per-phase move subsets and turn orders, and automatic end
//! conditions. `Flow::compile` validates it once; nothing here is consulted
//! in its raw form after that.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::turn_order::TurnOrder;
use crate::core::{Ctx, GameResult};

/// Predicate evaluated against `(G, ctx)` after moves and events.
pub type EndIf<G> = Arc<dyn Fn(&G, &Ctx) -> bool + Send + Sync>;

/// Terminal check evaluated against `(G, ctx)` after moves and events.
pub type EndGameIf<G> = Arc<dyn Fn(&G, &Ctx) -> Option<GameResult> + Send + Sync>;

/// Explicit event overrides.
///
/// `None` means "use the default": `endTurn` is on, `endPhase` is on when
/// phases are declared, `endGame` and `setActionPlayers` are off.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventToggles {
    /// `endTurn` override.
    pub end_turn: Option<bool>,
    /// `endPhase` override.
    pub end_phase: Option<bool>,
    /// `endGame` override.
    pub end_game: Option<bool>,
    /// `setActionPlayers` override.
    pub set_action_players: Option<bool>,
}

/// What `endPhase` does after the last declared phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseCycle {
    /// Return to the first declared phase.
    #[default]
    Wrap,
    /// Leave the phase sequence: `ctx.phase` becomes `None`.
    Terminate,
}

/// One named phase.
pub struct PhaseConfig<G> {
    /// Unique phase name.
    pub name: String,

    /// Moves allowed in this phase. `None` allows every declared move.
    pub moves: Option<Vec<String>>,

    /// Turn order while this phase is active. `None` uses the flow default.
    pub turn_order: Option<TurnOrder>,

    /// Phase entered by `endPhase`. `None` uses declaration order.
    pub next: Option<String>,

    /// Reject moves from unidentified actors in this phase.
    pub require_identity: bool,

    /// Automatic end condition.
    pub end_phase_if: Option<EndIf<G>>,
}

impl<G> PhaseConfig<G> {
    /// Create a phase allowing every move with the default turn order.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            moves: None,
            turn_order: None,
            next: None,
            require_identity: false,
            end_phase_if: None,
        }
    }

    /// Restrict the phase to the given moves.
    #[must_use]
    pub fn with_moves<I, S>(mut self, moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.moves = Some(moves.into_iter().map(Into::into).collect());
        self
    }

    /// Set the phase's turn order.
    #[must_use]
    pub fn with_turn_order(mut self, order: TurnOrder) -> Self {
        self.turn_order = Some(order);
        self
    }

    /// Set the phase entered after this one.
    #[must_use]
    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }

    /// Reject moves without a player identity.
    #[must_use]
    pub fn require_identity(mut self) -> Self {
        self.require_identity = true;
        self
    }

    /// End the phase automatically when `f` returns true.
    #[must_use]
    pub fn end_phase_if(mut self, f: impl Fn(&G, &Ctx) -> bool + Send + Sync + 'static) -> Self {
        self.end_phase_if = Some(Arc::new(f));
        self
    }

    /// Check whether a move is allowed in this phase.
    #[must_use]
    pub fn allows(&self, move_name: &str) -> bool {
        self.moves
            .as_ref()
            .map_or(true, |moves| moves.iter().any(|m| m == move_name))
    }
}

impl<G> Clone for PhaseConfig<G> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            moves: self.moves.clone(),
            turn_order: self.turn_order.clone(),
            next: self.next.clone(),
            require_identity: self.require_identity,
            end_phase_if: self.end_phase_if.clone(),
        }
    }
}

impl<G> fmt::Debug for PhaseConfig<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseConfig")
            .field("name", &self.name)
            .field("moves", &self.moves)
            .field("turn_order", &self.turn_order)
            .field("next", &self.next)
            .field("require_identity", &self.require_identity)
            .field("end_phase_if", &self.end_phase_if.is_some())
            .finish()
    }
}

/// Turn and phase structure of a game.
pub struct FlowConfig<G> {
    /// Event overrides.
    pub events: EventToggles,

    /// Declared phases, in order. Empty for phase-less games.
    pub phases: Vec<PhaseConfig<G>>,

    /// Phase active at setup. `None` starts in the first declared phase.
    pub start_phase: Option<String>,

    /// Behaviour after the last phase.
    pub phase_cycle: PhaseCycle,

    /// Turn order outside phases (or for phases without their own).
    pub turn_order: TurnOrder,

    /// End the turn automatically after this many moves.
    pub moves_per_turn: Option<u32>,

    /// End the turn automatically when this returns true.
    pub end_turn_if: Option<EndIf<G>>,

    /// Terminal check; a `Some` result becomes `ctx.gameover`.
    pub end_game_if: Option<EndGameIf<G>>,
}

impl<G> Default for FlowConfig<G> {
    fn default() -> Self {
        Self {
            events: EventToggles::default(),
            phases: Vec::new(),
            start_phase: None,
            phase_cycle: PhaseCycle::default(),
            turn_order: TurnOrder::default(),
            moves_per_turn: None,
            end_turn_if: None,
            end_game_if: None,
        }
    }
}

impl<G> FlowConfig<G> {
    /// Create an empty flow: one implicit phase, round robin, `endTurn` only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override event toggles.
    #[must_use]
    pub fn with_events(mut self, events: EventToggles) -> Self {
        self.events = events;
        self
    }

    /// Append a phase.
    #[must_use]
    pub fn with_phase(mut self, phase: PhaseConfig<G>) -> Self {
        self.phases.push(phase);
        self
    }

    /// Set the starting phase.
    #[must_use]
    pub fn with_start_phase(mut self, name: impl Into<String>) -> Self {
        self.start_phase = Some(name.into());
        self
    }

    /// Set the behaviour after the last phase.
    #[must_use]
    pub fn with_phase_cycle(mut self, cycle: PhaseCycle) -> Self {
        self.phase_cycle = cycle;
        self
    }

    /// Set the default turn order.
    #[must_use]
    pub fn with_turn_order(mut self, order: TurnOrder) -> Self {
        self.turn_order = order;
        self
    }

    /// End each turn after `n` moves.
    #[must_use]
    pub fn with_moves_per_turn(mut self, n: u32) -> Self {
        self.moves_per_turn = Some(n);
        self
    }

    /// End the turn automatically when `f` returns true.
    #[must_use]
    pub fn end_turn_if(mut self, f: impl Fn(&G, &Ctx) -> bool + Send + Sync + 'static) -> Self {
        self.end_turn_if = Some(Arc::new(f));
        self
    }
}

impl<G> Clone for FlowConfig<G> {
    fn clone(&self) -> Self {
        Self {
            events: self.events,
            phases: self.phases.clone(),
            start_phase: self.start_phase.clone(),
            phase_cycle: self.phase_cycle,
            turn_order: self.turn_order.clone(),
            moves_per_turn: self.moves_per_turn,
            end_turn_if: self.end_turn_if.clone(),
            end_game_if: self.end_game_if.clone(),
        }
    }
}

impl<G> fmt::Debug for FlowConfig<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowConfig")
            .field("events", &self.events)
            .field("phases", &self.phases)
            .field("start_phase", &self.start_phase)
            .field("phase_cycle", &self.phase_cycle)
            .field("turn_order", &self.turn_order)
            .field("moves_per_turn", &self.moves_per_turn)
            .finish_non_exhaustive()
    }
}
