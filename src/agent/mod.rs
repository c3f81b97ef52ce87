//! Search agents: pick and dispatch an action on a player's behalf.
//!
//! An agent is two pieces:
//! - an enumeration function listing candidate moves and events for a state
//! - a `SelectionPolicy` choosing among them
//!
//! `SearchAgent` glues them together and implements `Agent::step` once for
//! every policy: read the store, enumerate, select, then dispatch through
//! the same dispatcher tables a human caller uses. There is no privileged
//! path into the store.
//!
//! ## Policies
//!
//! - `UniformRandom`: the reference policy, seeded and reproducible
//! - `FirstCandidate`: always the first candidate
//! - `Mcts`: UCB1 tree search over `Game::reduce` with random rollouts

pub mod mcts;
pub mod random;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::core::{Action, Args, Ctx, PlayerId, StateSnapshot};
use crate::dispatch::{Dispatchers, Store};
use crate::game::{Game, GameData};

pub use mcts::{Mcts, MctsConfig, SearchStats};
pub use random::{FirstCandidate, UniformRandom};

/// Lists the candidates available in a state.
pub type EnumerateFn<G> = Arc<dyn Fn(&G, &Ctx) -> Vec<Candidate> + Send + Sync>;

/// A move or event an agent may dispatch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Candidate {
    /// A declared move.
    Move {
        /// Move name.
        name: String,
        /// Arguments.
        args: Args,
    },
    /// A flow event.
    Event {
        /// Event name.
        name: String,
        /// Arguments.
        args: Args,
    },
}

impl Candidate {
    /// A move candidate.
    pub fn make_move(name: impl Into<String>, args: impl IntoIterator<Item = Value>) -> Self {
        Candidate::Move {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    /// An event candidate.
    pub fn event(name: impl Into<String>, args: impl IntoIterator<Item = Value>) -> Self {
        Candidate::Event {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Move or event name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Candidate::Move { name, .. } | Candidate::Event { name, .. } => name,
        }
    }

    /// Arguments.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        match self {
            Candidate::Move { args, .. } | Candidate::Event { args, .. } => args,
        }
    }

    /// Build the action for this candidate.
    #[must_use]
    pub fn to_action(&self, player_id: Option<PlayerId>) -> Action {
        match self {
            Candidate::Move { name, args } => {
                Action::make_move(name.clone(), args.iter().cloned(), player_id)
            }
            Candidate::Event { name, args } => {
                Action::game_event(name.clone(), args.iter().cloned(), player_id)
            }
        }
    }
}

/// Something that can take a turn.
pub trait Agent<G: GameData>: Send {
    /// Candidates available in `(g, ctx)`.
    fn enumerate(&self, g: &G, ctx: &Ctx) -> Vec<Candidate>;

    /// Choose and dispatch one candidate.
    ///
    /// Returns the dispatched candidate, or `None` if there was nothing to
    /// do or the choice was rejected. An empty enumeration never touches
    /// the store.
    fn step(
        &mut self,
        store: &Store<G>,
        moves: &Dispatchers<G>,
        events: &Dispatchers<G>,
    ) -> Option<Candidate>;
}

/// Everything a policy may look at when choosing.
pub struct SearchContext<'a, G: GameData> {
    /// The game, for simulating candidates with `reduce`.
    pub game: &'a Game<G>,
    /// The state being decided on.
    pub state: &'a StateSnapshot<G>,
    /// Candidates for `state`, never empty.
    pub candidates: &'a [Candidate],
    /// Enumeration for states reached during search.
    pub enumerate: &'a (dyn Fn(&G, &Ctx) -> Vec<Candidate> + Send + Sync),
}

/// Chooses one candidate.
pub trait SelectionPolicy<G: GameData>: Send {
    /// Index into `search.candidates`, or `None` to pass.
    fn select(&mut self, search: &SearchContext<'_, G>) -> Option<usize>;
}

/// An agent built from an enumeration function and a selection policy.
pub struct SearchAgent<G: GameData, P> {
    enumerate: EnumerateFn<G>,
    policy: P,
}

impl<G: GameData, P: SelectionPolicy<G>> SearchAgent<G, P> {
    /// Create an agent.
    pub fn new(
        enumerate: impl Fn(&G, &Ctx) -> Vec<Candidate> + Send + Sync + 'static,
        policy: P,
    ) -> Self {
        Self {
            enumerate: Arc::new(enumerate),
            policy,
        }
    }

    /// Create an agent sharing an existing enumeration function.
    pub fn from_shared(enumerate: EnumerateFn<G>, policy: P) -> Self {
        Self { enumerate, policy }
    }

    /// The selection policy.
    #[must_use]
    pub fn policy(&self) -> &P {
        &self.policy
    }
}

impl<G: GameData, P: SelectionPolicy<G>> Agent<G> for SearchAgent<G, P> {
    fn enumerate(&self, g: &G, ctx: &Ctx) -> Vec<Candidate> {
        (self.enumerate)(g, ctx)
    }

    fn step(
        &mut self,
        store: &Store<G>,
        moves: &Dispatchers<G>,
        events: &Dispatchers<G>,
    ) -> Option<Candidate> {
        let state = store.state();
        if !state.is_active() {
            return None;
        }

        let candidates = self.enumerate(&state.g, &state.ctx);
        if candidates.is_empty() {
            trace!(turn = state.ctx.turn, "no candidates");
            return None;
        }

        let search = SearchContext {
            game: store.game(),
            state: &state,
            candidates: &candidates,
            enumerate: &*self.enumerate,
        };
        let chosen = self
            .policy
            .select(&search)
            .and_then(|i| candidates.get(i))?
            .clone();

        let table = match chosen {
            Candidate::Move { .. } => moves,
            Candidate::Event { .. } => events,
        };
        if table.call(chosen.name(), chosen.args().iter().cloned()) {
            Some(chosen)
        } else {
            debug!(name = chosen.name(), "agent choice rejected");
            None
        }
    }
}

impl<G: GameData, P: fmt::Debug> fmt::Debug for SearchAgent<G, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchAgent")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Seat that acts in `ctx` during simulation: the current player if they
/// may act, otherwise the lowest seat that may.
pub(crate) fn simulated_actor(ctx: &Ctx) -> Option<PlayerId> {
    if ctx.can_act(ctx.current_player) {
        Some(ctx.current_player)
    } else {
        ctx.action_players.iter().next().copied()
    }
}
