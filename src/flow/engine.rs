//! Compiled flow: the phase/turn finite-state machine.
//!
//! `Flow::compile` turns a `FlowConfig` into:
//! - the closed, ordered set of events enabled for the game,
//! - a transition function `(event, G, ctx, args) -> ctx'`,
//! - the automatic end conditions the reducer runs after each action.
//!
//! Everything here is a pure function of the configuration and its inputs.

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use super::config::{FlowConfig, PhaseConfig, PhaseCycle};
use super::turn_order::TurnOrder;
use crate::core::{Ctx, DefinitionError, FlowError, GameResult, PlayerId, PlayerSet};

/// Engine-level events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    /// End the current turn.
    #[serde(rename = "endTurn")]
    EndTurn,
    /// Advance to another phase.
    #[serde(rename = "endPhase")]
    EndPhase,
    /// Force the game over.
    #[serde(rename = "endGame")]
    EndGame,
    /// Replace the set of seats allowed to act.
    #[serde(rename = "setActionPlayers")]
    SetActionPlayers,
}

impl EventName {
    /// All events, in canonical order.
    pub const ALL: [EventName; 4] = [
        EventName::EndTurn,
        EventName::EndPhase,
        EventName::EndGame,
        EventName::SetActionPlayers,
    ];

    /// Wire name of the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EventName::EndTurn => "endTurn",
            EventName::EndPhase => "endPhase",
            EventName::EndGame => "endGame",
            EventName::SetActionPlayers => "setActionPlayers",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| FlowError::UnknownEvent(s.to_string()))
    }
}

/// Compiled phase/turn state machine for one game definition.
pub struct Flow<G> {
    config: FlowConfig<G>,
    phase_index: FxHashMap<String, usize>,
    event_names: Vec<EventName>,
}

impl<G> Flow<G> {
    /// Validate a flow configuration against the game's declared moves.
    pub fn compile(config: FlowConfig<G>, move_names: &[String]) -> Result<Self, DefinitionError> {
        let mut phase_index = FxHashMap::default();

        for (i, phase) in config.phases.iter().enumerate() {
            if phase.name.is_empty() {
                return Err(DefinitionError::InvalidName(phase.name.clone()));
            }
            if phase_index.insert(phase.name.clone(), i).is_some() {
                return Err(DefinitionError::DuplicatePhase(phase.name.clone()));
            }
            if let Some(unknown) = phase
                .moves
                .iter()
                .flatten()
                .find(|m| !move_names.contains(m))
            {
                return Err(DefinitionError::UnknownPhaseMove {
                    phase: phase.name.clone(),
                    name: unknown.clone(),
                });
            }
        }

        let referenced = config
            .phases
            .iter()
            .filter_map(|p| p.next.as_ref())
            .chain(config.start_phase.as_ref());
        for name in referenced {
            if !phase_index.contains_key(name) {
                return Err(DefinitionError::UnknownPhase(name.clone()));
            }
        }

        let event_names = compute_event_names(&config);

        Ok(Self {
            config,
            phase_index,
            event_names,
        })
    }

    /// Events enabled for this game, in canonical order.
    ///
    /// A pure function of the configuration: identical definitions always
    /// yield identical, identically ordered sets.
    #[must_use]
    pub fn event_names(&self) -> &[EventName] {
        &self.event_names
    }

    /// Check whether an event name is enabled.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.event_names.iter().any(|e| e.as_str() == name)
    }

    /// Declared phases.
    #[must_use]
    pub fn phases(&self) -> &[PhaseConfig<G>] {
        &self.config.phases
    }

    /// Look up a phase by name.
    #[must_use]
    pub fn phase(&self, name: &str) -> Option<&PhaseConfig<G>> {
        self.phase_index.get(name).map(|&i| &self.config.phases[i])
    }

    /// The phase named by `ctx.phase`, if any.
    #[must_use]
    pub fn active_phase(&self, ctx: &Ctx) -> Option<&PhaseConfig<G>> {
        ctx.phase.as_deref().and_then(|name| self.phase(name))
    }

    /// Turn order in effect for `ctx`.
    #[must_use]
    pub fn turn_order(&self, ctx: &Ctx) -> &TurnOrder {
        self.active_phase(ctx)
            .and_then(|p| p.turn_order.as_ref())
            .unwrap_or(&self.config.turn_order)
    }

    /// Move subset of the active phase. `None` allows every declared move.
    #[must_use]
    pub fn allowed_moves(&self, ctx: &Ctx) -> Option<&[String]> {
        self.active_phase(ctx).and_then(|p| p.moves.as_deref())
    }

    /// Check whether the active phase permits `move_name`.
    #[must_use]
    pub fn is_move_allowed(&self, ctx: &Ctx, move_name: &str) -> bool {
        self.active_phase(ctx).map_or(true, |p| p.allows(move_name))
    }

    /// Check whether the active phase rejects unidentified actors.
    #[must_use]
    pub fn requires_identity(&self, ctx: &Ctx) -> bool {
        self.active_phase(ctx).is_some_and(|p| p.require_identity)
    }

    /// Build the turn-0 context for a match.
    pub fn initial_ctx(&self, num_players: usize) -> Result<Ctx, DefinitionError> {
        self.config.turn_order.validate(num_players)?;
        for phase in &self.config.phases {
            if let Some(order) = &phase.turn_order {
                order.validate(num_players)?;
            }
        }

        let mut ctx = Ctx::new(num_players);
        ctx.phase = self
            .config
            .start_phase
            .clone()
            .or_else(|| self.config.phases.first().map(|p| p.name.clone()));

        let order = self.turn_order(&ctx).clone();
        ctx.current_player = order.first(&ctx);
        ctx.action_players = order.action_players(&ctx, ctx.current_player);
        Ok(ctx)
    }

    /// Apply an event to the context.
    ///
    /// Fails with `UnknownEvent` if the event is not enabled for this game.
    pub fn apply_event(
        &self,
        name: &str,
        _g: &G,
        ctx: &Ctx,
        args: &[Value],
    ) -> Result<Ctx, FlowError> {
        if !self.is_enabled(name) {
            return Err(FlowError::UnknownEvent(name.to_string()));
        }

        match name.parse::<EventName>()? {
            EventName::EndTurn => {
                let next = match args.first() {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(parse_seat(EventName::EndTurn, v, ctx.num_players)?),
                };
                Ok(self.end_turn(ctx, next))
            }
            EventName::EndPhase => {
                let target = match args.first() {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.as_str()),
                    Some(other) => {
                        return Err(invalid(
                            EventName::EndPhase,
                            format!("expected phase name, got {other}"),
                        ));
                    }
                };
                self.end_phase(ctx, target)
            }
            EventName::EndGame => {
                let result = match args.first() {
                    None | Some(Value::Null) => GameResult::Ended,
                    Some(v) => serde_json::from_value(v.clone())
                        .map_err(|e| invalid(EventName::EndGame, e.to_string()))?,
                };
                let mut next = ctx.clone();
                next.gameover = Some(result);
                Ok(next)
            }
            EventName::SetActionPlayers => {
                let ids: &[Value] = match args {
                    [Value::Array(ids)] => ids.as_slice(),
                    ids => ids,
                };
                let players = ids
                    .iter()
                    .map(|v| parse_seat(EventName::SetActionPlayers, v, ctx.num_players))
                    .collect::<Result<PlayerSet, _>>()?;
                let mut next = ctx.clone();
                next.action_players = players;
                Ok(next)
            }
        }
    }

    /// End the current turn, optionally handing it to an explicit player.
    #[must_use]
    pub fn end_turn(&self, ctx: &Ctx, next_player: Option<PlayerId>) -> Ctx {
        let order = self.turn_order(ctx);
        let current = next_player.unwrap_or_else(|| order.next(ctx));

        let mut next = ctx.clone();
        next.turn += 1;
        next.num_moves = 0;
        next.current_player = current;
        next.action_players = order.action_players(ctx, current);
        trace!(turn = next.turn, player = %current, "turn advanced");
        next
    }

    /// Leave the active phase for `target`, the configured next phase, or
    /// the following declared phase.
    pub fn end_phase(&self, ctx: &Ctx, target: Option<&str>) -> Result<Ctx, FlowError> {
        let next_phase = match target {
            Some(name) => {
                if !self.phase_index.contains_key(name) {
                    return Err(FlowError::UnknownPhase(name.to_string()));
                }
                Some(name.to_string())
            }
            None => self.following_phase(ctx),
        };

        let mut next = ctx.clone();
        next.phase = next_phase;

        let order = self.turn_order(&next).clone();
        next.current_player = order.first(&next);
        next.action_players = order.action_players(&next, next.current_player);
        trace!(phase = ?next.phase, player = %next.current_player, "phase advanced");
        Ok(next)
    }

    fn following_phase(&self, ctx: &Ctx) -> Option<String> {
        let current = self.active_phase(ctx)?;
        if let Some(next) = &current.next {
            return Some(next.clone());
        }

        let index = self.phase_index[&current.name];
        match self.config.phases.get(index + 1) {
            Some(phase) => Some(phase.name.clone()),
            None => match self.config.phase_cycle {
                PhaseCycle::Wrap => self.config.phases.first().map(|p| p.name.clone()),
                PhaseCycle::Terminate => None,
            },
        }
    }

    /// Evaluate the game's terminal check.
    #[must_use]
    pub fn check_end_game(&self, g: &G, ctx: &Ctx) -> Option<GameResult> {
        self.config.end_game_if.as_ref().and_then(|f| f(g, ctx))
    }

    /// Check the automatic end-of-turn conditions.
    #[must_use]
    pub fn should_end_turn(&self, g: &G, ctx: &Ctx) -> bool {
        let by_count = self
            .config
            .moves_per_turn
            .is_some_and(|limit| ctx.num_moves >= limit);
        by_count || self.config.end_turn_if.as_ref().is_some_and(|f| f(g, ctx))
    }

    /// Check the active phase's automatic end condition.
    #[must_use]
    pub fn should_end_phase(&self, g: &G, ctx: &Ctx) -> bool {
        self.active_phase(ctx)
            .and_then(|p| p.end_phase_if.as_ref())
            .is_some_and(|f| f(g, ctx))
    }
}

impl<G> fmt::Debug for Flow<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("config", &self.config)
            .field("event_names", &self.event_names)
            .finish()
    }
}

fn compute_event_names<G>(config: &FlowConfig<G>) -> Vec<EventName> {
    let toggles = &config.events;
    let has_phases = !config.phases.is_empty();

    EventName::ALL
        .into_iter()
        .filter(|event| match event {
            EventName::EndTurn => toggles.end_turn != Some(false),
            EventName::EndPhase => toggles.end_phase.unwrap_or(has_phases),
            EventName::EndGame => toggles.end_game == Some(true),
            EventName::SetActionPlayers => toggles.set_action_players == Some(true),
        })
        .collect()
}

fn parse_seat(event: EventName, value: &Value, num_players: usize) -> Result<PlayerId, FlowError> {
    PlayerId::parse(value)
        .filter(|p| p.is_seated(num_players))
        .ok_or_else(|| invalid(event, format!("{value} is not a seat")))
}

fn invalid(event: EventName, reason: String) -> FlowError {
    FlowError::InvalidArgs {
        event: event.as_str().to_string(),
        reason,
    }
}
