//! The reducer: `(state, action) -> state`.
//!
//! `Game::reduce` is the only way a snapshot changes. It is pure and
//! deterministic: identical inputs always produce identical outputs, so an
//! authoritative copy can replay a client's actions and land on the same
//! state.
//!
//! ## Rejection
//!
//! Illegal actions never raise. `reduce` returns the input unchanged and
//! logs why at `debug`. Callers that need the reason (the authoritative
//! master, tests) use `try_reduce`.
//!
//! ## Automatic transitions
//!
//! After an accepted move the reducer checks, in order: the terminal
//! condition, the phase's end condition, then the turn's end condition.
//! Each runs at most once per action. After an event only the first two
//! run. A terminal result stops the chain.
//!
//! ## Undo
//!
//! An undoable move pushes a checkpoint of the pre-move state; any other
//! move or any event clears the undo stack. Automatic transitions caused by
//! the move do not clear it, so undo always restores the exact pre-move
//! state. Any new move or event clears the redo stack. Once the game is
//! over, undo and redo are refused like any other action.

use thiserror::Error;
use tracing::{debug, trace};

use crate::core::{Action, ActionPayload, Checkpoint, Ctx, FlowError, LogEntry, PlayerId, StateSnapshot};

use super::definition::{Game, MoveContext};
use super::GameData;

/// Why an action was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The game is over.
    #[error("game is over")]
    GameOver,

    /// The move is not declared.
    #[error("move `{0}` is not declared")]
    UnknownMove(String),

    /// The active phase does not allow the move.
    #[error("move `{name}` is not allowed in phase `{phase}`")]
    NotInPhase {
        /// Move name.
        name: String,
        /// Active phase.
        phase: String,
    },

    /// The actor is not permitted to act.
    #[error("player {0} may not act now")]
    NotActionPlayer(PlayerId),

    /// The phase requires an identified actor.
    #[error("an identified player is required")]
    MissingIdentity,

    /// The move handler rejected its arguments.
    #[error("move `{0}` rejected its arguments")]
    InvalidMove(String),

    /// The flow rejected the event.
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// Nothing to undo.
    #[error("nothing to undo")]
    NothingToUndo,

    /// Nothing to redo.
    #[error("nothing to redo")]
    NothingToRedo,
}

impl<G: GameData> Game<G> {
    /// Apply an action, returning the input unchanged if it is illegal.
    #[must_use]
    pub fn reduce(&self, state: &StateSnapshot<G>, action: &Action) -> StateSnapshot<G> {
        match self.try_reduce(state, action) {
            Ok(next) => next,
            Err(reason) => {
                debug!(
                    game = %self.name(),
                    action = action.kind(),
                    name = action.name().unwrap_or("-"),
                    player = ?action.player_id(),
                    %reason,
                    "action rejected"
                );
                state.clone()
            }
        }
    }

    /// Apply an action, reporting why it was rejected.
    pub fn try_reduce(
        &self,
        state: &StateSnapshot<G>,
        action: &Action,
    ) -> Result<StateSnapshot<G>, Rejection> {
        let next = match action {
            Action::MakeMove(payload) => self.make_move(state, payload)?,
            Action::GameEvent(payload) => self.game_event(state, payload)?,
            Action::Undo { player_id } => self.undo(state, *player_id)?,
            Action::Redo { player_id } => self.redo(state, *player_id)?,
        };
        trace!(
            action = action.kind(),
            name = action.name().unwrap_or("-"),
            state_id = next.state_id,
            turn = next.ctx.turn,
            "action applied"
        );
        Ok(next)
    }

    /// Apply a sequence of actions from `state`, skipping rejected ones.
    #[must_use]
    pub fn replay<'a>(
        &self,
        state: &StateSnapshot<G>,
        actions: impl IntoIterator<Item = &'a Action>,
    ) -> StateSnapshot<G> {
        actions
            .into_iter()
            .fold(state.clone(), |acc, action| self.reduce(&acc, action))
    }

    fn make_move(
        &self,
        state: &StateSnapshot<G>,
        payload: &ActionPayload,
    ) -> Result<StateSnapshot<G>, Rejection> {
        if !state.is_active() {
            return Err(Rejection::GameOver);
        }
        let handler = self
            .moves
            .get(&payload.name)
            .ok_or_else(|| Rejection::UnknownMove(payload.name.clone()))?;
        if !self.flow.is_move_allowed(&state.ctx, &payload.name) {
            return Err(Rejection::NotInPhase {
                name: payload.name.clone(),
                phase: state.ctx.phase.clone().unwrap_or_default(),
            });
        }
        self.check_actor(&state.ctx, payload.player_id)?;

        let move_ctx = MoveContext {
            ctx: &state.ctx,
            player_id: payload.player_id,
        };
        let g = handler(&state.g, &move_ctx, &payload.args)
            .ok_or_else(|| Rejection::InvalidMove(payload.name.clone()))?;

        let mut next = state.clone();
        if self.is_undoable(&payload.name) {
            next.undo.push_back(state.checkpoint());
        } else {
            next.undo.clear();
        }
        next.redo.clear();
        next.g = g;
        next.ctx.num_moves += 1;
        self.record(&mut next, Action::MakeMove(payload.clone()), &state.ctx);
        self.settle(&mut next, true);
        Ok(next)
    }

    fn game_event(
        &self,
        state: &StateSnapshot<G>,
        payload: &ActionPayload,
    ) -> Result<StateSnapshot<G>, Rejection> {
        if !state.is_active() {
            return Err(Rejection::GameOver);
        }
        if let Some(player) = payload.player_id {
            if player != state.ctx.current_player && !state.ctx.can_act(player) {
                return Err(Rejection::NotActionPlayer(player));
            }
        }

        let ctx = self
            .flow
            .apply_event(&payload.name, &state.g, &state.ctx, &payload.args)?;

        let mut next = state.clone();
        next.ctx = ctx;
        next.undo.clear();
        next.redo.clear();
        self.record(&mut next, Action::GameEvent(payload.clone()), &state.ctx);
        self.settle(&mut next, false);
        Ok(next)
    }

    fn undo(
        &self,
        state: &StateSnapshot<G>,
        player_id: Option<PlayerId>,
    ) -> Result<StateSnapshot<G>, Rejection> {
        if !state.is_active() {
            return Err(Rejection::GameOver);
        }
        let checkpoint = state.undo.last().ok_or(Rejection::NothingToUndo)?;
        // The undoer must have been allowed to make the move being undone.
        self.check_actor(&checkpoint.ctx, player_id)?;

        let mut next = state.clone();
        let checkpoint = next.undo.pop_back().ok_or(Rejection::NothingToUndo)?;
        next.redo.push_back(state.checkpoint());
        next.restore(checkpoint);
        next.state_id += 1;
        Ok(next)
    }

    fn redo(
        &self,
        state: &StateSnapshot<G>,
        player_id: Option<PlayerId>,
    ) -> Result<StateSnapshot<G>, Rejection> {
        if !state.is_active() {
            return Err(Rejection::GameOver);
        }
        if state.redo.is_empty() {
            return Err(Rejection::NothingToRedo);
        }
        self.check_actor(&state.ctx, player_id)?;

        let mut next = state.clone();
        let checkpoint: Checkpoint<G> = next.redo.pop_back().ok_or(Rejection::NothingToRedo)?;
        next.undo.push_back(state.checkpoint());
        next.restore(checkpoint);
        next.state_id += 1;
        Ok(next)
    }

    fn check_actor(&self, ctx: &Ctx, player_id: Option<PlayerId>) -> Result<(), Rejection> {
        match player_id {
            Some(player) if !ctx.can_act(player) => Err(Rejection::NotActionPlayer(player)),
            None if self.flow.requires_identity(ctx) => Err(Rejection::MissingIdentity),
            _ => Ok(()),
        }
    }

    fn record(&self, next: &mut StateSnapshot<G>, action: Action, before: &Ctx) {
        let action = action.with_credentials(None);
        next.log
            .push_back(LogEntry::new(action, before.turn, before.phase.clone()));
        next.state_id += 1;
    }

    fn settle(&self, state: &mut StateSnapshot<G>, after_move: bool) {
        if self.finish_if_over(state) {
            return;
        }

        if self.flow.should_end_phase(&state.g, &state.ctx) {
            if let Ok(ctx) = self.flow.end_phase(&state.ctx, None) {
                state.ctx = ctx;
            }
            if self.finish_if_over(state) {
                return;
            }
        }

        if after_move && self.flow.should_end_turn(&state.g, &state.ctx) {
            state.ctx = self.flow.end_turn(&state.ctx, None);
            self.finish_if_over(state);
        }
    }

    fn finish_if_over(&self, state: &mut StateSnapshot<G>) -> bool {
        if state.ctx.gameover.is_some() {
            return true;
        }
        match self.flow.check_end_game(&state.g, &state.ctx) {
            Some(result) => {
                debug!(game = %self.name(), ?result, turn = state.ctx.turn, "game over");
                state.ctx.gameover = Some(result);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GameResult;
    use crate::flow::{EventToggles, FlowConfig, PhaseConfig};
    use crate::game::GameDefinition;
    use serde_json::{json, Value};

    fn p(id: u8) -> Option<PlayerId> {
        Some(PlayerId::new(id))
    }

    /// `G` is a running total; the game ends at 10.
    fn counter() -> Game<i64> {
        GameDefinition::new("counter")
            .with_setup(|_| 0)
            .with_move("add", |g: &i64, _, args: &[Value]| {
                g + args.first().and_then(Value::as_i64).unwrap_or(1)
            })
            .with_fallible_move("set_small", |_, _, args: &[Value]| {
                args.first().and_then(Value::as_i64).filter(|n| *n < 5)
            })
            .undoable_moves(["add"])
            .end_game_if(|g: &i64, ctx: &Ctx| {
                (*g >= 10).then_some(GameResult::Winner(ctx.current_player))
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_move_applies() {
        let game = counter();
        let state = game.initial_state(2).unwrap();

        let next = game.reduce(&state, &Action::make_move("add", [json!(3)], p(0)));

        assert_eq!(next.g, 3);
        assert_eq!(next.ctx.num_moves, 1);
        assert_eq!(next.log.len(), 1);
        assert_eq!(next.state_id, 1);
    }

    #[test]
    fn test_reduce_is_deterministic() {
        let game = counter();
        let state = game.initial_state(2).unwrap();
        let action = Action::make_move("add", [json!(2)], p(0));

        assert_eq!(game.reduce(&state, &action), game.reduce(&state, &action));
    }

    #[test]
    fn test_illegal_actor_leaves_state_unchanged() {
        let game = counter();
        let state = game.initial_state(2).unwrap();
        let action = Action::make_move("add", [json!(1)], p(1));

        assert_eq!(game.reduce(&state, &action), state);
        assert_eq!(
            game.try_reduce(&state, &action),
            Err(Rejection::NotActionPlayer(PlayerId::new(1)))
        );
    }

    #[test]
    fn test_unknown_move_and_event_rejected() {
        let game = counter();
        let state = game.initial_state(2).unwrap();

        assert_eq!(
            game.try_reduce(&state, &Action::make_move("fly", [], p(0))),
            Err(Rejection::UnknownMove("fly".into()))
        );
        assert_eq!(game.reduce(&state, &Action::game_event("endGame", [], p(0))), state);
    }

    #[test]
    fn test_fallible_move() {
        let game = counter();
        let state = game.initial_state(2).unwrap();

        let ok = game.reduce(&state, &Action::make_move("set_small", [json!(4)], p(0)));
        assert_eq!(ok.g, 4);

        assert_eq!(
            game.try_reduce(&state, &Action::make_move("set_small", [json!(9)], p(0))),
            Err(Rejection::InvalidMove("set_small".into()))
        );
    }

    #[test]
    fn test_end_turn_advances() {
        let game = counter();
        let state = game.initial_state(3).unwrap();

        let next = game.reduce(&state, &Action::game_event("endTurn", [], p(0)));

        assert_eq!(next.ctx.turn, 1);
        assert_eq!(next.ctx.current_player, PlayerId::new(1));
        assert!(next.ctx.can_act(PlayerId::new(1)));
        assert_eq!(next.ctx.num_moves, 0);
    }

    #[test]
    fn test_gameover_halts() {
        let game = counter();
        let state = game.initial_state(2).unwrap();

        let over = game.reduce(&state, &Action::make_move("add", [json!(10)], p(0)));
        assert_eq!(over.ctx.gameover, Some(GameResult::Winner(PlayerId::new(0))));

        let after = game.reduce(&over, &Action::make_move("add", [json!(1)], p(0)));
        assert_eq!(after, over);
        assert_eq!(
            game.try_reduce(&over, &Action::game_event("endTurn", [], p(0))),
            Err(Rejection::GameOver)
        );
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let game = counter();
        let s0 = game.initial_state(2).unwrap();
        let s1 = game.reduce(&s0, &Action::make_move("add", [json!(2)], p(0)));

        let undone = game.reduce(&s1, &Action::undo(p(0)));
        assert_eq!(undone.g, s0.g);
        assert_eq!(undone.ctx, s0.ctx);
        assert_eq!(undone.log, s0.log);
        assert!(undone.undo.is_empty());
        assert_eq!(undone.redo.len(), 1);

        let redone = game.reduce(&undone, &Action::redo(p(0)));
        assert_eq!(redone.g, s1.g);
        assert_eq!(redone.ctx, s1.ctx);
        assert_eq!(redone.log, s1.log);
        assert!(redone.redo.is_empty());
    }

    #[test]
    fn test_undo_after_gameover_rejected() {
        let game = counter();
        let s0 = game.initial_state(2).unwrap();
        let over = game.reduce(&s0, &Action::make_move("add", [json!(10)], p(0)));
        assert_eq!(over.undo.len(), 1);

        assert_eq!(
            game.try_reduce(&over, &Action::undo(p(0))),
            Err(Rejection::GameOver)
        );
        assert_eq!(game.reduce(&over, &Action::undo(p(0))), over);
    }

    #[test]
    fn test_credentials_are_not_logged() {
        let game = counter();
        let s0 = game.initial_state(2).unwrap();
        let signed = Action::make_move("add", [json!(1)], p(0)).with_credentials(Some("k".into()));

        let next = game.reduce(&s0, &signed);
        assert_eq!(next.g, 1);
        assert_eq!(next.log[0].action, Action::make_move("add", [json!(1)], p(0)));
    }

    #[test]
    fn test_undo_requires_mover() {
        let game = counter();
        let s0 = game.initial_state(2).unwrap();
        let s1 = game.reduce(&s0, &Action::make_move("add", [], p(0)));

        assert_eq!(
            game.try_reduce(&s1, &Action::undo(p(1))),
            Err(Rejection::NotActionPlayer(PlayerId::new(1)))
        );
    }

    #[test]
    fn test_non_undoable_move_clears_undo() {
        let game = counter();
        let s0 = game.initial_state(2).unwrap();
        let s1 = game.reduce(&s0, &Action::make_move("add", [], p(0)));
        let s2 = game.reduce(&s1, &Action::make_move("set_small", [json!(1)], p(0)));

        assert!(s2.undo.is_empty());
        assert_eq!(
            game.try_reduce(&s2, &Action::undo(p(0))),
            Err(Rejection::NothingToUndo)
        );
    }

    #[test]
    fn test_new_move_clears_redo() {
        let game = counter();
        let s0 = game.initial_state(2).unwrap();
        let s1 = game.reduce(&s0, &Action::make_move("add", [], p(0)));
        let undone = game.reduce(&s1, &Action::undo(p(0)));
        let fresh = game.reduce(&undone, &Action::make_move("add", [json!(3)], p(0)));

        assert!(fresh.redo.is_empty());
        assert_eq!(
            game.try_reduce(&fresh, &Action::redo(p(0))),
            Err(Rejection::NothingToRedo)
        );
    }

    #[test]
    fn test_events_clear_undo() {
        let game = counter();
        let s0 = game.initial_state(2).unwrap();
        let s1 = game.reduce(&s0, &Action::make_move("add", [], p(0)));
        let s2 = game.reduce(&s1, &Action::game_event("endTurn", [], p(0)));

        assert!(s2.undo.is_empty());
    }

    #[test]
    fn test_moves_per_turn_ends_turn_and_keeps_undo() {
        let game = GameDefinition::new("one-shot")
            .with_setup(|_| 0i64)
            .with_move("add", |g: &i64, _, _| g + 1)
            .undoable_moves(["add"])
            .with_flow(FlowConfig::new().with_moves_per_turn(1))
            .build()
            .unwrap();
        let s0 = game.initial_state(2).unwrap();

        let s1 = game.reduce(&s0, &Action::make_move("add", [], p(0)));
        assert_eq!(s1.ctx.turn, 1);
        assert_eq!(s1.ctx.current_player, PlayerId::new(1));

        let undone = game.reduce(&s1, &Action::undo(p(0)));
        assert_eq!(undone.ctx, s0.ctx);
        assert_eq!(undone.g, s0.g);
    }

    fn phased() -> Game<Vec<String>> {
        GameDefinition::new("phased")
            .with_setup(|_| Vec::new())
            .with_move("draw", |g: &Vec<String>, _, _| {
                let mut g = g.clone();
                g.push("draw".into());
                g
            })
            .with_move("play", |g: &Vec<String>, _, _| {
                let mut g = g.clone();
                g.push("play".into());
                g
            })
            .with_flow(
                FlowConfig::new()
                    .with_phase(
                        PhaseConfig::new("draw")
                            .with_moves(["draw"])
                            .end_phase_if(|g: &Vec<String>, _| g.len() >= 2),
                    )
                    .with_phase(PhaseConfig::new("play").with_moves(["play"]).require_identity()),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_move_outside_phase_rejected() {
        let game = phased();
        let state = game.initial_state(2).unwrap();

        assert_eq!(
            game.try_reduce(&state, &Action::make_move("play", [], p(0))),
            Err(Rejection::NotInPhase {
                name: "play".into(),
                phase: "draw".into(),
            })
        );
    }

    #[test]
    fn test_end_phase_if_runs_after_move() {
        let game = phased();
        let s0 = game.initial_state(2).unwrap();
        let s1 = game.reduce(&s0, &Action::make_move("draw", [], p(0)));
        assert_eq!(s1.ctx.phase.as_deref(), Some("draw"));

        let s2 = game.reduce(&s1, &Action::make_move("draw", [], p(0)));
        assert_eq!(s2.ctx.phase.as_deref(), Some("play"));
        assert_eq!(s2.ctx.turn, s1.ctx.turn);
    }

    #[test]
    fn test_require_identity() {
        let game = phased();
        let s0 = game.initial_state(2).unwrap();
        let play = game.reduce(&s0, &Action::game_event("endPhase", [], p(0)));
        assert_eq!(play.ctx.phase.as_deref(), Some("play"));

        assert_eq!(
            game.try_reduce(&play, &Action::make_move("play", [], None)),
            Err(Rejection::MissingIdentity)
        );
        let moved = game.reduce(&play, &Action::make_move("play", [], p(0)));
        assert_eq!(moved.g, vec!["play".to_string()]);
    }

    #[test]
    fn test_unidentified_actor_accepted_without_requirement() {
        let game = counter();
        let state = game.initial_state(2).unwrap();

        let next = game.reduce(&state, &Action::make_move("add", [], None));
        assert_eq!(next.g, 1);
    }

    #[test]
    fn test_end_game_event() {
        let game = GameDefinition::new("quit")
            .with_setup(|_| ())
            .with_flow(FlowConfig::new().with_events(EventToggles {
                end_game: Some(true),
                ..EventToggles::default()
            }))
            .build()
            .unwrap();
        let state = game.initial_state(2).unwrap();

        let over = game.reduce(&state, &Action::game_event("endGame", [json!("Draw")], p(0)));
        assert_eq!(over.ctx.gameover, Some(GameResult::Draw));
    }

    #[test]
    fn test_event_from_bystander_rejected() {
        let game = counter();
        let state = game.initial_state(3).unwrap();

        assert_eq!(
            game.try_reduce(&state, &Action::game_event("endTurn", [], p(2))),
            Err(Rejection::NotActionPlayer(PlayerId::new(2)))
        );
    }

    #[test]
    fn test_replay_matches_stepwise_reduction() {
        let game = counter();
        let s0 = game.initial_state(2).unwrap();
        let actions = vec![
            Action::make_move("add", [json!(2)], p(0)),
            Action::game_event("endTurn", [], p(0)),
            Action::make_move("add", [json!(9)], p(0)),
            Action::make_move("add", [json!(3)], p(1)),
        ];

        let stepwise = actions.iter().fold(s0.clone(), |s, a| game.reduce(&s, a));
        let replayed = game.replay(&s0, &actions);

        assert_eq!(stepwise, replayed);
        assert_eq!(replayed.g, 5);
        assert_eq!(replayed.log.len(), 3);
    }
}
