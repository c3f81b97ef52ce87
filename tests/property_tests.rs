//! Property tests for reduction.

use proptest::prelude::*;
use rust_tbg::core::{Action, PlayerId, StateSnapshot};
use rust_tbg::flow::FlowConfig;
use rust_tbg::game::{Game, GameDefinition};
use rust_tbg::games::tictactoe::{self, Board, CLICK_CELL};
use serde_json::{json, Value};

fn clicks(cells: &[(u8, u8)]) -> Vec<Action> {
    cells
        .iter()
        .map(|&(cell, player)| {
            Action::make_move(CLICK_CELL, [json!(cell)], Some(PlayerId::new(player % 2)))
        })
        .collect()
}

/// Sum game where every move is undoable and turns pass after each move.
fn adder() -> Game<i64> {
    GameDefinition::new("adder")
        .with_setup(|_| 0)
        .with_move("add", |g: &i64, _, args: &[Value]| {
            g + args.first().and_then(Value::as_i64).unwrap_or(0)
        })
        .with_flow(FlowConfig::new().with_moves_per_turn(1))
        .undoable_moves(["add"])
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_reduction_is_deterministic(cells in prop::collection::vec((0u8..12, 0u8..2), 0..20)) {
        let game = tictactoe::game().unwrap();
        let initial = game.initial_state(2).unwrap();
        let actions = clicks(&cells);

        let a = game.replay(&initial, &actions);
        let b = game.replay(&initial, &actions);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn prop_log_matches_accepted_actions(cells in prop::collection::vec((0u8..12, 0u8..2), 0..20)) {
        let game = tictactoe::game().unwrap();
        let mut state: StateSnapshot<Board> = game.initial_state(2).unwrap();
        let mut accepted = 0;

        for action in clicks(&cells) {
            let next = game.reduce(&state, &action);
            if next != state {
                accepted += 1;
            }
            prop_assert!(next.ctx.turn >= state.ctx.turn);
            state = next;
        }

        prop_assert_eq!(state.log.len(), accepted);
        prop_assert_eq!(state.state_id, accepted as u64);
    }

    #[test]
    fn prop_undo_round_trip(values in prop::collection::vec(-100i64..100, 1..12)) {
        let game = adder();
        let initial = game.initial_state(2).unwrap();
        let mut state = initial.clone();
        let mut history = vec![state.clone()];

        for value in &values {
            let mover = state.ctx.current_player;
            state = game.reduce(&state, &Action::make_move("add", [json!(value)], Some(mover)));
            history.push(state.clone());
        }
        prop_assert_eq!(state.g, values.iter().sum::<i64>());

        for expected in history.iter().rev().skip(1) {
            let mover = state.undo.last().map(|c| c.ctx.current_player);
            state = game.reduce(&state, &Action::undo(mover));
            prop_assert_eq!(&state.g, &expected.g);
            prop_assert_eq!(&state.ctx, &expected.ctx);
            prop_assert_eq!(&state.log, &expected.log);
        }
        prop_assert!(state.undo.is_empty());
        prop_assert_eq!(state.redo.len(), values.len());

        for expected in history.iter().skip(1) {
            state = game.reduce(&state, &Action::redo(Some(state.ctx.current_player)));
            prop_assert_eq!(&state.g, &expected.g);
            prop_assert_eq!(&state.ctx, &expected.ctx);
        }
        prop_assert_eq!(state.g, values.iter().sum::<i64>());
    }
}
