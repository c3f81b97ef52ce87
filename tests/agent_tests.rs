//! Search agents driving real games.

use std::sync::Arc;

use rust_tbg::agent::{Candidate, FirstCandidate, Mcts, MctsConfig, SearchAgent, UniformRandom};
use rust_tbg::core::{Ctx, PlayerId};
use rust_tbg::game::GameDefinition;
use rust_tbg::games::tictactoe::{self, Board, CLICK_CELL};
use rust_tbg::{Client, ClientConfig};
use serde_json::json;

fn hot_seat() -> ClientConfig {
    ClientConfig::default().with_hot_seat(true)
}

#[test]
fn test_step_is_noop_without_moves() {
    let game = GameDefinition::new("empty")
        .with_setup(|_| ())
        .build()
        .unwrap();
    let mut client = Client::new(Arc::new(game), ClientConfig::default())
        .unwrap()
        .with_agent(SearchAgent::new(
            |_: &(), _: &Ctx| Vec::<Candidate>::new(),
            UniformRandom::new(1),
        ));

    let before = client.store().state();
    assert_eq!(client.step(), None);
    assert_eq!(client.store().state(), before);
    assert_eq!(before.ctx.turn, 0);
}

#[test]
fn test_random_agents_finish_a_game() {
    let mut client = Client::new(Arc::new(tictactoe::game().unwrap()), hot_seat())
        .unwrap()
        .with_agent(SearchAgent::new(tictactoe::enumerate, UniformRandom::new(7)));

    let mut steps = 0;
    while client.step().is_some() {
        steps += 1;
    }

    let state = client.get_state();
    assert!(!state.is_active);
    assert!((5..=9).contains(&steps));
    assert_eq!(state.log_len, steps);

    // Stepping a finished game does nothing.
    assert_eq!(client.step(), None);
}

#[test]
fn test_random_play_is_reproducible() {
    let play = |seed| {
        let mut client = Client::new(Arc::new(tictactoe::game().unwrap()), hot_seat())
            .unwrap()
            .with_agent(SearchAgent::new(tictactoe::enumerate, UniformRandom::new(seed)));
        while client.step().is_some() {}
        client.get_state().g
    };

    assert_eq!(play(3), play(3));
}

#[test]
fn test_first_candidate_fills_in_order() {
    let mut client = Client::new(Arc::new(tictactoe::game().unwrap()), hot_seat())
        .unwrap()
        .with_agent(SearchAgent::new(tictactoe::enumerate, FirstCandidate));

    while client.step().is_some() {}

    // Cells fill in index order; seat 0 completes the 2-4-6 diagonal.
    let board = client.get_state().g;
    assert_eq!(board.winner(), Some(PlayerId::new(0)));
    assert_eq!(board.free_cells().collect::<Vec<_>>(), [7, 8]);
}

#[test]
fn test_mcts_takes_the_win() {
    let client = Client::new(Arc::new(tictactoe::game().unwrap()), hot_seat()).unwrap();
    // X X . / O O . / . . .  with X to move.
    for cell in [0, 3, 1, 4] {
        assert!(client.moves().call(CLICK_CELL, [json!(cell)]));
    }

    let mut client = client.with_agent(SearchAgent::new(
        tictactoe::enumerate,
        Mcts::new(MctsConfig::default().with_iterations(400).with_seed(5)),
    ));
    assert_eq!(
        client.step(),
        Some(Candidate::make_move(CLICK_CELL, [json!(2)]))
    );
    assert!(!client.get_state().is_active);
}

#[test]
fn test_mcts_blocks_the_loss() {
    let client = Client::new(Arc::new(tictactoe::game().unwrap()), hot_seat()).unwrap();
    // X . . / O O . / X . .  with X to move; O threatens cell 5.
    for cell in [0, 3, 6, 4] {
        assert!(client.moves().call(CLICK_CELL, [json!(cell)]));
    }

    let mut client = client.with_agent(SearchAgent::new(
        tictactoe::enumerate,
        Mcts::new(MctsConfig::default().with_iterations(2000).with_seed(11)),
    ));
    let board: Board = client.get_state().g;
    assert_eq!(board.cells[5], None);

    // Any other move lets O complete the middle row.
    assert_eq!(
        client.step(),
        Some(Candidate::make_move(CLICK_CELL, [json!(5)]))
    );
}
