//! Tic-tac-toe.
//!
//! Two seats alternate claiming cells of a 3x3 board with the `click_cell`
//! move, one move per turn. Three in a row wins; a full board is a draw.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agent::Candidate;
use crate::core::{Ctx, DefinitionError, GameResult, PlayerId};
use crate::flow::FlowConfig;
use crate::game::{Game, GameDefinition, MoveContext};

/// Name of the only move.
pub const CLICK_CELL: &str = "click_cell";

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// The board, row-major.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Owner of each cell.
    pub cells: [Option<PlayerId>; 9],
}

impl Board {
    /// Seat holding a full line, if any.
    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        LINES.iter().find_map(|&[a, b, c]| {
            let owner = self.cells[a]?;
            (self.cells[b] == Some(owner) && self.cells[c] == Some(owner)).then_some(owner)
        })
    }

    /// `true` when no cell is free.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Indices of free cells.
    pub fn free_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| i)
    }
}

fn click_cell(board: &Board, mv: &MoveContext<'_>, args: &[Value]) -> Option<Board> {
    let cell = usize::try_from(args.first()?.as_u64()?).ok()?;
    if board.cells.get(cell)?.is_some() {
        return None;
    }
    let mut next = board.clone();
    next.cells[cell] = Some(mv.ctx.current_player);
    Some(next)
}

fn outcome(board: &Board, _: &Ctx) -> Option<GameResult> {
    match board.winner() {
        Some(player) => Some(GameResult::Winner(player)),
        None if board.is_full() => Some(GameResult::Draw),
        None => None,
    }
}

/// The game definition, before building.
#[must_use]
pub fn definition() -> GameDefinition<Board> {
    GameDefinition::new("tic-tac-toe")
        .with_setup(|_| Board::default())
        .with_fallible_move(CLICK_CELL, click_cell)
        .with_flow(FlowConfig::new().with_moves_per_turn(1))
        .end_game_if(outcome)
        .with_player_range(2, 2)
}

/// The built game.
pub fn game() -> Result<Game<Board>, DefinitionError> {
    definition().build()
}

/// One `click_cell` candidate per free cell; none once the game is over.
#[must_use]
pub fn enumerate(board: &Board, ctx: &Ctx) -> Vec<Candidate> {
    if ctx.gameover.is_some() {
        return Vec::new();
    }
    board
        .free_cells()
        .map(|cell| Candidate::make_move(CLICK_CELL, [json!(cell)]))
        .collect()
}
