//! Engine-owned turn metadata (`ctx`) and the terminal marker.
//!
//! `Ctx` is distinct from the game-specific payload `G`: the flow engine owns
//! it, move handlers only read it.

use serde::{Deserialize, Serialize};

use super::player::{PlayerId, PlayerSet};

/// Result of a completed game, stored in `ctx.gameover`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    /// Single winner.
    Winner(PlayerId),
    /// Multiple winners (team games, shared victory).
    Winners(Vec<PlayerId>),
    /// Draw (no winner).
    Draw,
    /// Game ended without a declared outcome.
    Ended,
}

impl GameResult {
    /// Check if a player won.
    #[must_use]
    pub fn is_winner(&self, player: PlayerId) -> bool {
        match self {
            GameResult::Winner(p) => *p == player,
            GameResult::Winners(ps) => ps.contains(&player),
            GameResult::Draw | GameResult::Ended => false,
        }
    }
}

/// Turn, phase, and actor metadata.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ctx {
    /// Number of seats in this match.
    pub num_players: usize,

    /// Turn counter, starting at 0. Increments once per `endTurn`.
    pub turn: u32,

    /// Whose turn it is.
    pub current_player: PlayerId,

    /// Seats currently permitted to make moves.
    pub action_players: PlayerSet,

    /// Active phase, or `None` when the game declares no phases
    /// (or the phase sequence has terminated).
    pub phase: Option<String>,

    /// Moves applied during the current turn.
    pub num_moves: u32,

    /// Terminal marker. Once set, no move changes `G`.
    pub gameover: Option<GameResult>,
}

impl Ctx {
    /// Create the context for turn 0 with player 0 to act.
    #[must_use]
    pub fn new(num_players: usize) -> Self {
        assert!(num_players > 0, "Must have at least 1 player");
        assert!(num_players <= 255, "At most 255 players supported");

        Self {
            num_players,
            turn: 0,
            current_player: PlayerId::new(0),
            action_players: PlayerSet::unit(PlayerId::new(0)),
            phase: None,
            num_moves: 0,
            gameover: None,
        }
    }

    /// `true` while the game has not ended.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.gameover.is_none()
    }

    /// Check whether `player` may currently act.
    #[must_use]
    pub fn can_act(&self, player: PlayerId) -> bool {
        self.action_players.contains(&player)
    }

    /// Iterate over all seats.
    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> {
        PlayerId::all(self.num_players)
    }
}
