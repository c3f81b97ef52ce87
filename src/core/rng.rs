//! Seeded randomness for agents.
//!
//! Reduction never draws randomness: anything random a game needs must
//! arrive as an action argument. `GameRng` serves the search agents, so a
//! seeded agent makes the same choices on every run and can be paused and
//! resumed mid-match.
//!
//! ```
//! use rust_tbg::core::GameRng;
//!
//! let mut a = GameRng::new(42);
//! let mut b = GameRng::new(42);
//! assert_eq!(a.rollout().index(100), b.rollout().index(100));
//! assert_eq!(a.pick(&["x", "o"]), b.pick(&["x", "o"]));
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// ChaCha8 stream with resumable state.
#[derive(Clone, Debug)]
pub struct GameRng {
    stream: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    /// Stream for `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            stream: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Independent stream for one rollout, seeded from this one.
    ///
    /// Successive rollouts differ, and the sequence of rollouts is fixed by
    /// the parent's seed.
    pub fn rollout(&mut self) -> Self {
        Self::new(self.stream.gen())
    }

    /// Uniform index below `len`; `None` for an empty range.
    pub fn index(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.stream.gen_range(0..len))
    }

    /// Uniform element of `items`.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        self.index(items.len()).map(|i| &items[i])
    }

    /// Position in the stream, for resuming later.
    #[must_use]
    pub fn state(&self) -> GameRngState {
        GameRngState {
            seed: self.seed,
            word_pos: self.stream.get_word_pos(),
        }
    }

    /// Resume a stream where `state` left it.
    #[must_use]
    pub fn from_state(state: &GameRngState) -> Self {
        let mut rng = Self::new(state.seed);
        rng.stream.set_word_pos(state.word_pos);
        rng
    }
}

/// Saved position of a `GameRng`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRngState {
    /// Seed the stream started from.
    pub seed: u64,
    /// Words consumed so far.
    pub word_pos: u128,
}
