//! Simple selection policies.

use serde::{Deserialize, Serialize};

use super::{SearchContext, SelectionPolicy};
use crate::core::{GameRng, GameRngState};
use crate::game::GameData;

/// Uniform choice among candidates from a seeded RNG.
///
/// Two agents created with the same seed make the same choices when fed
/// the same states.
#[derive(Clone, Debug)]
pub struct UniformRandom {
    rng: GameRng,
}

impl UniformRandom {
    /// Create a policy with a fixed seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: GameRng::new(seed),
        }
    }

    /// Resume from a saved RNG state.
    #[must_use]
    pub fn from_state(state: &GameRngState) -> Self {
        Self {
            rng: GameRng::from_state(state),
        }
    }

    /// Current RNG state.
    #[must_use]
    pub fn rng_state(&self) -> GameRngState {
        self.rng.state()
    }
}

impl<G: GameData> SelectionPolicy<G> for UniformRandom {
    fn select(&mut self, search: &SearchContext<'_, G>) -> Option<usize> {
        self.rng.index(search.candidates.len())
    }
}

/// Always picks the first candidate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstCandidate;

impl<G: GameData> SelectionPolicy<G> for FirstCandidate {
    fn select(&mut self, search: &SearchContext<'_, G>) -> Option<usize> {
        (!search.candidates.is_empty()).then_some(0)
    }
}
