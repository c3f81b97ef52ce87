//! Counters from the most recent search.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What one search did. Reset at the start of every search.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Iterations completed.
    pub iterations: u32,

    /// Children added below the root.
    pub nodes_expanded: u32,

    /// Iterations whose new child already ended the game.
    pub terminal_hits: u32,

    /// Random playouts started.
    pub rollouts: u32,

    /// Playouts that hit the depth limit and were scored neutral.
    pub rollouts_cut_off: u32,

    /// Deepest node created.
    pub max_depth: u16,

    /// Wall time of the search.
    pub elapsed: Duration,
}

impl SearchStats {
    /// Record a node created at `depth`.
    pub fn record_expansion(&mut self, depth: u16) {
        self.nodes_expanded += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    /// Share of rollouts that were cut off, in `[0, 1]`.
    #[must_use]
    pub fn cutoff_rate(&self) -> f64 {
        if self.rollouts == 0 {
            return 0.0;
        }
        f64::from(self.rollouts_cut_off) / f64::from(self.rollouts)
    }

    /// Iterations per second of wall time.
    #[must_use]
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            f64::from(self.iterations) / secs
        } else {
            0.0
        }
    }
}
