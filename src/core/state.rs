//! State snapshots: the single value the reducer transforms.
//!
//! ## StateSnapshot
//!
//! Everything a container holds for a match:
//! - `g`: the game-specific payload
//! - `ctx`: engine metadata
//! - `log`: applied actions in order
//! - `undo` / `redo`: checkpoints for undo bookkeeping
//! - `state_id`: bumped on every accepted action
//!
//! Uses `im` persistent vectors so cloning a snapshot (done on every
//! reduction, undo checkpoint, and search rollout) is O(1) apart from `G`.

use std::hash::Hasher;

use im::Vector;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use super::action::LogEntry;
use super::context::Ctx;

/// A saved `(G, ctx, log)` triple restored by undo or redo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint<G: Clone> {
    /// Game payload at the checkpoint.
    pub g: G,
    /// Context at the checkpoint.
    pub ctx: Ctx,
    /// Log at the checkpoint.
    pub log: Vector<LogEntry>,
}

/// Complete match state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot<G: Clone> {
    /// Game-specific payload. Only move handlers produce new values.
    pub g: G,

    /// Engine-owned metadata.
    pub ctx: Ctx,

    /// Applied actions in order.
    pub log: Vector<LogEntry>,

    /// Checkpoints taken before undoable moves, newest last.
    pub undo: Vector<Checkpoint<G>>,

    /// Checkpoints pushed by undo, newest last. Cleared by any new action.
    pub redo: Vector<Checkpoint<G>>,

    /// Monotonic counter of accepted actions.
    ///
    /// Lets an authoritative copy detect updates computed against a stale
    /// state.
    pub state_id: u64,
}

impl<G: Clone> StateSnapshot<G> {
    /// Create a fresh snapshot with empty log and stacks.
    #[must_use]
    pub fn new(g: G, ctx: Ctx) -> Self {
        Self {
            g,
            ctx,
            log: Vector::new(),
            undo: Vector::new(),
            redo: Vector::new(),
            state_id: 0,
        }
    }

    /// `true` while the game has not ended.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.ctx.is_active()
    }

    /// Capture the current `(G, ctx, log)`.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint<G> {
        Checkpoint {
            g: self.g.clone(),
            ctx: self.ctx.clone(),
            log: self.log.clone(),
        }
    }

    /// Restore `(G, ctx, log)` from a checkpoint, leaving the stacks alone.
    pub fn restore(&mut self, checkpoint: Checkpoint<G>) {
        self.g = checkpoint.g;
        self.ctx = checkpoint.ctx;
        self.log = checkpoint.log;
    }

    /// Fingerprint of the snapshot's binary encoding.
    ///
    /// Two snapshots with the same digest encode to the same bytes (modulo
    /// hash collisions). Returns `None` if `G` cannot be encoded.
    #[must_use]
    pub fn digest(&self) -> Option<u64>
    where
        G: Serialize,
    {
        let bytes = bincode::serialize(self).ok()?;
        let mut hasher = FxHasher::default();
        hasher.write(&bytes);
        Some(hasher.finish())
    }
}
