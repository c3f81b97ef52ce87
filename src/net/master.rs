//! Authoritative reducer host.
//!
//! The master owns the canonical snapshot of every match it hosts. Clients
//! reduce optimistically and send each accepted action with the `state_id`
//! it was computed against; the master re-runs the reducer on its own copy
//! and answers with the outcome. An update computed against an older
//! `state_id` is stale and is refused without touching the stored match.
//!
//! ## Ordering
//!
//! Updates are committed one at a time: loading the stored snapshot, the
//! stale check, the reduction and the write back all happen under one
//! lock, so two updates computed against the same `state_id` can never
//! both be accepted.
//!
//! ## Credentials
//!
//! Updates carry the sender's opaque credentials. The master does not
//! interpret them; an optional [`Authenticator`] decides whether they may
//! act for the action's player. Without one, every update is allowed.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, instrument};

use super::storage::Storage;
use crate::core::{Action, PlayerId, StateSnapshot, TransportError};
use crate::game::{Game, GameData, Rejection};

/// Decides whether `credentials` may act as `player` in `match_id`.
pub type Authenticator =
    Arc<dyn Fn(&str, Option<PlayerId>, Option<&str>) -> bool + Send + Sync>;

/// What the master did with an update.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateOutcome<G: Clone> {
    /// The action was applied; this is the new authoritative snapshot.
    Accepted(StateSnapshot<G>),
    /// The update was computed against an old state.
    Stale {
        /// `state_id` the master currently holds.
        expected: u64,
    },
    /// The reducer refused the action.
    Rejected(Rejection),
    /// The authenticator refused the credentials.
    Unauthorized,
}

impl<G: Clone> UpdateOutcome<G> {
    /// `true` for `Accepted`.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, UpdateOutcome::Accepted(_))
    }
}

/// Hosts matches of one game on a storage backend.
pub struct Master<G: GameData, S> {
    game: Arc<Game<G>>,
    storage: S,
    authenticator: Option<Authenticator>,
    commit: Mutex<()>,
}

impl<G: GameData, S: Storage<G>> Master<G, S> {
    /// Create a master for `game` backed by `storage`.
    pub fn new(game: Arc<Game<G>>, storage: S) -> Self {
        Self {
            game,
            storage,
            authenticator: None,
            commit: Mutex::new(()),
        }
    }

    /// Check every update's credentials with `authenticator`.
    #[must_use]
    pub fn with_authenticator(
        mut self,
        authenticator: impl Fn(&str, Option<PlayerId>, Option<&str>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    /// The hosted game.
    #[must_use]
    pub fn game(&self) -> &Arc<Game<G>> {
        &self.game
    }

    /// The storage backend.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Set up a new match and store its initial snapshot.
    ///
    /// An existing match with the same id is replaced.
    pub fn create_match(
        &self,
        match_id: &str,
        num_players: usize,
    ) -> Result<StateSnapshot<G>, TransportError> {
        let state = self.game.initial_state(num_players)?;
        let _commit = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        self.storage.set(match_id, &state)?;
        info!(game = %self.game.name(), match_id, num_players, "match created");
        Ok(state)
    }

    /// Apply a client's update to the stored match.
    #[instrument(skip(self, action, credentials), fields(action = action.kind()))]
    pub fn on_update(
        &self,
        match_id: &str,
        state_id: u64,
        action: &Action,
        credentials: Option<&str>,
    ) -> Result<UpdateOutcome<G>, TransportError> {
        if let Some(authenticate) = &self.authenticator {
            if !authenticate(match_id, action.player_id(), credentials) {
                debug!(player = ?action.player_id(), "credentials refused");
                return Ok(UpdateOutcome::Unauthorized);
            }
        }

        let _commit = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self.load(match_id)?;
        if state_id != state.state_id {
            debug!(expected = state.state_id, "stale update");
            return Ok(UpdateOutcome::Stale {
                expected: state.state_id,
            });
        }

        match self.game.try_reduce(&state, action) {
            Ok(next) => {
                self.storage.set(match_id, &next)?;
                Ok(UpdateOutcome::Accepted(next))
            }
            Err(reason) => {
                debug!(%reason, "update rejected");
                Ok(UpdateOutcome::Rejected(reason))
            }
        }
    }

    /// Current snapshot of a match.
    pub fn on_sync(&self, match_id: &str) -> Result<StateSnapshot<G>, TransportError> {
        self.load(match_id)
    }

    fn load(&self, match_id: &str) -> Result<StateSnapshot<G>, TransportError> {
        self.storage
            .get(match_id)?
            .ok_or_else(|| TransportError::MatchNotFound(match_id.to_string()))
    }
}

impl<G: GameData, S: fmt::Debug> fmt::Debug for Master<G, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Master")
            .field("game", &self.game.name())
            .field("storage", &self.storage)
            .field("authenticated", &self.authenticator.is_some())
            .finish_non_exhaustive()
    }
}
