//! Acting-player resolution for dispatchers.

use serde::{Deserialize, Serialize};

use crate::core::{Ctx, PlayerId};

/// How a dispatcher decides which seat an action comes from.
///
/// The usual rule is picked by [`IdentityPolicy::resolve_default`]: an
/// explicitly bound identity wins (even a bound "nobody"), single-player
/// games fall back to seat 0, and multiplayer games pass the identity
/// through unresolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityPolicy {
    /// Always act as this identity. `Bound(None)` acts as nobody.
    Bound(Option<PlayerId>),
    /// Act as seat 0.
    DefaultToZero,
    /// Leave the identity unresolved.
    #[default]
    PassThrough,
    /// Act as whoever holds the turn when the dispatcher is called.
    FollowCurrentPlayer,
}

impl IdentityPolicy {
    /// Pick the policy for a dispatcher.
    ///
    /// `bound` is `Some` when the caller bound an identity at all; the inner
    /// `Option` is that identity.
    ///
    /// ```
    /// use rust_tbg::core::{Ctx, PlayerId};
    /// use rust_tbg::dispatch::IdentityPolicy;
    ///
    /// let ctx = Ctx::new(1);
    /// let single = IdentityPolicy::resolve_default(None, false);
    /// assert_eq!(single.resolve(&ctx), Some(PlayerId::new(0)));
    ///
    /// let multi = IdentityPolicy::resolve_default(None, true);
    /// assert_eq!(multi.resolve(&ctx), None);
    /// ```
    #[must_use]
    pub fn resolve_default(bound: Option<Option<PlayerId>>, is_multiplayer: bool) -> Self {
        match bound {
            Some(player) => IdentityPolicy::Bound(player),
            None if !is_multiplayer => IdentityPolicy::DefaultToZero,
            None => IdentityPolicy::PassThrough,
        }
    }

    /// Resolve the acting seat against the current context.
    #[must_use]
    pub fn resolve(&self, ctx: &Ctx) -> Option<PlayerId> {
        self.resolve_with(|| ctx.current_player)
    }

    /// Resolve the acting seat, asking for the current player only if the
    /// policy needs it.
    pub fn resolve_with(&self, current_player: impl FnOnce() -> PlayerId) -> Option<PlayerId> {
        match self {
            IdentityPolicy::Bound(player) => *player,
            IdentityPolicy::DefaultToZero => Some(PlayerId::new(0)),
            IdentityPolicy::PassThrough => None,
            IdentityPolicy::FollowCurrentPlayer => Some(current_player()),
        }
    }
}
