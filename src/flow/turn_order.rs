//! Turn-order policies.
//!
//! A policy is a pure function of `ctx` (plus its own configuration): it
//! picks the first player when a phase begins, the next player when a turn
//! ends, and the set of seats allowed to act for a given current player.
//! No scheduler state lives outside the context.

use serde::{Deserialize, Serialize};

use crate::core::{Ctx, DefinitionError, PlayerId, PlayerSet};

/// Turn-order policy for the flow or for a single phase.
///
/// ```
/// use rust_tbg::core::{Ctx, PlayerId};
/// use rust_tbg::flow::TurnOrder;
///
/// let mut ctx = Ctx::new(3);
/// ctx.current_player = PlayerId::new(2);
///
/// // Round robin wraps back to the first seat.
/// assert_eq!(TurnOrder::RoundRobin.next(&ctx), PlayerId::new(0));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnOrder {
    /// Seats take turns in index order; only the current player acts.
    #[default]
    RoundRobin,
    /// Seats rotate like round robin, but every seat may act at any time.
    Any,
    /// Seats rotate like round robin; everyone except the current player acts.
    Others,
    /// Explicit play order; only the current player acts.
    Custom(Vec<PlayerId>),
}

impl TurnOrder {
    /// Player who starts when a phase governed by this order begins.
    #[must_use]
    pub fn first(&self, ctx: &Ctx) -> PlayerId {
        match self {
            TurnOrder::Custom(order) if !order.contains(&ctx.current_player) => {
                order.first().copied().unwrap_or(ctx.current_player)
            }
            _ => ctx.current_player,
        }
    }

    /// Player who moves after `ctx.current_player`.
    #[must_use]
    pub fn next(&self, ctx: &Ctx) -> PlayerId {
        match self {
            TurnOrder::Custom(order) => {
                let Some(first) = order.first().copied() else {
                    return ctx.current_player;
                };
                order
                    .iter()
                    .position(|&p| p == ctx.current_player)
                    .map_or(first, |i| order[(i + 1) % order.len()])
            }
            _ => {
                let n = ctx.num_players.max(1);
                PlayerId::new(((ctx.current_player.index() + 1) % n) as u8)
            }
        }
    }

    /// Seats allowed to act while `current` holds the turn.
    #[must_use]
    pub fn action_players(&self, ctx: &Ctx, current: PlayerId) -> PlayerSet {
        match self {
            TurnOrder::RoundRobin | TurnOrder::Custom(_) => PlayerSet::unit(current),
            TurnOrder::Any => ctx.player_ids().collect(),
            TurnOrder::Others => ctx.player_ids().filter(|&p| p != current).collect(),
        }
    }

    /// Check the order against a concrete player count.
    pub fn validate(&self, num_players: usize) -> Result<(), DefinitionError> {
        if let TurnOrder::Custom(order) = self {
            if let Some(seat) = order.iter().find(|p| !p.is_seated(num_players)) {
                return Err(DefinitionError::TurnOrderSeat {
                    seat: seat.0,
                    num_players,
                });
            }
        }
        Ok(())
    }
}
