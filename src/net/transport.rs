//! Transport boundary between a client and the authoritative copy.
//!
//! A transport carries accepted local actions outward and brings back either
//! authoritative snapshots (which replace local state wholesale) or actions
//! applied by other participants. Delivery is poll-based so clients stay
//! synchronous.

use serde::{Deserialize, Serialize};

use crate::core::{Action, StateSnapshot, TransportError};

/// Message from the authoritative copy to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Inbound<G: Clone> {
    /// Authoritative state; replaces the local state if it differs.
    Snapshot(StateSnapshot<G>),
    /// An action another participant applied.
    Action(Action),
}

/// Message from a client to the authoritative copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Outbound {
    /// An action the client applied optimistically.
    Update {
        /// Match the action belongs to.
        match_id: String,
        /// `state_id` the action was computed against.
        state_id: u64,
        /// The action.
        action: Action,
        /// Opaque token identifying the sender, if it has one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        credentials: Option<String>,
    },
    /// Request the current authoritative snapshot.
    Sync {
        /// Match to synchronize.
        match_id: String,
    },
}

impl Outbound {
    /// Match this message refers to.
    #[must_use]
    pub fn match_id(&self) -> &str {
        match self {
            Outbound::Update { match_id, .. } | Outbound::Sync { match_id } => match_id,
        }
    }
}

/// A channel to the authoritative copy of a match.
pub trait Transport<G: Clone>: Send {
    /// Open the channel. Implementations request an initial sync.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Send a message. Fails with `NotConnected` before `connect`.
    fn send(&mut self, message: Outbound) -> Result<(), TransportError>;

    /// Drain messages received since the last poll.
    fn poll(&mut self) -> Vec<Inbound<G>>;

    /// Close the channel. Further sends fail; local state is untouched.
    fn disconnect(&mut self);

    /// `true` between `connect` and `disconnect`.
    fn is_connected(&self) -> bool;
}
