//! Client configuration.

use serde::{Deserialize, Serialize};

use crate::core::{ClientError, PlayerId};
use crate::dispatch::IdentityPolicy;

/// Which seat a client acts as.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerBinding {
    /// No identity bound; the default rule applies.
    #[default]
    Unbound,
    /// Explicitly bound to nobody. Actions carry no identity.
    Spectator,
    /// Bound to one seat.
    Seat(PlayerId),
}

impl PlayerBinding {
    /// The bound identity: `None` if unbound, `Some(None)` for a spectator.
    #[must_use]
    pub fn bound(self) -> Option<Option<PlayerId>> {
        match self {
            PlayerBinding::Unbound => None,
            PlayerBinding::Spectator => Some(None),
            PlayerBinding::Seat(player) => Some(Some(player)),
        }
    }
}

/// Client configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Seat binding.
    pub player: PlayerBinding,

    /// Whether the match is played by several clients.
    pub multiplayer: bool,

    /// Unbound clients act as whoever holds the turn.
    /// Ignored when a seat is bound.
    pub hot_seat: bool,

    /// Player count. `None` uses the game's default.
    pub num_players: Option<usize>,

    /// Match identifier sent with outbound updates.
    pub match_id: String,

    /// Opaque token sent with every action; `None` for anonymous play.
    pub credentials: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            player: PlayerBinding::Unbound,
            multiplayer: false,
            hot_seat: false,
            num_players: None,
            match_id: "default".to_string(),
            credentials: None,
        }
    }
}

impl ClientConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ClientError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Bind a seat.
    #[must_use]
    pub fn with_player(mut self, player: PlayerId) -> Self {
        self.player = PlayerBinding::Seat(player);
        self
    }

    /// Bind to nobody.
    #[must_use]
    pub fn spectator(mut self) -> Self {
        self.player = PlayerBinding::Spectator;
        self
    }

    /// Mark the match as multiplayer.
    #[must_use]
    pub fn with_multiplayer(mut self, multiplayer: bool) -> Self {
        self.multiplayer = multiplayer;
        self
    }

    /// Let an unbound client follow the current player.
    #[must_use]
    pub fn with_hot_seat(mut self, hot_seat: bool) -> Self {
        self.hot_seat = hot_seat;
        self
    }

    /// Set the player count.
    #[must_use]
    pub fn with_num_players(mut self, num_players: usize) -> Self {
        self.num_players = Some(num_players);
        self
    }

    /// Set the match id.
    #[must_use]
    pub fn with_match_id(mut self, match_id: impl Into<String>) -> Self {
        self.match_id = match_id.into();
        self
    }

    /// Set the credentials sent with every action.
    #[must_use]
    pub fn with_credentials(mut self, credentials: impl Into<String>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }

    /// Identity policy for this client's dispatchers.
    #[must_use]
    pub fn identity_policy(&self) -> IdentityPolicy {
        if self.hot_seat && self.player == PlayerBinding::Unbound {
            return IdentityPolicy::FollowCurrentPlayer;
        }
        IdentityPolicy::resolve_default(self.player.bound(), self.multiplayer)
    }
}
