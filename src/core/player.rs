//! Player identification, seat sets, and per-player data storage.
//!
//! ## PlayerId
//!
//! Type-safe seat identifier supporting 1-255 players. Displays as the bare
//! index (`"0"`, `"1"`, ...), which is the identity string clients bind to.
//!
//! ## PlayerSet
//!
//! Ordered set of seats, used for `ctx.action_players`. Backed by `im::OrdSet`
//! so snapshots clone in O(1) and serialize in a stable order.
//!
//! ## PlayerMap
//!
//! Efficient per-player data storage backed by `Vec` for O(1) access.

use im::OrdSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::{Index, IndexMut};

/// Player identifier supporting 1-255 players.
///
/// Player indices are 0-based: the first player is `PlayerId(0)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// Create a new player ID.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Get the raw player index (0-based).
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Iterate over all player IDs for a game with `player_count` players.
    ///
    /// ```
    /// use rust_tbg::core::PlayerId;
    ///
    /// let players: Vec<_> = PlayerId::all(4).collect();
    /// assert_eq!(players.len(), 4);
    /// assert_eq!(players[0], PlayerId::new(0));
    /// assert_eq!(players[3], PlayerId::new(3));
    /// ```
    pub fn all(player_count: usize) -> impl Iterator<Item = PlayerId> {
        (0..player_count as u8).map(PlayerId)
    }

    /// Parse a player ID from an action argument.
    ///
    /// Accepts a JSON number (`1`) or a numeric string (`"1"`).
    ///
    /// ```
    /// use rust_tbg::core::PlayerId;
    /// use serde_json::json;
    ///
    /// assert_eq!(PlayerId::parse(&json!(2)), Some(PlayerId::new(2)));
    /// assert_eq!(PlayerId::parse(&json!("1")), Some(PlayerId::new(1)));
    /// assert_eq!(PlayerId::parse(&json!("x")), None);
    /// ```
    #[must_use]
    pub fn parse(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()).map(PlayerId),
            Value::String(s) => s.parse::<u8>().ok().map(PlayerId),
            _ => None,
        }
    }

    /// Check whether this seat exists in a game with `player_count` players.
    #[must_use]
    pub const fn is_seated(self, player_count: usize) -> bool {
        self.index() < player_count
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered set of seats currently permitted to act.
pub type PlayerSet = OrdSet<PlayerId>;

/// Per-player data storage with O(1) access.
///
/// Backed by a `Vec<T>` with one entry per player.
///
/// ## Example
///
/// ```
/// use rust_tbg::core::{PlayerId, PlayerMap};
///
/// let mut score: PlayerMap<f64> = PlayerMap::with_value(2, 0.0);
/// score[PlayerId::new(1)] += 1.0;
/// assert_eq!(score[PlayerId::new(1)], 1.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerMap<T> {
    data: Vec<T>,
}

impl<T> PlayerMap<T> {
    /// Create a new PlayerMap with values from a factory function.
    pub fn new(player_count: usize, factory: impl Fn(PlayerId) -> T) -> Self {
        assert!(player_count > 0, "Must have at least 1 player");
        assert!(player_count <= 255, "At most 255 players supported");

        let data = (0..player_count as u8)
            .map(|i| factory(PlayerId(i)))
            .collect();

        Self { data }
    }

    /// Create a new PlayerMap with all entries set to the same value.
    pub fn with_value(player_count: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self::new(player_count, |_| value.clone())
    }

    /// Get the number of players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.data.len()
    }

    /// Iterate over (PlayerId, &T) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &T)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, v)| (PlayerId(i as u8), v))
    }
}

impl<T> Index<PlayerId> for PlayerMap<T> {
    type Output = T;

    fn index(&self, player: PlayerId) -> &Self::Output {
        &self.data[player.index()]
    }
}

impl<T> IndexMut<PlayerId> for PlayerMap<T> {
    fn index_mut(&mut self, player: PlayerId) -> &mut Self::Output {
        &mut self.data[player.index()]
    }
}
