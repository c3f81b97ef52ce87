//! Action representation: the only input the reducer accepts.
//!
//! Actions are plain data. They carry the name of a move or event, its
//! arguments, and the identity of the actor as resolved by the dispatch
//! layer. An authoritative copy can replay them to reach an identical state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;

use super::player::PlayerId;

/// Arguments passed to a move handler or event.
///
/// SmallVec keeps the common 0-2 argument case off the heap.
pub type Args = SmallVec<[Value; 2]>;

/// Payload shared by moves and events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionPayload {
    /// Move or event name.
    pub name: String,

    /// Arguments, in call order.
    #[serde(default)]
    pub args: Args,

    /// Acting seat. `None` when the caller is unidentified.
    #[serde(default)]
    pub player_id: Option<PlayerId>,

    /// Opaque token proving the caller may act as `player_id`. Never
    /// interpreted by the reducer and never logged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

/// A complete engine action.
///
/// ## Example
///
/// ```
/// use rust_tbg::core::{Action, PlayerId};
/// use serde_json::json;
///
/// let place = Action::make_move("place", [json!(4)], Some(PlayerId::new(0)));
/// let end = Action::game_event("endTurn", [], Some(PlayerId::new(0)));
///
/// assert_eq!(place.name(), Some("place"));
/// assert_eq!(end.player_id(), Some(PlayerId::new(0)));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Invoke a declared move handler.
    MakeMove(ActionPayload),
    /// Invoke a flow event (`endTurn`, `endPhase`, ...).
    GameEvent(ActionPayload),
    /// Restore the most recent undo checkpoint.
    Undo {
        #[serde(default)]
        player_id: Option<PlayerId>,
    },
    /// Re-apply the most recently undone checkpoint.
    Redo {
        #[serde(default)]
        player_id: Option<PlayerId>,
    },
}

impl Action {
    /// Build a `MAKE_MOVE` action.
    pub fn make_move(
        name: impl Into<String>,
        args: impl IntoIterator<Item = Value>,
        player_id: Option<PlayerId>,
    ) -> Self {
        Action::MakeMove(ActionPayload {
            name: name.into(),
            args: args.into_iter().collect(),
            player_id,
            credentials: None,
        })
    }

    /// Build a `GAME_EVENT` action.
    pub fn game_event(
        name: impl Into<String>,
        args: impl IntoIterator<Item = Value>,
        player_id: Option<PlayerId>,
    ) -> Self {
        Action::GameEvent(ActionPayload {
            name: name.into(),
            args: args.into_iter().collect(),
            player_id,
            credentials: None,
        })
    }

    /// Build an `UNDO` action.
    #[must_use]
    pub fn undo(player_id: Option<PlayerId>) -> Self {
        Action::Undo { player_id }
    }

    /// Build a `REDO` action.
    #[must_use]
    pub fn redo(player_id: Option<PlayerId>) -> Self {
        Action::Redo { player_id }
    }

    /// Move or event name, if this action has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Action::MakeMove(p) | Action::GameEvent(p) => Some(&p.name),
            Action::Undo { .. } | Action::Redo { .. } => None,
        }
    }

    /// Acting seat.
    #[must_use]
    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            Action::MakeMove(p) | Action::GameEvent(p) => p.player_id,
            Action::Undo { player_id } | Action::Redo { player_id } => *player_id,
        }
    }

    /// Credentials attached by the dispatcher, if any.
    #[must_use]
    pub fn credentials(&self) -> Option<&str> {
        match self {
            Action::MakeMove(p) | Action::GameEvent(p) => p.credentials.as_deref(),
            Action::Undo { .. } | Action::Redo { .. } => None,
        }
    }

    /// Attach credentials to a move or event. Undo and redo carry none.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Option<String>) -> Self {
        if let Action::MakeMove(p) | Action::GameEvent(p) = &mut self {
            p.credentials = credentials;
        }
        self
    }

    /// This action with its credentials removed.
    #[must_use]
    pub fn without_credentials(&self) -> Self {
        self.clone().with_credentials(None)
    }

    /// Short label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Action::MakeMove(_) => "MAKE_MOVE",
            Action::GameEvent(_) => "GAME_EVENT",
            Action::Undo { .. } => "UNDO",
            Action::Redo { .. } => "REDO",
        }
    }
}

/// A logged action with the turn and phase it was applied in.
///
/// Used for replay, debugging, and truncation on undo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The applied action.
    pub action: Action,

    /// Turn number when the action was applied.
    pub turn: u32,

    /// Phase active when the action was applied.
    pub phase: Option<String>,
}

impl LogEntry {
    /// Create a new log entry.
    #[must_use]
    pub fn new(action: Action, turn: u32, phase: Option<String>) -> Self {
        Self {
            action,
            turn,
            phase,
        }
    }
}
