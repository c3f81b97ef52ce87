//! Named dispatcher tables for moves and events.
//!
//! A table is built once from a list of names and never changes: the keys
//! a client sees are exactly the names it was created with, and lookups of
//! anything else return `None` rather than a dispatcher that fails later.
//!
//! Every binding of a table resolves its actor through the same
//! `IdentityPolicy` and attaches the same opaque credentials, if any.

use std::fmt;

use rustc_hash::FxHashMap;
use serde_json::Value;

use super::identity::IdentityPolicy;
use super::store::Store;
use crate::core::Action;
use crate::game::GameData;

/// Whether a binding builds moves or events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchKind {
    /// `MAKE_MOVE`.
    Move,
    /// `GAME_EVENT`.
    Event,
}

/// One named dispatcher.
pub struct Binding<G: GameData> {
    name: String,
    kind: DispatchKind,
    policy: IdentityPolicy,
    credentials: Option<String>,
    store: Store<G>,
}

impl<G: GameData> Binding<G> {
    /// Move or event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Move or event.
    #[must_use]
    pub fn kind(&self) -> DispatchKind {
        self.kind
    }

    /// Credentials attached to every action.
    #[must_use]
    pub fn credentials(&self) -> Option<&str> {
        self.credentials.as_deref()
    }

    /// Build the action this binding would dispatch right now.
    pub fn action(&self, args: impl IntoIterator<Item = Value>) -> Action {
        let player_id = self
            .policy
            .resolve_with(|| self.store.ctx().current_player);
        let action = match self.kind {
            DispatchKind::Move => Action::make_move(self.name.clone(), args, player_id),
            DispatchKind::Event => Action::game_event(self.name.clone(), args, player_id),
        };
        action.with_credentials(self.credentials.clone())
    }

    /// Resolve the actor and dispatch. Returns whether the action was
    /// accepted.
    pub fn call(&self, args: impl IntoIterator<Item = Value>) -> bool {
        self.store.dispatch(self.action(args))
    }
}

impl<G: GameData> fmt::Debug for Binding<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("policy", &self.policy)
            .field("credentials", &self.credentials.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

/// An ordered, fixed table of named dispatchers.
///
/// ```
/// use std::sync::Arc;
/// use rust_tbg::dispatch::{create_move_dispatchers, IdentityPolicy, Store};
/// use rust_tbg::game::GameDefinition;
///
/// let game = Arc::new(
///     GameDefinition::new("tally")
///         .with_setup(|_| 0u32)
///         .with_move("bump", |g: &u32, _, _| g + 1)
///         .build()
///         .unwrap(),
/// );
/// let store = Store::new(Arc::clone(&game), game.initial_state(1).unwrap());
/// let moves =
///     create_move_dispatchers(game.move_names(), &store, IdentityPolicy::DefaultToZero, None);
///
/// assert!(moves.get("bump").is_some());
/// assert!(moves.get("jump").is_none());
/// assert!(moves.call("bump", []));
/// assert_eq!(store.state().g, 1);
/// ```
pub struct Dispatchers<G: GameData> {
    bindings: Vec<Binding<G>>,
    index: FxHashMap<String, usize>,
}

impl<G: GameData> Dispatchers<G> {
    fn build<I, S>(
        kind: DispatchKind,
        names: I,
        store: &Store<G>,
        policy: IdentityPolicy,
        credentials: Option<&str>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut bindings = Vec::new();
        let mut index = FxHashMap::default();
        for name in names {
            let name = name.as_ref();
            if index.contains_key(name) {
                continue;
            }
            index.insert(name.to_string(), bindings.len());
            bindings.push(Binding {
                name: name.to_string(),
                kind,
                policy,
                credentials: credentials.map(str::to_owned),
                store: store.clone(),
            });
        }
        Self { bindings, index }
    }

    /// Look up a dispatcher by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Binding<G>> {
        self.index.get(name).map(|&i| &self.bindings[i])
    }

    /// Check whether a name has a dispatcher.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Names in creation order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.name.as_str())
    }

    /// Bindings in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Binding<G>> {
        self.bindings.iter()
    }

    /// Number of dispatchers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Dispatch by name. Unknown names dispatch nothing and return `false`.
    pub fn call(&self, name: &str, args: impl IntoIterator<Item = Value>) -> bool {
        self.get(name).is_some_and(|binding| binding.call(args))
    }
}

impl<G: GameData> fmt::Debug for Dispatchers<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

/// Build the move dispatcher table for `names`.
///
/// `credentials` is an opaque token attached to every action; the
/// authoritative copy may use it to check the actor.
pub fn create_move_dispatchers<G, I, S>(
    names: I,
    store: &Store<G>,
    policy: IdentityPolicy,
    credentials: Option<&str>,
) -> Dispatchers<G>
where
    G: GameData,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Dispatchers::build(DispatchKind::Move, names, store, policy, credentials)
}

/// Build the event dispatcher table for `names`.
pub fn create_event_dispatchers<G, I, S>(
    names: I,
    store: &Store<G>,
    policy: IdentityPolicy,
    credentials: Option<&str>,
) -> Dispatchers<G>
where
    G: GameData,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Dispatchers::build(DispatchKind::Event, names, store, policy, credentials)
}
