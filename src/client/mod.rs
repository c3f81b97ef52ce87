//! Client facade.
//!
//! A `Client` wires one match together: the state container, the move and
//! event dispatcher tables, an optional search agent, and an optional
//! transport. Without a transport it is a purely local game, and `connect`
//! does nothing.
//!
//! ## Networking
//!
//! Once connected, every action the local store accepts through `dispatch`
//! is forwarded as an `Outbound::Update` tagged with the `state_id` it was
//! reduced against and the configured credentials. The token travels in
//! the envelope only; the forwarded action carries none. Local application
//! is optimistic: `sync` drains the
//! transport and replaces the local state wholesale whenever an
//! authoritative snapshot differs from it. Actions relayed from other
//! participants are applied without being forwarded again.

pub mod config;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

pub use config::{ClientConfig, PlayerBinding};

use crate::agent::{Agent, Candidate};
use crate::core::{Action, ClientError, Ctx, PlayerId, StateSnapshot, TransportError};
use crate::dispatch::{
    create_event_dispatchers, create_move_dispatchers, Applied, Dispatchers, Enhancer,
    IdentityPolicy, Store, Subscription,
};
use crate::game::{Game, GameData};
use crate::net::{Inbound, Outbound, Transport};

type Link<G> = Arc<Mutex<Option<Box<dyn Transport<G>>>>>;

/// What a caller or UI sees of the match.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientState<G> {
    /// Game state.
    pub g: G,
    /// Engine context.
    pub ctx: Ctx,
    /// `false` once the game is over.
    pub is_active: bool,
    /// Number of logged actions.
    pub log_len: usize,
    /// Accepted actions so far, including undo and redo.
    pub state_id: u64,
    /// Seat this client is bound to, if any.
    pub player_id: Option<PlayerId>,
}

/// Forwards accepted actions over the client's transport.
struct Forwarder<G: GameData> {
    link: Link<G>,
    match_id: String,
    credentials: Option<String>,
}

impl<G: GameData> Enhancer<G> for Forwarder<G> {
    fn dispatch(
        &self,
        _store: &Store<G>,
        action: &Action,
        next: &dyn Fn(&Action) -> Option<Applied>,
    ) -> Option<Applied> {
        let applied = next(action)?;

        let mut link = lock(&self.link);
        if let Some(transport) = link.as_mut().filter(|t| t.is_connected()) {
            let credentials = action
                .credentials()
                .map(str::to_owned)
                .or_else(|| self.credentials.clone());
            let update = Outbound::Update {
                match_id: self.match_id.clone(),
                state_id: applied.from,
                action: action.without_credentials(),
                credentials,
            };
            if let Err(error) = transport.send(update) {
                warn!(%error, match_id = %self.match_id, "update not forwarded");
            }
        }
        Some(applied)
    }
}

/// One participant's view of a match.
pub struct Client<G: GameData> {
    config: ClientConfig,
    policy: IdentityPolicy,
    store: Store<G>,
    moves: Dispatchers<G>,
    events: Dispatchers<G>,
    agent: Option<Box<dyn Agent<G>>>,
    link: Link<G>,
}

impl<G: GameData> Client<G> {
    /// Create a client with a fresh match.
    pub fn new(game: Arc<Game<G>>, config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_enhancers(game, config, Vec::new())
    }

    /// Create a client whose dispatches pass through `enhancers`, outermost
    /// first.
    pub fn with_enhancers(
        game: Arc<Game<G>>,
        config: ClientConfig,
        enhancers: Vec<Arc<dyn Enhancer<G>>>,
    ) -> Result<Self, ClientError> {
        let num_players = config.num_players.unwrap_or_else(|| game.num_players());
        let state = game.initial_state(num_players)?;
        let link: Link<G> = Arc::new(Mutex::new(None));

        let mut store = Store::new(Arc::clone(&game), state);
        for enhancer in enhancers {
            store = store.with_shared_enhancer(enhancer);
        }
        let store = store.with_enhancer(Forwarder {
            link: Arc::clone(&link),
            match_id: config.match_id.clone(),
            credentials: config.credentials.clone(),
        });

        let policy = config.identity_policy();
        let credentials = config.credentials.as_deref();
        let moves = create_move_dispatchers(game.move_names(), &store, policy, credentials);
        let events = create_event_dispatchers(game.event_names(), &store, policy, credentials);

        Ok(Self {
            config,
            policy,
            store,
            moves,
            events,
            agent: None,
            link,
        })
    }

    /// Configure the transport `connect` opens. Nothing is sent until then.
    #[must_use]
    pub fn with_transport(self, transport: impl Transport<G> + 'static) -> Self {
        *lock(&self.link) = Some(Box::new(transport));
        self
    }

    /// Attach a search agent for `step`.
    #[must_use]
    pub fn with_agent(mut self, agent: impl Agent<G> + 'static) -> Self {
        self.agent = Some(Box::new(agent));
        self
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The game being played.
    #[must_use]
    pub fn game(&self) -> &Arc<Game<G>> {
        self.store.game()
    }

    /// The underlying state container.
    #[must_use]
    pub fn store(&self) -> &Store<G> {
        &self.store
    }

    /// Move dispatchers, one per declared move.
    #[must_use]
    pub fn moves(&self) -> &Dispatchers<G> {
        &self.moves
    }

    /// Event dispatchers, one per enabled event.
    #[must_use]
    pub fn events(&self) -> &Dispatchers<G> {
        &self.events
    }

    /// Current view of the match.
    #[must_use]
    pub fn get_state(&self) -> ClientState<G> {
        let StateSnapshot {
            g,
            ctx,
            log,
            state_id,
            ..
        } = self.store.state();
        ClientState {
            is_active: ctx.gameover.is_none(),
            player_id: self.policy.resolve(&ctx),
            log_len: log.len(),
            g,
            ctx,
            state_id,
        }
    }

    /// Let the agent act once.
    ///
    /// Returns the dispatched candidate; `None` if no agent is attached,
    /// there was nothing to do, or the choice was rejected.
    pub fn step(&mut self) -> Option<Candidate> {
        let agent = self.agent.as_mut()?;
        agent.step(&self.store, &self.moves, &self.events)
    }

    /// Undo the last undoable move. Returns whether anything changed.
    ///
    /// A hot-seat client undoes as the seat that made the move.
    pub fn undo(&self) -> bool {
        let actor = match self.policy {
            IdentityPolicy::FollowCurrentPlayer => self
                .store
                .state()
                .undo
                .last()
                .map(|checkpoint| checkpoint.ctx.current_player),
            _ => self.actor(),
        };
        self.store.dispatch(Action::undo(actor))
    }

    /// Redo the last undone move. Returns whether anything changed.
    pub fn redo(&self) -> bool {
        self.store.dispatch(Action::redo(self.actor()))
    }

    fn actor(&self) -> Option<PlayerId> {
        self.policy.resolve_with(|| self.store.ctx().current_player)
    }

    /// Open the configured transport and start forwarding.
    ///
    /// Without a configured transport the client plays offline and this
    /// does nothing. Local state is left as is until the next `sync`.
    pub fn connect(&mut self) -> Result<(), TransportError> {
        let mut link = lock(&self.link);
        let Some(transport) = link.as_mut() else {
            debug!(match_id = %self.config.match_id, "no transport configured");
            return Ok(());
        };
        if !transport.is_connected() {
            transport.connect()?;
            info!(match_id = %self.config.match_id, "client connected");
        }
        Ok(())
    }

    /// Replace the configured transport with `transport` and connect it.
    ///
    /// Any previous transport is disconnected first.
    pub fn connect_with(
        &mut self,
        transport: impl Transport<G> + 'static,
    ) -> Result<(), TransportError> {
        let previous = lock(&self.link).replace(Box::new(transport));
        if let Some(mut previous) = previous {
            previous.disconnect();
        }
        self.connect()
    }

    /// `true` while a transport is attached and connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        lock(&self.link).as_ref().is_some_and(|t| t.is_connected())
    }

    /// Apply everything the transport received since the last call.
    ///
    /// Returns the number of messages that changed local state.
    pub fn sync(&self) -> usize {
        let inbound = match lock(&self.link).as_mut() {
            Some(transport) => transport.poll(),
            None => return 0,
        };

        inbound
            .into_iter()
            .filter(|message| match message {
                Inbound::Snapshot(snapshot) => self.store.reconcile(snapshot.clone()),
                Inbound::Action(action) => self.store.apply_remote(action),
            })
            .count()
    }

    /// Stop forwarding. Local state is not rolled back; `connect` opens
    /// the same transport again.
    pub fn disconnect(&mut self) {
        if let Some(transport) = lock(&self.link).as_mut() {
            transport.disconnect();
        }
    }

    /// Call `listener` after every state change.
    pub fn subscribe(
        &self,
        listener: impl Fn(&StateSnapshot<G>) + Send + Sync + 'static,
    ) -> Subscription {
        self.store.subscribe(listener)
    }
}

impl<G: GameData> fmt::Debug for Client<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("game", &self.game().name())
            .field("config", &self.config)
            .field("moves", &self.moves)
            .field("events", &self.events)
            .field("agent", &self.agent.is_some())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
