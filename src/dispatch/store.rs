//! The state container.
//!
//! A `Store` owns the single `StateSnapshot` of a match and is the only
//! writer of it. Handles are cheap to clone and share one container; every
//! reduction runs under one mutex, so concurrent dispatches are applied one
//! at a time in lock order. Subscribers are notified after the lock is
//! released and may safely read or dispatch from inside their callback.
//!
//! ## Notification order
//!
//! Every state change queues its snapshot while the lock is still held, so
//! the queue is in reduction order. One caller at a time drains it; a
//! dispatch that finds a delivery in progress leaves its snapshot to that
//! caller. A subscriber therefore never sees an older state after a newer
//! one.
//!
//! ## Enhancers
//!
//! An [`Enhancer`] wraps `dispatch` the way middleware wraps a handler. It
//! sees the store, the action, and the outcome, but the reduction itself
//! always goes through `Game::try_reduce`. Actions that arrive from the
//! authoritative copy are applied with `apply_remote` and skip enhancers.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::core::{Action, Ctx, StateSnapshot};
use crate::game::{Game, GameData};

type Listener<G> = Arc<dyn Fn(&StateSnapshot<G>) + Send + Sync>;

/// An accepted reduction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Applied {
    /// `state_id` the action was reduced against.
    pub from: u64,
    /// `state_id` after the action.
    pub to: u64,
}

/// Middleware around `Store::dispatch`.
pub trait Enhancer<G: GameData>: Send + Sync {
    /// Handle `action`, calling `next` to forward it. Returns `None` if the
    /// action was rejected.
    fn dispatch(
        &self,
        store: &Store<G>,
        action: &Action,
        next: &dyn Fn(&Action) -> Option<Applied>,
    ) -> Option<Applied>;
}

/// Enhancer that records every dispatch with `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEnhancer;

impl<G: GameData> Enhancer<G> for TracingEnhancer {
    fn dispatch(
        &self,
        store: &Store<G>,
        action: &Action,
        next: &dyn Fn(&Action) -> Option<Applied>,
    ) -> Option<Applied> {
        let applied = next(action);
        debug!(
            game = %store.game().name(),
            action = action.kind(),
            name = action.name().unwrap_or("-"),
            player = ?action.player_id(),
            state_id = ?applied.map(|a| a.to),
            accepted = applied.is_some(),
            "dispatch"
        );
        applied
    }
}

/// Handle returned by `subscribe`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

struct Inner<G: Clone> {
    state: StateSnapshot<G>,
    listeners: Vec<(u64, Listener<G>)>,
    next_listener: u64,
    pending: VecDeque<StateSnapshot<G>>,
    delivering: bool,
}

impl<G: Clone> Inner<G> {
    fn set(&mut self, state: StateSnapshot<G>) {
        if !self.listeners.is_empty() {
            self.pending.push_back(state.clone());
        }
        self.state = state;
    }
}

/// Clears the delivery flag if a listener panics mid-delivery.
struct Delivery<'a, G: Clone> {
    inner: &'a Mutex<Inner<G>>,
    finished: bool,
}

impl<G: Clone> Drop for Delivery<'_, G> {
    fn drop(&mut self) {
        if !self.finished {
            lock(self.inner).delivering = false;
        }
    }
}

/// Shared handle to a match's state container.
pub struct Store<G: GameData> {
    game: Arc<Game<G>>,
    inner: Arc<Mutex<Inner<G>>>,
    enhancers: Vec<Arc<dyn Enhancer<G>>>,
}

impl<G: GameData> Store<G> {
    /// Create a store holding `state`.
    pub fn new(game: Arc<Game<G>>, state: StateSnapshot<G>) -> Self {
        Self {
            game,
            inner: Arc::new(Mutex::new(Inner {
                state,
                listeners: Vec::new(),
                next_listener: 0,
                pending: VecDeque::new(),
                delivering: false,
            })),
            enhancers: Vec::new(),
        }
    }

    /// Add an enhancer. Enhancers added first run outermost.
    #[must_use]
    pub fn with_enhancer(self, enhancer: impl Enhancer<G> + 'static) -> Self {
        self.with_shared_enhancer(Arc::new(enhancer))
    }

    /// Add an enhancer that is already shared.
    #[must_use]
    pub fn with_shared_enhancer(mut self, enhancer: Arc<dyn Enhancer<G>>) -> Self {
        self.enhancers.push(enhancer);
        self
    }

    /// The game this store reduces with.
    #[must_use]
    pub fn game(&self) -> &Arc<Game<G>> {
        &self.game
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> StateSnapshot<G> {
        lock(&self.inner).state.clone()
    }

    /// Current context.
    #[must_use]
    pub fn ctx(&self) -> Ctx {
        lock(&self.inner).state.ctx.clone()
    }

    /// Current `state_id`.
    #[must_use]
    pub fn state_id(&self) -> u64 {
        lock(&self.inner).state.state_id
    }

    /// Reduce `action` into the stored state. Returns whether it was
    /// accepted; rejected actions leave the state untouched.
    pub fn dispatch(&self, action: Action) -> bool {
        self.dispatch_from(0, &action).is_some()
    }

    fn dispatch_from(&self, index: usize, action: &Action) -> Option<Applied> {
        match self.enhancers.get(index) {
            Some(enhancer) => {
                enhancer.dispatch(self, action, &|a: &Action| self.dispatch_from(index + 1, a))
            }
            None => self.apply(action),
        }
    }

    /// Reduce an action received from the authoritative copy, bypassing
    /// enhancers.
    pub fn apply_remote(&self, action: &Action) -> bool {
        self.apply(action).is_some()
    }

    fn apply(&self, action: &Action) -> Option<Applied> {
        let applied = {
            let mut inner = lock(&self.inner);
            match self.game.try_reduce(&inner.state, action) {
                Ok(next) => {
                    let applied = Applied {
                        from: inner.state.state_id,
                        to: next.state_id,
                    };
                    inner.set(next);
                    applied
                }
                Err(reason) => {
                    debug!(
                        action = action.kind(),
                        name = action.name().unwrap_or("-"),
                        player = ?action.player_id(),
                        %reason,
                        "action rejected"
                    );
                    return None;
                }
            }
        };
        self.deliver();
        Some(applied)
    }

    /// Replace the stored state wholesale.
    pub fn replace(&self, state: StateSnapshot<G>) {
        lock(&self.inner).set(state);
        self.deliver();
    }

    /// Replace the stored state if it differs from `remote`.
    ///
    /// Returns `true` if the local state was replaced.
    pub fn reconcile(&self, remote: StateSnapshot<G>) -> bool {
        {
            let mut inner = lock(&self.inner);
            let same = match (inner.state.digest(), remote.digest()) {
                (Some(local), Some(theirs)) => local == theirs,
                _ => inner.state == remote,
            };
            if same {
                return false;
            }
            trace!(
                local = inner.state.state_id,
                remote = remote.state_id,
                "replacing diverged state"
            );
            inner.set(remote);
        }
        self.deliver();
        true
    }

    fn deliver(&self) {
        {
            let mut inner = lock(&self.inner);
            if inner.delivering || inner.pending.is_empty() {
                return;
            }
            inner.delivering = true;
        }

        let mut delivery = Delivery {
            inner: &self.inner,
            finished: false,
        };
        loop {
            let (snapshot, listeners) = {
                let mut inner = lock(delivery.inner);
                match inner.pending.pop_front() {
                    Some(snapshot) => (snapshot, listeners_of(&inner)),
                    None => {
                        inner.delivering = false;
                        delivery.finished = true;
                        return;
                    }
                }
            };
            notify(&listeners, &snapshot);
        }
    }

    /// Call `listener` after every state change.
    pub fn subscribe(
        &self,
        listener: impl Fn(&StateSnapshot<G>) + Send + Sync + 'static,
    ) -> Subscription {
        let mut inner = lock(&self.inner);
        let id = inner.next_listener;
        inner.next_listener += 1;
        inner.listeners.push((id, Arc::new(listener)));
        Subscription(id)
    }

    /// Stop notifying a subscriber.
    pub fn unsubscribe(&self, subscription: Subscription) {
        lock(&self.inner)
            .listeners
            .retain(|(id, _)| *id != subscription.0);
    }
}

impl<G: GameData> Clone for Store<G> {
    fn clone(&self) -> Self {
        Self {
            game: Arc::clone(&self.game),
            inner: Arc::clone(&self.inner),
            enhancers: self.enhancers.clone(),
        }
    }
}

impl<G: GameData> fmt::Debug for Store<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("game", &self.game.name())
            .field("enhancers", &self.enhancers.len())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn listeners_of<G: Clone>(inner: &Inner<G>) -> Vec<Listener<G>> {
    inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
}

fn notify<G: Clone>(listeners: &[Listener<G>], state: &StateSnapshot<G>) {
    for listener in listeners {
        listener(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlayerId;
    use crate::game::GameDefinition;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn game() -> Arc<Game<i64>> {
        Arc::new(
            GameDefinition::new("sum")
                .with_setup(|_| 0)
                .with_move("add", |g: &i64, _, args: &[Value]| {
                    g + args.first().and_then(Value::as_i64).unwrap_or(1)
                })
                .build()
                .unwrap(),
        )
    }

    fn store() -> Store<i64> {
        let game = game();
        let state = game.initial_state(2).unwrap();
        Store::new(game, state)
    }

    #[test]
    fn test_dispatch_accepts_and_rejects() {
        let store = store();

        assert!(store.dispatch(Action::make_move("add", [json!(2)], Some(PlayerId::new(0)))));
        assert!(!store.dispatch(Action::make_move("add", [json!(2)], Some(PlayerId::new(1)))));
        assert_eq!(store.state().g, 2);
    }

    #[test]
    fn test_subscribers_see_accepted_actions_only() {
        let store = store();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let sub = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.dispatch(Action::make_move("add", [], None));
        store.dispatch(Action::make_move("nope", [], None));
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        store.unsubscribe(sub);
        store.dispatch(Action::make_move("add", [], None));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscriber_may_read_store() {
        let store = store();
        let reader = store.clone();
        let last = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&last);
        store.subscribe(move |_| {
            sink.store(reader.state().g as usize, Ordering::SeqCst);
        });

        store.dispatch(Action::make_move("add", [json!(5)], None));
        assert_eq!(last.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_subscriber_may_dispatch() {
        let store = store();
        let inner = store.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(move |state| {
            lock(&sink).push(state.state_id);
            if state.state_id == 1 {
                assert!(inner.dispatch(Action::make_move("add", [], None)));
            }
        });

        assert!(store.dispatch(Action::make_move("add", [], None)));
        assert_eq!(*lock(&seen), [1, 2]);
        assert_eq!(store.state().g, 2);
    }

    #[test]
    fn test_notifications_follow_reduction_order() {
        let store = store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (entered_tx, entered_rx) = mpsc::channel();
        let entered = Mutex::new(entered_tx);
        let sink = Arc::clone(&seen);
        store.subscribe(move |state| {
            if state.state_id == 1 {
                let _ = lock(&entered).send(());
                thread::sleep(Duration::from_millis(100));
            }
            lock(&sink).push(state.state_id);
        });

        let first = {
            let store = store.clone();
            thread::spawn(move || store.dispatch(Action::make_move("add", [], None)))
        };
        entered_rx.recv().unwrap();
        assert!(store.dispatch(Action::make_move("add", [], None)));
        assert!(first.join().unwrap());

        assert_eq!(*lock(&seen), [1, 2]);
        assert_eq!(store.state_id(), 2);
    }

    #[test]
    fn test_enhancer_sees_pre_and_post_state_id() {
        struct Recording(Arc<Mutex<Vec<Applied>>>);

        impl Enhancer<i64> for Recording {
            fn dispatch(
                &self,
                _store: &Store<i64>,
                action: &Action,
                next: &dyn Fn(&Action) -> Option<Applied>,
            ) -> Option<Applied> {
                let applied = next(action);
                lock(&self.0).extend(applied);
                applied
            }
        }

        let applied = Arc::new(Mutex::new(Vec::new()));
        let store = store().with_enhancer(Recording(Arc::clone(&applied)));
        store.dispatch(Action::make_move("add", [], None));
        store.dispatch(Action::make_move("fly", [], None));
        store.dispatch(Action::make_move("add", [], None));

        assert_eq!(
            *lock(&applied),
            [Applied { from: 0, to: 1 }, Applied { from: 1, to: 2 }]
        );
    }

    #[test]
    fn test_reconcile_only_on_divergence() {
        let store = store();
        let same = store.state();
        assert!(!store.reconcile(same));

        let mut remote = store.state();
        remote.g = 40;
        remote.state_id = 9;
        assert!(store.reconcile(remote.clone()));
        assert_eq!(store.state(), remote);
    }

    #[test]
    fn test_concurrent_dispatch_is_serialized() {
        let store = store();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        store.dispatch(Action::make_move("add", [], None));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let state = store.state();
        assert_eq!(state.g, 200);
        assert_eq!(state.state_id, 200);
        assert_eq!(state.log.len(), 200);
    }

    struct Counting(Arc<AtomicUsize>);

    impl Enhancer<i64> for Counting {
        fn dispatch(
            &self,
            _store: &Store<i64>,
            action: &Action,
            next: &dyn Fn(&Action) -> Option<Applied>,
        ) -> Option<Applied> {
            self.0.fetch_add(1, Ordering::SeqCst);
            next(action)
        }
    }

    #[test]
    fn test_enhancers_wrap_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = store()
            .with_enhancer(TracingEnhancer)
            .with_enhancer(Counting(Arc::clone(&calls)));

        assert!(store.dispatch(Action::make_move("add", [], None)));
        assert!(!store.dispatch(Action::make_move("fly", [], None)));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.state().g, 1);

        assert!(store.apply_remote(&Action::make_move("add", [], None)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.state_id(), 2);
    }
}
