//! In-process server and transport.
//!
//! `LocalServer` wraps a `Master` and fans results out over `mpsc`
//! channels, one per connected `LocalTransport`. Every accepted update is
//! broadcast as a snapshot to all transports connected to that match. A
//! stale, rejected or unauthorized update is answered with the current snapshot, sent
//! only to the transport that submitted it, so its client rolls back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use super::master::{Master, UpdateOutcome};
use super::storage::{InMemoryStorage, Storage};
use super::transport::{Inbound, Outbound, Transport};
use crate::core::{StateSnapshot, TransportError};
use crate::game::GameData;

struct Connection<G: Clone> {
    id: u64,
    match_id: String,
    sender: Sender<Inbound<G>>,
}

/// Authoritative host shared by in-process transports.
pub struct LocalServer<G: GameData, S = InMemoryStorage<G>> {
    master: Master<G, S>,
    connections: Mutex<Vec<Connection<G>>>,
    next_id: AtomicU64,
}

impl<G: GameData, S: Storage<G>> LocalServer<G, S> {
    /// Wrap `master` in a shareable server.
    pub fn new(master: Master<G, S>) -> Arc<Self> {
        Arc::new(Self {
            master,
            connections: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        })
    }

    /// The wrapped master.
    #[must_use]
    pub fn master(&self) -> &Master<G, S> {
        &self.master
    }

    /// A transport to `match_id`, not yet connected.
    pub fn transport(self: &Arc<Self>, match_id: impl Into<String>) -> LocalTransport<G, S> {
        LocalTransport {
            server: Arc::clone(self),
            match_id: match_id.into(),
            link: None,
        }
    }

    fn register(&self, match_id: &str) -> Result<(u64, Receiver<Inbound<G>>), TransportError> {
        let snapshot = self.master.on_sync(match_id)?;
        let (sender, receiver) = mpsc::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // The receiver is still alive, so this cannot fail.
        let _ = sender.send(Inbound::Snapshot(snapshot));
        self.lock().push(Connection {
            id,
            match_id: match_id.to_string(),
            sender,
        });
        info!(connection = id, match_id, "transport connected");
        Ok((id, receiver))
    }

    fn handle(&self, from: u64, message: Outbound) -> Result<(), TransportError> {
        match message {
            Outbound::Sync { match_id } => {
                let snapshot = self.master.on_sync(&match_id)?;
                self.send_to(from, snapshot);
            }
            Outbound::Update {
                match_id,
                state_id,
                action,
                credentials,
            } => match self
                .master
                .on_update(&match_id, state_id, &action, credentials.as_deref())?
            {
                UpdateOutcome::Accepted(snapshot) => self.broadcast(&match_id, snapshot),
                UpdateOutcome::Stale { .. }
                | UpdateOutcome::Rejected(_)
                | UpdateOutcome::Unauthorized => {
                    let snapshot = self.master.on_sync(&match_id)?;
                    self.send_to(from, snapshot);
                }
            },
        }
        Ok(())
    }

    fn send_to(&self, id: u64, snapshot: StateSnapshot<G>) {
        let mut connections = self.lock();
        let Some(pos) = connections.iter().position(|c| c.id == id) else {
            return;
        };
        if connections[pos].sender.send(Inbound::Snapshot(snapshot)).is_err() {
            warn!(connection = id, "receiver dropped");
            connections.remove(pos);
        }
    }

    fn broadcast(&self, match_id: &str, snapshot: StateSnapshot<G>) {
        self.lock().retain(|c| {
            if c.match_id != match_id {
                return true;
            }
            let delivered = c.sender.send(Inbound::Snapshot(snapshot.clone())).is_ok();
            if !delivered {
                warn!(connection = c.id, match_id, "receiver dropped");
            }
            delivered
        });
    }
}

impl<G: GameData, S> LocalServer<G, S> {
    /// Number of open connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.lock().len()
    }

    fn unregister(&self, id: u64) {
        self.lock().retain(|c| c.id != id);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Connection<G>>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Transport to a `LocalServer`.
pub struct LocalTransport<G: GameData, S = InMemoryStorage<G>> {
    server: Arc<LocalServer<G, S>>,
    match_id: String,
    link: Option<(u64, Receiver<Inbound<G>>)>,
}

impl<G: GameData, S> LocalTransport<G, S> {
    /// Match this transport talks to.
    #[must_use]
    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    fn disconnect_inner(&mut self) {
        if let Some((id, _)) = self.link.take() {
            self.server.unregister(id);
        }
    }
}

impl<G: GameData, S: Storage<G>> Transport<G> for LocalTransport<G, S> {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.link.is_none() {
            self.link = Some(self.server.register(&self.match_id)?);
        }
        Ok(())
    }

    fn send(&mut self, message: Outbound) -> Result<(), TransportError> {
        let Some((id, _)) = &self.link else {
            return Err(TransportError::NotConnected);
        };
        self.server.handle(*id, message)
    }

    fn poll(&mut self) -> Vec<Inbound<G>> {
        match &self.link {
            Some((_, receiver)) => receiver.try_iter().collect(),
            None => Vec::new(),
        }
    }

    fn disconnect(&mut self) {
        self.disconnect_inner();
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }
}

impl<G: GameData, S> Drop for LocalTransport<G, S> {
    fn drop(&mut self) {
        self.disconnect_inner();
    }
}
