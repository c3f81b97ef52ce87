//! Transport and persistence boundaries.
//!
//! - `transport`: the `Transport` trait and its wire messages
//! - `storage`: the `Storage` trait with in-memory and flat-file backends
//! - `master`: the authoritative reducer host
//! - `local`: an in-process server and transport

pub mod local;
pub mod master;
pub mod storage;
pub mod transport;

pub use local::{LocalServer, LocalTransport};
pub use master::{Authenticator, Master, UpdateOutcome};
pub use storage::{FlatFileStorage, InMemoryStorage, Storage};
pub use transport::{Inbound, Outbound, Transport};
