//! Dispatch layer: the state container and the named callables bound to it.
//!
//! - `Store`: owns a match's snapshot and serializes reductions
//! - `Dispatchers`: fixed name → `Binding` tables for moves and events
//! - `IdentityPolicy`: which seat a dispatcher acts as

pub mod dispatchers;
pub mod identity;
pub mod store;

pub use dispatchers::{
    create_event_dispatchers, create_move_dispatchers, Binding, DispatchKind, Dispatchers,
};
pub use identity::IdentityPolicy;
pub use store::{Applied, Enhancer, Store, Subscription, TracingEnhancer};
