//! Flow engine: phases, turn order, and events.
//!
//! Games declare a `FlowConfig`; `Flow::compile` validates it once against
//! the declared moves and produces the state machine the reducer consults:
//! - which events exist (`event_names`)
//! - how each event changes `ctx` (`apply_event`)
//! - when turns, phases, and the game end on their own

pub mod config;
pub mod engine;
pub mod turn_order;

pub use config::{EndGameIf, EndIf, EventToggles, FlowConfig, PhaseConfig, PhaseCycle};
pub use engine::{EventName, Flow};
pub use turn_order::TurnOrder;
