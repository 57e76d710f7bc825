//! Chat turn state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions: the
//! runtime feeds events in, applies the returned state and executes the
//! returned effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::{Effect, TurnOutcome};
pub use event::Event;
pub use state::{TurnContext, TurnState, CONNECTION_FAILURE_TEXT};
pub use transition::{transition, TransitionError, TransitionResult};
