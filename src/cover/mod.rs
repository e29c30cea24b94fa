//! Cover tracking: one believed-state machine per remote channel and the
//! actuator that presses buttons on their behalf.

pub mod actuator;
pub mod state;

pub use actuator::{CoverActuator, PressCompletion};
pub use state::{CoverState, CoverStateMachine, Transition};
