//! Believed state of one cover.
//!
//! The remote is one-way RF: nothing reports where a cover really is.  The
//! state is inferred from the commands sent and from the channel LED
//! lighting up when the motor acknowledges a stored "my" position.
//!
//! ```text
//!             UP ┌───────────┐
//!   UNKNOWN ────▶│ MOVING_UP │──[travel time]──┐
//!      │         └───────────┘                 ▼
//!      │ DOWN    ┌─────────────┐            ┌──────┐
//!      ├────────▶│ MOVING_DOWN │──[travel]─▶│ IDLE │
//!      │         └─────────────┘            └──────┘
//!      │ MY / LED on  ┌────────────────┐
//!      └─────────────▶│ AT_MY_POSITION │
//!                     └────────────────┘
//! ```
//!
//! Every command and feedback edge is accepted from every state.

use core::fmt;

use crate::app::commands::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoverState {
    Idle,
    MovingUp,
    MovingDown,
    AtMyPosition,
    /// No command or feedback seen since boot.
    Unknown,
}

impl CoverState {
    pub const fn is_moving(self) -> bool {
        matches!(self, Self::MovingUp | Self::MovingDown)
    }
}

impl fmt::Display for CoverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::MovingUp => "MOVING_UP",
            Self::MovingDown => "MOVING_DOWN",
            Self::AtMyPosition => "AT_MY_POSITION",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// A state change reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CoverState,
    pub to: CoverState,
}

#[derive(Debug, Clone, Copy)]
pub struct CoverStateMachine {
    state: CoverState,
    entered_ms: u32,
}

impl Default for CoverStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverStateMachine {
    pub const fn new() -> Self {
        Self {
            state: CoverState::Unknown,
            entered_ms: 0,
        }
    }

    pub fn state(&self) -> CoverState {
        self.state
    }

    /// Apply a completed button press.  SELECT only changes the channel.
    pub fn apply_command(&mut self, cmd: Command, now_ms: u32) -> Option<Transition> {
        let next = match cmd {
            Command::Up => CoverState::MovingUp,
            Command::Down => CoverState::MovingDown,
            Command::My => CoverState::AtMyPosition,
            Command::Select => return None,
        };
        self.enter(next, now_ms)
    }

    /// The channel LED lit: the cover reports its "my" position.
    pub fn on_led_feedback(&mut self, now_ms: u32) -> Option<Transition> {
        self.enter(CoverState::AtMyPosition, now_ms)
    }

    /// Settle a moving cover once it has travelled for `travel_ms`.
    pub fn expire(&mut self, now_ms: u32, travel_ms: u32) -> Option<Transition> {
        if self.state.is_moving() && now_ms.wrapping_sub(self.entered_ms) >= travel_ms {
            self.enter(CoverState::Idle, now_ms)
        } else {
            None
        }
    }

    fn enter(&mut self, next: CoverState, now_ms: u32) -> Option<Transition> {
        let from = self.state;
        // Re-issuing UP while moving up restarts the travel clock.
        self.entered_ms = now_ms;
        if from == next {
            return None;
        }
        self.state = next;
        Some(Transition { from, to: next })
    }
}
