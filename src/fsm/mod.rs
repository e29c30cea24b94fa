//! Function-pointer finite state machine driving channel selection.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  StepTable                                                     │
//! │  ┌────────────────┬──────────┬──────────┬───────────────────┐  │
//! │  │ SelectStep     │ on_enter │ on_exit  │ on_update         │  │
//! │  ├────────────────┼──────────┼──────────┼───────────────────┤  │
//! │  │ Idle           │ fn(ctx)  │    -     │ fn(ctx)->Option<> │  │
//! │  │ Resetting      │ fn(ctx)  │    -     │ fn(ctx)->Option<> │  │
//! │  │ AwaitLedStable │    -     │    -     │ fn(ctx)->Option<> │  │
//! │  │ CheckLed       │    -     │    -     │ fn(ctx)->Option<> │  │
//! │  │ AwaitRelease   │ fn(ctx)  │    -     │ fn(ctx)->Option<> │  │
//! │  │ AwaitNextPress │    -     │    -     │ fn(ctx)->Option<> │  │
//! │  └────────────────┴──────────┴──────────┴───────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each loop iteration the engine calls `on_update` for the **current**
//! step.  If it returns `Some(next)`, the engine runs `on_exit` for the
//! current step, stamps the entry time, then runs `on_enter` for the next.
//! Handlers never touch GPIO: they read LED levels and button state from
//! the [`SelectContext`] and raise a press request the owner carries out.

pub mod context;
pub mod states;

use context::SelectContext;
use log::debug;

// ---------------------------------------------------------------------------
// Step identity
// ---------------------------------------------------------------------------

/// Every step of a selection sequence.
/// Must stay in sync with the table built in [`states::build_step_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SelectStep {
    /// No sequence running.
    Idle = 0,
    /// Reset press held; waiting for its release.
    Resetting = 1,
    /// Giving LED3 time to follow the reset press.
    AwaitLedStable = 2,
    /// Decide whether the remote reached channel 3.
    CheckLed = 3,
    /// Selection press held; waiting for its release.
    AwaitRelease = 4,
    /// Gap between two selection presses.
    AwaitNextPress = 5,
}

impl SelectStep {
    /// Total number of steps, used to size the table array.
    pub const COUNT: usize = 6;

    /// Convert an index back to `SelectStep`.  Out-of-range indices assert
    /// in debug builds and fall back to `Idle`.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Resetting,
            2 => Self::AwaitLedStable,
            3 => Self::CheckLed,
            4 => Self::AwaitRelease,
            5 => Self::AwaitNextPress,
            _ => {
                debug_assert!(false, "invalid step index: {idx}");
                Self::Idle
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StepActionFn = fn(&mut SelectContext);

/// Per-iteration handler.  `Some(next)` triggers a transition.
pub type StepUpdateFn = fn(&mut SelectContext) -> Option<SelectStep>;

// ---------------------------------------------------------------------------
// Step descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for one step, stored in a fixed-size array.
pub struct StepDescriptor {
    pub id: SelectStep,
    pub name: &'static str,
    pub on_enter: Option<StepActionFn>,
    pub on_exit: Option<StepActionFn>,
    pub on_update: StepUpdateFn,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Table-driven engine.  The blackboard [`SelectContext`] is owned by the
/// caller and threaded through every handler.
pub struct Fsm {
    table: [StepDescriptor; SelectStep::COUNT],
    current: usize,
}

impl Default for Fsm {
    fn default() -> Self {
        Self::new()
    }
}

impl Fsm {
    /// Engine over the standard step table, idle.
    pub fn new() -> Self {
        Self::with_table(states::build_step_table())
    }

    pub fn with_table(table: [StepDescriptor; SelectStep::COUNT]) -> Self {
        Self {
            table,
            current: SelectStep::Idle as usize,
        }
    }

    /// Run the current step's update handler once.
    /// `ctx.now_ms` must be current.
    pub fn tick(&mut self, ctx: &mut SelectContext) {
        if let Some(next) = (self.table[self.current].on_update)(ctx) {
            self.transition(next, ctx);
        }
    }

    /// Jump straight to `next`, running exit and enter actions.  Used to
    /// start a sequence and to cancel one.
    pub fn force_transition(&mut self, next: SelectStep, ctx: &mut SelectContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_step(&self) -> SelectStep {
        SelectStep::from_index(self.current)
    }

    pub fn current_name(&self) -> &'static str {
        self.table[self.current].name
    }

    /// A sequence is in progress.
    pub fn is_running(&self) -> bool {
        self.current != SelectStep::Idle as usize
    }

    fn transition(&mut self, next: SelectStep, ctx: &mut SelectContext) {
        let next_idx = next as usize;
        debug!(
            "select: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        ctx.entered_ms = ctx.now_ms;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
