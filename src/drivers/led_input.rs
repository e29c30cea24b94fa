//! Time-debounced digital input for the remote's channel LEDs.
//!
//! The LED lines are polled from the main loop, not interrupt driven, so
//! debouncing is a pure function of the sampled level and the loop clock:
//! a new level must be observed continuously for `debounce_ms` before it
//! replaces the accepted one.
//!
//! ```text
//!   raw  ──┐  ┌──┐     ┌───────────
//!          └──┘  └─────┘
//!   out  ──────────────────┐ (debounce_ms after the last flip)
//!                          └─────────
//! ```

/// Debounce filter for one polled input.
#[derive(Debug, Clone, Copy)]
pub struct DebouncedInput {
    debounce_ms: u32,
    /// Last accepted level.  `None` until the first level settles.
    stable: Option<bool>,
    /// Level currently being timed, and when it was first seen.
    candidate: Option<(bool, u32)>,
}

impl DebouncedInput {
    pub const fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms,
            stable: None,
            candidate: None,
        }
    }

    /// Feed one sample.  Returns the new level when it is accepted, so each
    /// settled change is reported exactly once.
    pub fn update(&mut self, raw: bool, now_ms: u32) -> Option<bool> {
        if self.stable == Some(raw) {
            self.candidate = None;
            return None;
        }

        let since = match self.candidate {
            Some((level, since)) if level == raw => since,
            _ => {
                self.candidate = Some((raw, now_ms));
                now_ms
            }
        };

        if now_ms.wrapping_sub(since) >= self.debounce_ms {
            self.stable = Some(raw);
            self.candidate = None;
            Some(raw)
        } else {
            None
        }
    }

    /// Accepted level, if one has settled yet.
    pub fn level(&self) -> Option<bool> {
        self.stable
    }
}
