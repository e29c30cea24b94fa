//! Shared mutable context threaded through every selection step.
//!
//! `SelectContext` is the blackboard the step handlers read from and write
//! to: loop time, the latest debounced LED levels, whether a button is
//! still held, the job being run and the outputs the owner must act on.

use crate::config::RemoteConfig;

/// How a selection sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The remote now addresses `cover`.
    Completed { cover: u8, presses: u8 },
    /// LED3 never lit alone during the reset phase.
    Failed { target: u8, reset_presses: u8 },
}

pub struct SelectContext {
    // -- Timing --
    /// Loop time of the current iteration.
    pub now_ms: u32,
    /// When the current step was entered.
    pub entered_ms: u32,

    // -- Inputs (written by the owner before each tick) --
    pub led3_on: bool,
    pub led4_on: bool,
    /// A press is still held on the button matrix.
    pub button_busy: bool,

    // -- Tracked channel (read and advanced by the steps) --
    pub cover: u8,

    // -- Job --
    pub target: u8,
    pub presses_remaining: u8,
    pub presses_done: u8,
    pub reset_presses: u8,

    // -- Configuration --
    pub cover_count: u8,
    pub press_duration_ms: u32,
    pub led_stable_delay_ms: u32,
    pub press_margin_ms: u32,
    pub max_reset_presses: u8,

    // -- Outputs (consumed by the owner after each tick) --
    /// Press SELECT now.
    pub press_select: bool,
    pub outcome: Option<SelectOutcome>,
}

impl SelectContext {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            now_ms: 0,
            entered_ms: 0,
            led3_on: false,
            led4_on: false,
            button_busy: false,
            cover: config.initial_cover_index,
            target: 0,
            presses_remaining: 0,
            presses_done: 0,
            reset_presses: 0,
            cover_count: config.cover_count,
            press_duration_ms: config.button_press_duration_ms,
            led_stable_delay_ms: config.timing.led_stable_delay_ms,
            press_margin_ms: config.timing.select_press_margin_ms,
            max_reset_presses: config.timing.max_reset_presses,
            press_select: false,
            outcome: None,
        }
    }

    /// Load a new job.  `presses` counts selection presses from channel 3.
    pub fn begin(&mut self, target: u8, presses: u8) {
        self.target = target;
        self.presses_remaining = presses;
        self.presses_done = 0;
        self.reset_presses = 0;
        self.press_select = false;
        self.outcome = None;
    }

    /// Milliseconds since the current step was entered.
    pub fn ms_in_step(&self) -> u32 {
        self.now_ms.wrapping_sub(self.entered_ms)
    }

    pub fn take_press_request(&mut self) -> bool {
        core::mem::take(&mut self.press_select)
    }

    pub fn take_outcome(&mut self) -> Option<SelectOutcome> {
        self.outcome.take()
    }

    /// LEDs show channel 3 (LED3 lit alone).
    pub fn at_led3_channel(&self) -> bool {
        self.led3_on && !self.led4_on
    }
}
