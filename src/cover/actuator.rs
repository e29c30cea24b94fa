//! Press sequencing and per-channel cover tracking.
//!
//! [`CoverActuator`] is the only user of the [`PinDriver`].  It enforces
//! one press in flight (a second request is rejected with `Busy`, never
//! queued) and, when a press completes, feeds the command into the state
//! machine of the channel that was active when the press started.

use log::debug;

use crate::app::commands::Command;
use crate::app::ports::GpioPort;
use crate::config::{MAX_COVERS, RemoteConfig};
use crate::cover::state::{CoverState, CoverStateMachine, Transition};
use crate::drivers::PinDriver;
use crate::error::{Error, Result};

/// A press that finished during [`CoverActuator::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressCompletion {
    pub command: Command,
    pub cover: u8,
    pub transition: Option<Transition>,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    command: Command,
    cover: u8,
}

pub struct CoverActuator<G: GpioPort> {
    driver: PinDriver<G>,
    covers: [CoverStateMachine; MAX_COVERS as usize],
    cover_count: u8,
    current: u8,
    in_flight: Option<InFlight>,
}

impl<G: GpioPort> CoverActuator<G> {
    pub fn new(config: &RemoteConfig, driver: PinDriver<G>) -> Self {
        Self {
            driver,
            covers: [CoverStateMachine::new(); MAX_COVERS as usize],
            cover_count: config.cover_count,
            current: config.initial_cover_index,
            in_flight: None,
        }
    }

    /// Start pressing the button for `cmd`.
    pub fn send(&mut self, cmd: Command, now_ms: u32) -> Result<()> {
        self.driver.press(cmd.role(), now_ms)?;
        self.in_flight = Some(InFlight {
            command: cmd,
            cover: self.current,
        });
        Ok(())
    }

    /// Release a finished press and update the cover it addressed.
    pub fn poll(&mut self, now_ms: u32) -> Result<Option<PressCompletion>> {
        if self.driver.poll(now_ms)?.is_none() {
            return Ok(None);
        }
        Ok(self.complete(now_ms))
    }

    /// Release the held press now.  The command still counts as sent.
    pub fn release(&mut self, now_ms: u32) -> Result<Option<PressCompletion>> {
        if self.driver.release()?.is_none() {
            return Ok(None);
        }
        Ok(self.complete(now_ms))
    }

    fn complete(&mut self, now_ms: u32) -> Option<PressCompletion> {
        let f = self.in_flight.take()?;
        let transition = self.covers[f.cover as usize].apply_command(f.command, now_ms);
        debug!("cover {}: {} press complete", f.cover, f.command);
        Some(PressCompletion {
            command: f.command,
            cover: f.cover,
            transition,
        })
    }

    /// LED feedback for the active channel.
    pub fn led_feedback(&mut self, now_ms: u32) -> Option<Transition> {
        self.covers[self.current as usize].on_led_feedback(now_ms)
    }

    /// Settle moving covers that exceeded `travel_ms`.
    pub fn expire_travel(
        &mut self,
        now_ms: u32,
        travel_ms: u32,
    ) -> heapless::Vec<(u8, Transition), { MAX_COVERS as usize }> {
        let mut settled = heapless::Vec::new();
        for (i, sm) in self.covers[..self.cover_count as usize].iter_mut().enumerate() {
            if let Some(t) = sm.expire(now_ms, travel_ms) {
                // capacity equals the number of covers
                let _ = settled.push((i as u8, t));
            }
        }
        settled
    }

    pub fn cover_state(&self, cover: u8) -> Result<CoverState> {
        if cover >= self.cover_count {
            return Err(Error::InvalidCover(cover));
        }
        Ok(self.covers[cover as usize].state())
    }

    pub fn current_cover(&self) -> u8 {
        self.current
    }

    pub fn set_current_cover(&mut self, cover: u8) -> Result<()> {
        if cover >= self.cover_count {
            return Err(Error::InvalidCover(cover));
        }
        self.current = cover;
        Ok(())
    }

    pub fn cover_count(&self) -> u8 {
        self.cover_count
    }

    pub fn in_flight(&self) -> Option<Command> {
        self.in_flight.map(|f| f.command)
    }

    pub fn is_busy(&self) -> bool {
        self.driver.is_pressing()
    }

    pub fn driver(&self) -> &PinDriver<G> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut PinDriver<G> {
        &mut self.driver
    }
}
