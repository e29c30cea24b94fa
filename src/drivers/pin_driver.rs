//! Button-matrix pin driver.
//!
//! ## Hardware
//!
//! Each button pad of the remote is wired straight to a GPIO.  Idle lines
//! are inputs (high impedance) so the remote's own pull-ups keep the pads
//! released.  A press pre-loads the active level into the output latch and
//! only then flips the line to output, so no glitch of the opposite level
//! ever reaches the pad.  Release flips the line back to input.
//!
//! Presses are non-blocking: [`PinDriver::press`] asserts the line and
//! [`PinDriver::poll`] releases it once the press duration elapsed.  At
//! most one line is ever driven.

use log::{debug, info, warn};

use crate::app::ports::{GpioPort, PinMode};
use crate::config::{PinConfig, RemoteConfig};
use crate::drivers::led_input::DebouncedInput;
use crate::error::{BusyReason, Error, Result};
use crate::pins::Role;

/// One LED poll result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedSample {
    /// Debounced logic level with inversion applied.  `false` until the
    /// first level settles.
    pub on: bool,
    /// The debounced level was accepted on this read.
    pub changed: bool,
    /// The line went from a settled off to on.  The first level to settle
    /// is never a rise.
    pub rose: bool,
}

#[derive(Debug, Clone, Copy)]
struct HeldPress {
    role: Role,
    since_ms: u32,
}

/// Owns every configured line of the remote.
pub struct PinDriver<G: GpioPort> {
    gpio: G,
    pins: [Option<PinConfig>; Role::COUNT],
    press_duration_ms: u32,
    held: Option<HeldPress>,
    leds: [DebouncedInput; 2],
}

impl<G: GpioPort> PinDriver<G> {
    pub fn new(config: &RemoteConfig, gpio: G) -> Self {
        let debounce = DebouncedInput::new(config.timing.led_debounce_ms);
        Self {
            gpio,
            pins: Role::ALL.map(|role| config.pin(role)),
            press_duration_ms: config.button_press_duration_ms,
            held: None,
            leds: [debounce; 2],
        }
    }

    /// Float every configured line and log the pin map.
    pub fn setup(&mut self) -> Result<()> {
        for role in Role::ALL {
            let Some(pin) = self.pins[role.index()] else {
                debug!("pins: {} not configured", role);
                continue;
            };
            self.gpio.set_mode(pin.number, PinMode::Input)?;
            info!(
                "pins: {:<12} GPIO{}{}",
                role.to_string(),
                pin.number,
                if pin.inverted { " (inverted)" } else { "" }
            );
        }
        info!("pins: all lines configured as INPUT (floating when idle)");
        Ok(())
    }

    /// Start holding the button on `role`.
    pub fn press(&mut self, role: Role, now_ms: u32) -> Result<()> {
        if self.held.is_some() {
            return Err(Error::Busy(BusyReason::ButtonPress));
        }
        let pin = self.output_pin(role)?;

        self.gpio.write(pin.number, pin.active_level())?;
        if let Err(e) = self.gpio.set_mode(pin.number, PinMode::Output) {
            // Leave the line floating before reporting.
            if self.gpio.set_mode(pin.number, PinMode::Input).is_err() {
                warn!("pins: GPIO{} could not be floated after failed press", pin.number);
            }
            return Err(e.into());
        }

        self.held = Some(HeldPress {
            role,
            since_ms: now_ms,
        });
        debug!("pins: pressing {} (GPIO{})", role, pin.number);
        Ok(())
    }

    /// Release the held line once the press duration has elapsed.
    /// Returns the released role.
    pub fn poll(&mut self, now_ms: u32) -> Result<Option<Role>> {
        match self.held {
            Some(h) if now_ms.wrapping_sub(h.since_ms) >= self.press_duration_ms => self.release(),
            _ => Ok(None),
        }
    }

    /// Release the held line immediately.  A failed release keeps the press
    /// marked as held so the next poll retries it.
    pub fn release(&mut self) -> Result<Option<Role>> {
        let Some(h) = self.held else {
            return Ok(None);
        };
        let pin = self.output_pin(h.role)?;
        self.gpio.set_mode(pin.number, PinMode::Input)?;
        self.held = None;
        debug!("pins: {} released", h.role);
        Ok(Some(h.role))
    }

    /// Sample an LED line through its debounce filter.
    pub fn read(&mut self, role: Role, now_ms: u32) -> Result<LedSample> {
        let slot = led_slot(role).ok_or(Error::InvalidRole(role))?;
        let pin = self.pins[role.index()].ok_or(Error::InvalidRole(role))?;

        let level = self.gpio.read(pin.number)? == pin.active_level();
        let filter = &mut self.leds[slot];
        let before = filter.level();
        let accepted = filter.update(level, now_ms);
        Ok(LedSample {
            on: filter.level().unwrap_or(false),
            changed: accepted.is_some(),
            rose: before == Some(false) && accepted == Some(true),
        })
    }

    /// Last debounced LED level without touching the line.
    pub fn led_level(&self, role: Role) -> Option<bool> {
        led_slot(role).and_then(|slot| self.leds[slot].level())
    }

    pub fn held_role(&self) -> Option<Role> {
        self.held.map(|h| h.role)
    }

    pub fn is_pressing(&self) -> bool {
        self.held.is_some()
    }

    pub fn has_pin(&self, role: Role) -> bool {
        self.pins[role.index()].is_some()
    }

    pub fn press_duration_ms(&self) -> u32 {
        self.press_duration_ms
    }

    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    pub fn gpio_mut(&mut self) -> &mut G {
        &mut self.gpio
    }

    fn output_pin(&self, role: Role) -> Result<PinConfig> {
        if !role.is_output() {
            return Err(Error::InvalidRole(role));
        }
        self.pins[role.index()].ok_or(Error::InvalidRole(role))
    }
}

impl<G: GpioPort> Drop for PinDriver<G> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("pins: release on drop failed: {}", e);
        }
    }
}

fn led_slot(role: Role) -> Option<usize> {
    match role {
        Role::Led3 => Some(0),
        Role::Led4 => Some(1),
        _ => None,
    }
}
