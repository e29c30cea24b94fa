//! ESP32 GPIO adapter.
//!
//! Implements [`GpioPort`] over the raw calls in
//! [`drivers::hw_init`](crate::drivers::hw_init).  On host targets those
//! calls hit simulated registers, so the same adapter drives the
//! simulation build.

use crate::app::ports::{GpioPort, PinMode};
use crate::config::RemoteConfig;
use crate::drivers::hw_init::{self, HwInitError};
use crate::error::GpioError;

/// Lines registered with the adapter, one bit per GPIO.
pub struct EspGpio {
    lines: u64,
}

impl EspGpio {
    /// Reset every configured line of `config` and take ownership of them.
    pub fn new(config: &RemoteConfig) -> Result<Self, HwInitError> {
        let pins: heapless::Vec<u8, 6> = config.configured_pins().map(|(_, p)| p.number).collect();
        hw_init::init_lines(&pins)?;
        let lines = pins.iter().fold(0u64, |acc, &p| acc | 1u64 << p);
        Ok(Self { lines })
    }

    fn check(&self, pin: u8) -> Result<(), GpioError> {
        if pin < 64 && self.lines & (1u64 << pin) != 0 {
            Ok(())
        } else {
            Err(GpioError::UnknownPin(pin))
        }
    }
}

impl GpioPort for EspGpio {
    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), GpioError> {
        self.check(pin)?;
        hw_init::gpio_set_output(pin, mode == PinMode::Output).map_err(|e| {
            log::warn!("gpio: {}", e);
            GpioError::ModeFailed(pin)
        })
    }

    fn write(&mut self, pin: u8, high: bool) -> Result<(), GpioError> {
        self.check(pin)?;
        hw_init::gpio_write(pin, high).map_err(|e| {
            log::warn!("gpio: {}", e);
            GpioError::WriteFailed(pin)
        })
    }

    fn read(&mut self, pin: u8) -> Result<bool, GpioError> {
        self.check(pin)?;
        Ok(hw_init::gpio_read(pin))
    }
}
