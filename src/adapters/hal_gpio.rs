//! `embedded-hal` GPIO adapter.
//!
//! Drives the remote from any HAL that hands out open-drain pins
//! implementing both [`InputPin`] and [`OutputPin`] (esp-hal `Flex`,
//! rp-hal, linux-embedded-hal, ...).  An open-drain line driven high is
//! electrically released, which is exactly the "input" state of a button
//! pad, so mode switching maps onto the output level:
//!
//! | Port call             | Pin action                                |
//! |-----------------------|-------------------------------------------|
//! | `set_mode(Input)`     | `set_high()` (released, pad floats)       |
//! | `write(level)`        | latch only, applied while in output mode  |
//! | `set_mode(Output)`    | apply latched level                       |
//! | `read()`              | `is_high()`                               |

use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::{GpioPort, PinMode};
use crate::error::GpioError;

const MAX_LINES: usize = 6;

struct Line<P> {
    number: u8,
    pin: P,
    latch: bool,
    output: bool,
}

/// Registry of HAL pins keyed by GPIO number.
pub struct HalGpio<P> {
    lines: heapless::Vec<Line<P>, MAX_LINES>,
}

impl<P> Default for HalGpio<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> HalGpio<P> {
    pub fn new() -> Self {
        Self {
            lines: heapless::Vec::new(),
        }
    }

    /// Register `pin` as GPIO `number`.  Hands the pin back when the
    /// registry is full or the number is taken.
    pub fn add(&mut self, number: u8, pin: P) -> Result<(), P> {
        if self.lines.iter().any(|l| l.number == number) {
            return Err(pin);
        }
        self.lines
            .push(Line {
                number,
                pin,
                latch: true,
                output: false,
            })
            .map_err(|line| line.pin)
    }

    fn line(&mut self, number: u8) -> Result<&mut Line<P>, GpioError> {
        self.lines
            .iter_mut()
            .find(|l| l.number == number)
            .ok_or(GpioError::UnknownPin(number))
    }
}

impl<P: InputPin + OutputPin> GpioPort for HalGpio<P> {
    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), GpioError> {
        let line = self.line(pin)?;
        let level = match mode {
            PinMode::Input => true,
            PinMode::Output => line.latch,
        };
        let res = if level {
            line.pin.set_high()
        } else {
            line.pin.set_low()
        };
        res.map_err(|_| GpioError::ModeFailed(pin))?;
        line.output = mode == PinMode::Output;
        Ok(())
    }

    fn write(&mut self, pin: u8, high: bool) -> Result<(), GpioError> {
        let line = self.line(pin)?;
        line.latch = high;
        if line.output {
            let res = if high {
                line.pin.set_high()
            } else {
                line.pin.set_low()
            };
            res.map_err(|_| GpioError::WriteFailed(pin))?;
        }
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<bool, GpioError> {
        let line = self.line(pin)?;
        line.pin.is_high().map_err(|_| GpioError::ReadFailed(pin))
    }
}
