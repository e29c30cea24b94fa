//! Unified error types for the remote driver.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform.  All variants are `Copy` so they
//! can be returned from the press path and logged without allocation.

use core::fmt;

use crate::config::ValidationError;
use crate::pins::Role;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible runtime operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration was rejected before the device started.
    Config(ValidationError),
    /// The role has no configured pin, or is used in the wrong direction.
    InvalidRole(Role),
    /// The button matrix is occupied.
    Busy(BusyReason),
    /// Cover index outside `0..cover_count`.
    InvalidCover(u8),
    /// The GPIO backend reported a failure.
    Gpio(GpioError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::InvalidRole(role) => write!(f, "invalid role: {role} has no usable pin"),
            Self::Busy(reason) => write!(f, "busy: {reason}"),
            Self::InvalidCover(idx) => write!(f, "invalid cover index {idx}"),
            Self::Gpio(e) => write!(f, "gpio: {e}"),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Busy reasons
// ---------------------------------------------------------------------------

/// Why the remote cannot accept a new operation right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyReason {
    /// A button is currently held down.
    ButtonPress,
    /// A cover-selection sequence owns the SELECT button.
    SelectCover,
}

impl fmt::Display for BusyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ButtonPress => write!(f, "Button press in progress"),
            Self::SelectCover => write!(f, "Select cover in progress"),
        }
    }
}

impl From<BusyReason> for Error {
    fn from(reason: BusyReason) -> Self {
        Self::Busy(reason)
    }
}

// ---------------------------------------------------------------------------
// GPIO errors
// ---------------------------------------------------------------------------

/// Failures reported by a [`GpioPort`](crate::app::ports::GpioPort) backend.
/// Each variant carries the physical pin number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioError {
    /// Switching the pin between input and output failed.
    ModeFailed(u8),
    /// Setting the output latch failed.
    WriteFailed(u8),
    /// Reading the input level failed.
    ReadFailed(u8),
    /// The backend has no line registered for this pin number.
    UnknownPin(u8),
}

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModeFailed(pin) => write!(f, "GPIO{pin} mode switch failed"),
            Self::WriteFailed(pin) => write!(f, "GPIO{pin} write failed"),
            Self::ReadFailed(pin) => write!(f, "GPIO{pin} read failed"),
            Self::UnknownPin(pin) => write!(f, "GPIO{pin} not registered"),
        }
    }
}

impl From<GpioError> for Error {
    fn from(e: GpioError) -> Self {
        Self::Gpio(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
