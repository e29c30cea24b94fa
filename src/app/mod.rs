//! Application core: the device manager and its port boundary.
//!
//! This module contains the remote's business rules: press sequencing,
//! channel selection, ready/busy tracking and LED-based channel sync.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real GPIO.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
