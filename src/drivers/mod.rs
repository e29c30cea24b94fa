//! Line drivers for the remote's button matrix and indicator LEDs.

pub mod hw_init;
pub mod led_input;
pub mod pin_driver;

pub use pin_driver::{LedSample, PinDriver};
