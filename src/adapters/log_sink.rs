//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured remote events to the
//! ESP-IDF logger (UART / USB-CDC in production).  A home-automation
//! bridge would implement the same trait and publish the binary sensors.

use log::{info, warn};

use crate::app::events::RemoteEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`RemoteEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &RemoteEvent) {
        match event {
            RemoteEvent::Started { cover } => {
                info!("START | channel={} (remote cover {})", cover, cover + 1);
            }
            RemoteEvent::ButtonPressed(cmd) => info!("PRESS | {}", cmd),
            RemoteEvent::ButtonReleased(cmd) => info!("RELEASE | {}", cmd),
            RemoteEvent::LedChanged { led, on } => {
                info!("LED | {}={}", led, if *on { "ON" } else { "OFF" });
            }
            RemoteEvent::BinarySensor { sensor, state } => {
                info!("SENSOR | {}={}", sensor, state);
            }
            RemoteEvent::CoverStateChanged { cover, from, to } => {
                info!("COVER | {}: {} -> {}", cover, from, to);
            }
            RemoteEvent::ReadyChanged { ready, reason } => match reason {
                Some(r) => info!("READY | {} ({})", ready, r),
                None => info!("READY | {}", ready),
            },
            RemoteEvent::CoverSelected { cover, presses } => {
                info!("SELECT | channel={} presses={}", cover, presses);
            }
            RemoteEvent::SelectionFailed {
                target,
                reset_presses,
            } => {
                warn!(
                    "SELECT | channel={} failed after {} reset presses",
                    target, reset_presses
                );
            }
            RemoteEvent::CoverIndexSynced { from, to } => {
                info!("SYNC | channel {} -> {}", from, to);
            }
        }
    }
}
