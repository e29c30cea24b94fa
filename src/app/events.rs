//! Outbound remote events.
//!
//! [`SomfyRemote`](super::service::SomfyRemote) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them: log to serial, publish binary sensors,
//! record them in a test.

use crate::app::commands::Command;
use crate::config::SensorId;
use crate::cover::CoverState;
use crate::error::BusyReason;
use crate::pins::Role;

/// Structured events emitted by the remote driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    /// `setup()` finished; carries the assumed active channel.
    Started { cover: u8 },

    /// A button line was driven to its active level.
    ButtonPressed(Command),
    /// The held button line was released back to input.
    ButtonReleased(Command),

    /// A debounced LED level change (inversion already applied).
    LedChanged { led: Role, on: bool },

    /// State to publish on a bound binary sensor entity.
    BinarySensor { sensor: SensorId, state: bool },

    /// Believed state of a cover changed.
    CoverStateChanged {
        cover: u8,
        from: CoverState,
        to: CoverState,
    },

    /// Ready/busy flipped.  `reason` is `None` when ready.
    ReadyChanged {
        ready: bool,
        reason: Option<BusyReason>,
    },

    /// A channel selection finished on `cover`.
    CoverSelected { cover: u8, presses: u8 },

    /// The reset phase never saw LED3 light alone.
    SelectionFailed { target: u8, reset_presses: u8 },

    /// The LEDs showed a different channel than the one tracked.
    CoverIndexSynced { from: u8, to: u8 },
}
