//! Somfy multi-channel remote driver library.
//!
//! Exposes the pure-logic modules for integration testing and host
//! simulation.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod cover;
pub mod error;
pub mod fsm;
pub mod pins;

pub mod adapters;
pub mod drivers;

pub use app::commands::{Command, RemoteCommand};
pub use app::events::RemoteEvent;
pub use app::service::SomfyRemote;
pub use config::{PinConfig, RemoteConfig, RemoteConfigBuilder, TimingConfig};
pub use cover::CoverState;
pub use error::{BusyReason, Error, GpioError};
pub use pins::Role;
