//! Port traits: the hexagonal boundary between the remote driver and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SomfyRemote (domain)
//! ```
//!
//! GPIO backends, event sinks and storage implement these traits.  The
//! [`SomfyRemote`](super::service::SomfyRemote) consumes them via generics,
//! so the domain core never touches a register directly.
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed; callers handle every variant explicitly.

use crate::config::{RemoteConfig, ValidationError};
use crate::error::GpioError;

// ───────────────────────────────────────────────────────────────
// GPIO port (domain ↔ button matrix)
// ───────────────────────────────────────────────────────────────

/// Electrical mode of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// High impedance.  Every line idles here.
    Input,
    /// Driving the output latch.
    Output,
}

/// Raw access to the lines wired to the remote.
///
/// Pins are addressed by physical number; inversion and role mapping are
/// the driver's business, not the backend's.
pub trait GpioPort {
    /// Switch `pin` between input (floating) and output.
    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), GpioError>;

    /// Set the output latch.  Takes effect on the wire once the pin is an
    /// output, so callers may pre-load the level while still an input.
    fn write(&mut self, pin: u8, high: bool) -> Result<(), GpioError>;

    /// Sample the electrical level.
    fn read(&mut self, pin: u8) -> Result<bool, GpioError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / home automation)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`RemoteEvent`](super::events::RemoteEvent)s
/// through this port.  Adapters decide where they go (serial log, binary
/// sensor entities, a test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::RemoteEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the remote configuration.
///
/// Implementations MUST run [`RemoteConfig::validate`] on both paths and
/// reject with [`ConfigError::ValidationFailed`] rather than repair.
pub trait ConfigPort {
    /// Load the stored configuration.  [`ConfigError::NotFound`] on first boot.
    fn load(&self) -> Result<RemoteConfig, ConfigError>;

    /// Validate and persist.
    fn save(&self, config: &RemoteConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Namespaced key-value storage for small device-state blobs.
///
/// Writes MUST be atomic.  The ESP-IDF NVS API guarantees this natively;
/// the in-memory simulation achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored blob failed deserialisation.
    Corrupted,
    /// The config decoded but broke an invariant.
    ValidationFailed(ValidationError),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Caller buffer too small for the stored value.
    BufferTooSmall,
    /// Generic I/O error.
    IoError,
}

impl From<ValidationError> for ConfigError {
    fn from(e: ValidationError) -> Self {
        Self::ValidationFailed(e)
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(e) => write!(f, "validation failed: {}", e),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
