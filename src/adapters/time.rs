//! Monotonic loop clock.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` (microsecond,
//!   monotonic since boot).
//! - **otherwise**: `std::time::Instant` for host simulation.
//!
//! The remote works in `u32` milliseconds that wrap after ~49 days; every
//! comparison in the crate uses `wrapping_sub`.

/// Loop clock for the remote.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Milliseconds since boot, truncated to `u32`.
    #[cfg(target_os = "espidf")]
    pub fn uptime_ms(&self) -> u32 {
        // SAFETY: esp_timer_get_time is a read of the RTC counter.
        ((unsafe { esp_idf_svc::sys::esp_timer_get_time() }) / 1_000) as u32
    }

    /// Milliseconds since the adapter was created, truncated to `u32`.
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}
