//! Raw GPIO access for the remote's lines.
//!
//! Thin wrappers over the ESP-IDF sys calls used by
//! [`EspGpio`](crate::adapters::gpio::EspGpio).  Lines are reset once at
//! boot and then only ever switched between floating input and output.
//!
//! On host targets the same functions operate on simulated registers so
//! the firmware loop can run under test.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Error type ────────────────────────────────────────────────

/// Failures from the raw GPIO layer, carrying the `esp_err_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    ResetFailed(i32),
    DirectionFailed(i32),
    LevelFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ResetFailed(rc) => write!(f, "gpio reset failed (rc={})", rc),
            Self::DirectionFailed(rc) => write!(f, "gpio direction failed (rc={})", rc),
            Self::LevelFailed(rc) => write!(f, "gpio set level failed (rc={})", rc),
        }
    }
}

// ── Device ────────────────────────────────────────────────────

/// Reset each line to a floating input with pulls disabled.
#[cfg(target_os = "espidf")]
pub fn init_lines(pins: &[u8]) -> Result<(), HwInitError> {
    for &pin in pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        // SAFETY: called from the single main task before the loop starts.
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::ResetFailed(ret));
        }
    }
    log::info!("hw_init: {} remote lines reset to floating input", pins.len());
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_set_output(pin: u8, output: bool) -> Result<(), HwInitError> {
    let mode = if output {
        gpio_mode_t_GPIO_MODE_INPUT_OUTPUT
    } else {
        gpio_mode_t_GPIO_MODE_INPUT
    };
    // SAFETY: direction register write on a line reset by init_lines();
    // main-loop only.
    let ret = unsafe { gpio_set_direction(pin as i32, mode) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::DirectionFailed(ret));
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: u8, high: bool) -> Result<(), HwInitError> {
    // SAFETY: output latch write; has no effect on the pad while the line
    // is an input.
    let ret = unsafe { gpio_set_level(pin as i32, u32::from(high)) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LevelFailed(ret));
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: u8) -> bool {
    // SAFETY: read-only register access.
    (unsafe { gpio_get_level(pin as i32) }) != 0
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicU64, Ordering};

    /// Bit set = line is an output.
    pub static SIM_OUTPUT: AtomicU64 = AtomicU64::new(0);
    /// Output latch per line.
    pub static SIM_LATCH: AtomicU64 = AtomicU64::new(0);
    /// Level seen on input lines.  Idle pads are pulled up.
    pub static SIM_INPUT: AtomicU64 = AtomicU64::new(u64::MAX);

    pub fn set_bit(reg: &AtomicU64, pin: u8, on: bool) {
        let mask = 1u64 << pin;
        if on {
            reg.fetch_or(mask, Ordering::SeqCst);
        } else {
            reg.fetch_and(!mask, Ordering::SeqCst);
        }
    }

    pub fn bit(reg: &AtomicU64, pin: u8) -> bool {
        reg.load(Ordering::SeqCst) & (1u64 << pin) != 0
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn init_lines(pins: &[u8]) -> Result<(), HwInitError> {
    for &pin in pins {
        sim::set_bit(&sim::SIM_OUTPUT, pin, false);
    }
    log::info!("hw_init(sim): {} lines reset", pins.len());
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_set_output(pin: u8, output: bool) -> Result<(), HwInitError> {
    sim::set_bit(&sim::SIM_OUTPUT, pin, output);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: u8, high: bool) -> Result<(), HwInitError> {
    sim::set_bit(&sim::SIM_LATCH, pin, high);
    Ok(())
}

/// Outputs read back their latch; inputs read the simulated pad.
#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: u8) -> bool {
    if sim::bit(&sim::SIM_OUTPUT, pin) {
        sim::bit(&sim::SIM_LATCH, pin)
    } else {
        sim::bit(&sim::SIM_INPUT, pin)
    }
}

/// Drive the simulated pad level of an input line (LED simulation).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_input_level(pin: u8, high: bool) {
    sim::set_bit(&sim::SIM_INPUT, pin, high);
}

/// Whether the simulated line is currently an output.
#[cfg(not(target_os = "espidf"))]
pub fn sim_is_output(pin: u8) -> bool {
    sim::bit(&sim::SIM_OUTPUT, pin)
}
