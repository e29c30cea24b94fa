//! Concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                       |
//! |------------|--------------|-----------------------------------|
//! | `gpio`     | GpioPort     | ESP32 GPIO matrix / host sim      |
//! | `hal_gpio` | GpioPort     | any `embedded-hal` open-drain pin |
//! | `log_sink` | EventSink    | Serial log output                 |
//! | `nvs`      | ConfigPort   | NVS / in-memory store             |
//! |            | StoragePort  |                                   |
//! | `time`     | (clock)      | ESP32 system timer                |

pub mod gpio;
pub mod hal_gpio;
pub mod log_sink;
pub mod nvs;
pub mod time;
