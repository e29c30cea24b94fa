//! Logical pin roles and the GPIO assignments of the reference board.
//!
//! Every driver addresses lines by [`Role`]; the physical number comes from
//! the validated [`RemoteConfig`](crate::config::RemoteConfig).  The
//! constants below describe the reference board (ESP32-S3 soldered onto
//! the button pads of a 5-channel Somfy Situo remote) and are only used
//! when no stored configuration exists.

use core::fmt;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Logical function of a line on the remote's button matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Role {
    /// Channel-select button (cycles the addressed cover).
    SelectCover = 0,
    Up = 1,
    Down = 2,
    /// Stop / recall the stored "my" position.
    My = 3,
    /// Channel indicator LED 3 (input).
    Led3 = 4,
    /// Channel indicator LED 4 (input).
    Led4 = 5,
}

/// Whether a role drives the matrix or observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Output,
    Input,
}

impl Role {
    pub const COUNT: usize = 6;

    pub const ALL: [Role; Role::COUNT] = [
        Role::SelectCover,
        Role::Up,
        Role::Down,
        Role::My,
        Role::Led3,
        Role::Led4,
    ];

    /// The four button lines.
    pub const BUTTONS: [Role; 4] = [Role::SelectCover, Role::Up, Role::Down, Role::My];

    /// The two LED sense lines.
    pub const LEDS: [Role; 2] = [Role::Led3, Role::Led4];

    pub const fn direction(self) -> Direction {
        match self {
            Self::SelectCover | Self::Up | Self::Down | Self::My => Direction::Output,
            Self::Led3 | Self::Led4 => Direction::Input,
        }
    }

    pub const fn is_output(self) -> bool {
        matches!(self.direction(), Direction::Output)
    }

    /// Configuration key of the role's pin (`up_pin`, `led3_pin`, ...).
    pub const fn config_key(self) -> &'static str {
        match self {
            Self::SelectCover => "select_cover_pin",
            Self::Up => "up_pin",
            Self::Down => "down_pin",
            Self::My => "my_pin",
            Self::Led3 => "led3_pin",
            Self::Led4 => "led4_pin",
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SelectCover => "Select Cover",
            Self::Up => "Up",
            Self::Down => "Down",
            Self::My => "My",
            Self::Led3 => "LED3",
            Self::Led4 => "LED4",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Reference board: button pads (open-drain, active LOW)
// ---------------------------------------------------------------------------

/// SELECT pad.  Pulled to GND to press.
pub const SELECT_COVER_GPIO: u8 = 4;
pub const UP_GPIO: u8 = 5;
pub const DOWN_GPIO: u8 = 6;
pub const MY_GPIO: u8 = 7;

/// The remote's pads are pulled up internally; a press sinks them to GND.
pub const BUTTONS_ACTIVE_LOW: bool = true;

// ---------------------------------------------------------------------------
// Reference board: channel LEDs (cathode side, LOW = lit)
// ---------------------------------------------------------------------------

pub const LED3_GPIO: u8 = 15;
pub const LED4_GPIO: u8 = 16;

pub const LEDS_ACTIVE_LOW: bool = true;

// ---------------------------------------------------------------------------
// Channel indicators
// ---------------------------------------------------------------------------

/// Cover index shown by LED3 lit alone.
pub const LED3_COVER_INDEX: u8 = 2;
/// Cover index shown by LED4 lit alone.
pub const LED4_COVER_INDEX: u8 = 3;
