//! Inbound commands to the remote.
//!
//! These represent actions requested by the outside world (serial console,
//! home-automation actions) that [`SomfyRemote`](super::service::SomfyRemote)
//! interprets and acts upon.

use core::fmt;
use core::str::FromStr;

use crate::pins::Role;

/// One of the four buttons on the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Select,
    Up,
    Down,
    My,
}

impl Command {
    pub const ALL: [Command; 4] = [Command::Select, Command::Up, Command::Down, Command::My];

    /// Output line that carries this button.
    pub const fn role(self) -> Role {
        match self {
            Self::Select => Role::SelectCover,
            Self::Up => Role::Up,
            Self::Down => Role::Down,
            Self::My => Role::My,
        }
    }

    pub const fn from_role(role: Role) -> Option<Self> {
        match role {
            Role::SelectCover => Some(Self::Select),
            Role::Up => Some(Self::Up),
            Role::Down => Some(Self::Down),
            Role::My => Some(Self::My),
            Role::Led3 | Role::Led4 => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.role(), f)
    }
}

/// Requests accepted by [`SomfyRemote::handle_command`](super::service::SomfyRemote::handle_command).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    /// Press a button on whatever channel is active.
    Press(Command),
    /// Step the remote to a channel.
    SelectCover(u8),
    /// Select the channel, then press UP.
    Open(u8),
    /// Select the channel, then press DOWN.
    Close(u8),
    /// Select the channel, then press MY.
    Stop(u8),
    /// Assume the remote shows its default channel again.
    Calibrate,
}

/// Console text that did not parse as a [`RemoteCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseCommandError {
    Empty,
    UnknownVerb,
    MissingCover,
    BadCover,
    TrailingInput,
}

impl fmt::Display for ParseCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::UnknownVerb => write!(f, "unknown command"),
            Self::MissingCover => write!(f, "cover index required"),
            Self::BadCover => write!(f, "cover index must be a number"),
            Self::TrailingInput => write!(f, "unexpected trailing input"),
        }
    }
}

impl FromStr for RemoteCommand {
    type Err = ParseCommandError;

    /// `up`, `down`, `my`, `select`, `calibrate`, or
    /// `select|open|close|stop <index>`.  Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let verb = words.next().ok_or(ParseCommandError::Empty)?.to_ascii_lowercase();
        let cover = words
            .next()
            .map(|w| w.parse::<u8>().map_err(|_| ParseCommandError::BadCover))
            .transpose()?;
        if words.next().is_some() {
            return Err(ParseCommandError::TrailingInput);
        }

        let needs_cover =
            |make: fn(u8) -> RemoteCommand| cover.map(make).ok_or(ParseCommandError::MissingCover);
        let no_cover = |cmd: RemoteCommand| match cover {
            None => Ok(cmd),
            Some(_) => Err(ParseCommandError::TrailingInput),
        };

        match verb.as_str() {
            "up" => no_cover(Self::Press(Command::Up)),
            "down" => no_cover(Self::Press(Command::Down)),
            "my" => no_cover(Self::Press(Command::My)),
            "calibrate" => no_cover(Self::Calibrate),
            "select" => match cover {
                None => Ok(Self::Press(Command::Select)),
                Some(i) => Ok(Self::SelectCover(i)),
            },
            "open" => needs_cover(Self::Open),
            "close" => needs_cover(Self::Close),
            "stop" => needs_cover(Self::Stop),
            _ => Err(ParseCommandError::UnknownVerb),
        }
    }
}
