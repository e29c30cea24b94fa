//! Fuzz target: serial console command lines
//!
//! Parses arbitrary text as a `RemoteCommand` and dispatches whatever
//! parses to a remote on the reference board, checking that no input
//! panics and that at most one button line is ever driven.
//!
//! cargo fuzz run fuzz_command_line

#![no_main]

use libfuzzer_sys::fuzz_target;
use somfyremote::app::events::RemoteEvent;
use somfyremote::app::ports::{EventSink, GpioPort, PinMode};
use somfyremote::{GpioError, RemoteCommand, RemoteConfig, SomfyRemote};

#[derive(Default)]
struct Lines {
    driven: u64,
}

impl GpioPort for Lines {
    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), GpioError> {
        match mode {
            PinMode::Output => self.driven |= 1 << pin,
            PinMode::Input => self.driven &= !(1 << pin),
        }
        assert!(self.driven.count_ones() <= 1, "two lines driven");
        Ok(())
    }
    fn write(&mut self, _pin: u8, _high: bool) -> Result<(), GpioError> {
        Ok(())
    }
    fn read(&mut self, _pin: u8) -> Result<bool, GpioError> {
        Ok(true)
    }
}

struct Discard;

impl EventSink for Discard {
    fn emit(&mut self, _event: &RemoteEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(mut remote) = SomfyRemote::new(RemoteConfig::reference_board(), Lines::default()) else {
        return;
    };
    let mut sink = Discard;
    if remote.setup(&mut sink).is_err() {
        return;
    }

    let mut now = 0u32;
    for line in text.lines().take(16) {
        if let Ok(cmd) = line.parse::<RemoteCommand>() {
            let _ = remote.handle_command(cmd, now, &mut sink);
        }
        for _ in 0..40 {
            now += 10;
            remote.loop_once(now, &mut sink);
        }
    }
});
