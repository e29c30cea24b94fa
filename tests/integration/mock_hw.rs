//! Mock hardware adapters for integration tests.
//!
//! [`MockGpio`] records every port call and can emulate the remote itself:
//! each released SELECT press advances a virtual channel and drives the
//! LED lines the way the handset does (LED3 alone on channel 2, LED4 alone
//! on channel 3, dark otherwise).

use somfyremote::app::events::RemoteEvent;
use somfyremote::app::ports::{EventSink, GpioPort, PinMode, StorageError, StoragePort};
use somfyremote::{GpioError, RemoteConfig, SomfyRemote};
use std::collections::{HashMap, HashSet};

pub const SELECT: u8 = 4;
pub const UP: u8 = 5;
pub const DOWN: u8 = 6;
pub const MY: u8 = 7;
pub const LED3: u8 = 15;
pub const LED4: u8 = 16;

/// Loop period used by [`run`].
pub const TICK_MS: u32 = 10;

// ── GPIO call record ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioCall {
    Mode(u8, PinMode),
    Write(u8, bool),
}

// ── Virtual handset ───────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct VirtualRemote {
    pub channel: u8,
    pub channels: u8,
    /// LEDs stay dark no matter the channel.
    pub leds_broken: bool,
}

impl VirtualRemote {
    fn led_levels(&self) -> (bool, bool) {
        if self.leds_broken {
            return (false, false);
        }
        (self.channel == 2, self.channel == 3)
    }
}

// ── MockGpio ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MockGpio {
    pub calls: Vec<GpioCall>,
    outputs: HashSet<u8>,
    latches: HashMap<u8, bool>,
    inputs: HashMap<u8, bool>,
    /// `set_mode(pin, Output)` fails for this pin.
    pub fail_output: Option<u8>,
    pub handset: Option<VirtualRemote>,
    /// Completed presses per pin.
    pub presses: HashMap<u8, u32>,
}

#[allow(dead_code)]
impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emulate a five-channel handset sitting on `channel`.
    pub fn with_handset(channel: u8) -> Self {
        let mut gpio = Self::new();
        gpio.handset = Some(VirtualRemote {
            channel,
            channels: 5,
            leds_broken: false,
        });
        gpio.apply_handset_leds();
        gpio
    }

    /// Set an LED as the handset would show it (active low).
    pub fn set_led(&mut self, pin: u8, on: bool) {
        self.inputs.insert(pin, !on);
    }

    pub fn is_output(&self, pin: u8) -> bool {
        self.outputs.contains(&pin)
    }

    /// Pins currently driven.
    pub fn driven(&self) -> Vec<u8> {
        let mut v: Vec<u8> = self.outputs.iter().copied().collect();
        v.sort_unstable();
        v
    }

    pub fn press_count(&self, pin: u8) -> u32 {
        self.presses.get(&pin).copied().unwrap_or(0)
    }

    pub fn handset_channel(&self) -> Option<u8> {
        self.handset.map(|h| h.channel)
    }

    fn apply_handset_leds(&mut self) {
        if let Some(h) = self.handset {
            let (l3, l4) = h.led_levels();
            self.set_led(LED3, l3);
            self.set_led(LED4, l4);
        }
    }
}

impl GpioPort for MockGpio {
    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), GpioError> {
        self.calls.push(GpioCall::Mode(pin, mode));
        match mode {
            PinMode::Output => {
                if self.fail_output == Some(pin) {
                    return Err(GpioError::ModeFailed(pin));
                }
                self.outputs.insert(pin);
            }
            PinMode::Input => {
                if self.outputs.remove(&pin) {
                    *self.presses.entry(pin).or_insert(0) += 1;
                    if pin == SELECT {
                        if let Some(h) = self.handset.as_mut() {
                            h.channel = (h.channel + 1) % h.channels;
                        }
                        self.apply_handset_leds();
                    }
                }
            }
        }
        Ok(())
    }

    fn write(&mut self, pin: u8, high: bool) -> Result<(), GpioError> {
        self.calls.push(GpioCall::Write(pin, high));
        self.latches.insert(pin, high);
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<bool, GpioError> {
        if self.outputs.contains(&pin) {
            return Ok(self.latches.get(&pin).copied().unwrap_or(true));
        }
        Ok(self.inputs.get(&pin).copied().unwrap_or(true))
    }
}

// ── Event recorder ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<RemoteEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&RemoteEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn contains(&self, event: &RemoteEvent) -> bool {
        self.events.contains(event)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &RemoteEvent) {
        self.events.push(event.clone());
    }
}

// ── In-memory storage ─────────────────────────────────────────

#[derive(Default)]
pub struct MemStore {
    entries: HashMap<(String, String), Vec<u8>>,
}

#[allow(dead_code)]
impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl StoragePort for MemStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self
            .entries
            .get(&(namespace.to_owned(), key.to_owned()))
            .ok_or(StorageError::NotFound)?;
        if data.len() > buf.len() {
            return Err(StorageError::BufferTooSmall);
        }
        buf[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.entries
            .insert((namespace.to_owned(), key.to_owned()), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.entries.remove(&(namespace.to_owned(), key.to_owned()));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.entries
            .contains_key(&(namespace.to_owned(), key.to_owned()))
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// Build and set up a remote on the reference board.
#[allow(dead_code)]
pub fn make_remote(
    config: RemoteConfig,
    gpio: MockGpio,
) -> (SomfyRemote<MockGpio>, RecordingSink) {
    let mut remote = SomfyRemote::new(config, gpio).unwrap();
    let mut sink = RecordingSink::new();
    remote.setup(&mut sink).unwrap();
    (remote, sink)
}

/// Run the loop every [`TICK_MS`] from `from` up to and including `to`.
#[allow(dead_code)]
pub fn run(remote: &mut SomfyRemote<MockGpio>, sink: &mut RecordingSink, from: u32, to: u32) {
    let mut t = from;
    while t <= to {
        remote.loop_once(t, sink);
        t += TICK_MS;
    }
}
