//! Device manager: the hexagonal core of the remote.
//!
//! [`SomfyRemote`] owns the pin driver (through the [`CoverActuator`]),
//! every cover state machine, the channel-selection sequencer and the
//! single pending action.  It exposes a hardware-agnostic API; GPIO is
//! injected at construction and events leave through an [`EventSink`]
//! passed at call sites, so the whole device runs under test with mock
//! adapters.
//!
//! ```text
//!   GpioPort ◀── ┌──────────────────────────────┐ ──▶ EventSink
//!                │          SomfyRemote          │
//!  StoragePort ◀─│ Actuator · Covers · Sequencer │
//!                └──────────────────────────────┘
//! ```

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::RemoteConfig;
use crate::cover::{CoverActuator, CoverState, PressCompletion};
use crate::drivers::PinDriver;
use crate::error::{BusyReason, Error, Result};
use crate::fsm::context::{SelectContext, SelectOutcome};
use crate::fsm::{Fsm, SelectStep};
use crate::pins::{LED3_COVER_INDEX, LED4_COVER_INDEX, Role};

use super::commands::{Command, RemoteCommand};
use super::events::RemoteEvent;
use super::ports::{EventSink, GpioPort, StorageError, StoragePort};

/// Storage namespace and key of the persisted device state.
pub const STATE_NAMESPACE: &str = "somfy";
pub const STATE_KEY: &str = "cover_idx";

#[derive(Debug, Serialize, Deserialize)]
struct DeviceState {
    cover_index: u8,
}

// ───────────────────────────────────────────────────────────────
// SomfyRemote
// ───────────────────────────────────────────────────────────────

pub struct SomfyRemote<G: GpioPort> {
    config: RemoteConfig,
    actuator: CoverActuator<G>,
    fsm: Fsm,
    sel: SelectContext,
    /// Button to press once the running selection completes.
    pending: Option<Command>,
    last_ready: bool,
    last_status_log_ms: u32,
    last_led_sync_ms: u32,
    last_select_done_ms: u32,
    /// Channel index changed since the last save.
    state_dirty: bool,
}

impl<G: GpioPort> SomfyRemote<G> {
    /// Build the device from a configuration.  The config is validated
    /// again here so a hand-assembled struct cannot bypass the checks.
    pub fn new(config: RemoteConfig, gpio: G) -> Result<Self> {
        config.validate()?;
        let driver = PinDriver::new(&config, gpio);
        let actuator = CoverActuator::new(&config, driver);
        let sel = SelectContext::new(&config);
        Ok(Self {
            config,
            actuator,
            fsm: Fsm::new(),
            sel,
            pending: None,
            last_ready: true,
            last_status_log_ms: 0,
            last_led_sync_ms: 0,
            last_select_done_ms: 0,
            state_dirty: false,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Float every line and announce the device.
    pub fn setup(&mut self, sink: &mut impl EventSink) -> Result<()> {
        self.actuator.driver_mut().setup()?;
        let cover = self.actuator.current_cover();
        info!(
            "remote: initialised, active channel {} (remote cover {})",
            cover,
            cover + 1
        );
        sink.emit(&RemoteEvent::Started { cover });
        self.last_ready = self.is_ready();
        self.publish_ready(sink);
        Ok(())
    }

    /// One cooperative loop iteration.  Never blocks.
    pub fn loop_once(&mut self, now_ms: u32, sink: &mut impl EventSink) {
        self.log_status(now_ms);
        self.poll_leds(now_ms, sink);
        self.poll_press(now_ms, sink);
        self.expire_travel(now_ms, sink);

        let t = &self.config.timing;
        if !self.fsm.is_running()
            && now_ms.wrapping_sub(self.last_led_sync_ms) > t.led_sync_interval_ms
            && now_ms.wrapping_sub(self.last_select_done_ms) > t.led_sync_delay_after_select_ms
        {
            self.sync_cover_index_from_leds(sink);
            self.last_led_sync_ms = now_ms;
        }

        if self.fsm.is_running() {
            self.step_selection(now_ms, sink);
        }

        self.track_ready(sink);
    }

    // ── Commands ──────────────────────────────────────────────

    pub fn handle_command(
        &mut self,
        cmd: RemoteCommand,
        now_ms: u32,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match cmd {
            RemoteCommand::Press(button) => self.press(button, now_ms, sink),
            RemoteCommand::SelectCover(i) => self.select_cover(i, now_ms, sink),
            RemoteCommand::Open(i) => self.open(i, now_ms, sink),
            RemoteCommand::Close(i) => self.close(i, now_ms, sink),
            RemoteCommand::Stop(i) => self.stop(i, now_ms, sink),
            RemoteCommand::Calibrate => {
                self.calibrate_cover_index();
                Ok(())
            }
        }
    }

    /// Press a button on the active channel.  Rejected while busy.
    pub fn press(&mut self, cmd: Command, now_ms: u32, sink: &mut impl EventSink) -> Result<()> {
        if let Some(reason) = self.busy_reason() {
            warn!("remote: busy ({}), ignoring {} press", reason, cmd);
            return Err(Error::Busy(reason));
        }
        self.start_press(cmd, now_ms, sink)
    }

    /// Bring the remote to channel `target`, then run the pending action.
    pub fn select_cover(
        &mut self,
        target: u8,
        now_ms: u32,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let count = self.actuator.cover_count();
        if target >= count {
            warn!("select: invalid channel {} (must be 0-{})", target, count - 1);
            return Err(Error::InvalidCover(target));
        }

        if self.fsm.is_running() {
            info!("select: cancelling running selection");
            self.sel.now_ms = now_ms;
            self.fsm.force_transition(SelectStep::Idle, &mut self.sel);
            if self.actuator.in_flight() == Some(Command::Select) {
                match self.actuator.release(now_ms) {
                    Ok(Some(done)) => self.report_completion(done, sink),
                    Ok(None) => {}
                    Err(e) => warn!("select: release on cancel failed: {}", e),
                }
            }
        }

        if let Some(reason) = self.busy_reason() {
            warn!("select: busy ({}), cannot select channel {}", reason, target);
            return Err(Error::Busy(reason));
        }

        let current = self.actuator.current_cover();
        if current == target {
            info!("select: already on channel {}", target);
            return self.run_pending(now_ms, sink);
        }

        for led in Role::LEDS {
            if !self.actuator.driver().has_pin(led) {
                warn!("select: {} not configured, cannot track channel", led);
                return Err(Error::InvalidRole(led));
            }
        }

        let presses = (target + count - LED3_COVER_INDEX) % count;
        self.sel.now_ms = now_ms;
        self.sel.begin(target, presses);

        if self.led(Role::Led3) && !self.led(Role::Led4) {
            info!(
                "select: LED3 lit, channel {} confirmed, skipping reset",
                LED3_COVER_INDEX
            );
            self.set_cover(LED3_COVER_INDEX);
            if presses == 0 {
                return self.run_pending(now_ms, sink);
            }
            info!("select: channel {} in {} presses", target, presses);
            self.sel.cover = LED3_COVER_INDEX;
            self.fsm.force_transition(SelectStep::AwaitRelease, &mut self.sel);
        } else {
            info!(
                "select: resetting to channel {}, then {} presses to channel {}",
                LED3_COVER_INDEX, presses, target
            );
            self.sel.cover = current;
            self.fsm.force_transition(SelectStep::Resetting, &mut self.sel);
        }

        self.apply_selection_outputs(now_ms, sink)
    }

    pub fn open(&mut self, cover: u8, now_ms: u32, sink: &mut impl EventSink) -> Result<()> {
        self.cover_action(cover, Command::Up, now_ms, sink)
    }

    pub fn close(&mut self, cover: u8, now_ms: u32, sink: &mut impl EventSink) -> Result<()> {
        self.cover_action(cover, Command::Down, now_ms, sink)
    }

    pub fn stop(&mut self, cover: u8, now_ms: u32, sink: &mut impl EventSink) -> Result<()> {
        self.cover_action(cover, Command::My, now_ms, sink)
    }

    /// Assume the remote shows its power-on channel again.
    pub fn calibrate_cover_index(&mut self) {
        let index = self.config.initial_cover_index;
        self.set_cover(index);
        info!(
            "remote: channel calibrated to {} (remote cover {})",
            index,
            index + 1
        );
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_ready(&self) -> bool {
        self.busy_reason().is_none()
    }

    /// Why the remote is busy; `None` when ready.
    pub fn busy_reason(&self) -> Option<BusyReason> {
        if self.fsm.is_running() {
            Some(BusyReason::SelectCover)
        } else if self.actuator.is_busy() {
            Some(BusyReason::ButtonPress)
        } else {
            None
        }
    }

    pub fn current_cover(&self) -> u8 {
        self.actuator.current_cover()
    }

    pub fn cover_state(&self, cover: u8) -> Result<CoverState> {
        self.actuator.cover_state(cover)
    }

    pub fn selection_step(&self) -> SelectStep {
        self.fsm.current_step()
    }

    pub fn pending_action(&self) -> Option<Command> {
        self.pending
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub fn gpio(&self) -> &G {
        self.actuator.driver().gpio()
    }

    pub fn gpio_mut(&mut self) -> &mut G {
        self.actuator.driver_mut().gpio_mut()
    }

    // ── Device state ──────────────────────────────────────────

    /// Restore the channel index saved by a previous run.  Returns whether
    /// a usable value was found.
    pub fn restore_state(&mut self, store: &impl StoragePort) -> core::result::Result<bool, StorageError> {
        let mut buf = [0u8; 8];
        let n = match store.read(STATE_NAMESPACE, STATE_KEY, &mut buf) {
            Ok(n) => n,
            Err(StorageError::NotFound) => return Ok(false),
            Err(e) => return Err(e),
        };
        let state: DeviceState = match postcard::from_bytes(&buf[..n]) {
            Ok(s) => s,
            Err(e) => {
                warn!("remote: stored state unreadable ({}), ignoring", e);
                return Ok(false);
            }
        };
        if self.actuator.set_current_cover(state.cover_index).is_err() {
            warn!(
                "remote: stored channel {} out of range, ignoring",
                state.cover_index
            );
            return Ok(false);
        }
        info!("remote: restored channel {}", state.cover_index);
        Ok(true)
    }

    /// Persist the channel index if it changed.  Returns whether a write
    /// happened.
    pub fn save_state_if_dirty(
        &mut self,
        store: &mut impl StoragePort,
    ) -> core::result::Result<bool, StorageError> {
        if !self.state_dirty {
            return Ok(false);
        }
        let state = DeviceState {
            cover_index: self.actuator.current_cover(),
        };
        let mut buf = [0u8; 8];
        let bytes = postcard::to_slice(&state, &mut buf).map_err(|_| StorageError::IoError)?;
        store.write(STATE_NAMESPACE, STATE_KEY, bytes)?;
        self.state_dirty = false;
        debug!("remote: channel {} saved", state.cover_index);
        Ok(true)
    }

    pub fn is_state_dirty(&self) -> bool {
        self.state_dirty
    }

    // ── Internal ──────────────────────────────────────────────

    fn start_press(&mut self, cmd: Command, now_ms: u32, sink: &mut impl EventSink) -> Result<()> {
        self.actuator.send(cmd, now_ms)?;
        sink.emit(&RemoteEvent::ButtonPressed(cmd));
        Ok(())
    }

    fn cover_action(
        &mut self,
        cover: u8,
        cmd: Command,
        now_ms: u32,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if cover >= self.actuator.cover_count() {
            warn!("remote: invalid channel {} for {}", cover, cmd);
            return Err(Error::InvalidCover(cover));
        }
        if self.actuator.current_cover() == cover && !self.fsm.is_running() {
            return self.press(cmd, now_ms, sink);
        }

        info!("remote: {} on channel {}, selecting first", cmd, cover);
        self.pending = Some(cmd);
        let result = self.select_cover(cover, now_ms, sink);
        if result.is_err() {
            self.pending = None;
        }
        result
    }

    fn run_pending(&mut self, now_ms: u32, sink: &mut impl EventSink) -> Result<()> {
        let Some(cmd) = self.pending.take() else {
            return Ok(());
        };
        info!(
            "remote: executing pending {} on channel {}",
            cmd,
            self.actuator.current_cover()
        );
        self.start_press(cmd, now_ms, sink)
    }

    fn clear_pending(&mut self) {
        if let Some(cmd) = self.pending.take() {
            warn!("remote: pending {} dropped", cmd);
        }
    }

    fn led(&self, role: Role) -> bool {
        self.actuator.driver().led_level(role).unwrap_or(false)
    }

    fn set_cover(&mut self, cover: u8) {
        if self.actuator.current_cover() != cover && self.actuator.set_current_cover(cover).is_ok() {
            self.state_dirty = true;
        }
    }

    fn log_status(&mut self, now_ms: u32) {
        if now_ms.wrapping_sub(self.last_status_log_ms) > self.config.timing.status_log_interval_ms {
            let cover = self.actuator.current_cover();
            debug!("remote: active channel {} (remote cover {})", cover, cover + 1);
            self.last_status_log_ms = now_ms;
        }
    }

    fn poll_leds(&mut self, now_ms: u32, sink: &mut impl EventSink) {
        for role in Role::LEDS {
            if !self.actuator.driver().has_pin(role) {
                continue;
            }
            let sample = match self.actuator.driver_mut().read(role, now_ms) {
                Ok(s) => s,
                Err(e) => {
                    warn!("leds: {} read failed: {}", role, e);
                    continue;
                }
            };
            if !sample.changed {
                continue;
            }

            sink.emit(&RemoteEvent::LedChanged {
                led: role,
                on: sample.on,
            });
            if let Some(id) = self.config.binary_sensor(role) {
                sink.emit(&RemoteEvent::BinarySensor {
                    sensor: id.clone(),
                    state: sample.on,
                });
            }

            // Channel LEDs blink while the sequencer steps through channels.
            if !sample.rose || self.fsm.is_running() || self.actuator.is_busy() {
                continue;
            }
            let cover = match role {
                Role::Led3 => LED3_COVER_INDEX,
                _ => LED4_COVER_INDEX,
            };
            if cover != self.actuator.current_cover() {
                debug!(
                    "leds: {} rose while tracking cover {}",
                    role,
                    self.actuator.current_cover()
                );
                continue;
            }
            if let Some(t) = self.actuator.led_feedback(now_ms) {
                sink.emit(&RemoteEvent::CoverStateChanged {
                    cover,
                    from: t.from,
                    to: t.to,
                });
            }
        }
    }

    fn poll_press(&mut self, now_ms: u32, sink: &mut impl EventSink) {
        match self.actuator.poll(now_ms) {
            Ok(Some(done)) => self.report_completion(done, sink),
            Ok(None) => {}
            Err(e) => warn!("remote: release failed: {}", e),
        }
    }

    fn report_completion(&mut self, done: PressCompletion, sink: &mut impl EventSink) {
        sink.emit(&RemoteEvent::ButtonReleased(done.command));
        if let Some(t) = done.transition {
            info!("cover {}: {} -> {}", done.cover, t.from, t.to);
            sink.emit(&RemoteEvent::CoverStateChanged {
                cover: done.cover,
                from: t.from,
                to: t.to,
            });
        }
    }

    fn expire_travel(&mut self, now_ms: u32, sink: &mut impl EventSink) {
        let Some(travel_ms) = self.config.timing.travel_time_ms else {
            return;
        };
        for (cover, t) in self.actuator.expire_travel(now_ms, travel_ms) {
            sink.emit(&RemoteEvent::CoverStateChanged {
                cover,
                from: t.from,
                to: t.to,
            });
        }
    }

    /// Align the tracked channel with what the LEDs show.
    fn sync_cover_index_from_leds(&mut self, sink: &mut impl EventSink) {
        if !self.config.has_channel_leds() {
            return;
        }
        let detected = match (self.led(Role::Led3), self.led(Role::Led4)) {
            (true, false) => LED3_COVER_INDEX,
            (false, true) => LED4_COVER_INDEX,
            (false, false) => {
                debug!("leds: both dark, channel undetermined");
                return;
            }
            (true, true) => {
                warn!("leds: both lit, erratic reading, not syncing");
                return;
            }
        };

        let current = self.actuator.current_cover();
        if detected != current {
            info!("leds: syncing channel {} -> {}", current, detected);
            self.set_cover(detected);
            sink.emit(&RemoteEvent::CoverIndexSynced {
                from: current,
                to: detected,
            });
        }
    }

    fn step_selection(&mut self, now_ms: u32, sink: &mut impl EventSink) {
        self.sel.now_ms = now_ms;
        self.sel.button_busy = self.actuator.is_busy();
        self.sel.led3_on = self.led(Role::Led3);
        self.sel.led4_on = self.led(Role::Led4);
        self.sel.cover = self.actuator.current_cover();
        self.fsm.tick(&mut self.sel);

        if let Err(e) = self.apply_selection_outputs(now_ms, sink) {
            warn!("select: {}", e);
        }
    }

    /// Carry out what the sequencer asked for on its last step.
    fn apply_selection_outputs(&mut self, now_ms: u32, sink: &mut impl EventSink) -> Result<()> {
        self.set_cover(self.sel.cover);

        if self.sel.take_press_request() {
            if let Err(e) = self.start_press(Command::Select, now_ms, sink) {
                self.fsm.force_transition(SelectStep::Idle, &mut self.sel);
                self.clear_pending();
                sink.emit(&RemoteEvent::SelectionFailed {
                    target: self.sel.target,
                    reset_presses: self.sel.reset_presses,
                });
                return Err(e);
            }
        }

        match self.sel.take_outcome() {
            Some(SelectOutcome::Completed { cover, presses }) => {
                info!("select: channel {} reached after {} presses", cover, presses);
                self.last_select_done_ms = now_ms;
                sink.emit(&RemoteEvent::CoverSelected { cover, presses });
                self.run_pending(now_ms, sink)
            }
            Some(SelectOutcome::Failed {
                target,
                reset_presses,
            }) => {
                self.clear_pending();
                sink.emit(&RemoteEvent::SelectionFailed {
                    target,
                    reset_presses,
                });
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn track_ready(&mut self, sink: &mut impl EventSink) {
        let ready = self.is_ready();
        if ready == self.last_ready {
            return;
        }
        let reason = self.busy_reason();
        info!(
            "remote: {} -> {} ({})",
            if self.last_ready { "READY" } else { "BUSY" },
            if ready { "READY" } else { "BUSY" },
            reason.map_or("Ready".into(), |r| r.to_string())
        );
        self.last_ready = ready;
        sink.emit(&RemoteEvent::ReadyChanged { ready, reason });
        self.publish_ready(sink);
    }

    fn publish_ready(&self, sink: &mut impl EventSink) {
        if let Some(id) = &self.config.ready_binary_sensor {
            sink.emit(&RemoteEvent::BinarySensor {
                sensor: id.clone(),
                state: self.is_ready(),
            });
        }
    }
}
