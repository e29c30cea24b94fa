//! SomfyRemote firmware entry point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  EspGpio      LogEventSink   NvsAdapter      Esp32Time       │
//! │  (GpioPort)   (EventSink)    (Config+State)  (loop clock)    │
//! │  Console (stdin → RemoteCommand)                             │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            SomfyRemote (pure logic)                    │  │
//! │  │  PinDriver · CoverActuator · Select FSM                │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::{error, info, warn};

use somfyremote::adapters::gpio::EspGpio;
use somfyremote::adapters::log_sink::LogEventSink;
use somfyremote::adapters::nvs::NvsAdapter;
use somfyremote::adapters::time::Esp32TimeAdapter;
use somfyremote::app::ports::{ConfigError, ConfigPort};
use somfyremote::{RemoteCommand, RemoteConfig, SomfyRemote};

/// Main loop period.  Short enough that a press ends within a tick of its
/// configured duration.
const LOOP_PERIOD_MS: u64 = 10;

/// Minimum spacing between channel-index flash writes.
const STATE_SAVE_INTERVAL_MS: u32 = 1_000;

/// Read commands from the serial console, one per line.
fn spawn_console(tx: mpsc::Sender<RemoteCommand>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("console".into())
        .stack_size(8192)
        .spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.read_line(&mut line) {
                    Ok(0) => std::thread::sleep(Duration::from_millis(100)),
                    Ok(_) => {
                        let text = line.trim();
                        if text.is_empty() {
                            continue;
                        }
                        match text.parse::<RemoteCommand>() {
                            Ok(cmd) => {
                                if tx.send(cmd).is_err() {
                                    return;
                                }
                            }
                            Err(e) => warn!("console: '{}': {}", text, e),
                        }
                    }
                    Err(e) => {
                        warn!("console: read failed: {}", e);
                        std::thread::sleep(Duration::from_millis(100));
                    }
                }
            }
        })
        .map(|_| ())
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("SomfyRemote v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Config from NVS, or the reference board ────────────
    let mut nvs = NvsAdapter::new().map_err(|e| anyhow!("NVS init failed: {}", e))?;
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(ConfigError::NotFound) => {
            info!("Config: none stored, persisting reference board layout");
            let cfg = RemoteConfig::reference_board();
            if let Err(e) = nvs.save(&cfg) {
                warn!("Config: save failed ({})", e);
            }
            cfg
        }
        Err(e) => {
            warn!("Config: load failed ({}), using reference board layout", e);
            RemoteConfig::reference_board()
        }
    };

    // ── 3. Adapters ───────────────────────────────────────────
    let gpio = EspGpio::new(&config).map_err(|e| anyhow!("GPIO init failed: {}", e))?;
    let mut sink = LogEventSink::new();
    let clock = Esp32TimeAdapter::new();

    // ── 4. Remote ─────────────────────────────────────────────
    let mut remote = SomfyRemote::new(config, gpio).map_err(|e| anyhow!("remote: {}", e))?;
    match remote.restore_state(&nvs) {
        Ok(true) => info!("State: restored channel {}", remote.current_cover()),
        Ok(false) => info!("State: none stored"),
        Err(e) => warn!("State: restore failed ({})", e),
    }
    remote
        .setup(&mut sink)
        .map_err(|e| anyhow!("remote setup failed: {}", e))?;

    let (tx, rx) = mpsc::channel();
    spawn_console(tx).context("console thread")?;

    info!("System ready. Entering main loop.");

    // ── 5. Main loop ──────────────────────────────────────────
    let mut last_save_ms = clock.uptime_ms();
    loop {
        let now = clock.uptime_ms();

        while let Ok(cmd) = rx.try_recv() {
            if let Err(e) = remote.handle_command(cmd, now, &mut sink) {
                warn!("command {:?} rejected: {}", cmd, e);
            }
        }

        remote.loop_once(now, &mut sink);

        // Mid-sequence indices are transient; persist only the settled one.
        if remote.is_ready() && now.wrapping_sub(last_save_ms) >= STATE_SAVE_INTERVAL_MS {
            last_save_ms = now;
            if let Err(e) = remote.save_state_if_dirty(&mut nvs) {
                error!("State: save failed ({})", e);
            }
        }

        std::thread::sleep(Duration::from_millis(LOOP_PERIOD_MS));
    }
}
