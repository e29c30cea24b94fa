//! Integration tests for the SomfyRemote → PinDriver → GPIO pipeline.
//!
//! Button timing, busy rejection, LED feedback, binary-sensor publishing
//! and ready tracking, all against the recording mock GPIO.

use crate::mock_hw::{self, DOWN, GpioCall, LED3, MockGpio, RecordingSink, UP, make_remote, run};

use somfyremote::app::ports::PinMode;
use somfyremote::config::PinConfig;
use somfyremote::{
    BusyReason, Command, CoverState, Error, GpioError, RemoteCommand, RemoteConfig, RemoteEvent,
    Role, TimingConfig,
};

fn config_with_sensors() -> RemoteConfig {
    RemoteConfig::builder()
        .select_cover_pin(PinConfig::inverted(mock_hw::SELECT))
        .up_pin(PinConfig::inverted(UP))
        .down_pin(PinConfig::inverted(DOWN))
        .my_pin(PinConfig::inverted(mock_hw::MY))
        .led3_pin(PinConfig::inverted(LED3))
        .led4_pin(PinConfig::inverted(mock_hw::LED4))
        .led3_binary_sensor("blind_led3")
        .ready_binary_sensor("remote_ready")
        .build()
        .unwrap()
}

// ── Press timing ──────────────────────────────────────────────

#[test]
fn up_press_holds_the_line_for_the_press_duration() {
    let (mut remote, mut sink) = make_remote(RemoteConfig::reference_board(), MockGpio::new());

    remote.press(Command::Up, 0, &mut sink).unwrap();
    assert_eq!(remote.gpio().driven(), vec![UP]);

    run(&mut remote, &mut sink, 0, 490);
    assert!(remote.gpio().is_output(UP), "UP released early");

    remote.loop_once(500, &mut sink);
    assert!(remote.gpio().driven().is_empty());
    assert_eq!(remote.cover_state(3), Ok(CoverState::MovingUp));
    assert!(sink.contains(&RemoteEvent::ButtonPressed(Command::Up)));
    assert!(sink.contains(&RemoteEvent::ButtonReleased(Command::Up)));
    assert!(sink.contains(&RemoteEvent::CoverStateChanged {
        cover: 3,
        from: CoverState::Unknown,
        to: CoverState::MovingUp,
    }));
}

#[test]
fn active_level_is_latched_before_the_line_is_driven() {
    let (mut remote, mut sink) = make_remote(RemoteConfig::reference_board(), MockGpio::new());
    remote.press(Command::Down, 0, &mut sink).unwrap();

    let calls = &remote.gpio().calls;
    let write = calls.iter().position(|c| *c == GpioCall::Write(DOWN, false));
    let drive = calls
        .iter()
        .position(|c| *c == GpioCall::Mode(DOWN, PinMode::Output));
    assert!(write.is_some() && drive.is_some());
    assert!(write < drive);
}

#[test]
fn setup_floats_every_configured_line() {
    let (remote, _sink) = make_remote(RemoteConfig::reference_board(), MockGpio::new());
    for pin in [4, 5, 6, 7, 15, 16] {
        assert!(
            remote
                .gpio()
                .calls
                .contains(&GpioCall::Mode(pin, PinMode::Input)),
            "GPIO{} not floated",
            pin
        );
    }
    assert!(remote.gpio().driven().is_empty());
}

// ── Busy discipline ───────────────────────────────────────────

#[test]
fn second_press_during_a_press_is_busy() {
    let (mut remote, mut sink) = make_remote(RemoteConfig::reference_board(), MockGpio::new());

    remote.press(Command::Up, 0, &mut sink).unwrap();
    run(&mut remote, &mut sink, 0, 100);
    assert_eq!(
        remote.press(Command::Down, 100, &mut sink),
        Err(Error::Busy(BusyReason::ButtonPress))
    );
    assert_eq!(remote.busy_reason().map(|r| r.to_string()).as_deref(), Some("Button press in progress"));
    assert!(!remote.gpio().is_output(DOWN));

    run(&mut remote, &mut sink, 110, 500);
    remote.press(Command::Down, 510, &mut sink).unwrap();
    assert_eq!(remote.gpio().driven(), vec![DOWN]);
}

#[test]
fn failed_drive_leaves_the_line_floating_and_remote_ready() {
    let mut gpio = MockGpio::new();
    gpio.fail_output = Some(UP);
    let (mut remote, mut sink) = make_remote(RemoteConfig::reference_board(), gpio);

    assert_eq!(
        remote.press(Command::Up, 0, &mut sink),
        Err(Error::Gpio(GpioError::ModeFailed(UP)))
    );
    assert!(remote.gpio().driven().is_empty());
    assert!(remote.is_ready());
    assert!(!sink.contains(&RemoteEvent::ButtonPressed(Command::Up)));
}

// ── LED feedback ──────────────────────────────────────────────

/// Reference board tracking channel 2, the channel LED3 reports.
fn tracking_led3_channel() -> RemoteConfig {
    RemoteConfig {
        initial_cover_index: 2,
        ..RemoteConfig::reference_board()
    }
}

fn state_changes(sink: &RecordingSink, cover: u8) -> usize {
    sink.count(|e| matches!(e, RemoteEvent::CoverStateChanged { cover: c, .. } if *c == cover))
}

#[test]
fn led_rising_after_up_reports_my_position() {
    let (mut remote, mut sink) = make_remote(tracking_led3_channel(), MockGpio::new());

    remote.press(Command::Up, 0, &mut sink).unwrap();
    run(&mut remote, &mut sink, 0, 600);
    assert_eq!(remote.cover_state(2), Ok(CoverState::MovingUp));

    remote.gpio_mut().set_led(LED3, true);
    run(&mut remote, &mut sink, 610, 800);
    assert_eq!(remote.cover_state(2), Ok(CoverState::AtMyPosition));
    assert!(sink.contains(&RemoteEvent::CoverStateChanged {
        cover: 2,
        from: CoverState::MovingUp,
        to: CoverState::AtMyPosition,
    }));
}

#[test]
fn my_press_then_led_rising_settles_at_my_position() {
    let (mut remote, mut sink) = make_remote(tracking_led3_channel(), MockGpio::new());
    run(&mut remote, &mut sink, 0, 190);

    remote.press(Command::My, 200, &mut sink).unwrap();
    run(&mut remote, &mut sink, 200, 800);
    assert!(sink.contains(&RemoteEvent::ButtonReleased(Command::My)));
    assert_eq!(remote.cover_state(2), Ok(CoverState::AtMyPosition));

    remote.gpio_mut().set_led(LED3, true);
    run(&mut remote, &mut sink, 810, 1_100);

    assert!(sink.contains(&RemoteEvent::LedChanged {
        led: Role::Led3,
        on: true,
    }));
    assert_eq!(remote.cover_state(2), Ok(CoverState::AtMyPosition));
    assert_eq!(state_changes(&sink, 2), 1);
}

#[test]
fn led_lit_at_boot_is_not_feedback() {
    let mut gpio = MockGpio::new();
    gpio.set_led(LED3, true);
    let (mut remote, mut sink) = make_remote(tracking_led3_channel(), gpio);
    run(&mut remote, &mut sink, 0, 300);

    assert!(sink.contains(&RemoteEvent::LedChanged {
        led: Role::Led3,
        on: true,
    }));
    assert_eq!(remote.cover_state(2), Ok(CoverState::Unknown));
    assert_eq!(state_changes(&sink, 2), 0);
}

#[test]
fn led_of_another_channel_leaves_tracked_cover_alone() {
    let (mut remote, mut sink) = make_remote(RemoteConfig::reference_board(), MockGpio::new());
    run(&mut remote, &mut sink, 0, 300);
    assert_eq!(remote.current_cover(), 3);

    remote.gpio_mut().set_led(LED3, true);
    run(&mut remote, &mut sink, 310, 600);

    assert!(sink.contains(&RemoteEvent::LedChanged {
        led: Role::Led3,
        on: true,
    }));
    assert_eq!(remote.cover_state(3), Ok(CoverState::Unknown));
    assert_eq!(state_changes(&sink, 3), 0);
}

#[test]
fn handset_on_led3_channel_resyncs_without_touching_either_cover() {
    let (mut remote, mut sink) = make_remote(RemoteConfig::reference_board(), MockGpio::with_handset(2));
    run(&mut remote, &mut sink, 0, 2_100);

    assert_eq!(remote.current_cover(), 2);
    assert_eq!(remote.cover_state(3), Ok(CoverState::Unknown));
    assert_eq!(remote.cover_state(2), Ok(CoverState::Unknown));
}

#[test]
fn led_flicker_shorter_than_debounce_is_ignored() {
    let (mut remote, mut sink) = make_remote(RemoteConfig::reference_board(), MockGpio::new());
    run(&mut remote, &mut sink, 0, 300);

    remote.gpio_mut().set_led(LED3, true);
    run(&mut remote, &mut sink, 310, 350);
    remote.gpio_mut().set_led(LED3, false);
    run(&mut remote, &mut sink, 360, 800);

    let lit = sink.count(|e| {
        matches!(
            e,
            RemoteEvent::LedChanged {
                led: Role::Led3,
                on: true
            }
        )
    });
    assert_eq!(lit, 0);
}

#[test]
fn led_edges_publish_bound_binary_sensor_once_each() {
    let (mut remote, mut sink) = make_remote(config_with_sensors(), MockGpio::new());
    let led3_sensor = |sink: &RecordingSink| -> Vec<bool> {
        sink.events
            .iter()
            .filter_map(|e| match e {
                RemoteEvent::BinarySensor { sensor, state } if sensor.as_str() == "blind_led3" => {
                    Some(*state)
                }
                _ => None,
            })
            .collect()
    };

    run(&mut remote, &mut sink, 0, 1000);
    assert_eq!(led3_sensor(&sink), vec![false]);

    remote.gpio_mut().set_led(LED3, true);
    run(&mut remote, &mut sink, 1010, 1900);
    assert_eq!(led3_sensor(&sink), vec![false, true]);
}

// ── Ready tracking ────────────────────────────────────────────

#[test]
fn ready_sensor_follows_press_lifecycle() {
    let (mut remote, mut sink) = make_remote(config_with_sensors(), MockGpio::new());
    let ready_states = |sink: &RecordingSink| -> Vec<bool> {
        sink.events
            .iter()
            .filter_map(|e| match e {
                RemoteEvent::BinarySensor { sensor, state } if sensor.as_str() == "remote_ready" => {
                    Some(*state)
                }
                _ => None,
            })
            .collect()
    };
    assert_eq!(ready_states(&sink), vec![true]);

    remote.press(Command::My, 0, &mut sink).unwrap();
    remote.loop_once(0, &mut sink);
    assert!(sink.contains(&RemoteEvent::ReadyChanged {
        ready: false,
        reason: Some(BusyReason::ButtonPress),
    }));

    run(&mut remote, &mut sink, 10, 600);
    assert!(sink.contains(&RemoteEvent::ReadyChanged {
        ready: true,
        reason: None,
    }));
    assert_eq!(ready_states(&sink), vec![true, false, true]);
}

// ── Travel timeout ────────────────────────────────────────────

#[test]
fn moving_cover_settles_after_travel_time() {
    let config = RemoteConfig {
        timing: TimingConfig {
            travel_time_ms: Some(3_000),
            ..TimingConfig::default()
        },
        ..RemoteConfig::reference_board()
    };
    let (mut remote, mut sink) = make_remote(config, MockGpio::new());

    remote.press(Command::Down, 0, &mut sink).unwrap();
    run(&mut remote, &mut sink, 0, 3_490);
    assert_eq!(remote.cover_state(3), Ok(CoverState::MovingDown));

    remote.loop_once(3_500, &mut sink);
    assert_eq!(remote.cover_state(3), Ok(CoverState::Idle));
}

// ── Command surface ───────────────────────────────────────────

#[test]
fn console_line_on_active_channel_presses_directly() {
    let (mut remote, mut sink) = make_remote(RemoteConfig::reference_board(), MockGpio::new());
    let cmd: RemoteCommand = "close 3".parse().unwrap();

    remote.handle_command(cmd, 0, &mut sink).unwrap();
    assert_eq!(remote.gpio().driven(), vec![DOWN]);
    assert_eq!(remote.pending_action(), None);
}

#[test]
fn out_of_range_cover_is_rejected() {
    let (mut remote, mut sink) = make_remote(RemoteConfig::reference_board(), MockGpio::new());
    assert_eq!(
        remote.handle_command(RemoteCommand::Open(5), 0, &mut sink),
        Err(Error::InvalidCover(5))
    );
    assert_eq!(remote.cover_state(7), Err(Error::InvalidCover(7)));
    assert!(remote.gpio().driven().is_empty());
}

#[test]
fn selection_needs_channel_leds() {
    let config = RemoteConfig::builder()
        .select_cover_pin(PinConfig::inverted(mock_hw::SELECT))
        .up_pin(PinConfig::inverted(UP))
        .down_pin(PinConfig::inverted(DOWN))
        .my_pin(PinConfig::inverted(mock_hw::MY))
        .build()
        .unwrap();
    let (mut remote, mut sink) = make_remote(config, MockGpio::new());

    assert_eq!(
        remote.open(1, 0, &mut sink),
        Err(Error::InvalidRole(Role::Led3))
    );
    assert_eq!(remote.pending_action(), None);
    assert!(remote.is_ready());
}

#[test]
fn calibrate_returns_to_the_start_channel() {
    let (mut remote, mut sink) = make_remote(RemoteConfig::reference_board(), MockGpio::new());
    remote
        .handle_command(RemoteCommand::Calibrate, 0, &mut sink)
        .unwrap();
    assert_eq!(remote.current_cover(), 3);
}
