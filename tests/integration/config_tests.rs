//! Configuration documents and adapters wired into a running remote.

use crate::mock_hw::{MockGpio, RecordingSink, UP, make_remote, run};

use core::convert::Infallible;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use somfyremote::adapters::hal_gpio::HalGpio;
use somfyremote::adapters::nvs::NvsAdapter;
use somfyremote::app::ports::{ConfigError, ConfigPort};
use somfyremote::config::ValidationError;
use somfyremote::{Command, RemoteConfig, Role, SomfyRemote};

const BOARD_JSON: &str = r#"{
    "select_cover_pin": { "number": 4, "inverted": true },
    "up_pin": { "number": 5, "inverted": true },
    "down_pin": { "number": 6, "inverted": true },
    "my_pin": { "number": 7, "inverted": true },
    "led3_pin": { "number": 15, "inverted": true },
    "led4_pin": { "number": 16, "inverted": true },
    "led4_binary_sensor": "blind_led4",
    "button_press_duration": "1s",
    "cover_count": 6,
    "initial_cover_index": 0
}"#;

#[test]
fn json_document_drives_press_duration_and_start_channel() {
    let config = RemoteConfig::from_json(BOARD_JSON).unwrap();
    assert_eq!(config.binary_sensor(Role::Led4).map(|s| s.as_str()), Some("blind_led4"));

    let (mut remote, mut sink) = make_remote(config, MockGpio::new());
    assert_eq!(remote.current_cover(), 0);

    remote.press(Command::Up, 0, &mut sink).unwrap();
    run(&mut remote, &mut sink, 0, 990);
    assert!(remote.gpio().is_output(UP));
    remote.loop_once(1_000, &mut sink);
    assert!(!remote.gpio().is_output(UP));
}

#[test]
fn each_malformed_class_is_rejected_before_the_device_runs() {
    let cases: &[(&str, ValidationError)] = &[
        (
            r#"{ "up_pin": 5, "down_pin": 6, "my_pin": 7 }"#,
            ValidationError::MissingPin(Role::SelectCover),
        ),
        (
            r#"{ "select_cover_pin": 4, "up_pin": 4, "down_pin": 6, "my_pin": 7 }"#,
            ValidationError::PinConflict {
                pin: 4,
                first: Role::SelectCover,
                second: Role::Up,
            },
        ),
        (
            r#"{ "select_cover_pin": 4, "up_pin": 5, "down_pin": 6, "my_pin": 7,
                 "led3_binary_sensor": "x" }"#,
            ValidationError::SensorWithoutPin(Role::Led3),
        ),
        (
            r#"{ "select_cover_pin": 4, "up_pin": 5, "down_pin": 6, "my_pin": 7,
                 "cover_count": 9 }"#,
            ValidationError::InvalidCoverCount(9),
        ),
        (
            r#"{ "select_cover_pin": 4, "up_pin": 5, "down_pin": 6, "my_pin": 7,
                 "initial_cover_index": 5 }"#,
            ValidationError::InvalidCoverIndex(5),
        ),
        (r#"{ "select_cover_pin": "four" }"#, ValidationError::Malformed),
    ];

    for (doc, expected) in cases {
        assert_eq!(RemoteConfig::from_json(doc).unwrap_err(), *expected, "{}", doc);
    }

    for bad in [r#""0ms""#, r#"0"#, r#""fast""#, r#""-1s""#] {
        let doc = format!(
            r#"{{ "select_cover_pin": 4, "up_pin": 5, "down_pin": 6, "my_pin": 7,
                  "button_press_duration": {} }}"#,
            bad
        );
        assert!(
            matches!(
                RemoteConfig::from_json(&doc),
                Err(ValidationError::InvalidDuration(_))
            ),
            "{} accepted",
            bad
        );
    }
}

#[test]
fn stored_config_boots_the_remote() {
    let nvs = NvsAdapter::new().unwrap();
    assert_eq!(nvs.load().unwrap_err(), ConfigError::NotFound);

    let config = RemoteConfig::from_json(BOARD_JSON).unwrap();
    nvs.save(&config).unwrap();

    let loaded = nvs.load().unwrap();
    assert_eq!(loaded, config);
    let remote = SomfyRemote::new(loaded, MockGpio::new()).unwrap();
    assert_eq!(remote.current_cover(), 0);
}

// ── embedded-hal backend ──────────────────────────────────────

/// Open-drain pin shared between the test and the adapter.
#[derive(Clone, Default)]
struct SharedPin(std::rc::Rc<std::cell::Cell<bool>>);

impl SharedPin {
    fn pulled_low(&self) -> bool {
        self.0.get()
    }
}

impl ErrorType for SharedPin {
    type Error = Infallible;
}

impl OutputPin for SharedPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.set(true);
        Ok(())
    }
    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.set(false);
        Ok(())
    }
}

impl InputPin for SharedPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.get())
    }
    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.get())
    }
}

#[test]
fn hal_backend_pulls_the_button_low_for_one_press() {
    let pins: Vec<(u8, SharedPin)> = [4u8, 5, 6, 7, 15, 16]
        .into_iter()
        .map(|n| (n, SharedPin::default()))
        .collect();
    let mut gpio = HalGpio::new();
    for (n, pin) in &pins {
        assert!(gpio.add(*n, pin.clone()).is_ok());
    }

    let mut remote = SomfyRemote::new(RemoteConfig::reference_board(), gpio).unwrap();
    let mut sink = RecordingSink::new();
    remote.setup(&mut sink).unwrap();

    remote.press(Command::Up, 0, &mut sink).unwrap();
    let low: Vec<u8> = pins
        .iter()
        .filter(|(_, p)| p.pulled_low())
        .map(|(n, _)| *n)
        .collect();
    assert_eq!(low, vec![5]);

    for t in (10..=500).step_by(10) {
        remote.loop_once(t, &mut sink);
    }
    assert!(pins.iter().all(|(_, p)| !p.pulled_low()));
}
