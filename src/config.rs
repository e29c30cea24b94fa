//! Remote configuration.
//!
//! The configuration surface mirrors the declarative component schema the
//! remote was originally wired through: four required button pins, two
//! optional LED pins, optional binary-sensor bindings and a button press
//! duration.  It is assembled with [`RemoteConfigBuilder`] (in code or from
//! JSON) and only a successfully validated [`RemoteConfig`] can reach the
//! drivers.

use core::fmt;

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use crate::pins::{self, Role};

/// Default hold time of a simulated button press.
pub const DEFAULT_BUTTON_PRESS_MS: u32 = 500;
/// Longest accepted button press.
pub const MAX_BUTTON_PRESS_MS: u32 = 60_000;
/// Channels on the remote unless configured otherwise.
pub const DEFAULT_COVER_COUNT: u8 = 5;
/// Upper bound on channels the driver tracks.
pub const MAX_COVERS: u8 = 8;
/// Channel assumed at boot before any LED feedback.
pub const DEFAULT_COVER_INDEX: u8 = 3;

/// Highest GPIO number a line may use.
pub const MAX_GPIO: u8 = 63;

/// Identifier of a binary sensor entity published by the remote.
pub type SensorId = heapless::String<32>;

// ---------------------------------------------------------------------------
// Pins
// ---------------------------------------------------------------------------

/// Physical pin bound to a [`Role`].  Direction follows from the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinConfig {
    /// GPIO number.
    pub number: u8,
    /// Active level is LOW instead of HIGH.
    pub inverted: bool,
}

impl PinConfig {
    pub const fn new(number: u8) -> Self {
        Self {
            number,
            inverted: false,
        }
    }

    pub const fn inverted(number: u8) -> Self {
        Self {
            number,
            inverted: true,
        }
    }

    /// Electrical level that means "pressed" / "lit".
    pub const fn active_level(&self) -> bool {
        !self.inverted
    }
}

/// Accepted textual pin forms: `5` or `{ "number": 5, "inverted": true }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PinSchema {
    Number(u8),
    Full {
        number: u8,
        #[serde(default)]
        inverted: bool,
    },
}

impl From<PinSchema> for PinConfig {
    fn from(schema: PinSchema) -> Self {
        match schema {
            PinSchema::Number(number) => Self::new(number),
            PinSchema::Full { number, inverted } => Self { number, inverted },
        }
    }
}

fn de_pin<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PinConfig>, D::Error> {
    Ok(Option::<PinSchema>::deserialize(d)?.map(PinConfig::from))
}

// ---------------------------------------------------------------------------
// Durations
// ---------------------------------------------------------------------------

/// A duration as written in configuration: bare milliseconds or text with
/// a unit (`"500ms"`, `"1s"`, `"0.75s"`, `"1min"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DurationSpec {
    Millis(u32),
    Text(String),
}

/// Parse a textual duration into whole milliseconds.
///
/// Fractions below one millisecond are truncated.  Zero and values past
/// `u32::MAX` ms are rejected.
pub fn parse_duration_ms(text: &str) -> Result<u32, ValidationError> {
    let text = text.trim();
    let split = text
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (number, unit) = (text[..split].trim(), text[split..].trim());

    let scale: u64 = match unit {
        "" | "ms" => 1,
        "s" => 1_000,
        "min" => 60_000,
        _ => return Err(ValidationError::InvalidDuration("unknown unit")),
    };

    let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(ValidationError::InvalidDuration("missing number"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidDuration("not a number"));
    }
    if frac.len() > 9 {
        return Err(ValidationError::InvalidDuration("too many decimals"));
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| ValidationError::InvalidDuration("out of range"))?
    };
    let frac_ms = if frac.is_empty() {
        0
    } else {
        let digits: u64 = frac
            .parse()
            .map_err(|_| ValidationError::InvalidDuration("not a number"))?;
        digits * scale / 10u64.pow(frac.len() as u32)
    };

    let ms = whole
        .checked_mul(scale)
        .and_then(|ms| ms.checked_add(frac_ms))
        .ok_or(ValidationError::InvalidDuration("out of range"))?;
    let ms = u32::try_from(ms).map_err(|_| ValidationError::InvalidDuration("out of range"))?;
    if ms == 0 {
        return Err(ValidationError::InvalidDuration("must be positive"));
    }
    Ok(ms)
}

impl DurationSpec {
    fn to_millis(&self) -> Result<u32, ValidationError> {
        match self {
            Self::Millis(0) => Err(ValidationError::InvalidDuration("must be positive")),
            Self::Millis(ms) => Ok(*ms),
            Self::Text(text) => parse_duration_ms(text),
        }
    }
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Loop timing parameters.  Defaults match the behaviour of the physical
/// remote (LED response ~100 ms, 100 ms sensor filter, 100 ms margin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// A new LED level must hold this long before it is accepted.
    pub led_debounce_ms: u32,
    /// Wait after a reset press before LED3 is checked.
    pub led_stable_delay_ms: u32,
    /// Gap added after the press duration between selection presses.
    pub select_press_margin_ms: u32,
    /// Reset-phase presses before channel selection gives up.
    pub max_reset_presses: u8,
    /// Period of the LED-based channel sync.
    pub led_sync_interval_ms: u32,
    /// Quiet period after a completed selection before LED sync resumes.
    pub led_sync_delay_after_select_ms: u32,
    /// Period of the active-channel debug log.
    pub status_log_interval_ms: u32,
    /// Full travel time of a cover; moving covers settle to idle after it.
    pub travel_time_ms: Option<u32>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            led_debounce_ms: 100,
            led_stable_delay_ms: 300,
            select_press_margin_ms: 50,
            max_reset_presses: 10,
            led_sync_interval_ms: 2_000,
            led_sync_delay_after_select_ms: 2_000,
            status_log_interval_ms: 5_000,
            travel_time_ms: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Validated configuration
// ---------------------------------------------------------------------------

/// Validated remote configuration.  Immutable once handed to the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub select_cover_pin: PinConfig,
    pub up_pin: PinConfig,
    pub down_pin: PinConfig,
    pub my_pin: PinConfig,
    pub led3_pin: Option<PinConfig>,
    pub led4_pin: Option<PinConfig>,
    pub led3_binary_sensor: Option<SensorId>,
    pub led4_binary_sensor: Option<SensorId>,
    /// Receives `true` while the remote accepts new operations.
    pub ready_binary_sensor: Option<SensorId>,
    pub button_press_duration_ms: u32,
    pub cover_count: u8,
    pub initial_cover_index: u8,
    pub timing: TimingConfig,
}

impl RemoteConfig {
    pub fn builder() -> RemoteConfigBuilder {
        RemoteConfigBuilder::default()
    }

    /// Wiring of the reference board with default timing.
    pub fn reference_board() -> Self {
        let button = |n| PinConfig {
            number: n,
            inverted: pins::BUTTONS_ACTIVE_LOW,
        };
        let led = |n| PinConfig {
            number: n,
            inverted: pins::LEDS_ACTIVE_LOW,
        };
        Self {
            select_cover_pin: button(pins::SELECT_COVER_GPIO),
            up_pin: button(pins::UP_GPIO),
            down_pin: button(pins::DOWN_GPIO),
            my_pin: button(pins::MY_GPIO),
            led3_pin: Some(led(pins::LED3_GPIO)),
            led4_pin: Some(led(pins::LED4_GPIO)),
            led3_binary_sensor: None,
            led4_binary_sensor: None,
            ready_binary_sensor: None,
            button_press_duration_ms: DEFAULT_BUTTON_PRESS_MS,
            cover_count: DEFAULT_COVER_COUNT,
            initial_cover_index: DEFAULT_COVER_INDEX,
            timing: TimingConfig::default(),
        }
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self, ValidationError> {
        let builder: RemoteConfigBuilder = serde_json::from_str(text).map_err(|e| {
            warn!("config: JSON rejected: {}", e);
            ValidationError::Malformed
        })?;
        builder.build()
    }

    /// Pin bound to `role`, if any.
    pub fn pin(&self, role: Role) -> Option<PinConfig> {
        match role {
            Role::SelectCover => Some(self.select_cover_pin),
            Role::Up => Some(self.up_pin),
            Role::Down => Some(self.down_pin),
            Role::My => Some(self.my_pin),
            Role::Led3 => self.led3_pin,
            Role::Led4 => self.led4_pin,
        }
    }

    /// Binary sensor bound to an LED role.
    pub fn binary_sensor(&self, role: Role) -> Option<&SensorId> {
        match role {
            Role::Led3 => self.led3_binary_sensor.as_ref(),
            Role::Led4 => self.led4_binary_sensor.as_ref(),
            _ => None,
        }
    }

    /// Every role that has a pin, in [`Role::ALL`] order.
    pub fn configured_pins(&self) -> impl Iterator<Item = (Role, PinConfig)> + '_ {
        Role::ALL
            .into_iter()
            .filter_map(move |role| self.pin(role).map(|pin| (role, pin)))
    }

    /// Both channel LEDs are wired, so channel selection is possible.
    pub fn has_channel_leds(&self) -> bool {
        self.led3_pin.is_some() && self.led4_pin.is_some()
    }

    /// Check every invariant.  Also run on configs loaded from storage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let pins: heapless::Vec<(Role, PinConfig), { Role::COUNT }> =
            self.configured_pins().collect();
        if let Some((role, pin)) = pins.iter().find(|(_, p)| p.number > MAX_GPIO) {
            return Err(ValidationError::InvalidPin {
                role: *role,
                pin: pin.number,
            });
        }
        for (i, (first, a)) in pins.iter().enumerate() {
            if let Some((second, _)) = pins[i + 1..].iter().find(|(_, b)| b.number == a.number) {
                return Err(ValidationError::PinConflict {
                    pin: a.number,
                    first: *first,
                    second: *second,
                });
            }
        }

        for role in Role::LEDS {
            if self.binary_sensor(role).is_some() && self.pin(role).is_none() {
                return Err(ValidationError::SensorWithoutPin(role));
            }
        }

        if self.button_press_duration_ms == 0 || self.button_press_duration_ms > MAX_BUTTON_PRESS_MS {
            return Err(ValidationError::InvalidDuration(
                "button_press_duration must be 1–60000 ms",
            ));
        }

        let min_covers = if self.has_channel_leds() {
            pins::LED4_COVER_INDEX + 1
        } else {
            1
        };
        if !(min_covers..=MAX_COVERS).contains(&self.cover_count) {
            return Err(ValidationError::InvalidCoverCount(self.cover_count));
        }
        if self.initial_cover_index >= self.cover_count {
            return Err(ValidationError::InvalidCoverIndex(self.initial_cover_index));
        }

        let t = &self.timing;
        if t.max_reset_presses == 0 {
            return Err(ValidationError::InvalidTiming("max_reset_presses must be >= 1"));
        }
        if t.led_stable_delay_ms < t.led_debounce_ms {
            return Err(ValidationError::InvalidTiming(
                "led_stable_delay_ms must cover led_debounce_ms",
            ));
        }
        if t.led_sync_interval_ms == 0 || t.status_log_interval_ms == 0 {
            return Err(ValidationError::InvalidTiming("intervals must be positive"));
        }
        if t.travel_time_ms == Some(0) {
            return Err(ValidationError::InvalidTiming("travel_time_ms must be positive"));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects configuration values; [`build`](Self::build) validates them.
///
/// Also the deserialisation target for JSON documents, using the same keys
/// as the component schema.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfigBuilder {
    #[serde(default, deserialize_with = "de_pin")]
    select_cover_pin: Option<PinConfig>,
    #[serde(default, deserialize_with = "de_pin")]
    up_pin: Option<PinConfig>,
    #[serde(default, deserialize_with = "de_pin")]
    down_pin: Option<PinConfig>,
    #[serde(default, deserialize_with = "de_pin")]
    my_pin: Option<PinConfig>,
    #[serde(default, deserialize_with = "de_pin")]
    led3_pin: Option<PinConfig>,
    #[serde(default, deserialize_with = "de_pin")]
    led4_pin: Option<PinConfig>,
    #[serde(default)]
    led3_binary_sensor: Option<String>,
    #[serde(default)]
    led4_binary_sensor: Option<String>,
    #[serde(default)]
    ready_binary_sensor: Option<String>,
    #[serde(default)]
    button_press_duration: Option<DurationSpec>,
    #[serde(default)]
    cover_count: Option<u8>,
    #[serde(default)]
    initial_cover_index: Option<u8>,
    #[serde(default)]
    timing: Option<TimingConfig>,
}

impl RemoteConfigBuilder {
    pub fn select_cover_pin(mut self, pin: PinConfig) -> Self {
        self.select_cover_pin = Some(pin);
        self
    }

    pub fn up_pin(mut self, pin: PinConfig) -> Self {
        self.up_pin = Some(pin);
        self
    }

    pub fn down_pin(mut self, pin: PinConfig) -> Self {
        self.down_pin = Some(pin);
        self
    }

    pub fn my_pin(mut self, pin: PinConfig) -> Self {
        self.my_pin = Some(pin);
        self
    }

    pub fn led3_pin(mut self, pin: PinConfig) -> Self {
        self.led3_pin = Some(pin);
        self
    }

    pub fn led4_pin(mut self, pin: PinConfig) -> Self {
        self.led4_pin = Some(pin);
        self
    }

    pub fn led3_binary_sensor(mut self, id: &str) -> Self {
        self.led3_binary_sensor = Some(id.into());
        self
    }

    pub fn led4_binary_sensor(mut self, id: &str) -> Self {
        self.led4_binary_sensor = Some(id.into());
        self
    }

    pub fn ready_binary_sensor(mut self, id: &str) -> Self {
        self.ready_binary_sensor = Some(id.into());
        self
    }

    pub fn button_press_duration_ms(mut self, ms: u32) -> Self {
        self.button_press_duration = Some(DurationSpec::Millis(ms));
        self
    }

    /// Textual duration, checked by [`build`](Self::build).
    pub fn button_press_duration(mut self, text: &str) -> Self {
        self.button_press_duration = Some(DurationSpec::Text(text.into()));
        self
    }

    pub fn cover_count(mut self, count: u8) -> Self {
        self.cover_count = Some(count);
        self
    }

    pub fn initial_cover_index(mut self, index: u8) -> Self {
        self.initial_cover_index = Some(index);
        self
    }

    pub fn timing(mut self, timing: TimingConfig) -> Self {
        self.timing = Some(timing);
        self
    }

    /// Validate and produce the immutable configuration.
    pub fn build(self) -> Result<RemoteConfig, ValidationError> {
        let required = |role: Role, pin: Option<PinConfig>| pin.ok_or(ValidationError::MissingPin(role));

        let config = RemoteConfig {
            select_cover_pin: required(Role::SelectCover, self.select_cover_pin)?,
            up_pin: required(Role::Up, self.up_pin)?,
            down_pin: required(Role::Down, self.down_pin)?,
            my_pin: required(Role::My, self.my_pin)?,
            led3_pin: self.led3_pin,
            led4_pin: self.led4_pin,
            led3_binary_sensor: sensor_id(self.led3_binary_sensor.as_deref(), "led3_binary_sensor")?,
            led4_binary_sensor: sensor_id(self.led4_binary_sensor.as_deref(), "led4_binary_sensor")?,
            ready_binary_sensor: sensor_id(self.ready_binary_sensor.as_deref(), "ready_binary_sensor")?,
            button_press_duration_ms: self
                .button_press_duration
                .as_ref()
                .map_or(Ok(DEFAULT_BUTTON_PRESS_MS), DurationSpec::to_millis)?,
            cover_count: self.cover_count.unwrap_or(DEFAULT_COVER_COUNT),
            initial_cover_index: self.initial_cover_index.unwrap_or(DEFAULT_COVER_INDEX),
            timing: self.timing.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}

fn sensor_id(id: Option<&str>, field: &'static str) -> Result<Option<SensorId>, ValidationError> {
    match id {
        None => Ok(None),
        Some("") => Err(ValidationError::InvalidSensorId(field)),
        Some(id) => SensorId::try_from(id)
            .map(Some)
            .map_err(|_| ValidationError::InvalidSensorId(field)),
    }
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// Reasons a configuration is rejected before the device runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// A required button pin was not given.
    MissingPin(Role),
    /// GPIO number beyond [`MAX_GPIO`].
    InvalidPin { role: Role, pin: u8 },
    /// Two roles share one physical pin.
    PinConflict { pin: u8, first: Role, second: Role },
    /// A binary sensor is bound to an LED that has no pin.
    SensorWithoutPin(Role),
    /// Sensor id empty or longer than 32 bytes; carries the field name.
    InvalidSensorId(&'static str),
    InvalidDuration(&'static str),
    InvalidCoverCount(u8),
    InvalidCoverIndex(u8),
    InvalidTiming(&'static str),
    /// The document is not valid JSON for this schema.
    Malformed,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPin(role) => write!(f, "{} is required", role.config_key()),
            Self::InvalidPin { role, pin } => {
                write!(f, "{}: GPIO{pin} does not exist", role.config_key())
            }
            Self::PinConflict { pin, first, second } => write!(
                f,
                "GPIO{pin} used by both {} and {}",
                first.config_key(),
                second.config_key()
            ),
            Self::SensorWithoutPin(role) => {
                write!(f, "binary sensor bound but {} is not set", role.config_key())
            }
            Self::InvalidSensorId(field) => write!(f, "{field}: id must be 1–32 bytes"),
            Self::InvalidDuration(msg) => write!(f, "invalid duration: {msg}"),
            Self::InvalidCoverCount(n) => write!(f, "cover_count {n} out of range"),
            Self::InvalidCoverIndex(i) => write!(f, "initial_cover_index {i} out of range"),
            Self::InvalidTiming(msg) => write!(f, "invalid timing: {msg}"),
            Self::Malformed => write!(f, "malformed configuration document"),
        }
    }
}
