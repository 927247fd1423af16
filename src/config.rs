//! Configuration for the meter and its network services.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`.
//!
//! # Example
//!
//! ```rust
//! use ph_meter::config::{Config, InputConfig, MeterConfig, MqttConfig};
//! use ph_meter::TemperatureUnit;
//!
//! // Use defaults
//! let config = Config::default();
//! assert!(config.meter.validate().is_ok());
//!
//! // Or customize
//! let config = Config::default()
//!     .with_meter(
//!         MeterConfig::default()
//!             .with_input(InputConfig::native_pin(34))
//!             .with_update_interval_ms(2_000)
//!             .with_temperature_unit(TemperatureUnit::Fahrenheit),
//!     )
//!     .with_mqtt(MqttConfig::default().with_host("192.168.1.100"));
//! ```

use heapless::String as HString;

use crate::acquisition::{DEFAULT_REFERENCE_MV, DEFAULT_RESOLUTION_BITS};
use crate::calibration::{BufferSolutions, CalibrationCoefficients, SlopeLimits};
use crate::error::ConfigurationError;
use crate::filter::{DEFAULT_SMOOTHING_WINDOW, MAX_SMOOTHING_WINDOW};
use crate::health::{DEFAULT_DISCONNECT_DEBOUNCE, DEFAULT_RAIL_MARGIN_MV};
use crate::temperature::{is_physical, TemperatureUnit, DEFAULT_TEMPERATURE_C};

/// Maximum length for short config strings (hostnames, client IDs)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for longer config strings (topic prefixes, paths)
pub const MAX_LONG_STRING: usize = 128;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for longer config strings
pub type LongString = HString<MAX_LONG_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

fn truncated<const N: usize>(s: &str) -> HString<N> {
    let mut end = s.len().min(N);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut hs = HString::new();
    let _ = hs.push_str(&s[..end]);
    hs
}

/// Create a ShortString from a &str, truncating at a char boundary if too long
pub fn short_string(s: &str) -> ShortString {
    truncated(s)
}

/// Create a LongString from a &str, truncating at a char boundary if too long
pub fn long_string(s: &str) -> LongString {
    truncated(s)
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Measurement and calibration configuration
    pub meter: MeterConfig,
    /// MQTT client configuration
    pub mqtt: MqttConfig,
}

impl Config {
    /// Set meter configuration
    pub fn with_meter(mut self, meter: MeterConfig) -> Self {
        self.meter = meter;
        self
    }

    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }
}

// ============================================================================
// Input Config
// ============================================================================

/// Where the probe voltage comes from. Fixed for the lifetime of a meter.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InputConfig {
    /// Channel of an external multiplexed converter
    Multiplexed {
        /// Converter channel (0-3)
        channel: u8,
    },
    /// On-device analog pin
    NativePin {
        /// GPIO number
        gpio: u8,
        /// Reference (full-scale) voltage in millivolts
        reference_mv: f32,
        /// Converter resolution in bits
        resolution_bits: u8,
    },
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig::Multiplexed { channel: 0 }
    }
}

impl InputConfig {
    /// Multiplexed converter channel
    pub const fn multiplexed(channel: u8) -> Self {
        InputConfig::Multiplexed { channel }
    }

    /// Native pin with a 3.3 V reference and 12-bit resolution
    pub const fn native_pin(gpio: u8) -> Self {
        InputConfig::NativePin {
            gpio,
            reference_mv: DEFAULT_REFERENCE_MV,
            resolution_bits: DEFAULT_RESOLUTION_BITS,
        }
    }
}

// ============================================================================
// Meter Config
// ============================================================================

/// Measurement pipeline and calibration configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeterConfig {
    /// Voltage input selection
    pub input: InputConfig,
    /// Measurement tick interval in milliseconds
    pub update_interval_ms: u32,
    /// Unit for the temperature output
    pub temperature_unit: TemperatureUnit,
    /// Buffer reference values for stages 4, 7 and 10
    pub buffers: BufferSolutions,
    /// Temperature used when no sensor reading is available
    pub default_temperature_c: f32,
    /// Coefficients used while uncalibrated
    pub factory: CalibrationCoefficients,
    /// Accepted slope magnitudes for a fit
    pub slope_limits: SlopeLimits,
    /// Rolling-average window for voltage samples
    pub smoothing_window: usize,
    /// Consecutive faulty ticks before the probe is reported disconnected
    pub disconnect_debounce: u8,
    /// Distance from either rail counted as "at the rail", in millivolts
    pub rail_margin_mv: f32,
    /// Calibration mode switches itself off after this long (0 = never)
    pub calibration_timeout_ms: u32,
    /// Optional exponential smoothing of the computed pH
    pub ph_smoothing_alpha: Option<f32>,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            update_interval_ms: 10_000,
            temperature_unit: TemperatureUnit::Celsius,
            buffers: BufferSolutions::default(),
            default_temperature_c: DEFAULT_TEMPERATURE_C,
            factory: CalibrationCoefficients::FACTORY,
            slope_limits: SlopeLimits::default(),
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            disconnect_debounce: DEFAULT_DISCONNECT_DEBOUNCE,
            rail_margin_mv: DEFAULT_RAIL_MARGIN_MV,
            calibration_timeout_ms: 300_000,
            ph_smoothing_alpha: None,
        }
    }
}

impl MeterConfig {
    /// Set the voltage input
    pub fn with_input(mut self, input: InputConfig) -> Self {
        self.input = input;
        self
    }

    /// Set the tick interval
    pub fn with_update_interval_ms(mut self, ms: u32) -> Self {
        self.update_interval_ms = ms;
        self
    }

    /// Set the temperature output unit
    pub fn with_temperature_unit(mut self, unit: TemperatureUnit) -> Self {
        self.temperature_unit = unit;
        self
    }

    /// Set the buffer reference values
    pub fn with_buffers(mut self, buffers: BufferSolutions) -> Self {
        self.buffers = buffers;
        self
    }

    /// Set the fallback temperature
    pub fn with_default_temperature_c(mut self, celsius: f32) -> Self {
        self.default_temperature_c = celsius;
        self
    }

    /// Set the factory coefficients
    pub fn with_factory(mut self, factory: CalibrationCoefficients) -> Self {
        self.factory = factory;
        self
    }

    /// Set the slope acceptance limits
    pub fn with_slope_limits(mut self, limits: SlopeLimits) -> Self {
        self.slope_limits = limits;
        self
    }

    /// Set the voltage smoothing window
    pub fn with_smoothing_window(mut self, window: usize) -> Self {
        self.smoothing_window = window;
        self
    }

    /// Set the disconnect debounce count
    pub fn with_disconnect_debounce(mut self, ticks: u8) -> Self {
        self.disconnect_debounce = ticks;
        self
    }

    /// Set the rail margin
    pub fn with_rail_margin_mv(mut self, mv: f32) -> Self {
        self.rail_margin_mv = mv;
        self
    }

    /// Set the calibration-mode timeout
    pub fn with_calibration_timeout_ms(mut self, ms: u32) -> Self {
        self.calibration_timeout_ms = ms;
        self
    }

    /// Enable exponential pH smoothing
    pub fn with_ph_smoothing(mut self, alpha: f32) -> Self {
        self.ph_smoothing_alpha = Some(alpha);
        self
    }

    /// Check the configuration before building a meter
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let InputConfig::Multiplexed { channel } = self.input {
            if channel > 3 {
                return Err(ConfigurationError::InvalidChannel(channel));
            }
        }
        self.buffers.validate()?;
        if self.update_interval_ms == 0 {
            return Err(ConfigurationError::InvalidInterval);
        }
        if self.smoothing_window == 0 || self.smoothing_window > MAX_SMOOTHING_WINDOW {
            return Err(ConfigurationError::InvalidSmoothingWindow);
        }
        if !is_physical(self.default_temperature_c) {
            return Err(ConfigurationError::InvalidTemperature);
        }
        Ok(())
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT client configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MqttConfig {
    /// Broker hostname or IP
    pub host: ShortString,
    /// Broker port
    pub port: u16,
    /// Client ID (should be unique per device)
    pub client_id: ShortString,
    /// Topic prefix for all pub/sub (e.g., "ph" -> "ph/value")
    pub topic_prefix: ShortString,
    /// Username for authentication (empty = no auth)
    pub username: ShortString,
    /// Password for authentication
    pub password: ShortString,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: short_string("localhost"),
            port: 1883,
            client_id: short_string("ph-meter"),
            topic_prefix: short_string("ph"),
            username: ShortString::new(),
            password: ShortString::new(),
            keep_alive_secs: 30,
        }
    }
}

impl MqttConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = short_string(host);
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client ID
    pub fn with_client_id(mut self, id: &str) -> Self {
        self.client_id = short_string(id);
        self
    }

    /// Set the topic prefix
    pub fn with_topic_prefix(mut self, prefix: &str) -> Self {
        self.topic_prefix = short_string(prefix);
        self
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.username = short_string(username);
        self.password = short_string(password);
        self
    }

    /// Build a topic string with the configured prefix
    pub fn topic(&self, suffix: &str) -> LongString {
        let mut topic = LongString::new();
        let _ = topic.push_str(self.topic_prefix.as_str());
        let _ = topic.push('/');
        let _ = topic.push_str(suffix);
        topic
    }

    /// Check if authentication is configured
    pub fn has_auth(&self) -> bool {
        !self.username.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.meter.update_interval_ms, 10_000);
        assert_eq!(config.meter.input, InputConfig::Multiplexed { channel: 0 });
        assert!(config.meter.validate().is_ok());
    }

    #[test]
    fn mqtt_topic_building() {
        let mqtt = MqttConfig::default().with_topic_prefix("tanks/probe1");
        let topic = mqtt.topic("calibrate");
        assert_eq!(topic.as_str(), "tanks/probe1/calibrate");
    }

    #[test]
    fn mqtt_auth_detection() {
        let no_auth = MqttConfig::default();
        assert!(!no_auth.has_auth());

        let with_auth = MqttConfig::default().with_auth("user", "pass");
        assert!(with_auth.has_auth());
    }

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn long_string_truncation() {
        let long_input = "b".repeat(200);
        let s = long_string(&long_input);
        assert_eq!(s.len(), MAX_LONG_STRING);
    }

    #[test]
    fn string_helpers_utf8_boundary() {
        // 3-byte characters never land exactly on byte 64
        let input = "€".repeat(30);
        let s = short_string(&input);
        assert!(s.len() <= MAX_SHORT_STRING);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());
        assert_eq!(s.len(), 63);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_mqtt(
                MqttConfig::default()
                    .with_host("broker.local")
                    .with_port(8883),
            )
            .with_meter(MeterConfig::default().with_input(InputConfig::native_pin(3)));

        assert_eq!(config.mqtt.host.as_str(), "broker.local");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.meter.input, InputConfig::native_pin(3));
    }

    // =========================================================================
    // MeterConfig Tests
    // =========================================================================

    #[test]
    fn meter_config_default() {
        let meter = MeterConfig::default();
        assert_eq!(meter.temperature_unit, TemperatureUnit::Celsius);
        assert_eq!(meter.buffers, BufferSolutions::new(4.0, 7.0, 10.0));
        assert_eq!(meter.default_temperature_c, 25.0);
        assert_eq!(meter.factory, CalibrationCoefficients::new(59.16, 199.3));
        assert_eq!(meter.smoothing_window, 5);
        assert_eq!(meter.disconnect_debounce, 3);
        assert_eq!(meter.rail_margin_mv, 5.0);
        assert_eq!(meter.calibration_timeout_ms, 300_000);
        assert_eq!(meter.ph_smoothing_alpha, None);
    }

    #[test]
    fn meter_config_builder() {
        let meter = MeterConfig::default()
            .with_input(InputConfig::multiplexed(2))
            .with_update_interval_ms(1_000)
            .with_buffers(BufferSolutions::new(4.01, 6.86, 9.18))
            .with_smoothing_window(8)
            .with_disconnect_debounce(5)
            .with_ph_smoothing(0.2);

        assert_eq!(meter.input, InputConfig::Multiplexed { channel: 2 });
        assert_eq!(meter.update_interval_ms, 1_000);
        assert_eq!(meter.buffers.ph7, 6.86);
        assert_eq!(meter.smoothing_window, 8);
        assert_eq!(meter.disconnect_debounce, 5);
        assert_eq!(meter.ph_smoothing_alpha, Some(0.2));
        assert!(meter.validate().is_ok());
    }

    #[test]
    fn native_pin_defaults() {
        assert_eq!(
            InputConfig::native_pin(34),
            InputConfig::NativePin {
                gpio: 34,
                reference_mv: 3300.0,
                resolution_bits: 12,
            }
        );
    }

    #[test]
    fn validate_rejects_bad_values() {
        let bad_channel = MeterConfig::default().with_input(InputConfig::multiplexed(4));
        assert_eq!(
            bad_channel.validate(),
            Err(ConfigurationError::InvalidChannel(4))
        );

        let zero_interval = MeterConfig::default().with_update_interval_ms(0);
        assert_eq!(
            zero_interval.validate(),
            Err(ConfigurationError::InvalidInterval)
        );

        let big_window = MeterConfig::default().with_smoothing_window(17);
        assert_eq!(
            big_window.validate(),
            Err(ConfigurationError::InvalidSmoothingWindow)
        );

        let same_buffers =
            MeterConfig::default().with_buffers(BufferSolutions::new(7.0, 7.0, 10.0));
        assert_eq!(
            same_buffers.validate(),
            Err(ConfigurationError::DuplicateBufferValues)
        );

        let frozen = MeterConfig::default().with_default_temperature_c(-273.15);
        assert_eq!(
            frozen.validate(),
            Err(ConfigurationError::InvalidTemperature)
        );
    }

    // =========================================================================
    // MqttConfig Tests
    // =========================================================================

    #[test]
    fn mqtt_config_default() {
        let mqtt = MqttConfig::default();
        assert_eq!(mqtt.host.as_str(), "localhost");
        assert_eq!(mqtt.client_id.as_str(), "ph-meter");
        assert_eq!(mqtt.topic_prefix.as_str(), "ph");
        assert!(mqtt.username.is_empty());
        assert_eq!(mqtt.keep_alive_secs, 30);
    }
}
