//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for the hardware and telemetry traits,
//! enabling development and testing on desktop without a probe attached.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockAdc`] | [`MultiplexedAdc`] | Per-channel voltages, injected bus errors |
//! | [`MockAnalogPin`] | [`AnalogPin`] | Raw counts, injected pin faults |
//! | [`MockThermometer`] | [`TemperatureSensor`] | Settable reading, none until set |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockSensor`] | [`SensorSink`] | Records published values |
//! | [`MockText`] | [`TextSink`] | Records published text |
//! | [`LogSink`] | both sinks | Writes publications to the `log` facade |
//!
//! # Example
//!
//! ```rust
//! use ph_meter::{MeterConfig, Outputs, PhMeter};
//! use ph_meter::acquisition::MuxAdcSource;
//! use ph_meter::hal::{MockAdc, MockSensor, MockText};
//! use ph_meter::temperature::FixedTemperature;
//! use ph_meter::traits::AdcChannel;
//!
//! let mut adc = MockAdc::new();
//! adc.set_channel_mv(AdcChannel::A0, 199.3);
//!
//! let outputs = Outputs::new(MockSensor::new()).with_status(MockText::new());
//! let mut meter = PhMeter::new(
//!     &MeterConfig::default(),
//!     MuxAdcSource::new(adc, AdcChannel::A0),
//!     FixedTemperature::default(),
//!     outputs,
//! )
//! .unwrap();
//!
//! meter.tick(0);
//!
//! // Verify via outputs
//! assert_eq!(meter.outputs().ph.last(), Some(7.0));
//! assert_eq!(meter.outputs().status.as_ref().unwrap().last(), Some("normal"));
//! ```
//!
//! [`MultiplexedAdc`]: crate::traits::MultiplexedAdc
//! [`AnalogPin`]: crate::traits::AnalogPin
//! [`TemperatureSensor`]: crate::traits::TemperatureSensor
//! [`Clock`]: crate::traits::Clock
//! [`SensorSink`]: crate::traits::SensorSink
//! [`TextSink`]: crate::traits::TextSink

use alloc::string::String;
use alloc::vec::Vec;

use crate::traits::{
    AdcChannel, AnalogPin, Clock, MultiplexedAdc, SensorSink, TemperatureSensor, TextSink,
};

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock multiplexed converter.
///
/// Each channel holds a fixed voltage (0.0 until set). Queue failures with
/// [`fail_next`](Self::fail_next) to simulate bus errors.
///
/// # Example
///
/// ```rust
/// use ph_meter::hal::MockAdc;
/// use ph_meter::traits::{AdcChannel, MultiplexedAdc};
///
/// let mut adc = MockAdc::new();
/// adc.set_channel_mv(AdcChannel::A3, 412.0);
/// adc.fail_next(1);
///
/// assert_eq!(adc.read_channel_mv(AdcChannel::A3), Err(()));
/// assert_eq!(adc.read_channel_mv(AdcChannel::A3), Ok(412.0));
/// assert_eq!(adc.read_channel_mv(AdcChannel::A0), Ok(0.0));
/// assert_eq!(adc.reads, 3);
/// ```
#[derive(Debug)]
pub struct MockAdc {
    /// Voltage returned for each channel, in millivolts.
    pub channels: [f32; 4],
    /// Full-scale voltage reported to callers.
    pub full_scale_mv: f32,
    /// Number of read attempts, including failed ones.
    pub reads: usize,
    failures: usize,
}

impl MockAdc {
    /// Creates a converter with all channels at 0 mV and a 4.096 V full scale.
    pub fn new() -> Self {
        Self {
            channels: [0.0; 4],
            full_scale_mv: 4096.0,
            reads: 0,
            failures: 0,
        }
    }

    /// Sets the full-scale voltage.
    pub fn with_full_scale(mut self, mv: f32) -> Self {
        self.full_scale_mv = mv;
        self
    }

    /// Sets the voltage a channel returns.
    pub fn set_channel_mv(&mut self, channel: AdcChannel, mv: f32) {
        self.channels[channel.index() as usize] = mv;
    }

    /// Makes the next `count` reads fail.
    pub fn fail_next(&mut self, count: usize) {
        self.failures = count;
    }
}

impl Default for MockAdc {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiplexedAdc for MockAdc {
    type Error = ();

    fn read_channel_mv(&mut self, channel: AdcChannel) -> Result<f32, ()> {
        self.reads += 1;
        if self.failures > 0 {
            self.failures -= 1;
            return Err(());
        }
        Ok(self.channels[channel.index() as usize])
    }

    fn full_scale_mv(&self) -> f32 {
        self.full_scale_mv
    }
}

/// Mock on-device ADC pin.
#[derive(Debug)]
pub struct MockAnalogPin {
    /// GPIO number reported by [`AnalogPin::gpio`].
    pub gpio: u8,
    /// Raw count returned by reads.
    pub raw: u16,
    failures: usize,
}

impl MockAnalogPin {
    /// Creates a pin reading 0 counts.
    pub fn new(gpio: u8) -> Self {
        Self {
            gpio,
            raw: 0,
            failures: 0,
        }
    }

    /// Sets the raw count.
    pub fn with_raw(mut self, raw: u16) -> Self {
        self.raw = raw;
        self
    }

    /// Sets the raw count.
    pub fn set_raw(&mut self, raw: u16) {
        self.raw = raw;
    }

    /// Makes the next `count` reads fail.
    pub fn fail_next(&mut self, count: usize) {
        self.failures = count;
    }
}

impl AnalogPin for MockAnalogPin {
    type Error = ();

    fn read_raw(&mut self) -> Result<u16, ()> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(());
        }
        Ok(self.raw)
    }

    fn gpio(&self) -> u8 {
        self.gpio
    }
}

/// Mock temperature sensor. Has no reading until [`set`](Self::set).
#[derive(Debug, Default)]
pub struct MockThermometer {
    /// Latest reading in Celsius.
    pub celsius: Option<f32>,
}

impl MockThermometer {
    /// Creates a sensor with no reading.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reading.
    pub fn set(&mut self, celsius: f32) {
        self.celsius = Some(celsius);
    }

    /// Clears the reading.
    pub fn clear(&mut self) {
        self.celsius = None;
    }
}

impl TemperatureSensor for MockThermometer {
    fn latest_celsius(&self) -> Option<f32> {
        self.celsius
    }
}

/// Mock clock for testing time-dependent behavior.
///
/// # Example
///
/// ```rust
/// use ph_meter::hal::MockClock;
/// use ph_meter::traits::Clock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
#[derive(Debug)]
pub struct MockClock {
    current_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self { current_ms: 0 }
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }
}

// ============================================================================
// Telemetry Mocks
// ============================================================================

/// Records every numeric publication.
#[derive(Debug, Default, Clone)]
pub struct MockSensor {
    /// Published values in order.
    pub values: Vec<f32>,
}

impl MockSensor {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent value.
    pub fn last(&self) -> Option<f32> {
        self.values.last().copied()
    }
}

impl SensorSink for MockSensor {
    fn publish(&mut self, value: f32) {
        self.values.push(value);
    }
}

/// Records every text publication.
#[derive(Debug, Default, Clone)]
pub struct MockText {
    /// Published texts in order.
    pub texts: Vec<String>,
}

impl MockText {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent text.
    pub fn last(&self) -> Option<&str> {
        self.texts.last().map(String::as_str)
    }
}

impl TextSink for MockText {
    fn publish_text(&mut self, text: &str) {
        self.texts.push(String::from(text));
    }
}

/// Writes publications to the `log` facade at info level.
#[derive(Debug, Clone, Copy)]
pub struct LogSink {
    /// Output name used as the log prefix.
    pub name: &'static str,
}

impl LogSink {
    /// Creates a sink that logs under `name`.
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl SensorSink for LogSink {
    fn publish(&mut self, value: f32) {
        log::info!("{}: {}", self.name, value);
    }
}

impl TextSink for LogSink {
    fn publish_text(&mut self, text: &str) {
        log::info!("{}: {}", self.name, text);
    }
}
