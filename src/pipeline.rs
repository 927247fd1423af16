//! The per-tick measurement path: smoothing, conversion, health, publication.
//!
//! ```text
//! read_mv ──Err──▶ monitor.record_failure()           (nothing published)
//!    │
//!    Ok(mv) ─▶ rolling average ─▶ pH = 7 - (avg - intercept) / slope(T)
//!                                   │
//!                                   ├─▶ [optional EMA]
//!                                   ├─▶ monitor.record_reading()
//!                                   └─▶ outputs: pH, raw mV, slope, temperature, status
//! ```
//!
//! Published values are rounded per output:
//!
//! | Output | Decimals |
//! |--------|----------|
//! | pH | 2 |
//! | raw voltage (mV) | 1 |
//! | slope (mV/pH) | 2 |
//! | temperature | 1 |

use num_traits::float::FloatCore;

use crate::acquisition::InputRange;
use crate::calibration::CalibrationCoefficients;
use crate::config::MeterConfig;
use crate::error::AcquisitionError;
use crate::filter::{ExponentialSmoother, RollingAverage};
use crate::health::{ProbeHealthMonitor, ProbeStatus};
use crate::temperature::TemperatureUnit;
use crate::traits::{SensorSink, TextSink};

/// Decimals published for pH.
pub const PH_DECIMALS: u8 = 2;
/// Decimals published for the raw voltage.
pub const VOLTAGE_DECIMALS: u8 = 1;
/// Decimals published for the slope.
pub const SLOPE_DECIMALS: u8 = 2;
/// Decimals published for the temperature.
pub const TEMPERATURE_DECIMALS: u8 = 1;

/// Round `value` to `decimals` places.
///
/// # Examples
///
/// ```
/// use ph_meter::pipeline::round_to;
///
/// assert_eq!(round_to(7.004, 2), 7.0);
/// assert_eq!(round_to(199.26, 1), 199.3);
/// ```
pub fn round_to(value: f32, decimals: u8) -> f32 {
    let scale = FloatCore::powi(10.0f32, decimals as i32);
    FloatCore::round(value * scale) / scale
}

// ============================================================================
// Outputs
// ============================================================================

/// Where readings go. pH is mandatory; every other output is optional.
///
/// # Example
///
/// ```rust
/// use ph_meter::hal::{MockSensor, MockText};
/// use ph_meter::pipeline::Outputs;
///
/// let outputs: Outputs<MockSensor, MockText> = Outputs::new(MockSensor::new())
///     .with_slope(MockSensor::new())
///     .with_status(MockText::new());
///
/// assert!(outputs.raw_voltage.is_none());
/// assert!(outputs.slope.is_some());
/// ```
#[derive(Debug, Default)]
pub struct Outputs<S: SensorSink, T: TextSink> {
    /// pH output.
    pub ph: S,
    /// Unaveraged voltage, in millivolts.
    pub raw_voltage: Option<S>,
    /// Slope in mV/pH: compensated per tick, committed on calibration.
    pub slope: Option<S>,
    /// Temperature in the configured unit.
    pub temperature: Option<S>,
    /// Probe status text.
    pub status: Option<T>,
}

impl<S: SensorSink, T: TextSink> Outputs<S, T> {
    /// Only the pH output.
    pub fn new(ph: S) -> Self {
        Self {
            ph,
            raw_voltage: None,
            slope: None,
            temperature: None,
            status: None,
        }
    }

    /// Add the raw voltage output.
    pub fn with_raw_voltage(mut self, sink: S) -> Self {
        self.raw_voltage = Some(sink);
        self
    }

    /// Add the slope output.
    pub fn with_slope(mut self, sink: S) -> Self {
        self.slope = Some(sink);
        self
    }

    /// Add the temperature output.
    pub fn with_temperature(mut self, sink: S) -> Self {
        self.temperature = Some(sink);
        self
    }

    /// Add the status output.
    pub fn with_status(mut self, sink: T) -> Self {
        self.status = Some(sink);
        self
    }

    /// Publish a slope value if the slope output is configured.
    pub fn publish_slope(&mut self, slope_mv_per_ph: f32) {
        if let Some(sink) = self.slope.as_mut() {
            sink.publish(round_to(slope_mv_per_ph, SLOPE_DECIMALS));
        }
    }

    fn publish_reading(&mut self, reading: &Reading, unit: TemperatureUnit) {
        self.ph.publish(round_to(reading.ph, PH_DECIMALS));
        if let Some(sink) = self.raw_voltage.as_mut() {
            sink.publish(round_to(reading.raw_mv, VOLTAGE_DECIMALS));
        }
        self.publish_slope(reading.slope_mv_per_ph);
        if let Some(sink) = self.temperature.as_mut() {
            sink.publish(round_to(
                unit.from_celsius(reading.temperature_c),
                TEMPERATURE_DECIMALS,
            ));
        }
        if let Some(sink) = self.status.as_mut() {
            sink.publish_text(reading.status.as_str());
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Everything computed on a successful tick, before rounding.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    /// Computed pH, unclamped.
    pub ph: f32,
    /// Voltage read this tick.
    pub raw_mv: f32,
    /// Rolling average used for conversion.
    pub averaged_mv: f32,
    /// Temperature-compensated slope.
    pub slope_mv_per_ph: f32,
    /// Temperature used for compensation, in Celsius.
    pub temperature_c: f32,
    /// Health classification.
    pub status: ProbeStatus,
}

/// Result of one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
    /// A reading was published.
    Published(Reading),
    /// Acquisition failed; nothing was published.
    Skipped(AcquisitionError),
}

impl TickOutcome {
    /// The reading, if one was published.
    pub fn reading(&self) -> Option<&Reading> {
        match self {
            TickOutcome::Published(r) => Some(r),
            TickOutcome::Skipped(_) => None,
        }
    }
}

/// Smoothing, conversion and health state carried between ticks.
#[derive(Clone, Debug)]
pub struct MeasurementPipeline {
    window: RollingAverage,
    ph_smoother: Option<ExponentialSmoother>,
    monitor: ProbeHealthMonitor,
    unit: TemperatureUnit,
    last: Option<Reading>,
}

impl Default for MeasurementPipeline {
    fn default() -> Self {
        Self::new(&MeterConfig::default())
    }
}

impl MeasurementPipeline {
    /// Build from the meter configuration.
    pub fn new(config: &MeterConfig) -> Self {
        Self {
            window: RollingAverage::new(config.smoothing_window),
            ph_smoother: config.ph_smoothing_alpha.map(ExponentialSmoother::new),
            monitor: ProbeHealthMonitor::new(config.disconnect_debounce, config.rail_margin_mv),
            unit: config.temperature_unit,
            last: None,
        }
    }

    /// Record a failed acquisition. Nothing is published.
    pub fn skip(&mut self, error: AcquisitionError) -> TickOutcome {
        let status = self.monitor.record_failure();
        log::warn!("voltage acquisition failed: {} (status {})", error, status);
        TickOutcome::Skipped(error)
    }

    /// Convert a successful sample and publish it.
    pub fn process<S: SensorSink, T: TextSink>(
        &mut self,
        raw_mv: f32,
        range: InputRange,
        temperature_c: f32,
        coefficients: &CalibrationCoefficients,
        outputs: &mut Outputs<S, T>,
    ) -> TickOutcome {
        let averaged_mv = self.window.push(raw_mv);
        let slope = coefficients.effective_slope(temperature_c);
        let mut ph = coefficients.ph_at(averaged_mv, temperature_c);
        if let Some(smoother) = self.ph_smoother.as_mut() {
            ph = smoother.update(ph);
        }
        let status = self.monitor.record_reading(raw_mv, range, ph);

        let reading = Reading {
            ph,
            raw_mv,
            averaged_mv,
            slope_mv_per_ph: slope,
            temperature_c,
            status,
        };
        log::debug!(
            "tick: {:.1} mV (avg {:.1}), {:.1} °C, slope {:.2} mV/pH, pH {:.2}, {}",
            raw_mv,
            averaged_mv,
            temperature_c,
            slope,
            ph,
            status
        );

        outputs.publish_reading(&reading, self.unit);
        self.last = Some(reading);
        TickOutcome::Published(reading)
    }

    /// Run one tick from an acquisition result.
    pub fn run_tick<S: SensorSink, T: TextSink>(
        &mut self,
        acquired: Result<f32, AcquisitionError>,
        range: InputRange,
        temperature_c: f32,
        coefficients: &CalibrationCoefficients,
        outputs: &mut Outputs<S, T>,
    ) -> TickOutcome {
        match acquired {
            Ok(mv) => self.process(mv, range, temperature_c, coefficients, outputs),
            Err(e) => self.skip(e),
        }
    }

    /// Forget pH smoothing history, e.g. after the coefficients change.
    pub fn reset_ph_smoothing(&mut self) {
        if let Some(smoother) = self.ph_smoother.as_mut() {
            smoother.reset();
        }
    }

    /// Most recent published reading.
    pub fn last_reading(&self) -> Option<&Reading> {
        self.last.as_ref()
    }

    /// Current probe status, including failures since the last reading.
    pub fn status(&self) -> ProbeStatus {
        self.monitor.status()
    }

    /// Health monitor.
    pub fn monitor(&self) -> &ProbeHealthMonitor {
        &self.monitor
    }

    /// Temperature output unit.
    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    /// Voltage smoothing window length.
    pub fn smoothing_window(&self) -> usize {
        self.window.window()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockSensor, MockText};

    type TestOutputs = Outputs<MockSensor, MockText>;

    const PIN: InputRange = InputRange::unipolar(3300.0);

    fn all_outputs() -> TestOutputs {
        Outputs::new(MockSensor::new())
            .with_raw_voltage(MockSensor::new())
            .with_slope(MockSensor::new())
            .with_temperature(MockSensor::new())
            .with_status(MockText::new())
    }

    fn single_sample() -> MeterConfig {
        MeterConfig::default().with_smoothing_window(1)
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(5.499, 2), 5.5);
        assert_eq!(round_to(-0.04, 1), -0.0);
        assert_eq!(round_to(59.164, 2), 59.16);
    }

    #[test]
    fn factory_neutral_reading() {
        let mut pipeline = MeasurementPipeline::new(&single_sample());
        let mut out = all_outputs();

        let outcome = pipeline.process(
            199.3,
            PIN,
            25.0,
            &CalibrationCoefficients::FACTORY,
            &mut out,
        );

        let reading = outcome.reading().unwrap();
        assert!((reading.ph - 7.0).abs() < 1e-4);
        assert_eq!(out.ph.last(), Some(7.0));
        assert_eq!(out.raw_voltage.as_ref().unwrap().last(), Some(199.3));
        assert_eq!(out.slope.as_ref().unwrap().last(), Some(59.16));
        assert_eq!(out.temperature.as_ref().unwrap().last(), Some(25.0));
        assert_eq!(out.status.as_ref().unwrap().last(), Some("normal"));
    }

    #[test]
    fn failure_publishes_nothing() {
        let mut pipeline = MeasurementPipeline::default();
        let mut out = all_outputs();

        let outcome = pipeline.run_tick(
            Err(AcquisitionError::NotReady),
            PIN,
            25.0,
            &CalibrationCoefficients::FACTORY,
            &mut out,
        );

        assert_eq!(outcome, TickOutcome::Skipped(AcquisitionError::NotReady));
        assert!(out.ph.values.is_empty());
        assert!(out.raw_voltage.as_ref().unwrap().values.is_empty());
        assert!(out.slope.as_ref().unwrap().values.is_empty());
        assert!(out.temperature.as_ref().unwrap().values.is_empty());
        assert!(out.status.as_ref().unwrap().texts.is_empty());
        assert!(pipeline.last_reading().is_none());
    }

    #[test]
    fn averaged_voltage_used_raw_published() {
        let mut pipeline = MeasurementPipeline::new(&MeterConfig::default().with_smoothing_window(2));
        let mut out = all_outputs();
        let c = CalibrationCoefficients::FACTORY;

        pipeline.process(199.3, PIN, 25.0, &c, &mut out);
        let outcome = pipeline.process(258.46, PIN, 25.0, &c, &mut out);

        let reading = outcome.reading().unwrap();
        assert!((reading.averaged_mv - 228.88).abs() < 1e-3);
        // (228.88 - 199.3) / 59.16 = 0.5
        assert!((reading.ph - 6.5).abs() < 1e-3);
        assert_eq!(out.raw_voltage.as_ref().unwrap().last(), Some(258.5));
    }

    #[test]
    fn temperature_compensates_and_converts() {
        let config = single_sample().with_temperature_unit(TemperatureUnit::Fahrenheit);
        let mut pipeline = MeasurementPipeline::new(&config);
        let mut out = all_outputs();

        let outcome = pipeline.process(
            140.14,
            PIN,
            50.0,
            &CalibrationCoefficients::FACTORY,
            &mut out,
        );
        let reading = outcome.reading().unwrap();

        let expected_slope = 59.16 * 323.15 / 298.15;
        assert!((reading.slope_mv_per_ph - expected_slope).abs() < 1e-3);
        assert!((reading.ph - (7.0 + 59.16 / expected_slope)).abs() < 1e-3);
        assert_eq!(out.temperature.as_ref().unwrap().last(), Some(122.0));
        assert_eq!(reading.temperature_c, 50.0);
    }

    #[test]
    fn out_of_range_still_published() {
        let mut pipeline = MeasurementPipeline::new(&single_sample());
        let mut out = all_outputs();

        // 8 pH units below the intercept
        let outcome = pipeline.process(
            199.3 + 8.0 * 59.16,
            PIN,
            25.0,
            &CalibrationCoefficients::FACTORY,
            &mut out,
        );

        assert_eq!(outcome.reading().unwrap().status, ProbeStatus::OutOfRange);
        assert_eq!(out.ph.last(), Some(-1.0));
        assert_eq!(out.status.as_ref().unwrap().last(), Some("out_of_range"));
    }

    #[test]
    fn ph_only_outputs() {
        let mut pipeline = MeasurementPipeline::new(&single_sample());
        let mut out: TestOutputs = Outputs::new(MockSensor::new());

        pipeline.process(199.3, PIN, 25.0, &CalibrationCoefficients::FACTORY, &mut out);
        assert_eq!(out.ph.values.len(), 1);
    }

    #[test]
    fn ph_smoothing_when_enabled() {
        let mut pipeline = MeasurementPipeline::new(&single_sample().with_ph_smoothing(0.5));
        let mut out = all_outputs();
        let c = CalibrationCoefficients::FACTORY;

        pipeline.process(199.3, PIN, 25.0, &c, &mut out);
        // Second reading converts to pH 6.0, smoothed halfway
        let outcome = pipeline.process(199.3 + 59.16, PIN, 25.0, &c, &mut out);
        assert!((outcome.reading().unwrap().ph - 6.5).abs() < 1e-3);

        pipeline.reset_ph_smoothing();
        let outcome = pipeline.process(199.3 + 59.16, PIN, 25.0, &c, &mut out);
        assert!((outcome.reading().unwrap().ph - 6.0).abs() < 1e-3);
    }

    #[test]
    fn disconnected_after_debounced_rail_readings() {
        let mut pipeline = MeasurementPipeline::new(&single_sample());
        let mut out = all_outputs();
        let c = CalibrationCoefficients::FACTORY;

        for _ in 0..3 {
            pipeline.process(0.0, PIN, 25.0, &c, &mut out);
        }
        assert_eq!(out.status.as_ref().unwrap().last(), Some("disconnected"));
        assert_eq!(pipeline.status(), ProbeStatus::Disconnected);
    }

    #[test]
    fn near_zero_on_signed_converter_stays_normal() {
        let mut pipeline = MeasurementPipeline::new(&single_sample());
        let mut out = all_outputs();
        let c = CalibrationCoefficients::FACTORY;

        for _ in 0..3 {
            pipeline.process(2.0, InputRange::bipolar(4096.0), 25.0, &c, &mut out);
        }
        assert_eq!(out.status.as_ref().unwrap().texts, ["normal"; 3]);
        assert_eq!(out.ph.last(), Some(10.34));
    }
}
