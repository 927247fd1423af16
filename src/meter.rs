//! The driver instance that ties acquisition, calibration and measurement together.
//!
//! This module provides [`PhMeter`], which owns one probe's voltage source,
//! temperature provider, calibration engine, measurement pipeline and outputs.
//!
//! # Overview
//!
//! The meter:
//! - Runs a measurement tick every `update_interval_ms` via [`PhMeter::poll`]
//! - Accepts calibration actions while calibration mode is on
//! - Always converts with the latest committed coefficients
//! - Provides state snapshots for network services
//!
//! # Example
//!
//! ```rust
//! use ph_meter::{
//!     CalibrationAction, MeterConfig, Outputs, PhMeter,
//!     acquisition::MuxAdcSource,
//!     hal::{MockAdc, MockSensor, MockText},
//!     temperature::FixedTemperature,
//!     traits::AdcChannel,
//! };
//!
//! let source = MuxAdcSource::new(MockAdc::new(), AdcChannel::A0);
//! let outputs: Outputs<MockSensor, MockText> = Outputs::new(MockSensor::new());
//! let mut meter = PhMeter::new(
//!     &MeterConfig::default(),
//!     source,
//!     FixedTemperature::default(),
//!     outputs,
//! )
//! .unwrap();
//!
//! // Two-point calibration
//! meter.set_calibration_mode(true, 0);
//! meter.source_mut().adc_mut().set_channel_mv(AdcChannel::A0, 354.8);
//! meter.dispatch(CalibrationAction::CalibratePh4, 0).unwrap();
//! meter.source_mut().adc_mut().set_channel_mv(AdcChannel::A0, 199.3);
//! meter.dispatch(CalibrationAction::CalibratePh7, 0).unwrap();
//!
//! // Main loop
//! meter.source_mut().adc_mut().set_channel_mv(AdcChannel::A0, 277.05);
//! meter.poll(0);
//! assert_eq!(meter.outputs().ph.last(), Some(5.5));
//! ```

use crate::acquisition::VoltageSource;
use crate::action::CalibrationAction;
use crate::calibration::{
    CalibrationCoefficients, CalibrationEngine, CalibrationPoint, CalibrationStage,
    CalibrationState,
};
use crate::config::MeterConfig;
use crate::error::{AcquisitionError, CalibrationFault, ConfigurationError, Error};
use crate::health::ProbeStatus;
use crate::pipeline::{
    round_to, MeasurementPipeline, Outputs, TickOutcome, PH_DECIMALS, SLOPE_DECIMALS,
    TEMPERATURE_DECIMALS, VOLTAGE_DECIMALS,
};
use crate::temperature::{TemperatureProvider, TemperatureUnit};
use crate::traits::{SensorSink, TextSink};

/// A pH probe driver instance.
///
/// # Type Parameters
///
/// - `V`: voltage source ([`VoltageSource`])
/// - `P`: temperature provider ([`TemperatureProvider`])
/// - `S`: numeric output sink ([`SensorSink`])
/// - `T`: status output sink ([`TextSink`])
///
/// # Thread Safety
///
/// The meter itself is not thread-safe. For multi-threaded scenarios
/// (e.g., MQTT command handling + tick loop), use the `SharedMeter`
/// wrapper from the services module (requires `mqtt` feature).
pub struct PhMeter<V, P, S, T>
where
    V: VoltageSource,
    P: TemperatureProvider,
    S: SensorSink,
    T: TextSink,
{
    source: V,
    temperature: P,
    engine: CalibrationEngine,
    pipeline: MeasurementPipeline,
    outputs: Outputs<S, T>,
    update_interval_ms: u64,
    calibration_timeout_ms: u64,
    calibration_mode: bool,
    mode_since_ms: u64,
    last_tick_ms: Option<u64>,
}

impl<V, P, S, T> PhMeter<V, P, S, T>
where
    V: VoltageSource,
    P: TemperatureProvider,
    S: SensorSink,
    T: TextSink,
{
    /// Create a meter. Fails if `config` does not validate.
    pub fn new(
        config: &MeterConfig,
        source: V,
        temperature: P,
        outputs: Outputs<S, T>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            source,
            temperature,
            engine: CalibrationEngine::new(config.buffers, config.factory, config.slope_limits),
            pipeline: MeasurementPipeline::new(config),
            outputs,
            update_interval_ms: u64::from(config.update_interval_ms),
            calibration_timeout_ms: u64::from(config.calibration_timeout_ms),
            calibration_mode: false,
            mode_since_ms: 0,
            last_tick_ms: None,
        })
    }

    /// Call from the main loop. Runs a tick once the update interval has
    /// elapsed since the previous one; the first call always ticks.
    pub fn poll(&mut self, now_ms: u64) -> Option<TickOutcome> {
        self.expire_calibration_mode(now_ms);
        let due = match self.last_tick_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.update_interval_ms,
        };
        if due {
            Some(self.tick(now_ms))
        } else {
            None
        }
    }

    /// Run one measurement tick now.
    pub fn tick(&mut self, now_ms: u64) -> TickOutcome {
        self.expire_calibration_mode(now_ms);
        self.last_tick_ms = Some(now_ms);

        match self.source.read_mv() {
            Ok(mv) => {
                let celsius = self.temperature.read_celsius();
                let coefficients = self.engine.coefficients();
                let range = self.source.input_range();
                self.pipeline
                    .process(mv, range, celsius, &coefficients, &mut self.outputs)
            }
            Err(e) => self.pipeline.skip(e),
        }
    }

    // ------------------------------------------------------------------------
    // Calibration
    // ------------------------------------------------------------------------

    /// Turn calibration mode on or off.
    pub fn set_calibration_mode(&mut self, enabled: bool, now_ms: u64) {
        if enabled != self.calibration_mode {
            log::info!(
                "calibration mode {}",
                if enabled { "enabled" } else { "disabled" }
            );
        }
        self.calibration_mode = enabled;
        self.mode_since_ms = now_ms;
    }

    /// Whether calibration mode is on.
    pub fn calibration_mode(&self) -> bool {
        self.calibration_mode
    }

    /// Run a calibration action.
    ///
    /// Stage captures require calibration mode; reset is always accepted.
    pub fn dispatch(
        &mut self,
        action: CalibrationAction,
        now_ms: u64,
    ) -> Result<CalibrationCoefficients, Error> {
        match action.stage() {
            Some(stage) => self.calibrate(stage, now_ms),
            None => Ok(self.reset_calibration()),
        }
    }

    /// Run a calibration action by name (`calibrate_ph4`, ..., `reset_calibration`).
    pub fn dispatch_name(
        &mut self,
        name: &str,
        now_ms: u64,
    ) -> Result<CalibrationCoefficients, Error> {
        let action = CalibrationAction::from_name(name)?;
        self.dispatch(action, now_ms)
    }

    /// Take a calibration point for `stage` now.
    ///
    /// Averages a burst of readings the size of the smoothing window and
    /// commits it as the point. The pipeline's own window is untouched.
    pub fn calibrate(
        &mut self,
        stage: CalibrationStage,
        now_ms: u64,
    ) -> Result<CalibrationCoefficients, Error> {
        self.expire_calibration_mode(now_ms);
        if !self.calibration_mode {
            log::warn!(
                "{} ignored: calibration mode is off",
                CalibrationAction::calibrate(stage)
            );
            return Err(ConfigurationError::CalibrationModeInactive.into());
        }

        let millivolts = self.sample_average().map_err(|e| {
            log::warn!("calibration {} sampling failed: {}", stage.label(), e);
            e
        })?;

        self.engine.begin_calibration(stage);
        let coefficients = self.engine.capture_sample(millivolts)?;
        self.committed(coefficients);
        Ok(coefficients)
    }

    /// Clear all calibration points and revert to factory coefficients.
    pub fn reset_calibration(&mut self) -> CalibrationCoefficients {
        self.engine.reset_calibration();
        let coefficients = self.engine.coefficients();
        self.committed(coefficients);
        coefficients
    }

    /// Re-install a point set kept by the host.
    pub fn restore_calibration(
        &mut self,
        points: &[CalibrationPoint],
    ) -> Result<CalibrationCoefficients, Error> {
        let coefficients = self.engine.restore(points)?;
        self.committed(coefficients);
        Ok(coefficients)
    }

    fn committed(&mut self, coefficients: CalibrationCoefficients) {
        self.outputs.publish_slope(coefficients.slope_mv_per_ph);
        self.pipeline.reset_ph_smoothing();
    }

    fn sample_average(&mut self) -> Result<f32, AcquisitionError> {
        let count = self.pipeline.smoothing_window().max(1);
        let mut sum = 0.0f32;
        for _ in 0..count {
            sum += self.source.read_mv()?;
        }
        Ok(sum / count as f32)
    }

    fn expire_calibration_mode(&mut self, now_ms: u64) {
        if self.calibration_mode
            && self.calibration_timeout_ms > 0
            && now_ms.saturating_sub(self.mode_since_ms) >= self.calibration_timeout_ms
        {
            log::info!(
                "calibration mode timed out after {} ms",
                self.calibration_timeout_ms
            );
            self.calibration_mode = false;
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// State snapshot for UI/API.
    pub fn state(&self) -> MeterState {
        let unit = self.pipeline.unit();
        let last = self.pipeline.last_reading();
        MeterState {
            ph: last.map(|r| round_to(r.ph, PH_DECIMALS)),
            raw_mv: last.map(|r| round_to(r.raw_mv, VOLTAGE_DECIMALS)),
            slope_mv_per_ph: last.map(|r| round_to(r.slope_mv_per_ph, SLOPE_DECIMALS)),
            temperature: last
                .map(|r| round_to(unit.from_celsius(r.temperature_c), TEMPERATURE_DECIMALS)),
            temperature_unit: unit,
            status: self.pipeline.status(),
            coefficients: self.engine.coefficients(),
            calibrated: self.engine.is_calibrated(),
            points: self.engine.points().len() as u8,
            fault: self.engine.fault(),
            calibration_state: self.engine.state(),
            calibration_mode: self.calibration_mode,
        }
    }

    /// Committed coefficients.
    pub fn coefficients(&self) -> CalibrationCoefficients {
        self.engine.coefficients()
    }

    /// Calibration engine.
    pub fn engine(&self) -> &CalibrationEngine {
        &self.engine
    }

    /// Measurement pipeline.
    pub fn pipeline(&self) -> &MeasurementPipeline {
        &self.pipeline
    }

    /// Output sinks.
    pub fn outputs(&self) -> &Outputs<S, T> {
        &self.outputs
    }

    /// Mutable access to the output sinks.
    pub fn outputs_mut(&mut self) -> &mut Outputs<S, T> {
        &mut self.outputs
    }

    /// Voltage source.
    pub fn source(&self) -> &V {
        &self.source
    }

    /// Mutable access to the voltage source.
    pub fn source_mut(&mut self) -> &mut V {
        &mut self.source
    }

    /// Mutable access to the temperature provider.
    pub fn temperature_mut(&mut self) -> &mut P {
        &mut self.temperature
    }
}

/// Full state snapshot for UI/API.
///
/// Reading fields are `None` until the first successful tick and keep their
/// last values across failed ticks. Implements `serde::Serialize` when the
/// `serde` feature is enabled.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeterState {
    /// Last published pH.
    pub ph: Option<f32>,
    /// Last published raw voltage, in millivolts.
    pub raw_mv: Option<f32>,
    /// Last published compensated slope, in mV/pH.
    pub slope_mv_per_ph: Option<f32>,
    /// Last published temperature, in `temperature_unit`.
    pub temperature: Option<f32>,
    /// Temperature output unit.
    pub temperature_unit: TemperatureUnit,
    /// Current probe status.
    pub status: ProbeStatus,
    /// Committed coefficients.
    pub coefficients: CalibrationCoefficients,
    /// Whether a fit from at least two points is committed.
    pub calibrated: bool,
    /// Number of stored calibration points.
    pub points: u8,
    /// Most recent rejected fit, if not yet superseded.
    pub fault: Option<CalibrationFault>,
    /// Calibration protocol state.
    pub calibration_state: CalibrationState,
    /// Whether calibration mode is on.
    pub calibration_mode: bool,
}
