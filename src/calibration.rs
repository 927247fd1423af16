//! Buffer calibration points and the capture protocol.
//!
//! The engine keeps up to three [`CalibrationPoint`]s, one per
//! [`CalibrationStage`], and derives [`CalibrationCoefficients`] from them:
//!
//! | Points | Coefficients |
//! |--------|--------------|
//! | 0 or 1 | Factory defaults, reported as uncalibrated |
//! | 2 | Exact line through both points |
//! | 3 | Ordinary least-squares fit of voltage against reference pH |
//!
//! # Conversion
//!
//! `pH = 7 - (mV - intercept_mv) / slope`, where `intercept_mv` is the voltage
//! at pH 7 and `slope` is the compensated mV per pH unit. A probe whose
//! voltage falls as pH rises therefore has a positive slope.
//!
//! # Protocol
//!
//! ```text
//!            begin_calibration(stage)
//!   Idle ─────────────────────────────▶ AwaitingSample(stage)
//!    ▲                                   │   ▲      │
//!    │                                   │   └──────┘ begin_calibration(other)
//!    │       recompute, accept/reject    ▼             (prior stage aborted)
//!    └──────────────────────────── Committing ◀── capture_sample(mV)
//!
//!   reset_calibration(): any state ──▶ Idle, points cleared, factory coefficients
//! ```
//!
//! A fit with a zero or implausible slope is rejected. The new point is
//! dropped and the previous point set stays in effect. The
//! [`CalibrationFault`] is kept until the next successful commit or reset.
//!
//! # Example
//!
//! ```rust
//! use ph_meter::calibration::{CalibrationEngine, CalibrationStage};
//!
//! let mut engine = CalibrationEngine::default();
//!
//! engine.begin_calibration(CalibrationStage::Ph4);
//! engine.capture_sample(354.8).unwrap();
//!
//! engine.begin_calibration(CalibrationStage::Ph7);
//! let coefficients = engine.capture_sample(199.3).unwrap();
//!
//! assert!(engine.is_calibrated());
//! assert!((coefficients.ph_at(277.05, 25.0) - 5.5).abs() < 0.01);
//! ```

use heapless::Vec;
use num_traits::float::FloatCore;

use crate::error::{CalibrationFault, ConfigurationError, Error};
use crate::temperature::compensate_slope;

/// pH of the neutral point the intercept is referenced to.
pub const NEUTRAL_PH: f32 = 7.0;

/// Theoretical Nernstian slope at 25 °C, in mV per pH unit.
pub const NERNST_SLOPE_MV: f32 = 59.16;

/// Factory neutral-buffer voltage, in millivolts.
pub const FACTORY_NEUTRAL_MV: f32 = 199.3;

/// Maximum number of stored calibration points.
pub const MAX_POINTS: usize = 3;

// ============================================================================
// Stages and buffers
// ============================================================================

/// A calibration stage, named by its nominal buffer pH.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CalibrationStage {
    /// Acidic buffer (nominal pH 4).
    Ph4,
    /// Neutral buffer (nominal pH 7).
    Ph7,
    /// Alkaline buffer (nominal pH 10).
    Ph10,
}

impl CalibrationStage {
    /// All stages in ascending pH order.
    pub const ALL: [CalibrationStage; 3] = [
        CalibrationStage::Ph4,
        CalibrationStage::Ph7,
        CalibrationStage::Ph10,
    ];

    /// Nominal stage number (4, 7 or 10).
    #[inline]
    pub const fn number(&self) -> u8 {
        match self {
            CalibrationStage::Ph4 => 4,
            CalibrationStage::Ph7 => 7,
            CalibrationStage::Ph10 => 10,
        }
    }

    /// Label used in logs and point keys.
    pub const fn label(&self) -> &'static str {
        match self {
            CalibrationStage::Ph4 => "pH4",
            CalibrationStage::Ph7 => "pH7",
            CalibrationStage::Ph10 => "pH10",
        }
    }

    /// Stage for a nominal number.
    ///
    /// Stage 0 is reserved for reset and is not a capture stage.
    ///
    /// # Examples
    ///
    /// ```
    /// use ph_meter::calibration::CalibrationStage;
    ///
    /// assert_eq!(CalibrationStage::from_number(7), Ok(CalibrationStage::Ph7));
    /// assert!(CalibrationStage::from_number(0).is_err());
    /// ```
    pub fn from_number(n: u8) -> Result<Self, ConfigurationError> {
        match n {
            4 => Ok(CalibrationStage::Ph4),
            7 => Ok(CalibrationStage::Ph7),
            10 => Ok(CalibrationStage::Ph10),
            other => Err(ConfigurationError::InvalidStage(other)),
        }
    }
}

/// Reference pH of the buffer solution used for each stage.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BufferSolutions {
    /// Buffer used at stage 4.
    pub ph4: f32,
    /// Buffer used at stage 7.
    pub ph7: f32,
    /// Buffer used at stage 10.
    pub ph10: f32,
}

impl Default for BufferSolutions {
    fn default() -> Self {
        Self {
            ph4: 4.0,
            ph7: 7.0,
            ph10: 10.0,
        }
    }
}

impl BufferSolutions {
    /// Create a buffer set.
    pub const fn new(ph4: f32, ph7: f32, ph10: f32) -> Self {
        Self { ph4, ph7, ph10 }
    }

    /// Reference pH for `stage`.
    #[inline]
    pub fn value_for(&self, stage: CalibrationStage) -> f32 {
        match stage {
            CalibrationStage::Ph4 => self.ph4,
            CalibrationStage::Ph7 => self.ph7,
            CalibrationStage::Ph10 => self.ph10,
        }
    }

    /// Check that every value lies in 0-14 and all three are distinct.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let values = [self.ph4, self.ph7, self.ph10];
        if values.iter().any(|v| !(0.0..=14.0).contains(v)) {
            return Err(ConfigurationError::BufferOutOfRange);
        }
        if self.ph4 == self.ph7 || self.ph7 == self.ph10 || self.ph4 == self.ph10 {
            return Err(ConfigurationError::DuplicateBufferValues);
        }
        Ok(())
    }
}

// ============================================================================
// Points and coefficients
// ============================================================================

/// A stored buffer reading.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationPoint {
    /// Stage this point was captured at; the point-set key.
    pub stage: CalibrationStage,
    /// Reference pH of the buffer.
    pub reference_ph: f32,
    /// Averaged probe voltage in the buffer, in millivolts.
    pub measured_mv: f32,
}

impl CalibrationPoint {
    /// Create a point.
    pub const fn new(stage: CalibrationStage, reference_ph: f32, measured_mv: f32) -> Self {
        Self {
            stage,
            reference_ph,
            measured_mv,
        }
    }
}

/// Line mapping probe voltage to pH, referenced to 25 °C.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationCoefficients {
    /// Probe sensitivity in mV per pH unit.
    pub slope_mv_per_ph: f32,
    /// Voltage at pH 7, in millivolts.
    pub intercept_mv: f32,
}

impl Default for CalibrationCoefficients {
    fn default() -> Self {
        Self::FACTORY
    }
}

impl CalibrationCoefficients {
    /// Nominal coefficients used while uncalibrated.
    pub const FACTORY: Self = Self {
        slope_mv_per_ph: NERNST_SLOPE_MV,
        intercept_mv: FACTORY_NEUTRAL_MV,
    };

    /// Create coefficients.
    pub const fn new(slope_mv_per_ph: f32, intercept_mv: f32) -> Self {
        Self {
            slope_mv_per_ph,
            intercept_mv,
        }
    }

    /// Slope scaled to `celsius`.
    #[inline]
    pub fn effective_slope(&self, celsius: f32) -> f32 {
        compensate_slope(self.slope_mv_per_ph, celsius)
    }

    /// pH for a voltage at `celsius`.
    #[inline]
    pub fn ph_at(&self, millivolts: f32, celsius: f32) -> f32 {
        NEUTRAL_PH - (millivolts - self.intercept_mv) / self.effective_slope(celsius)
    }

    /// Voltage expected at `ph` at 25 °C.
    #[inline]
    pub fn voltage_at(&self, ph: f32) -> f32 {
        self.intercept_mv - self.slope_mv_per_ph * (ph - NEUTRAL_PH)
    }
}

/// Plausible slope magnitudes for a working electrode, in mV per pH.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlopeLimits {
    /// Smallest accepted `|slope|`.
    pub min_abs: f32,
    /// Largest accepted `|slope|`.
    pub max_abs: f32,
}

impl Default for SlopeLimits {
    fn default() -> Self {
        Self {
            min_abs: 10.0,
            max_abs: 100.0,
        }
    }
}

impl SlopeLimits {
    /// Returns true if `slope` is finite, non-zero and within limits.
    pub fn contains(&self, slope: f32) -> bool {
        let magnitude = FloatCore::abs(slope);
        slope != 0.0 && magnitude >= self.min_abs && magnitude <= self.max_abs
    }
}

/// Fit a line to `points`.
///
/// Two points give the exact line through both; three use ordinary least
/// squares on voltage residuals.
pub fn fit_line(
    points: &[CalibrationPoint],
    limits: &SlopeLimits,
) -> Result<CalibrationCoefficients, Error> {
    let coefficients = match points {
        [] | [_] => {
            return Err(ConfigurationError::InsufficientPoints {
                count: points.len(),
            }
            .into())
        }
        [a, b] => {
            let dph = b.reference_ph - a.reference_ph;
            if dph == 0.0 {
                return Err(CalibrationFault::DegenerateFit.into());
            }
            let mv_per_ph = (b.measured_mv - a.measured_mv) / dph;
            CalibrationCoefficients::new(
                -mv_per_ph,
                a.measured_mv + mv_per_ph * (NEUTRAL_PH - a.reference_ph),
            )
        }
        _ => {
            let n = points.len() as f32;
            let mean_ph = points.iter().map(|p| p.reference_ph).sum::<f32>() / n;
            let mean_mv = points.iter().map(|p| p.measured_mv).sum::<f32>() / n;

            let (sxx, sxy) = points.iter().fold((0.0f32, 0.0f32), |(sxx, sxy), p| {
                let dx = p.reference_ph - mean_ph;
                (sxx + dx * dx, sxy + dx * (p.measured_mv - mean_mv))
            });
            if sxx == 0.0 {
                return Err(CalibrationFault::DegenerateFit.into());
            }
            let mv_per_ph = sxy / sxx;
            CalibrationCoefficients::new(
                -mv_per_ph,
                mean_mv + mv_per_ph * (NEUTRAL_PH - mean_ph),
            )
        }
    };

    let slope = coefficients.slope_mv_per_ph;
    if slope == 0.0
        || FloatCore::is_nan(slope)
        || FloatCore::is_infinite(slope)
        || FloatCore::is_nan(coefficients.intercept_mv)
    {
        return Err(CalibrationFault::DegenerateFit.into());
    }
    if !limits.contains(slope) {
        return Err(CalibrationFault::ImplausibleSlope {
            slope_mv_per_ph: slope,
        }
        .into());
    }
    Ok(coefficients)
}

// ============================================================================
// Engine
// ============================================================================

/// Position in the calibration protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CalibrationState {
    /// No stage in flight.
    #[default]
    Idle,
    /// A stage has begun and waits for its voltage sample.
    AwaitingSample(CalibrationStage),
    /// A sample was recorded and the fit is being recomputed.
    Committing,
}

/// Owns the calibration point set and the committed coefficients.
#[derive(Clone, Debug)]
pub struct CalibrationEngine {
    points: Vec<CalibrationPoint, MAX_POINTS>,
    coefficients: CalibrationCoefficients,
    factory: CalibrationCoefficients,
    buffers: BufferSolutions,
    limits: SlopeLimits,
    state: CalibrationState,
    fault: Option<CalibrationFault>,
    calibrated: bool,
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new(
            BufferSolutions::default(),
            CalibrationCoefficients::FACTORY,
            SlopeLimits::default(),
        )
    }
}

impl CalibrationEngine {
    /// Create an uncalibrated engine.
    pub fn new(
        buffers: BufferSolutions,
        factory: CalibrationCoefficients,
        limits: SlopeLimits,
    ) -> Self {
        Self {
            points: Vec::new(),
            coefficients: factory,
            factory,
            buffers,
            limits,
            state: CalibrationState::Idle,
            fault: None,
            calibrated: false,
        }
    }

    /// Start a stage. A stage already awaiting its sample is aborted and
    /// returned; it records nothing.
    pub fn begin_calibration(&mut self, stage: CalibrationStage) -> Option<CalibrationStage> {
        let aborted = match self.state {
            CalibrationState::AwaitingSample(prev) => {
                log::info!(
                    "calibration stage {} aborted, starting {}",
                    prev.label(),
                    stage.label()
                );
                Some(prev)
            }
            _ => None,
        };
        self.state = CalibrationState::AwaitingSample(stage);
        aborted
    }

    /// Record `millivolts` for the pending stage and recompute.
    ///
    /// Returns the committed coefficients (factory defaults while fewer than
    /// two points exist). On a rejected fit the point set and coefficients
    /// are left as they were and the fault is returned.
    pub fn capture_sample(&mut self, millivolts: f32) -> Result<CalibrationCoefficients, Error> {
        let stage = match self.state {
            CalibrationState::AwaitingSample(stage) => stage,
            _ => return Err(Error::NotAwaitingSample),
        };

        self.state = CalibrationState::Committing;
        let previous = self.points.clone();
        let point = CalibrationPoint::new(stage, self.buffers.value_for(stage), millivolts);
        upsert(&mut self.points, point);

        let result = self.commit();
        if result.is_err() {
            self.points = previous;
        } else {
            log::info!(
                "calibration {} captured at {:.1} mV ({} point(s))",
                stage.label(),
                millivolts,
                self.points.len()
            );
        }
        self.state = CalibrationState::Idle;
        result
    }

    /// Clear every point and return to factory coefficients.
    pub fn reset_calibration(&mut self) {
        self.points.clear();
        self.coefficients = self.factory;
        self.calibrated = false;
        self.fault = None;
        self.state = CalibrationState::Idle;
        log::info!(
            "calibration reset to factory: slope {:.2} mV/pH, neutral {:.1} mV",
            self.factory.slope_mv_per_ph,
            self.factory.intercept_mv
        );
    }

    /// Replace the point set with `points` (e.g. a set the host kept from an
    /// earlier session) and recompute.
    ///
    /// Later entries overwrite earlier ones with the same stage. Points whose
    /// reference pH is not the configured buffer for their stage are refused
    /// with [`ConfigurationError::BufferMismatch`]. A refused set or a
    /// rejected fit leaves the current set in place.
    pub fn restore(&mut self, points: &[CalibrationPoint]) -> Result<CalibrationCoefficients, Error> {
        let buffers = self.buffers;
        let mismatched = |p: &&CalibrationPoint| {
            FloatCore::abs(p.reference_ph - buffers.value_for(p.stage)) > BUFFER_MATCH_TOLERANCE
        };
        if let Some(p) = points.iter().find(mismatched) {
            log::warn!(
                "refusing restored {} point at pH {}: buffer is pH {}",
                p.stage.label(),
                p.reference_ph,
                buffers.value_for(p.stage)
            );
            return Err(ConfigurationError::BufferMismatch(p.stage.number()).into());
        }

        let previous = self.points.clone();
        self.points.clear();
        for p in points {
            upsert(&mut self.points, *p);
        }
        let result = self.commit();
        if result.is_err() {
            self.points = previous;
        }
        self.state = CalibrationState::Idle;
        result
    }

    /// Fit the stored points without committing.
    ///
    /// Fails with [`ConfigurationError::InsufficientPoints`] below two points.
    pub fn fit(&self) -> Result<CalibrationCoefficients, Error> {
        fit_line(&self.points, &self.limits)
    }

    fn commit(&mut self) -> Result<CalibrationCoefficients, Error> {
        if self.points.len() < 2 {
            self.coefficients = self.factory;
            self.calibrated = false;
            self.fault = None;
            log::debug!(
                "{} calibration point(s), using factory coefficients",
                self.points.len()
            );
            return Ok(self.coefficients);
        }

        match fit_line(&self.points, &self.limits) {
            Ok(coefficients) => {
                self.coefficients = coefficients;
                self.calibrated = true;
                self.fault = None;
                log::info!(
                    "calibration committed: slope {:.2} mV/pH, neutral {:.1} mV",
                    coefficients.slope_mv_per_ph,
                    coefficients.intercept_mv
                );
                Ok(coefficients)
            }
            Err(Error::Calibration(fault)) => {
                log::warn!("calibration rejected: {}", fault);
                self.fault = Some(fault);
                Err(fault.into())
            }
            Err(other) => Err(other),
        }
    }

    /// Currently committed coefficients.
    #[inline]
    pub fn coefficients(&self) -> CalibrationCoefficients {
        self.coefficients
    }

    /// Factory coefficients restored by a reset.
    pub fn factory(&self) -> CalibrationCoefficients {
        self.factory
    }

    /// Stored points.
    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    /// Stored point for `stage`, if any.
    pub fn point(&self, stage: CalibrationStage) -> Option<&CalibrationPoint> {
        self.points.iter().find(|p| p.stage == stage)
    }

    /// Protocol state.
    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Fault from the most recent rejected fit, cleared by a successful
    /// commit or a reset.
    pub fn fault(&self) -> Option<CalibrationFault> {
        self.fault
    }

    /// Returns true once a fit from at least two points is committed.
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Buffer reference values.
    pub fn buffers(&self) -> &BufferSolutions {
        &self.buffers
    }

    /// Slope acceptance limits.
    pub fn limits(&self) -> &SlopeLimits {
        &self.limits
    }
}

/// Largest difference between a restored point's reference pH and its buffer.
const BUFFER_MATCH_TOLERANCE: f32 = 1e-3;

fn upsert(points: &mut Vec<CalibrationPoint, MAX_POINTS>, point: CalibrationPoint) {
    if let Some(existing) = points.iter_mut().find(|p| p.stage == point.stage) {
        *existing = point;
    } else {
        // One slot per stage, so this cannot overflow.
        let _ = points.push(point);
    }
}
