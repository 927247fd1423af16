//! Error taxonomy for the pH meter core.
//!
//! Nothing here is fatal during normal operation:
//!
//! - [`AcquisitionError`] is transient; the affected tick is skipped and the
//!   next tick retries naturally.
//! - [`CalibrationFault`] is a rejected regression result; the previous valid
//!   coefficients stay in effect.
//! - [`ConfigurationError`] is a request the driver refused without changing
//!   any state (e.g. a calibration action while calibration mode is off).

/// Failure to obtain a voltage sample from the analog front end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AcquisitionError {
    /// The multiplexed converter reported a bus error for this channel.
    #[error("bus error reading ADC channel {channel}")]
    Bus {
        /// Converter channel (0-3).
        channel: u8,
    },
    /// The native analog pin could not be read.
    #[error("fault reading analog pin {pin}")]
    PinFault {
        /// GPIO number of the pin.
        pin: u8,
    },
    /// The converter has not produced a sample yet.
    #[error("no sample available yet")]
    NotReady,
}

/// A calibration fit that was rejected.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CalibrationFault {
    /// The points do not determine a line (identical voltages or buffer values).
    #[error("calibration points do not determine a slope")]
    DegenerateFit,
    /// The fitted slope is outside the plausible range for a pH electrode.
    #[error("implausible slope {slope_mv_per_ph} mV/pH")]
    ImplausibleSlope {
        /// The rejected slope.
        slope_mv_per_ph: f32,
    },
}

/// A request the driver refused without changing state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConfigurationError {
    /// A stage capture was requested while calibration mode is off.
    #[error("calibration mode is not active")]
    CalibrationModeInactive,
    /// A fit was requested with fewer than two calibration points.
    #[error("a fit needs at least 2 calibration points, have {count}")]
    InsufficientPoints {
        /// Number of stored points.
        count: usize,
    },
    /// Multiplexed converter channel outside 0-3.
    #[error("ADC channel {0} out of range (0-3)")]
    InvalidChannel(u8),
    /// The configured input mode does not match the source being built.
    #[error("input configuration selects a different voltage source")]
    InputModeMismatch,
    /// The configured GPIO differs from the pin handed to the source.
    #[error("input configured for GPIO {configured}, pin is GPIO {actual}")]
    PinMismatch {
        /// GPIO named in the configuration.
        configured: u8,
        /// GPIO of the bound pin.
        actual: u8,
    },
    /// Calibration stage other than 4, 7 or 10.
    #[error("unknown calibration stage {0}")]
    InvalidStage(u8),
    /// Action name that does not map to a calibration action.
    #[error("unknown calibration action")]
    UnknownAction,
    /// A buffer reference value lies outside 0-14 pH.
    #[error("buffer solution value outside 0-14 pH")]
    BufferOutOfRange,
    /// A restored point's reference pH differs from the configured buffer
    /// for its stage.
    #[error("restored pH{0} point does not match the configured buffer")]
    BufferMismatch(u8),
    /// Two buffer reference values are equal.
    #[error("buffer solution values must be distinct")]
    DuplicateBufferValues,
    /// Update interval of zero.
    #[error("update interval must be non-zero")]
    InvalidInterval,
    /// Smoothing window outside the supported range.
    #[error("smoothing window out of range")]
    InvalidSmoothingWindow,
    /// Default temperature not finite or not above absolute zero.
    #[error("default temperature must be above absolute zero")]
    InvalidTemperature,
}

/// Any error surfaced by a driver operation.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Error {
    /// Voltage acquisition failed.
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    /// Calibration fit rejected.
    #[error(transparent)]
    Calibration(#[from] CalibrationFault),
    /// Request refused.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// A sample was offered while no calibration stage was pending.
    #[error("no calibration stage is awaiting a sample")]
    NotAwaitingSample,
}
