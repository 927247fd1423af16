//! # ph-meter
//!
//! A pH probe driver core. It calibrates a probe against buffer solutions
//! and publishes temperature-compensated pH readings.
//!
//! ## Features
//!
//! - **Two input variants**: a channel of an external multiplexed converter or a native ADC pin
//! - **Buffer calibration**: up to three points (pH 4/7/10, configurable), exact or least-squares fit
//! - **Implausible fits rejected**: previous coefficients stay in effect
//! - **Nernstian compensation**: slope scaled by absolute temperature, referenced to 25 °C
//! - **Probe health**: normal, out of range, or disconnected (debounced)
//! - **Optional outputs**: raw voltage, slope, temperature and status are each an `Option<Sink>`
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware and telemetry abstractions
//! - `acquisition` - Voltage sources
//! - `calibration` - Calibration points, regression and protocol state machine
//! - `pipeline` - Per-tick smoothing, conversion and publication
//! - `meter` - Driver instance that ties everything together
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use ph_meter::{
//!     MeterConfig, Outputs, PhMeter, ProbeStatus,
//!     acquisition::MuxAdcSource,
//!     hal::{MockAdc, MockSensor, MockText},
//!     temperature::FixedTemperature,
//!     traits::AdcChannel,
//! };
//!
//! let mut adc = MockAdc::new();
//! adc.set_channel_mv(AdcChannel::A0, 199.3);
//!
//! let outputs: Outputs<MockSensor, MockText> =
//!     Outputs::new(MockSensor::new()).with_slope(MockSensor::new());
//!
//! let mut meter = PhMeter::new(
//!     &MeterConfig::default(),
//!     MuxAdcSource::new(adc, AdcChannel::A0),
//!     FixedTemperature::default(),
//!     outputs,
//! )
//! .unwrap();
//!
//! // Call poll() from your main loop; it ticks every update interval
//! meter.poll(0);
//!
//! let state = meter.state();
//! assert_eq!(state.ph, Some(7.0));
//! assert_eq!(state.status, ProbeStatus::Normal);
//! assert!(!state.calibrated);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Voltage sources for the probe's analog front end.
pub mod acquisition;
/// Operator-triggered calibration actions.
pub mod action;
/// Calibration points, regression and the capture protocol.
pub mod calibration;
/// Error types.
pub mod error;
/// Rolling-average and exponential smoothing.
pub mod filter;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Probe health classification.
pub mod health;
/// Driver instance tying acquisition, calibration and measurement together.
pub mod meter;
/// Per-tick measurement and publication.
pub mod pipeline;
/// Temperature providers and Nernstian compensation.
pub mod temperature;
/// Core traits for hardware and telemetry abstraction.
pub mod traits;

/// Shared configuration system for desktop and ESP32.
pub mod config;

/// Shared message types for MQTT communication (serde-based).
#[cfg(feature = "serde")]
pub mod messages;

/// Network services for MQTT (feature-gated).
#[cfg(feature = "mqtt")]
pub mod services;

// Re-exports for convenience
pub use acquisition::{
    AnySource, InputRange, MuxAdcSource, NativeAdcSource, VoltageSample, VoltageSource,
};
pub use action::CalibrationAction;
pub use calibration::{
    BufferSolutions, CalibrationCoefficients, CalibrationEngine, CalibrationPoint,
    CalibrationStage, CalibrationState, SlopeLimits,
};
pub use error::{AcquisitionError, CalibrationFault, ConfigurationError, Error};
pub use health::{ProbeHealthMonitor, ProbeStatus};
pub use meter::{MeterState, PhMeter};
pub use pipeline::{MeasurementPipeline, Outputs, Reading, TickOutcome};
pub use temperature::{
    FixedTemperature, SensorTemperature, TemperatureProvider, TemperatureUnit,
};
pub use traits::{
    AdcChannel, AnalogPin, Clock, MultiplexedAdc, SensorSink, TemperatureSensor, TextSink,
};

// Config re-exports
pub use config::{Config, InputConfig, MeterConfig, MqttConfig};

// Message re-exports (for MQTT APIs)
#[cfg(feature = "serde")]
pub use messages::{CalibrationModeRequest, CalibrationRequest};

// Parsing function re-exports (serde-json-core based)
#[cfg(feature = "serde-json-core")]
pub use messages::{parse_calibration_mode_request, parse_calibration_request};
