//! Trait definitions for hardware abstraction and telemetry output.
//!
//! This module defines the core abstractions that allow the pH meter to:
//! - Run on different hardware (external multiplexed ADC, on-chip ADC pin, desktop mock)
//! - Publish readings to whatever the host uses for entities or messaging
//!
//! # Submodules
//!
//! - `hardware`: Converters, analog pins, temperature sensor, clock
//! - `telemetry`: Numeric and text output sinks
//!
//! # Hardware Abstraction
//!
//! - [`MultiplexedAdc`]: External converter with channels 0-3
//! - [`AnalogPin`]: Native ADC pin returning raw counts
//! - [`TemperatureSensor`]: Optional bound temperature sensor
//! - [`Clock`]: Time source for `no_std` environments

pub mod hardware;
pub mod telemetry;

pub use hardware::*;
pub use telemetry::*;
