//! ESP32-C3 SuperMini hardware abstraction layer for the pH probe.
//!
//! # Hardware Configuration
//!
//! - **MCU**: ESP32-C3 SuperMini (RISC-V 160MHz, 4MB Flash)
//! - **Probe front end**: pH amplifier board with analog output
//!
//! The probe sits on GPIO3; [`adc::PROBE_INPUT`] is the matching input
//! configuration.

pub mod adc;
mod clock;

pub use adc::Esp32AnalogPin;
pub use clock::Esp32Clock;
