//! Hardware abstraction traits for the analog front end and time source.
//!
//! This module defines the hardware interfaces that allow the pH meter to
//! run against an external multiplexed converter, an on-chip ADC pin, or
//! desktop mocks.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`MultiplexedAdc`] | External converter with four single-ended channels |
//! | [`AnalogPin`] | On-device ADC pin returning raw counts |
//! | [`TemperatureSensor`] | Bound temperature sensor (may not have a reading yet) |
//! | [`Clock`] | Time source for `no_std` environments |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For ESP32 hardware, use the
//! implementations from `hal::esp32` (requires `esp32` feature).
//!
//! # Example
//!
//! ```rust
//! use ph_meter::traits::{AdcChannel, MultiplexedAdc};
//! use ph_meter::hal::MockAdc;
//!
//! let mut adc = MockAdc::new();
//! adc.set_channel_mv(AdcChannel::A1, 1650.0);
//!
//! assert_eq!(adc.read_channel_mv(AdcChannel::A1), Ok(1650.0));
//! ```

use crate::error::ConfigurationError;

/// Single-ended input channel of a multiplexed converter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AdcChannel {
    /// Channel 0.
    #[default]
    A0,
    /// Channel 1.
    A1,
    /// Channel 2.
    A2,
    /// Channel 3.
    A3,
}

impl AdcChannel {
    /// Returns the channel index (0-3).
    #[inline]
    pub const fn index(&self) -> u8 {
        match self {
            AdcChannel::A0 => 0,
            AdcChannel::A1 => 1,
            AdcChannel::A2 => 2,
            AdcChannel::A3 => 3,
        }
    }
}

impl TryFrom<u8> for AdcChannel {
    type Error = ConfigurationError;

    /// # Examples
    ///
    /// ```
    /// use ph_meter::traits::AdcChannel;
    ///
    /// assert_eq!(AdcChannel::try_from(3), Ok(AdcChannel::A3));
    /// assert!(AdcChannel::try_from(4).is_err());
    /// ```
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AdcChannel::A0),
            1 => Ok(AdcChannel::A1),
            2 => Ok(AdcChannel::A2),
            3 => Ok(AdcChannel::A3),
            other => Err(ConfigurationError::InvalidChannel(other)),
        }
    }
}

/// External multiplexed converter (e.g. a 4-channel 16-bit I2C ADC).
///
/// The converter is shared with other consumers and provides one
/// authoritative sample per call. Bus protocol details live in the
/// implementation.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use ph_meter::traits::{AdcChannel, MultiplexedAdc};
///
/// struct MyAdc { /* bus handle */ }
///
/// impl MultiplexedAdc for MyAdc {
///     type Error = ();
///
///     fn read_channel_mv(&mut self, channel: AdcChannel) -> Result<f32, ()> {
///         // Select mux, trigger conversion, scale to millivolts...
///         Ok(1650.0)
///     }
///
///     fn full_scale_mv(&self) -> f32 {
///         4096.0
///     }
/// }
/// ```
pub trait MultiplexedAdc {
    /// Error type for bus operations.
    type Error;

    /// Read one sample from `channel`, in millivolts.
    fn read_channel_mv(&mut self, channel: AdcChannel) -> Result<f32, Self::Error>;

    /// Full-scale input voltage of the configured gain, in millivolts.
    fn full_scale_mv(&self) -> f32;

    /// Lowest reportable input voltage, in millivolts.
    ///
    /// Single-ended channels of a signed converter read down to
    /// `-full_scale_mv`.
    fn min_scale_mv(&self) -> f32 {
        -self.full_scale_mv()
    }
}

/// On-device ADC pin.
///
/// Returns raw conversion counts; scaling to millivolts is done by
/// [`NativeAdcSource`](crate::acquisition::NativeAdcSource) using the
/// device reference voltage.
pub trait AnalogPin {
    /// Error type for conversion failures.
    type Error;

    /// Read the raw conversion result.
    fn read_raw(&mut self) -> Result<u16, Self::Error>;

    /// GPIO number, used in diagnostics.
    fn gpio(&self) -> u8;
}

/// A bound temperature sensor owned by the host.
///
/// `latest_celsius` returns `None` until the sensor has produced its
/// first reading.
pub trait TemperatureSensor {
    /// Most recent reading in degrees Celsius, if any.
    fn latest_celsius(&self) -> Option<f32>;
}

/// Time source trait for `no_std` compatibility.
///
/// Provides monotonic time in milliseconds for tick scheduling and the
/// calibration-mode timeout.
///
/// # Example
///
/// ```rust
/// use ph_meter::traits::Clock;
/// use ph_meter::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // AdcChannel Tests
    // =========================================================================

    #[test]
    fn adc_channel_default() {
        assert_eq!(AdcChannel::default(), AdcChannel::A0);
    }

    #[test]
    fn adc_channel_index_round_trip() {
        for i in 0..4u8 {
            let ch = AdcChannel::try_from(i).unwrap();
            assert_eq!(ch.index(), i);
        }
    }

    #[test]
    fn adc_channel_out_of_range() {
        assert_eq!(
            AdcChannel::try_from(4),
            Err(ConfigurationError::InvalidChannel(4))
        );
        assert_eq!(
            AdcChannel::try_from(255),
            Err(ConfigurationError::InvalidChannel(255))
        );
    }

    // =========================================================================
    // TemperatureSensor Tests
    // =========================================================================

    struct Unbound;

    impl TemperatureSensor for Unbound {
        fn latest_celsius(&self) -> Option<f32> {
            None
        }
    }

    #[test]
    fn temperature_sensor_without_reading() {
        assert!(Unbound.latest_celsius().is_none());
    }
}
