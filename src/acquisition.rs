//! Voltage acquisition from the probe's analog front end.
//!
//! A [`VoltageSource`] produces one millivolt sample per call. Two variants
//! exist, selected once at construction:
//!
//! - [`MuxAdcSource`]: one channel (0-3) of an external multiplexed converter
//! - [`NativeAdcSource`]: an on-device ADC pin, scaled by the reference voltage
//!
//! [`AnySource`] wraps either one so a driver can be built from configuration
//! without naming the concrete backend type in its signature.
//!
//! No retries happen at this layer. A failed read is returned to the caller
//! for that poll only.
//!
//! # Example
//!
//! ```rust
//! use ph_meter::acquisition::{MuxAdcSource, VoltageSource};
//! use ph_meter::hal::MockAdc;
//! use ph_meter::traits::AdcChannel;
//!
//! let mut adc = MockAdc::new();
//! adc.set_channel_mv(AdcChannel::A2, 1650.0);
//!
//! let mut source = MuxAdcSource::new(adc, AdcChannel::A2);
//! assert_eq!(source.read_mv(), Ok(1650.0));
//! ```

use crate::config::InputConfig;
use crate::error::{AcquisitionError, ConfigurationError};
use crate::traits::{AdcChannel, AnalogPin, MultiplexedAdc};

/// A single voltage reading.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VoltageSample {
    /// Measured voltage in millivolts.
    pub millivolts: f32,
    /// Time of the reading, in milliseconds.
    pub timestamp_ms: u64,
}

impl VoltageSample {
    /// Create a sample.
    pub const fn new(millivolts: f32, timestamp_ms: u64) -> Self {
        Self {
            millivolts,
            timestamp_ms,
        }
    }
}

/// Span of voltages a channel can report, in millivolts.
///
/// Readings pinned at either end are treated as "at the rail" by the
/// health monitor.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputRange {
    /// Lowest reportable voltage.
    pub min_mv: f32,
    /// Highest reportable voltage.
    pub max_mv: f32,
}

impl InputRange {
    /// Create a range from explicit bounds.
    pub const fn new(min_mv: f32, max_mv: f32) -> Self {
        Self { min_mv, max_mv }
    }

    /// `0..=full_scale_mv`, as seen by an on-chip ADC pin.
    pub const fn unipolar(full_scale_mv: f32) -> Self {
        Self::new(0.0, full_scale_mv)
    }

    /// `-full_scale_mv..=full_scale_mv`, as seen by a signed converter.
    pub fn bipolar(full_scale_mv: f32) -> Self {
        Self::new(-full_scale_mv, full_scale_mv)
    }

    /// Returns true if `millivolts` lies within `margin_mv` of either bound.
    pub fn at_rail(&self, millivolts: f32, margin_mv: f32) -> bool {
        millivolts <= self.min_mv + margin_mv || millivolts >= self.max_mv - margin_mv
    }
}

/// One analog channel producing millivolt samples.
pub trait VoltageSource {
    /// Read one sample in millivolts.
    fn read_mv(&mut self) -> Result<f32, AcquisitionError>;

    /// Full-scale voltage of the channel, in millivolts.
    fn full_scale_mv(&self) -> f32;

    /// Voltages the channel can report. Unipolar unless overridden.
    fn input_range(&self) -> InputRange {
        InputRange::unipolar(self.full_scale_mv())
    }

    /// Read one sample and stamp it with `now_ms`.
    fn sample(&mut self, now_ms: u64) -> Result<VoltageSample, AcquisitionError> {
        self.read_mv().map(|mv| VoltageSample::new(mv, now_ms))
    }
}

impl<V: VoltageSource + ?Sized> VoltageSource for &mut V {
    fn read_mv(&mut self) -> Result<f32, AcquisitionError> {
        (**self).read_mv()
    }

    fn full_scale_mv(&self) -> f32 {
        (**self).full_scale_mv()
    }

    fn input_range(&self) -> InputRange {
        (**self).input_range()
    }
}

// ============================================================================
// Multiplexed ADC
// ============================================================================

/// A channel of an external multiplexed converter.
#[derive(Debug)]
pub struct MuxAdcSource<A: MultiplexedAdc> {
    adc: A,
    channel: AdcChannel,
}

impl<A: MultiplexedAdc> MuxAdcSource<A> {
    /// Bind `channel` of `adc`.
    pub fn new(adc: A, channel: AdcChannel) -> Self {
        Self { adc, channel }
    }

    /// Bind the channel named by `input`.
    ///
    /// Fails if `input` selects the native pin or names a channel outside 0-3.
    pub fn from_config(adc: A, input: &InputConfig) -> Result<Self, ConfigurationError> {
        match *input {
            InputConfig::Multiplexed { channel } => {
                Ok(Self::new(adc, AdcChannel::try_from(channel)?))
            }
            InputConfig::NativePin { .. } => Err(ConfigurationError::InputModeMismatch),
        }
    }

    /// The bound channel.
    pub fn channel(&self) -> AdcChannel {
        self.channel
    }

    /// Access the converter.
    pub fn adc(&self) -> &A {
        &self.adc
    }

    /// Mutable access to the converter.
    pub fn adc_mut(&mut self) -> &mut A {
        &mut self.adc
    }
}

impl<A: MultiplexedAdc> VoltageSource for MuxAdcSource<A> {
    fn read_mv(&mut self) -> Result<f32, AcquisitionError> {
        self.adc
            .read_channel_mv(self.channel)
            .map_err(|_| AcquisitionError::Bus {
                channel: self.channel.index(),
            })
    }

    fn full_scale_mv(&self) -> f32 {
        self.adc.full_scale_mv()
    }

    fn input_range(&self) -> InputRange {
        InputRange::new(self.adc.min_scale_mv(), self.adc.full_scale_mv())
    }
}

// ============================================================================
// Native ADC pin
// ============================================================================

/// Default reference voltage of an on-chip ADC, in millivolts.
pub const DEFAULT_REFERENCE_MV: f32 = 3300.0;

/// Default on-chip ADC resolution.
pub const DEFAULT_RESOLUTION_BITS: u8 = 12;

/// An on-device analog pin scaled to millivolts.
///
/// `mv = raw / (2^bits - 1) * reference_mv`
#[derive(Debug)]
pub struct NativeAdcSource<P: AnalogPin> {
    pin: P,
    reference_mv: f32,
    max_count: f32,
}

impl<P: AnalogPin> NativeAdcSource<P> {
    /// Bind `pin` with the default 3.3 V reference and 12-bit resolution.
    pub fn new(pin: P) -> Self {
        Self::with_scaling(pin, DEFAULT_REFERENCE_MV, DEFAULT_RESOLUTION_BITS)
    }

    /// Bind `pin` with an explicit reference voltage and resolution.
    ///
    /// Resolution is clamped to 1-16 bits.
    pub fn with_scaling(pin: P, reference_mv: f32, resolution_bits: u8) -> Self {
        let bits = resolution_bits.clamp(1, 16) as u32;
        Self {
            pin,
            reference_mv,
            max_count: ((1u32 << bits) - 1) as f32,
        }
    }

    /// Bind `pin` with the scaling named by `input`.
    ///
    /// Fails if `input` selects the multiplexed converter or a GPIO other
    /// than the pin's own.
    pub fn from_config(pin: P, input: &InputConfig) -> Result<Self, ConfigurationError> {
        match *input {
            InputConfig::NativePin {
                gpio,
                reference_mv,
                resolution_bits,
            } => {
                if gpio != pin.gpio() {
                    return Err(ConfigurationError::PinMismatch {
                        configured: gpio,
                        actual: pin.gpio(),
                    });
                }
                Ok(Self::with_scaling(pin, reference_mv, resolution_bits))
            }
            InputConfig::Multiplexed { .. } => Err(ConfigurationError::InputModeMismatch),
        }
    }

    /// Convert a raw count to millivolts.
    #[inline]
    pub fn raw_to_mv(&self, raw: u16) -> f32 {
        (raw as f32 / self.max_count) * self.reference_mv
    }

    /// Access the pin.
    pub fn pin(&self) -> &P {
        &self.pin
    }

    /// Mutable access to the pin.
    pub fn pin_mut(&mut self) -> &mut P {
        &mut self.pin
    }
}

impl<P: AnalogPin> VoltageSource for NativeAdcSource<P> {
    fn read_mv(&mut self) -> Result<f32, AcquisitionError> {
        let gpio = self.pin.gpio();
        let raw = self
            .pin
            .read_raw()
            .map_err(|_| AcquisitionError::PinFault { pin: gpio })?;
        Ok(self.raw_to_mv(raw))
    }

    fn full_scale_mv(&self) -> f32 {
        self.reference_mv
    }
}

// ============================================================================
// Either variant
// ============================================================================

/// A voltage source whose variant is chosen once, at construction.
#[derive(Debug)]
pub enum AnySource<A: MultiplexedAdc, P: AnalogPin> {
    /// External multiplexed converter channel.
    Multiplexed(MuxAdcSource<A>),
    /// Native analog pin.
    Native(NativeAdcSource<P>),
}

impl<A: MultiplexedAdc, P: AnalogPin> AnySource<A, P> {
    /// Build the multiplexed variant from configuration.
    ///
    /// See [`MuxAdcSource::from_config`].
    pub fn multiplexed(adc: A, input: &InputConfig) -> Result<Self, ConfigurationError> {
        MuxAdcSource::from_config(adc, input).map(AnySource::Multiplexed)
    }

    /// Build the native-pin variant from configuration.
    ///
    /// See [`NativeAdcSource::from_config`].
    pub fn native(pin: P, input: &InputConfig) -> Result<Self, ConfigurationError> {
        NativeAdcSource::from_config(pin, input).map(AnySource::Native)
    }

    /// Returns true for the multiplexed-converter variant.
    pub fn is_multiplexed(&self) -> bool {
        matches!(self, AnySource::Multiplexed(_))
    }
}

impl<A: MultiplexedAdc, P: AnalogPin> VoltageSource for AnySource<A, P> {
    fn read_mv(&mut self) -> Result<f32, AcquisitionError> {
        match self {
            AnySource::Multiplexed(s) => s.read_mv(),
            AnySource::Native(s) => s.read_mv(),
        }
    }

    fn full_scale_mv(&self) -> f32 {
        match self {
            AnySource::Multiplexed(s) => s.full_scale_mv(),
            AnySource::Native(s) => s.full_scale_mv(),
        }
    }

    fn input_range(&self) -> InputRange {
        match self {
            AnySource::Multiplexed(s) => s.input_range(),
            AnySource::Native(s) => s.input_range(),
        }
    }
}
