//! pH probe input on the ESP32 on-chip ADC.
//!
//! The probe amplifier output goes to GPIO3 (ADC1, channel 3 on the C3).
//! ADC2 is shared with the radio and is not used.
//!
//! With 11 dB attenuation the usable input range is roughly 0-3100 mV, so
//! build the voltage source from [`PROBE_INPUT`]:
//!
//! ```ignore
//! use ph_meter::hal::esp32::{adc, Esp32AnalogPin};
//! use ph_meter::NativeAdcSource;
//!
//! let adc1 = AdcDriver::new(peripherals.adc1)?;
//! let pin = Esp32AnalogPin::new(&adc1, peripherals.pins.gpio3)?;
//! let source = NativeAdcSource::from_config(pin, &adc::PROBE_INPUT)?;
//! ```

use crate::config::InputConfig;
use crate::traits::AnalogPin;
use esp_idf_hal::adc::attenuation::DB_11;
use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::adc::ADC1;
use esp_idf_hal::gpio::Gpio3;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::sys::EspError;

/// Input range at 11 dB attenuation, in millivolts.
pub const FULL_SCALE_MV: f32 = 3100.0;

/// One-shot conversion width.
pub const RESOLUTION_BITS: u8 = 12;

/// GPIO number of the probe input.
pub const PROBE_GPIO: u8 = 3;

/// Input configuration for the probe on GPIO3.
pub const PROBE_INPUT: InputConfig = InputConfig::NativePin {
    gpio: PROBE_GPIO,
    reference_mv: FULL_SCALE_MV,
    resolution_bits: RESOLUTION_BITS,
};

/// Probe input channel on GPIO3.
pub struct Esp32AnalogPin<'d> {
    channel: AdcChannelDriver<'d, Gpio3, &'d AdcDriver<'d, ADC1>>,
}

impl<'d> Esp32AnalogPin<'d> {
    /// Configures GPIO3 as an ADC1 input.
    ///
    /// # Errors
    ///
    /// Returns an error if ADC channel initialization fails.
    pub fn new(
        adc: &'d AdcDriver<'d, ADC1>,
        pin: impl Peripheral<P = Gpio3> + 'd,
    ) -> Result<Self, EspError> {
        let config = AdcChannelConfig {
            attenuation: DB_11,
            ..Default::default()
        };
        let channel = AdcChannelDriver::new(adc, pin, &config)?;
        Ok(Self { channel })
    }
}

impl AnalogPin for Esp32AnalogPin<'_> {
    type Error = EspError;

    fn read_raw(&mut self) -> Result<u16, EspError> {
        self.channel.read_raw()
    }

    fn gpio(&self) -> u8 {
        PROBE_GPIO
    }
}
