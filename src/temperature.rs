//! Ambient temperature for slope compensation and display.
//!
//! Compensation always works in Celsius. [`TemperatureUnit`] only affects the
//! optional temperature output.

use num_traits::float::FloatCore;

use crate::traits::TemperatureSensor;

/// Reference temperature of a calibrated slope, in Celsius.
pub const REFERENCE_TEMP_C: f32 = 25.0;

/// Offset between Celsius and Kelvin.
pub const KELVIN_OFFSET: f32 = 273.15;

/// Temperature assumed when no sensor is bound.
pub const DEFAULT_TEMPERATURE_C: f32 = REFERENCE_TEMP_C;

/// Nernstian scale factor `(273.15 + t) / (273.15 + 25)`.
///
/// Exactly `1.0` at the reference temperature.
///
/// # Examples
///
/// ```
/// use ph_meter::temperature::nernst_factor;
///
/// assert_eq!(nernst_factor(25.0), 1.0);
/// assert!(nernst_factor(35.0) > 1.0);
/// ```
#[inline]
pub fn nernst_factor(celsius: f32) -> f32 {
    if celsius == REFERENCE_TEMP_C {
        return 1.0;
    }
    (celsius + KELVIN_OFFSET) / (REFERENCE_TEMP_C + KELVIN_OFFSET)
}

/// Returns true for a finite temperature above absolute zero.
///
/// ```
/// use ph_meter::temperature::is_physical;
///
/// assert!(is_physical(-40.0));
/// assert!(!is_physical(-273.15));
/// assert!(!is_physical(f32::NAN));
/// ```
#[inline]
pub fn is_physical(celsius: f32) -> bool {
    FloatCore::is_finite(celsius) && celsius > -KELVIN_OFFSET
}

/// Scale a slope committed at 25 °C to `celsius`.
#[inline]
pub fn compensate_slope(slope_mv_per_ph: f32, celsius: f32) -> f32 {
    slope_mv_per_ph * nernst_factor(celsius)
}

/// Display unit for the temperature output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TemperatureUnit {
    /// Degrees Celsius.
    #[default]
    Celsius,
    /// Degrees Fahrenheit.
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a Celsius value into this unit.
    ///
    /// # Examples
    ///
    /// ```
    /// use ph_meter::TemperatureUnit;
    ///
    /// assert_eq!(TemperatureUnit::Celsius.from_celsius(25.0), 25.0);
    /// assert_eq!(TemperatureUnit::Fahrenheit.from_celsius(100.0), 212.0);
    /// ```
    #[inline]
    pub fn from_celsius(&self, celsius: f32) -> f32 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    /// Unit symbol.
    pub const fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    /// Parse `"celsius"`/`"c"` or `"fahrenheit"`/`"f"`, case-insensitive.
    pub fn from_text(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("celsius") || s.eq_ignore_ascii_case("c") {
            Some(TemperatureUnit::Celsius)
        } else if s.eq_ignore_ascii_case("fahrenheit") || s.eq_ignore_ascii_case("f") {
            Some(TemperatureUnit::Fahrenheit)
        } else {
            None
        }
    }
}

/// Supplies the ambient temperature in Celsius. Never fails.
pub trait TemperatureProvider {
    /// Current temperature in Celsius.
    fn read_celsius(&mut self) -> f32;
}

/// Constant temperature, used when no sensor is bound.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedTemperature(pub f32);

impl Default for FixedTemperature {
    fn default() -> Self {
        Self(DEFAULT_TEMPERATURE_C)
    }
}

impl TemperatureProvider for FixedTemperature {
    fn read_celsius(&mut self) -> f32 {
        self.0
    }
}

/// A bound sensor with a fallback for when it has no reading yet.
///
/// Readings that are not finite or not above absolute zero are also
/// replaced by the fallback.
#[derive(Debug)]
pub struct SensorTemperature<S: TemperatureSensor> {
    sensor: S,
    fallback_c: f32,
}

impl<S: TemperatureSensor> SensorTemperature<S> {
    /// Wrap `sensor`, falling back to 25 °C.
    pub fn new(sensor: S) -> Self {
        Self::with_fallback(sensor, DEFAULT_TEMPERATURE_C)
    }

    /// Wrap `sensor` with an explicit fallback temperature.
    pub fn with_fallback(sensor: S, fallback_c: f32) -> Self {
        Self { sensor, fallback_c }
    }

    /// Access the sensor.
    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Mutable access to the sensor.
    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

impl<S: TemperatureSensor> TemperatureProvider for SensorTemperature<S> {
    fn read_celsius(&mut self) -> f32 {
        match self.sensor.latest_celsius() {
            Some(t) if is_physical(t) => t,
            _ => self.fallback_c,
        }
    }
}
