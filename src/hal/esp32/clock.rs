//! ESP32 clock implementation using the ESP-IDF timer.

use crate::traits::Clock;

/// Milliseconds since boot from the ESP-IDF high-resolution timer.
///
/// # Example
///
/// ```ignore
/// use ph_meter::hal::esp32::Esp32Clock;
/// use ph_meter::traits::Clock;
///
/// let clock = Esp32Clock::new();
/// meter.poll(clock.now_ms());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Esp32Clock;

impl Esp32Clock {
    /// Creates a new ESP32 clock instance.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_ms(&self) -> u64 {
        // Microseconds since boot; reading the timer has no side effects.
        let micros = unsafe { esp_idf_hal::sys::esp_timer_get_time() };
        (micros / 1000) as u64
    }
}
