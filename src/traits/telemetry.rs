//! Output traits for publishing readings to the host runtime.
//!
//! The measurement pipeline pushes values into sinks. What a sink does with
//! them is up to the host.
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`SensorSink`] | Numeric reading (pH, voltage, slope, temperature) |
//! | [`TextSink`] | Enumerated text reading (probe status) |

/// Numeric telemetry output.
///
/// Values arrive already rounded to the output's accuracy.
pub trait SensorSink {
    /// Publish a new reading.
    fn publish(&mut self, value: f32);
}

/// Text telemetry output.
pub trait TextSink {
    /// Publish a new text state.
    fn publish_text(&mut self, text: &str);
}

impl<S: SensorSink + ?Sized> SensorSink for &mut S {
    fn publish(&mut self, value: f32) {
        (**self).publish(value)
    }
}

impl<T: TextSink + ?Sized> TextSink for &mut T {
    fn publish_text(&mut self, text: &str) {
        (**self).publish_text(text)
    }
}
