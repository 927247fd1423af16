//! Shared meter state for the tick loop and command handlers.
//!
//! `SharedMeter` serializes every mutation of a single [`PhMeter`] behind one
//! mutex, so calibration commands and measurement ticks never interleave.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ph_meter::services::SharedMeter;
//!
//! let shared = Arc::new(SharedMeter::new(meter));
//!
//! // Tick task
//! shared.poll();
//!
//! // Command handler
//! shared.dispatch(CalibrationAction::CalibratePh7)?;
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::acquisition::VoltageSource;
use crate::action::CalibrationAction;
use crate::calibration::CalibrationCoefficients;
use crate::error::Error;
use crate::meter::{MeterState, PhMeter};
use crate::pipeline::TickOutcome;
use crate::temperature::TemperatureProvider;
use crate::traits::{SensorSink, TextSink};

/// A meter shared between tasks.
///
/// # Thread Safety
///
/// - One `Mutex` guards the whole meter: ticks and calibration actions are
///   serialized, so a tick always sees fully committed coefficients.
/// - All timestamps come from the same `start_time`.
pub struct SharedMeter<V, P, S, T>
where
    V: VoltageSource,
    P: TemperatureProvider,
    S: SensorSink,
    T: TextSink,
{
    meter: Mutex<PhMeter<V, P, S, T>>,
    start_time: Instant,
}

impl<V, P, S, T> SharedMeter<V, P, S, T>
where
    V: VoltageSource,
    P: TemperatureProvider,
    S: SensorSink,
    T: TextSink,
{
    /// Wrap a meter. Its clock starts now.
    pub fn new(meter: PhMeter<V, P, S, T>) -> Self {
        Self {
            meter: Mutex::new(meter),
            start_time: Instant::now(),
        }
    }

    /// Milliseconds since creation.
    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    fn lock(&self) -> MutexGuard<'_, PhMeter<V, P, S, T>> {
        // Poisoning is ignored: meter state is valid between operations.
        self.meter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Access the meter with a mutable lock.
    ///
    /// The closure pattern prevents accidentally holding the lock across await points.
    pub fn with_meter<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut PhMeter<V, P, S, T>) -> R,
    {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Tick if the update interval has elapsed.
    pub fn poll(&self) -> Option<TickOutcome> {
        let now_ms = self.now_ms();
        self.lock().poll(now_ms)
    }

    /// Run a calibration action.
    pub fn dispatch(&self, action: CalibrationAction) -> Result<CalibrationCoefficients, Error> {
        let now_ms = self.now_ms();
        self.lock().dispatch(action, now_ms)
    }

    /// Turn calibration mode on or off.
    pub fn set_calibration_mode(&self, enabled: bool) {
        let now_ms = self.now_ms();
        self.lock().set_calibration_mode(enabled, now_ms);
    }

    /// State snapshot.
    pub fn state(&self) -> MeterState {
        self.lock().state()
    }
}
