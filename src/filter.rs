//! Noise reduction for voltage samples and computed pH.

use heapless::Deque;

/// Largest supported rolling-average window.
pub const MAX_SMOOTHING_WINDOW: usize = 16;

/// Default rolling-average window.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Rolling mean over the most recent `window` samples.
///
/// Until the window fills, the mean covers however many samples have been
/// pushed.
///
/// # Example
///
/// ```rust
/// use ph_meter::filter::RollingAverage;
///
/// let mut avg = RollingAverage::new(3);
/// assert_eq!(avg.push(3.0), 3.0);
/// assert_eq!(avg.push(6.0), 4.5);
/// assert_eq!(avg.push(9.0), 6.0);
/// assert_eq!(avg.push(12.0), 9.0); // 3.0 dropped
/// ```
#[derive(Clone, Debug)]
pub struct RollingAverage {
    samples: Deque<f32, MAX_SMOOTHING_WINDOW>,
    window: usize,
}

impl RollingAverage {
    /// Create an empty window. `window` is clamped to `1..=MAX_SMOOTHING_WINDOW`.
    pub fn new(window: usize) -> Self {
        Self {
            samples: Deque::new(),
            window: window.clamp(1, MAX_SMOOTHING_WINDOW),
        }
    }

    /// Add a sample and return the new mean.
    pub fn push(&mut self, value: f32) -> f32 {
        while self.samples.len() >= self.window {
            self.samples.pop_front();
        }
        // Cannot fail: at least one slot was freed above.
        let _ = self.samples.push_back(value);
        self.mean().unwrap_or(value)
    }

    /// Mean of the buffered samples, if any.
    pub fn mean(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f32 = self.samples.iter().sum();
        Some(sum / self.samples.len() as f32)
    }

    /// Configured window length.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if no samples are buffered.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop all buffered samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for RollingAverage {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_WINDOW)
    }
}

/// Exponential smoothing `y = alpha * x + (1 - alpha) * y`.
///
/// The first value passes through unchanged.
#[derive(Clone, Copy, Debug)]
pub struct ExponentialSmoother {
    alpha: f32,
    state: Option<f32>,
}

impl ExponentialSmoother {
    /// Create a smoother. `alpha` is clamped to `(0, 1]`.
    pub fn new(alpha: f32) -> Self {
        let alpha = if alpha > 0.0 { alpha.min(1.0) } else { 1.0 };
        Self { alpha, state: None }
    }

    /// Feed a value and return the smoothed value.
    pub fn update(&mut self, value: f32) -> f32 {
        let next = match self.state {
            None => value,
            Some(prev) => self.alpha * value + (1.0 - self.alpha) * prev,
        };
        self.state = Some(next);
        next
    }

    /// Forget history.
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Smoothing factor.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // RollingAverage Tests
    // =========================================================================

    #[test]
    fn rolling_average_window_clamped() {
        assert_eq!(RollingAverage::new(0).window(), 1);
        assert_eq!(RollingAverage::new(100).window(), MAX_SMOOTHING_WINDOW);
        assert_eq!(RollingAverage::default().window(), DEFAULT_SMOOTHING_WINDOW);
    }

    #[test]
    fn rolling_average_empty() {
        let avg = RollingAverage::new(4);
        assert!(avg.is_empty());
        assert_eq!(avg.mean(), None);
    }

    #[test]
    fn rolling_average_drops_oldest() {
        let mut avg = RollingAverage::new(2);
        avg.push(100.0);
        avg.push(200.0);
        assert_eq!(avg.push(400.0), 300.0);
        assert_eq!(avg.len(), 2);
    }

    #[test]
    fn rolling_average_window_of_one_is_passthrough() {
        let mut avg = RollingAverage::new(1);
        assert_eq!(avg.push(12.5), 12.5);
        assert_eq!(avg.push(-3.0), -3.0);
    }

    #[test]
    fn rolling_average_clear() {
        let mut avg = RollingAverage::new(3);
        avg.push(1.0);
        avg.push(2.0);
        avg.clear();
        assert!(avg.is_empty());
        assert_eq!(avg.push(9.0), 9.0);
    }

    #[test]
    fn rolling_average_constant_input() {
        let mut avg = RollingAverage::new(5);
        for _ in 0..20 {
            assert!((avg.push(199.3) - 199.3).abs() < 1e-4);
        }
    }

    // =========================================================================
    // ExponentialSmoother Tests
    // =========================================================================

    #[test]
    fn smoother_first_value_passthrough() {
        let mut s = ExponentialSmoother::new(0.2);
        assert_eq!(s.update(7.0), 7.0);
    }

    #[test]
    fn smoother_moves_toward_input() {
        let mut s = ExponentialSmoother::new(0.2);
        s.update(7.0);
        let next = s.update(8.0);
        assert!((next - 7.2).abs() < 1e-5);
    }

    #[test]
    fn smoother_alpha_clamped() {
        assert_eq!(ExponentialSmoother::new(0.0).alpha(), 1.0);
        assert_eq!(ExponentialSmoother::new(3.0).alpha(), 1.0);
    }

    #[test]
    fn smoother_reset() {
        let mut s = ExponentialSmoother::new(0.5);
        s.update(1.0);
        s.reset();
        assert_eq!(s.update(10.0), 10.0);
    }
}
