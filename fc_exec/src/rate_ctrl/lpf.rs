//! Single-pole low-pass filter for the rate measurement

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single-pole discrete low-pass filter over a three-axis sample.
///
/// A cutoff frequency of zero (or below) disables the filter, `apply` then
/// passes samples through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowPassFilter {
    /// The cutoff frequency the filter is currently tuned to.
    ///
    /// Units: Hertz
    cutoff_freq_hz: f64,

    /// Smoothing factor in (0, 1], derived from the sample and cutoff
    /// frequencies.
    alpha: f64,

    /// The filtered value after the last `apply`.
    state: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LowPassFilter {
    /// Create a new filter tuned to the given sample and cutoff frequencies,
    /// with zeroed state.
    pub fn new(sample_freq_hz: f64, cutoff_freq_hz: f64) -> Self {
        let mut filter = Self::default();
        filter.set_cutoff_frequency(sample_freq_hz, cutoff_freq_hz);
        filter
    }

    /// Retune the filter without touching its state.
    pub fn set_cutoff_frequency(&mut self, sample_freq_hz: f64, cutoff_freq_hz: f64) {
        self.cutoff_freq_hz = cutoff_freq_hz;

        if cutoff_freq_hz <= 0.0 || sample_freq_hz <= 0.0 {
            // Disabled, pass samples through unchanged
            self.alpha = 1.0;
            return;
        }

        let dt = 1.0 / sample_freq_hz;
        let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff_freq_hz);
        self.alpha = dt / (dt + rc);
    }

    /// Add a new raw sample and return the filtered value.
    pub fn apply(&mut self, sample: &Vector3<f64>) -> Vector3<f64> {
        self.state += (sample - self.state) * self.alpha;
        self.state
    }

    /// Force the filter state to the given sample.
    pub fn reset(&mut self, sample: &Vector3<f64>) {
        self.state = *sample;
    }

    /// The cutoff frequency the filter is currently tuned to.
    ///
    /// Units: Hertz
    pub fn get_cutoff_freq(&self) -> f64 {
        self.cutoff_freq_hz
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_sample_weight() {
        let mut filter = LowPassFilter::new(250.0, 30.0);

        let dt = 1.0 / 250.0;
        let rc = 1.0 / (2.0 * std::f64::consts::PI * 30.0);
        let alpha = dt / (dt + rc);

        let out = filter.apply(&Vector3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(out[0], alpha, epsilon = 1e-12);
    }

    #[test]
    fn test_converges_to_dc() {
        let mut filter = LowPassFilter::new(250.0, 30.0);

        let mut out = Vector3::zeros();
        for _ in 0..500 {
            out = filter.apply(&Vector3::new(2.0, -1.0, 0.5));
        }

        assert_relative_eq!(out, Vector3::new(2.0, -1.0, 0.5), epsilon = 1e-9);
    }

    #[test]
    fn test_zero_cutoff_passes_through() {
        let mut filter = LowPassFilter::new(250.0, 0.0);

        let sample = Vector3::new(3.0, -7.0, 0.1);
        assert_eq!(filter.apply(&sample), sample);
    }

    #[test]
    fn test_reset() {
        let mut filter = LowPassFilter::new(250.0, 30.0);

        for _ in 0..10 {
            filter.apply(&Vector3::new(5.0, 5.0, 5.0));
        }

        filter.reset(&Vector3::zeros());

        // After a reset the next output is weighted from the reset state, not
        // the old history
        let out = filter.apply(&Vector3::zeros());
        assert_relative_eq!(out, Vector3::zeros(), epsilon = 1e-12);
    }
}
