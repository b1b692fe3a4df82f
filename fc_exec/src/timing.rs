//! Control loop timing
//!
//! The controllers integrate over the measured inter-sample period rather
//! than a nominal one, so a scheduling stall or a duplicated timestamp would
//! otherwise feed an absurd `dt` straight into the integrators. Every period
//! is clamped here before any module sees it.

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Smallest inter-sample period accepted by the control core.
///
/// Units: seconds
pub const DT_MIN_S: f64 = 0.0002;

/// Largest inter-sample period accepted by the control core.
///
/// Units: seconds
pub const DT_MAX_S: f64 = 0.02;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Clamp a raw inter-sample period into `[DT_MIN_S, DT_MAX_S]`.
///
/// Non-finite periods collapse to `DT_MIN_S`, so the value returned is always
/// finite, positive and usable as an integration step.
pub fn clamp_dt(raw_dt_s: f64) -> f64 {
    if !(raw_dt_s > DT_MIN_S) {
        DT_MIN_S
    } else if raw_dt_s > DT_MAX_S {
        DT_MAX_S
    } else {
        raw_dt_s
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp_dt() {
        // In-range periods pass through untouched
        assert_eq!(clamp_dt(0.004), 0.004);
        assert_eq!(clamp_dt(DT_MIN_S), DT_MIN_S);
        assert_eq!(clamp_dt(DT_MAX_S), DT_MAX_S);

        // Degenerate periods from duplicated or stalled timestamps
        assert_eq!(clamp_dt(1e-7), DT_MIN_S);
        assert_eq!(clamp_dt(0.0), DT_MIN_S);
        assert_eq!(clamp_dt(-1.0), DT_MIN_S);
        assert_eq!(clamp_dt(5.0), DT_MAX_S);

        // Non-finite periods never escape the clamp
        assert_eq!(clamp_dt(f64::NAN), DT_MIN_S);
        assert_eq!(clamp_dt(f64::INFINITY), DT_MAX_S);
        assert_eq!(clamp_dt(f64::NEG_INFINITY), DT_MIN_S);
    }
}
