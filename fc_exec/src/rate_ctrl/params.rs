//! Parameters structure for RateCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Rate control.
#[derive(Debug, Default, Deserialize)]
pub struct Params {

    // ---- GAINS ----

    /// Rate error proportional gain about the body [roll, pitch, yaw] axes.
    pub rate_p: [f64; 3],

    /// Rate error integral gain about the body [roll, pitch, yaw] axes.
    pub rate_i: [f64; 3],

    /// Absolute bound on the integrator state per axis.
    pub rate_int_lim: [f64; 3],

    /// Rate derivative gain about the body [roll, pitch, yaw] axes.
    pub rate_d: [f64; 3],

    /// Rate setpoint feed-forward gain about the body [roll, pitch, yaw]
    /// axes.
    pub rate_ff: [f64; 3],

    // ---- THROTTLE PID ATTENUATION ----

    /// Throttle above which the P gain starts attenuating, [0, 1].
    pub tpa_breakpoint_p: f64,

    /// Throttle above which the I gain starts attenuating, [0, 1].
    pub tpa_breakpoint_i: f64,

    /// Throttle above which the D gain starts attenuating, [0, 1].
    pub tpa_breakpoint_d: f64,

    /// Attenuation rate of the P gain above its breakpoint.
    pub tpa_rate_p: f64,

    /// Attenuation rate of the I gain above its breakpoint.
    pub tpa_rate_i: f64,

    /// Attenuation rate of the D gain above its breakpoint.
    pub tpa_rate_d: f64,

    // ---- D-TERM FILTER ----

    /// Cutoff frequency of the D-term low-pass filter, zero disables the
    /// filter.
    ///
    /// Units: Hertz
    pub d_term_cutoff_freq_hz: f64,

    /// Loop rate estimate used before the online estimator settles.
    ///
    /// Units: Hertz
    pub initial_loop_rate_hz: f64,
}
