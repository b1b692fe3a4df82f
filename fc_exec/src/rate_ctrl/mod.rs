//! Rate control module
//!
//! Closes the body-rate loop with a PID+feed-forward law, producing the
//! normalised torque demand for the mixer. The derivative term acts on a
//! low-pass filtered rate measurement and the proportional/integral/
//! derivative gains are attenuated at high throttle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod lpf;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use lpf::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Lower bound on the throttle-dependent gain attenuation factor.
pub const TPA_RATE_LOWER_LIMIT: f64 = 0.05;

/// Window after module start during which the loop rate estimate keeps
/// updating even while armed.
///
/// Units: seconds
pub const LOOP_RATE_STARTUP_WINDOW_S: f64 = 3.3;

/// Accumulation span feeding one loop rate estimate update.
///
/// Units: seconds
pub const LOOP_RATE_ACCUM_SPAN_S: f64 = 1.0;

/// Change in the configured D-term cutoff frequency above which the filter
/// is retuned and reset.
///
/// Units: Hertz
pub const D_TERM_RETUNE_THRESHOLD_HZ: f64 = 0.01;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during RateCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum RateCtrlError {
    #[error("Rate control processed while the rate loop is disabled")]
    RateLoopDisabled,
}
