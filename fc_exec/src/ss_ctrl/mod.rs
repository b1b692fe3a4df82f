//! State-space control module
//!
//! A linear full-state-feedback regulator for altitude hold. The vehicle is
//! modelled around hover as a double integrator per axis, the feedback gain
//! closes the loop on the full eight-element state and the model is
//! propagated one Euler step per cycle for telemetry. The mission sequencer
//! decides when the regulator runs and which reference it tracks.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod model;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use model::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Upper bound on an upward acceleration observation accepted by the thrust
/// ceiling adaptation.
///
/// Units: meters/second^2
pub const ACCEL_OBS_MAX_MS2: f64 = 40.0;
