//! Attitude control module
//!
//! Converts an attitude setpoint into a body rate setpoint using a
//! quaternion-error law. Tilt (roll/pitch) errors are corrected along the
//! shortest path while yaw correction is blended in with a reduced priority,
//! so a large heading error never steals tilt authority.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Threshold on the x/y elements of the tilt quaternion above which the two
/// z-axes are considered anti-parallel and the yaw blend is skipped.
pub const TILT_SINGULARITY_EPS: f64 = 1.0e-5;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during AttCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum AttCtrlError {
    #[error("Attitude control processed while the attitude loop is disabled")]
    AttLoopDisabled,
}
