//! Mission sequencer module
//!
//! Drives the state-space regulator through a fixed flight plan: an initial
//! hold with the output suppressed, a table of timed climb phases, then a
//! geometric descent back to the ground. A hard bound on the mission clock
//! disables the whole subsystem if the plan overruns.
//!
//! The sequencer is broken down into a number of phases:
//!
//! - `Idle` - Waiting for the vehicle to arm with the rate loop live.
//! - `Hold` - Feedback runs but the output is suppressed.
//! - `Climb` - Stepping through the climb table in order.
//! - `ReturnDescent` - Decaying the target altitude towards zero.
//! - `Disabled` - The safety timeout tripped, latched until re-init.

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
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during Mission operation.
#[derive(Debug, thiserror::Error)]
pub enum MissionError {
    #[error("Mission sequencing processed while the state-space law is not selected")]
    WrongLaw,
}
