//! Parameters structure for the Mission sequencer

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One step of the climb table.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MissionPhase {
    /// Target altitude held during this phase.
    ///
    /// Units: meters
    pub alt_m: f64,

    /// Time spent in this phase.
    ///
    /// Units: seconds
    pub duration_s: f64,
}

/// Parameters for the Mission sequencer.
#[derive(Debug, Default, Deserialize)]
pub struct Params {

    // ---- FLIGHT PLAN ----

    /// Duration of the initial hold during which feedback runs but the
    /// output stays suppressed.
    ///
    /// Units: seconds
    pub hold_duration_s: f64,

    /// Climb phases executed in order once the hold completes.
    pub phases: Vec<MissionPhase>,

    // ---- RETURN DESCENT ----

    /// Ratio applied to the descent target at each decay, must be in (0, 1).
    pub return_decay_ratio: f64,

    /// Descent target below which the target snaps to zero.
    ///
    /// Units: meters
    pub min_target_alt_m: f64,

    /// Altitude below which the output is suppressed during the descent.
    ///
    /// Units: meters
    pub ground_proximity_m: f64,

    // ---- SAFETY ----

    /// Bound on the mission clock beyond which sequencing disables entirely.
    ///
    /// Units: seconds
    pub safety_timeout_s: f64,
}

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("The return decay ratio must be in (0, 1), got {0}")]
    DecayRatioOutOfRange(f64),

    #[error("Phase durations must be positive, got {0}")]
    NonPositiveDuration(f64),

    #[error("Climb phase {0} has a negative target altitude")]
    NegativeTargetAlt(usize),

    #[error("The safety timeout must be positive, got {0}")]
    NonPositiveTimeout(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Determines if the parameters are valid.
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        if !(self.return_decay_ratio > 0.0 && self.return_decay_ratio < 1.0) {
            return Err(ParamsError::DecayRatioOutOfRange(self.return_decay_ratio));
        }

        if self.hold_duration_s < 0.0 {
            return Err(ParamsError::NonPositiveDuration(self.hold_duration_s));
        }

        for (i, phase) in self.phases.iter().enumerate() {
            if phase.duration_s <= 0.0 {
                return Err(ParamsError::NonPositiveDuration(phase.duration_s));
            }
            if phase.alt_m < 0.0 {
                return Err(ParamsError::NegativeTargetAlt(i));
            }
        }

        if self.safety_timeout_s <= 0.0 {
            return Err(ParamsError::NonPositiveTimeout(self.safety_timeout_s));
        }

        Ok(())
    }
}
