//! # Actuator-side types
//!
//! Control efforts, actuator demands, and the rate-controller telemetry
//! produced each step for observability.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Normalised control effort, the shared output contract of both control
/// laws.
///
/// Produced fresh every step, then passed through the output normaliser
/// before leaving the core as an [`ActuatorDems`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ControlEffort {
    /// Normalised torque demand about the body roll/pitch/yaw axes, nominal
    /// range [-1, 1] per axis.
    pub torque_norm: Vector3<f64>,

    /// Normalised collective thrust demand, nominal range [0, 1].
    pub thrust_norm: f64,
}

/// The actuator schema leaving the control core towards the mixer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActuatorDems {
    /// Normalised torque demand about the body roll/pitch/yaw axes.
    pub torque_norm: Vector3<f64>,

    /// Normalised collective thrust demand.
    pub thrust_norm: f64,

    /// Landing gear demand.
    pub gear: GearState,
}

/// Actuator saturation flags reported back by the mixing stage.
///
/// Supplied externally and consumed read-only by the anti-windup logic.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SaturationStatus {
    pub roll_pos: bool,
    pub roll_neg: bool,
    pub pitch_pos: bool,
    pub pitch_neg: bool,
    pub yaw_pos: bool,
    pub yaw_neg: bool,
}

/// Rate-controller telemetry published every step.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RateCtrlStatus {
    /// The rate measurement used on the last step.
    ///
    /// Units: radians/second
    pub rates_meas_rads: Vector3<f64>,

    /// The integrator state after the last step.
    pub rates_int: Vector3<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Landing gear demand state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GearState {
    Down,
    Up,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SaturationStatus {
    /// True if any axis is saturated in either direction.
    pub fn any(&self) -> bool {
        self.roll_pos
            || self.roll_neg
            || self.pitch_pos
            || self.pitch_neg
            || self.yaw_pos
            || self.yaw_neg
    }

    /// Saturation flags for one axis (0 = roll, 1 = pitch, 2 = yaw) as a
    /// (positive, negative) pair.
    pub fn axis(&self, i: usize) -> (bool, bool) {
        match i {
            0 => (self.roll_pos, self.roll_neg),
            1 => (self.pitch_pos, self.pitch_neg),
            _ => (self.yaw_pos, self.yaw_neg),
        }
    }
}

impl Default for ActuatorDems {
    fn default() -> Self {
        Self {
            torque_norm: Vector3::zeros(),
            thrust_norm: 0.0,
            gear: GearState::Down,
        }
    }
}

impl Default for GearState {
    fn default() -> Self {
        GearState::Down
    }
}
