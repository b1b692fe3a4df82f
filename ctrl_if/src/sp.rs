//! # Setpoint and mode types

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An attitude setpoint from the guidance layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AttSetpoint {
    /// Desired attitude.
    ///
    /// Expected to be unit norm, consumers renormalise before use.
    pub q_d: UnitQuaternion<f64>,

    /// Feed-forward rotation rate about the world z-axis.
    ///
    /// Units: radians/second
    pub yaw_rate_ff_rads: f64,

    /// Normalised collective thrust setpoint, [0, 1].
    pub thrust_norm: f64,
}

/// A direct body-rate setpoint, used when the attitude loop is bypassed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateSetpoint {
    /// Body-frame rate setpoint.
    ///
    /// Units: radians/second
    pub rates_rads: Vector3<f64>,

    /// Normalised collective thrust setpoint, [0, 1].
    pub thrust_norm: f64,
}

/// Arm and flight-mode flags consumed by the control core.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CtrlMode {
    /// Vehicle is armed.
    pub armed: bool,

    /// The rate control loop shall run.
    pub rate_ctrl_enabled: bool,

    /// The attitude loop shall run (when false a direct rate setpoint is
    /// expected instead of an attitude setpoint).
    pub att_ctrl_enabled: bool,

    /// Pilot-manual mode, selects the tighter rate-limit set.
    pub manual: bool,

    /// The vehicle is operating as a rotary wing (multirotor) platform.
    pub rotary_wing: bool,

    /// Flight termination: all demands are forced neutral while set.
    pub termination: bool,

    /// The control law evaluated this step.
    pub law: CtrlLaw,
}

/// Land-detector flags.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LandFlags {
    /// The vehicle is on the ground.
    pub landed: bool,

    /// The land detector suspects ground contact but is not yet certain.
    pub maybe_landed: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Selector between the two control laws.
///
/// The selection is made once per step and the two paths never interleave
/// within a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CtrlLaw {
    /// Quaternion attitude error + PID rate loop.
    RatePid,

    /// Linear full-state-feedback altitude-hold regulator.
    StateSpace,
}

/// Operator landing-gear switch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GearSwitch {
    Down,
    Up,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for AttSetpoint {
    fn default() -> Self {
        Self {
            q_d: UnitQuaternion::identity(),
            yaw_rate_ff_rads: 0.0,
            thrust_norm: 0.0,
        }
    }
}

impl Default for RateSetpoint {
    fn default() -> Self {
        Self {
            rates_rads: Vector3::zeros(),
            thrust_norm: 0.0,
        }
    }
}

impl Default for CtrlMode {
    fn default() -> Self {
        Self {
            armed: false,
            rate_ctrl_enabled: false,
            att_ctrl_enabled: false,
            manual: false,
            rotary_wing: true,
            termination: false,
            law: CtrlLaw::RatePid,
        }
    }
}

impl Default for GearSwitch {
    fn default() -> Self {
        GearSwitch::Down
    }
}
