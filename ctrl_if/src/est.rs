//! # State estimate types

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The per-step measurement snapshot consumed by the control core.
///
/// Both control paths read the same snapshot within one step. All quantities
/// are already bias/scale corrected by the estimation side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StateEstimate {
    /// Estimated attitude, rotating body-frame vectors into the world frame.
    ///
    /// Expected to be unit norm, scalar-first at the serialisation boundary.
    /// Consumers renormalise before any use that assumes unit norm.
    pub q: UnitQuaternion<f64>,

    /// Body-frame angular rate.
    ///
    /// Units: radians/second
    pub rates_rads: Vector3<f64>,

    /// Vertical position, down positive.
    ///
    /// Units: meters
    pub pos_z_m: f64,

    /// Vertical velocity, down positive.
    ///
    /// Units: meters/second
    pub vel_z_ms: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StateEstimate {
    /// Altitude above the origin, up positive.
    ///
    /// Units: meters
    pub fn alt_m(&self) -> f64 {
        -self.pos_z_m
    }

    /// Climb rate, up positive.
    ///
    /// Units: meters/second
    pub fn climb_rate_ms(&self) -> f64 {
        -self.vel_z_ms
    }
}

impl Default for StateEstimate {
    fn default() -> Self {
        Self {
            q: UnitQuaternion::identity(),
            rates_rads: Vector3::zeros(),
            pos_z_m: 0.0,
            vel_z_ms: 0.0,
        }
    }
}
