//! Parameters structure for AttCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Attitude control.
#[derive(Debug, Default, Deserialize)]
pub struct Params {

    // ---- GAINS ----

    /// Attitude error proportional gain about the body [roll, pitch, yaw]
    /// axes.
    ///
    /// The yaw entry is only used relative to the roll/pitch entries when
    /// building the yaw blend weight, the gain actually applied about yaw is
    /// the roll/pitch average.
    ///
    /// Units: 1/second
    pub att_p: [f64; 3],

    // ---- CAPABILITIES ----

    /// Maximum rate setpoint magnitude per axis in manual flight modes.
    ///
    /// Units: radians/second
    pub rate_max_manual_rads: [f64; 3],

    /// Maximum rate setpoint magnitude per axis in autonomous flight modes.
    ///
    /// Units: radians/second
    pub rate_max_auto_rads: [f64; 3],
}
