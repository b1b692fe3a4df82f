//! Parameters structure for SsCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for State-space control.
#[derive(Debug, Default, Deserialize)]
pub struct Params {

    // ---- PHYSICAL ----

    /// Vehicle mass.
    ///
    /// Units: kilograms
    pub mass_kg: f64,

    /// Body-axis moments of inertia [Ixx, Iyy, Izz].
    ///
    /// Units: kilogram meter^2
    pub inertia_kgm2: [f64; 3],

    /// Gravitational acceleration.
    ///
    /// Units: meters/second^2
    pub gravity_ms2: f64,

    // ---- OUTPUT NORMALISATION ----

    /// Initial estimate of the maximum collective thrust, the adaptation can
    /// raise this but never lower it.
    ///
    /// Units: Newtons
    pub thrust_max_init_n: f64,

    /// Maximum body moment about [roll, pitch, yaw] used to normalise the
    /// torque channels.
    ///
    /// Units: Newton meters
    pub moment_max_nm: [f64; 3],

    // ---- REGULATOR ----

    /// Scale from target altitude to the thrust-channel reference. Matched
    /// to the altitude feedback gain so the closed loop settles on the
    /// target with no steady-state offset.
    pub ref_alt_scale: f64,

    /// Enables the torque channels of the regulator output. With this off
    /// the regulator only commands thrust.
    pub angle_control: bool,
}

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("Mass and inertia must be positive: {0}")]
    NonPositiveInertial(String),

    #[error("Normalisation maxima must be positive: {0}")]
    NonPositiveMaxima(String),

    #[error("Gravity must be positive, got {0}")]
    NonPositiveGravity(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Determines if the parameters are valid.
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        if self.mass_kg <= 0.0 {
            return Err(ParamsError::NonPositiveInertial(format!(
                "mass is {} kg",
                self.mass_kg
            )));
        }

        for (i, inertia) in self.inertia_kgm2.iter().enumerate() {
            if *inertia <= 0.0 {
                return Err(ParamsError::NonPositiveInertial(format!(
                    "inertia axis {} is {} kg m^2",
                    i, inertia
                )));
            }
        }

        if self.thrust_max_init_n <= 0.0 {
            return Err(ParamsError::NonPositiveMaxima(format!(
                "initial thrust ceiling is {} N",
                self.thrust_max_init_n
            )));
        }

        for (i, moment) in self.moment_max_nm.iter().enumerate() {
            if *moment <= 0.0 {
                return Err(ParamsError::NonPositiveMaxima(format!(
                    "moment axis {} is {} N m",
                    i, moment
                )));
            }
        }

        if self.gravity_ms2 <= 0.0 {
            return Err(ParamsError::NonPositiveGravity(self.gravity_ms2));
        }

        Ok(())
    }
}
