//! Plant model and feedback gain for the state-space regulator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{MatrixMN, VectorN, U4, U8};

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// The model state, [altitude, roll, pitch, yaw, climb rate, roll rate,
/// pitch rate, yaw rate].
pub type StateVec = VectorN<f64, U8>;

/// A regulator-input-shaped vector, [thrust, roll moment, pitch moment,
/// yaw moment].
pub type CtrlVec = VectorN<f64, U4>;

/// A model-output-shaped vector, [altitude, roll, pitch, yaw].
pub type OutputVec = VectorN<f64, U4>;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Full-state feedback gain entries, row major with one row per input
/// channel. Designed offline against the hover-linearised plant.
const K_GAIN: [[f64; 8]; 4] = [
    [3.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0],
    [0.0, 1.48, -0.3884, -0.3751, 0.0, 0.5151, -0.0914, -0.065],
    [0.0, 0.1841, 1.696, -0.0133, 0.0, 0.0709, 0.5454, 0.014],
    [0.0, 0.9353, 0.6032, 5.4446, 0.0, 0.0915, 0.1529, 2.1972],
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The hover-linearised plant model with its feedback gain.
///
/// Altitude and the three attitude angles integrate their rates, the rates
/// are driven by the inputs through the inverse inertial terms. Gravity and
/// hover thrust cancel in the linearisation so the thrust input is the
/// deviation from hover.
#[derive(Debug, Clone, Copy)]
pub struct StateSpaceModel {
    /// System matrix.
    pub a: MatrixMN<f64, U8, U8>,

    /// Input matrix.
    pub b: MatrixMN<f64, U8, U4>,

    /// Output matrix, selects the four regulated states.
    pub c: MatrixMN<f64, U4, U8>,

    /// Full-state feedback gain.
    pub k: MatrixMN<f64, U4, U8>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StateSpaceModel {
    /// Build the model for a vehicle of the given mass and body-axis
    /// moments of inertia.
    pub fn new(mass_kg: f64, inertia_kgm2: [f64; 3]) -> Self {
        let mut a = MatrixMN::<f64, U8, U8>::zeros();
        for i in 0..4 {
            a[(i, i + 4)] = 1.0;
        }

        let mut b = MatrixMN::<f64, U8, U4>::zeros();
        b[(4, 0)] = 1.0 / mass_kg;
        b[(5, 1)] = 1.0 / inertia_kgm2[0];
        b[(6, 2)] = 1.0 / inertia_kgm2[1];
        b[(7, 3)] = 1.0 / inertia_kgm2[2];

        let mut c = MatrixMN::<f64, U4, U8>::zeros();
        for i in 0..4 {
            c[(i, i)] = 1.0;
        }

        let k = MatrixMN::<f64, U4, U8>::from_fn(|row, col| K_GAIN[row][col]);

        Self { a, b, c, k }
    }

    /// Regulator input for the given state and reference, `u = r - K x`.
    pub fn feedback(&self, x: &StateVec, r: &CtrlVec) -> CtrlVec {
        r - self.k * x
    }

    /// Advance the model state one Euler step under the given input.
    pub fn propagate(&self, x: &StateVec, u: &CtrlVec, dt_s: f64) -> StateVec {
        x + (self.a * x + self.b * u) * dt_s
    }

    /// Model output for the given state.
    pub fn output(&self, x: &StateVec) -> OutputVec {
        self.c * x
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
