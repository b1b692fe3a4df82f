//! Plant simulation
//!
//! A rigid body stand-in for the vehicle so the executable can close the
//! control loop without hardware. The dynamics match the hover-linearised
//! model the state-space regulator is designed against, a double integrator
//! per axis with thrust acting along the body z-axis, plus a hard ground
//! plane. Higher fidelity than the regulator's own model is deliberately not
//! attempted.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

// Internal
use ctrl_if::{act::ActuatorDems, est::StateEstimate};
use util::{
    archive::{Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Plant simulation module state
#[derive(Default)]
pub struct Sim {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    /// Simulated attitude.
    q: UnitQuaternion<f64>,

    /// Simulated body rates.
    ///
    /// Units: radians/second
    rates_rads: Vector3<f64>,

    /// Simulated vertical position, down positive.
    ///
    /// Units: meters
    pos_z_m: f64,

    /// Simulated vertical velocity, down positive.
    ///
    /// Units: meters/second
    vel_z_ms: f64,

    pub(crate) output: Option<StateEstimate>,
    arch_output: Archiver,
}

/// Parameters for the Plant simulation.
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

    // ---- ACTUATION ----

    /// Collective thrust produced at a normalised thrust demand of one.
    ///
    /// Units: Newtons
    pub thrust_max_n: f64,

    /// Body moment about [roll, pitch, yaw] at a normalised torque demand of
    /// one.
    ///
    /// Units: Newton meters
    pub moment_max_nm: [f64; 3],

    // ---- INITIAL STATE ----

    /// Altitude the vehicle starts at.
    ///
    /// Units: meters
    pub initial_alt_m: f64,

    // ---- LAND DETECTION ----

    /// Altitude below which the vehicle is considered landed when also slow.
    ///
    /// Units: meters
    pub landed_alt_m: f64,

    /// Altitude below which ground contact is suspected.
    ///
    /// Units: meters
    pub maybe_landed_alt_m: f64,

    /// Vertical speed below which the vehicle is considered at rest.
    ///
    /// Units: meters/second
    pub landed_vel_ms: f64,
}

/// Input data to the Plant simulation.
#[derive(Clone, Copy, Default)]
pub struct InputData {
    /// The actuator demands issued by the control core this step.
    pub dems: ActuatorDems,

    /// Inter-sample period, already clamped by the executor.
    ///
    /// Units: seconds
    pub dt_s: f64,
}

/// Status report for Sim processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// The vehicle is at rest on the ground.
    pub landed: bool,

    /// Ground contact is suspected but the vehicle is still moving.
    pub maybe_landed: bool,

    /// Simulated altitude, up positive.
    ///
    /// Units: meters
    pub alt_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during Sim operation.
///
/// The plant always propagates, there are no variants.
#[derive(Debug, thiserror::Error)]
pub enum SimError {}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for Sim {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = StateEstimate;
    type StatusReport = StatusReport;
    type ProcError = SimError;

    /// Initialise the Sim module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        // Load the parameters
        self.params = match params::load(init_data) {
            Ok(p) => p,
            Err(e) => return Err(e)
        };

        self.apply_params();

        // Create the arch folder for sim
        let mut arch_path = session.arch_root.clone();
        arch_path.push("sim");
        std::fs::create_dir_all(arch_path).unwrap();

        // Initialise the archivers
        self.arch_report = Archiver::from_path(
            session, "sim/status_report.csv"
        ).unwrap();
        self.arch_output = Archiver::from_path(
            session, "sim/vehicle_state.csv"
        ).unwrap();

        Ok(())
    }

    /// Perform cyclic processing of the Plant simulation.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let dt_s = input_data.dt_s;
        let dems = input_data.dems;

        // Denormalise the demands back into physical actuation
        let thrust_n = dems.thrust_norm * self.params.thrust_max_n;
        let torque_nm = dems
            .torque_norm
            .component_mul(&Vector3::from(self.params.moment_max_nm));

        // Rotational dynamics
        let ang_acc = torque_nm.component_div(&Vector3::from(self.params.inertia_kgm2));
        self.rates_rads += ang_acc * dt_s;
        self.q *= UnitQuaternion::from_scaled_axis(self.rates_rads * dt_s);

        // Vertical dynamics, down positive. Thrust acts along the body
        // z-axis so only its component along world down opposes gravity.
        let tilt_align = (self.q * Vector3::z()).dot(&Vector3::z());
        let acc_z_ms2 = self.params.gravity_ms2 - thrust_n * tilt_align / self.params.mass_kg;
        self.vel_z_ms += acc_z_ms2 * dt_s;
        self.pos_z_m += self.vel_z_ms * dt_s;

        // Hard ground plane, the gear takes any residual descent rate
        if self.pos_z_m >= 0.0 {
            self.pos_z_m = 0.0;
            if self.vel_z_ms > 0.0 {
                self.vel_z_ms = 0.0;
            }
            self.rates_rads = Vector3::zeros();
            self.q = UnitQuaternion::identity();
        }

        let alt_m = -self.pos_z_m;
        self.report = StatusReport {
            landed: alt_m < self.params.landed_alt_m
                && self.vel_z_ms.abs() < self.params.landed_vel_ms,
            maybe_landed: alt_m < self.params.maybe_landed_alt_m,
            alt_m,
        };

        let output = StateEstimate {
            q: self.q,
            rates_rads: self.rates_rads,
            pos_z_m: self.pos_z_m,
            vel_z_ms: self.vel_z_ms,
        };

        // Update the output in self
        self.output = Some(output);

        Ok((output, self.report))
    }
}

impl Archived for Sim {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report.serialise(self.report)?;
        self.arch_output.serialise(self.output)?;

        Ok(())
    }
}

impl Sim {
    /// Create a new instance with the given parameters and archiving
    /// disabled.
    ///
    /// Normal construction is `default()` followed by [`State::init`], this
    /// is for benchmarks which have no session to archive into.
    pub fn with_params(params: Params) -> Self {
        let mut sim = Self {
            params,
            ..Default::default()
        };
        sim.apply_params();
        sim
    }

    /// Seed the plant state from the loaded parameters.
    fn apply_params(&mut self) {
        self.pos_z_m = -self.params.initial_alt_m;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
