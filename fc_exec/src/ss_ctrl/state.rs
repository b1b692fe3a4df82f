//! Implementations for the SsCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace};
use nalgebra::Vector3;
use serde::Serialize;
use thiserror::Error;

// Internal
use super::{CtrlVec, Params, StateSpaceModel, StateVec, ACCEL_OBS_MAX_MS2};
use crate::mission;
use ctrl_if::{act::ControlEffort, est::StateEstimate};
use util::{
    archive::{Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// State-space control module state
#[derive(Default)]
pub struct SsCtrl {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    /// Plant model and feedback gain, built once on first activation.
    model: Option<StateSpaceModel>,

    /// Model state kept propagated for telemetry.
    x: StateVec,

    /// Regulator reference, thrust channel first.
    r: CtrlVec,

    /// Adaptive ceiling on the available collective thrust.
    ///
    /// Units: Newtons
    t_max_n: f64,

    /// Altitude at the previous step.
    ///
    /// Units: meters
    last_alt_m: f64,

    /// Climb rate at the previous step.
    ///
    /// Units: meters/second
    last_climb_rate_ms: f64,

    pub(crate) output: Option<ControlEffort>,
    arch_output: Archiver,
}

/// Input data to State-space control.
#[derive(Clone, Copy, Default)]
pub struct InputData {
    /// The measurement snapshot for this step.
    pub est: StateEstimate,

    /// Commands from the mission sequencer for this step.
    pub mission: mission::OutputData,

    /// Inter-sample period, already clamped by the executor.
    ///
    /// Units: seconds
    pub dt_s: f64,
}

/// Status report for SsCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Unscaled regulator input, [thrust N, roll N m, pitch N m, yaw N m].
    pub u: [f64; 4],

    /// Model output after the last propagation, [altitude m, roll rad,
    /// pitch rad, yaw rad].
    pub y: [f64; 4],

    /// Current thrust ceiling.
    ///
    /// Units: Newtons
    pub thrust_max_n: f64,

    /// True when the normalised thrust demand left [0, 1].
    pub thrust_saturated: bool,

    /// Per-axis flags raised when the normalised torque demand left [-1, 1].
    pub torque_saturated: [bool; 3],
}

// ---------------------------------------------------------------------------
// ENUEMRATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Failed to load parameters: {0}")]
    ParamLoadError(params::LoadError),

    #[error("Loaded parameters are invalid: {0}")]
    ParamsInvalid(super::ParamsError),
}

#[derive(Debug, Error)]
pub enum ProcError {
    #[error("State-space control processed before the module was initialised")]
    NotInitialised,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for SsCtrl {
    type InitData = &'static str;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = ControlEffort;
    type StatusReport = StatusReport;
    type ProcError = ProcError;

    /// Initialise the SsCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        // Load the parameters
        self.params = match params::load(init_data) {
            Ok(p) => p,
            Err(e) => return Err(InitError::ParamLoadError(e))
        };

        // Check parameters are valid
        match self.params.are_valid() {
            Ok(_) => (),
            Err(e) => return Err(InitError::ParamsInvalid(e))
        }

        self.t_max_n = self.params.thrust_max_init_n;

        // Create the arch folder for ss_ctrl
        let mut arch_path = session.arch_root.clone();
        arch_path.push("ss_ctrl");
        std::fs::create_dir_all(arch_path).unwrap();

        // Initialise the archivers
        self.arch_report = Archiver::from_path(
            session, "ss_ctrl/status_report.csv"
        ).unwrap();
        self.arch_output = Archiver::from_path(
            session, "ss_ctrl/control_effort.csv"
        ).unwrap();

        Ok(())
    }

    /// Perform cyclic processing of State-space control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report
        self.report = StatusReport::default();
        self.report.thrust_max_n = self.t_max_n;

        let mission = input_data.mission;

        if !mission.regulator_active {
            // Regulator idle, demand neutral effort
            let output = ControlEffort::default();
            self.output = Some(output);
            return Ok((output, self.report));
        }

        // One-time setup on first activation
        let model = match self.model {
            Some(m) => m,
            None => {
                if self.params.mass_kg <= 0.0 {
                    return Err(ProcError::NotInitialised);
                }
                let m = StateSpaceModel::new(self.params.mass_kg, self.params.inertia_kgm2);
                self.model = Some(m);
                m
            }
        };

        // Consume the one-shot reference update
        if mission.update_reference {
            self.r = CtrlVec::zeros();
            self.r[0] = self.params.ref_alt_scale * mission.target_alt_m;
            info!(
                "SsCtrl reference rebuilt for target altitude {:.2} m",
                mission.target_alt_m
            );
        }

        // Re-seed the model state from the measurement snapshot
        let (roll, pitch, yaw) = input_data.est.q.euler_angles();
        let mut x = StateVec::zeros();
        x[0] = input_data.est.alt_m();
        x[1] = roll;
        x[2] = pitch;
        x[3] = yaw;
        x[4] = input_data.est.climb_rate_ms();
        x[5] = input_data.est.rates_rads[0];
        x[6] = input_data.est.rates_rads[1];
        x[7] = input_data.est.rates_rads[2];

        let u = model.feedback(&x, &self.r);
        self.x = model.propagate(&x, &u, input_data.dt_s);
        let y = model.output(&self.x);

        self.report.u = [u[0], u[1], u[2], u[3]];
        self.report.y = [y[0], y[1], y[2], y[3]];

        let output = if mission.output_suppressed {
            ControlEffort::default()
        } else {
            self.update_thrust_ceiling(&input_data.est, input_data.dt_s);
            self.report.thrust_max_n = self.t_max_n;
            self.scale_output(&u)
        };

        trace!("SsCtrl effort: {:?}", output);

        // Update the output in self
        self.output = Some(output);

        Ok((output, self.report))
    }
}

impl Archived for SsCtrl {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report.serialise(self.report)?;
        self.arch_output.serialise(self.output)?;

        Ok(())
    }
}

impl SsCtrl {
    /// Create a new instance with the given parameters and archiving
    /// disabled.
    ///
    /// Normal construction is `default()` followed by [`State::init`], this
    /// is for benchmarks which have no session to archive into.
    pub fn with_params(params: Params) -> Self {
        let mut ctrl = Self {
            params,
            ..Default::default()
        };
        ctrl.t_max_n = ctrl.params.thrust_max_init_n;
        ctrl
    }

    /// Raise the thrust ceiling from an observed upward acceleration.
    ///
    /// The climb rate is differenced across steps, an observation only
    /// counts while the vehicle was already climbing away from the ground
    /// and only if it falls inside the plausibility window. The ceiling is
    /// never lowered.
    fn update_thrust_ceiling(&mut self, est: &StateEstimate, dt_s: f64) {
        let alt_m = est.alt_m();
        let climb_rate_ms = est.climb_rate_ms();

        if self.last_alt_m > 0.0 && self.last_climb_rate_ms > 0.0 {
            let accel_ms2 = (climb_rate_ms - self.last_climb_rate_ms) / dt_s;

            if accel_ms2 > 0.0 && accel_ms2 < ACCEL_OBS_MAX_MS2 {
                let thrust_n = self.params.mass_kg * (accel_ms2 + self.params.gravity_ms2);
                if thrust_n > self.t_max_n {
                    self.t_max_n = thrust_n;
                    info!("SsCtrl thrust ceiling raised to {:.2} N", self.t_max_n);
                }
            }
        }

        self.last_alt_m = alt_m;
        self.last_climb_rate_ms = climb_rate_ms;
    }

    /// Normalise the regulator input into the shared effort schema.
    ///
    /// The thrust channel regulates the deviation from hover so the hover
    /// weight is added back before scaling by the thrust ceiling. Values
    /// outside the nominal range are reported, not clipped, clipping is the
    /// mixer's call.
    fn scale_output(&mut self, u: &CtrlVec) -> ControlEffort {
        let thrust_n = u[0] + self.params.mass_kg * self.params.gravity_ms2;

        let thrust_norm = if self.t_max_n > 0.0 {
            thrust_n / self.t_max_n
        } else {
            // No usable ceiling, any upward demand is already railed
            self.report.thrust_saturated = true;
            if thrust_n > 0.0 {
                1.0
            } else {
                0.0
            }
        };

        if !(0.0..=1.0).contains(&thrust_norm) {
            self.report.thrust_saturated = true;
        }

        let mut torque_norm = Vector3::zeros();
        if self.params.angle_control {
            for i in 0..3 {
                torque_norm[i] = u[i + 1] / self.params.moment_max_nm[i];
                if torque_norm[i].abs() > 1.0 {
                    self.report.torque_saturated[i] = true;
                }
            }
        }

        ControlEffort {
            torque_norm,
            thrust_norm,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    fn ss_ctrl() -> SsCtrl {
        SsCtrl::with_params(Params {
            mass_kg: 1.5,
            inertia_kgm2: [0.029, 0.029, 0.055],
            gravity_ms2: 9.80665,
            thrust_max_init_n: 29.4,
            moment_max_nm: [2.0, 2.0, 1.0],
            ref_alt_scale: 3.0,
            angle_control: true,
        })
    }

    fn live_mission(target_alt_m: f64, update_reference: bool) -> mission::OutputData {
        mission::OutputData {
            regulator_active: true,
            output_suppressed: false,
            update_reference,
            target_alt_m,
        }
    }

    fn input_at(alt_m: f64, climb_rate_ms: f64, mission: mission::OutputData) -> InputData {
        InputData {
            est: StateEstimate {
                pos_z_m: -alt_m,
                vel_z_ms: -climb_rate_ms,
                ..Default::default()
            },
            mission,
            dt_s: 0.004,
        }
    }

    #[test]
    fn test_equilibrium_holds_origin() {
        let mut ctrl = ss_ctrl();

        let (output, report) = ctrl
            .proc(&input_at(0.0, 0.0, live_mission(0.0, true)))
            .unwrap();

        // Zero state tracking a zero reference, the only demand is hover
        // thrust
        assert_eq!(report.u, [0.0; 4]);
        assert_eq!(report.y, [0.0; 4]);
        assert_relative_eq!(
            output.thrust_norm,
            1.5 * 9.80665 / 29.4,
            epsilon = 1e-12
        );
        assert_eq!(output.torque_norm, Vector3::zeros());
    }

    #[test]
    fn test_reference_update_is_one_shot() {
        let mut ctrl = ss_ctrl();

        let (_, report) = ctrl
            .proc(&input_at(0.0, 0.0, live_mission(2.0, true)))
            .unwrap();
        assert_relative_eq!(report.u[0], 6.0, epsilon = 1e-12);

        // A changed target without the flag leaves the reference alone
        let (_, report) = ctrl
            .proc(&input_at(0.0, 0.0, live_mission(5.0, false)))
            .unwrap();
        assert_relative_eq!(report.u[0], 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_on_target_demands_hover() {
        // At the target altitude with no climb rate the thrust channel
        // balances exactly, the reference scale matching the altitude gain
        let mut ctrl = ss_ctrl();

        let (output, report) = ctrl
            .proc(&input_at(1.0, 0.0, live_mission(1.0, true)))
            .unwrap();

        assert_relative_eq!(report.u[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(
            output.thrust_norm,
            1.5 * 9.80665 / 29.4,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_thrust_ceiling_raise_only() {
        let mut ctrl = ss_ctrl();
        let mission = live_mission(2.0, false);

        // Prime the differencing with a climbing sample
        let mut input = input_at(0.5, 1.0, mission);
        input.dt_s = 0.1;
        ctrl.proc(&input).unwrap();

        // 10 m/s^2 upward, implies more thrust than the initial ceiling
        let mut input = input_at(0.6, 2.0, mission);
        input.dt_s = 0.1;
        let (_, report) = ctrl.proc(&input).unwrap();
        let raised_n = 1.5 * (10.0 + 9.80665);
        assert_relative_eq!(report.thrust_max_n, raised_n, epsilon = 1e-9);

        // A gentler climb must not lower it
        let mut input = input_at(0.7, 2.05, mission);
        input.dt_s = 0.1;
        let (_, report) = ctrl.proc(&input).unwrap();
        assert_relative_eq!(report.thrust_max_n, raised_n, epsilon = 1e-9);

        // An implausibly large observation is discarded
        let mut input = input_at(0.8, 12.0, mission);
        input.dt_s = 0.1;
        let (_, report) = ctrl.proc(&input).unwrap();
        assert_relative_eq!(report.thrust_max_n, raised_n, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_ceiling_treated_as_saturated() {
        let mut ctrl = ss_ctrl();
        ctrl.params.thrust_max_init_n = 0.0;
        ctrl.t_max_n = 0.0;

        let (output, report) = ctrl
            .proc(&input_at(0.0, 0.0, live_mission(0.0, true)))
            .unwrap();

        assert!(report.thrust_saturated);
        assert_eq!(output.thrust_norm, 1.0);
        assert!(output.thrust_norm.is_finite());
    }

    #[test]
    fn test_angle_control_gates_torque() {
        // A rolled attitude produces a roll moment demand only while the
        // torque channels are enabled
        let mut ctrl = ss_ctrl();

        let mut input = input_at(0.0, 0.0, live_mission(0.0, true));
        input.est.q = UnitQuaternion::from_euler_angles(0.2, 0.0, 0.0);

        let (output, _) = ctrl.proc(&input).unwrap();
        assert!(output.torque_norm[0].abs() > 0.0);

        ctrl.params.angle_control = false;
        let (output, _) = ctrl.proc(&input).unwrap();
        assert_eq!(output.torque_norm, Vector3::zeros());
    }

    #[test]
    fn test_suppressed_output_still_runs_feedback() {
        let mut ctrl = ss_ctrl();

        let mut mission = live_mission(0.0, true);
        mission.output_suppressed = true;

        let (output, report) = ctrl.proc(&input_at(1.0, 0.0, mission)).unwrap();

        // Neutral effort out, but the model state tracked the measurement
        assert_eq!(output.thrust_norm, 0.0);
        assert_eq!(output.torque_norm, Vector3::zeros());
        assert!(report.y[0] > 0.0);
    }

    #[test]
    fn test_inactive_demands_neutral() {
        let mut ctrl = ss_ctrl();

        let (output, _) = ctrl
            .proc(&input_at(1.0, 0.0, mission::OutputData::default()))
            .unwrap();

        assert_eq!(output.thrust_norm, 0.0);
        assert_eq!(output.torque_norm, Vector3::zeros());
    }

    #[test]
    fn test_uninitialised_rejected() {
        let mut ctrl = SsCtrl::default();

        assert!(matches!(
            ctrl.proc(&input_at(0.0, 0.0, live_mission(0.0, true))),
            Err(ProcError::NotInitialised)
        ));
    }
}
