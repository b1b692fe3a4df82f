//! Implementations for the AttCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::Serialize;

// Internal
use super::{AttCtrlError, Params, TILT_SINGULARITY_EPS};
use ctrl_if::{
    est::StateEstimate,
    sp::{AttSetpoint, CtrlMode, RateSetpoint},
};
use util::{
    archive::{Archived, Archiver},
    maths::{clamp, sign_no_zero},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Attitude control module state
#[derive(Default)]
pub struct AttCtrl {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    pub(crate) output: Option<RateSetpoint>,
    arch_output: Archiver,
}

/// Input data to Attitude Control.
#[derive(Clone, Copy, Default)]
pub struct InputData {
    /// The measurement snapshot for this step.
    pub est: StateEstimate,

    /// The attitude setpoint to track.
    pub att_sp: AttSetpoint,

    /// Mode flags for this step.
    pub mode: CtrlMode,
}

/// Status report for AttCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// True when the tilt rotation was degenerate (z-axes anti-parallel) and
    /// the full setpoint was used without the yaw blend.
    pub tilt_singularity: bool,

    /// Per-axis flags raised when the rate setpoint hit the configured limit.
    pub rate_sp_limited: [bool; 3],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for AttCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = RateSetpoint;
    type StatusReport = StatusReport;
    type ProcError = super::AttCtrlError;

    /// Initialise the AttCtrl module.
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

        // Create the arch folder for att_ctrl
        let mut arch_path = session.arch_root.clone();
        arch_path.push("att_ctrl");
        std::fs::create_dir_all(arch_path).unwrap();

        // Initialise the archivers
        self.arch_report = Archiver::from_path(
            session, "att_ctrl/status_report.csv"
        ).unwrap();
        self.arch_output = Archiver::from_path(
            session, "att_ctrl/rate_setpoint.csv"
        ).unwrap();

        Ok(())
    }

    /// Perform cyclic processing of Attitude Control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report
        self.report = StatusReport::default();

        if !input_data.mode.att_ctrl_enabled {
            return Err(AttCtrlError::AttLoopDisabled);
        }

        let mut rates_rads = self.calc_rates_sp(&input_data.est, &input_data.att_sp);

        // Limit the setpoint to the rate envelope of the current flight mode
        let rate_max = if input_data.mode.manual {
            &self.params.rate_max_manual_rads
        } else {
            &self.params.rate_max_auto_rads
        };

        for i in 0..3 {
            if rates_rads[i].abs() > rate_max[i] {
                rates_rads[i] = clamp(rates_rads[i], -rate_max[i], rate_max[i]);
                self.report.rate_sp_limited[i] = true;
            }
        }

        trace!("AttCtrl rate setpoint: {:?}", rates_rads);

        let output = RateSetpoint {
            rates_rads,
            thrust_norm: input_data.att_sp.thrust_norm,
        };

        // Update the output in self
        self.output = Some(output);

        Ok((output, self.report))
    }
}

impl Archived for AttCtrl {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report.serialise(self.report)?;
        self.arch_output.serialise(self.output)?;

        Ok(())
    }
}

impl AttCtrl {
    /// Create a new instance with the given parameters and archiving
    /// disabled.
    ///
    /// Normal construction is `default()` followed by [`State::init`], this
    /// is for benchmarks which have no session to archive into.
    pub fn with_params(params: Params) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// Calculate the body rate setpoint required to track the given attitude
    /// setpoint.
    ///
    /// Tilt is corrected along the shortest path between the current and
    /// desired body z-axes, yaw correction is then blended on top with a
    /// weight derived from the yaw/tilt gain ratio. With equal gains the
    /// blend degenerates to the full attitude error.
    fn calc_rates_sp(&mut self, est: &StateEstimate, att_sp: &AttSetpoint) -> Vector3<f64> {
        // Incoming attitudes crossed a serialisation boundary so unit norm
        // cannot be assumed
        let q = UnitQuaternion::new_normalize(est.q.into_inner());
        let qd = UnitQuaternion::new_normalize(att_sp.q_d.into_inner());

        let roll_pitch_gain = 0.5 * (self.params.att_p[0] + self.params.att_p[1]);
        let yaw_w = clamp(self.params.att_p[2] / roll_pitch_gain, 0.0, 1.0);
        let gain = Vector3::new(
            self.params.att_p[0],
            self.params.att_p[1],
            roll_pitch_gain,
        );

        // Current and desired body z-axes in the world frame
        let e_z = q * Vector3::z();
        let e_z_d = qd * Vector3::z();

        // Reduced setpoint: only the shortest rotation taking e_z onto e_z_d,
        // composed onto the current attitude
        let qd_red = match UnitQuaternion::rotation_between(&e_z, &e_z_d) {
            Some(q_tilt)
                if q_tilt.i.abs() <= (1.0 - TILT_SINGULARITY_EPS)
                    && q_tilt.j.abs() <= (1.0 - TILT_SINGULARITY_EPS) =>
            {
                q_tilt * q
            }
            _ => {
                // The z-axes are (within tolerance of) anti-parallel so the
                // tilt rotation is degenerate. Track the full setpoint for
                // this step instead.
                self.report.tilt_singularity = true;
                qd
            }
        };

        // Blend the remaining yaw rotation onto the reduced setpoint with
        // reduced priority. The mix quaternion is forced into the canonical
        // hemisphere first so the arc functions see a shortest-path rotation.
        let q_mix = (qd_red.inverse() * qd).into_inner();
        let q_mix = q_mix * sign_no_zero(q_mix.w);
        let mix_w = clamp(q_mix.w, -1.0, 1.0);
        let mix_z = clamp(q_mix.k, -1.0, 1.0);

        let q_yaw = Quaternion::new(
            (yaw_w * mix_w.acos()).cos(),
            0.0,
            0.0,
            (yaw_w * mix_z.asin()).sin(),
        );
        let qd_blended = qd_red * UnitQuaternion::new_normalize(q_yaw);

        // Quaternion attitude error, sign chosen so the error always takes
        // the shortest of the two equivalent rotations
        let qe = q.inverse() * qd_blended;
        let eq = qe.imag() * (2.0 * sign_no_zero(qe.w));

        // Feed-forward the commanded world z rotation rate, expressed in the
        // body frame
        eq.component_mul(&gain)
            + (q.inverse() * Vector3::z()) * att_sp.yaw_rate_ff_rads
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn att_ctrl() -> AttCtrl {
        AttCtrl::with_params(Params {
            att_p: [6.5, 6.5, 2.8],
            rate_max_manual_rads: [3.8, 3.8, 3.4],
            rate_max_auto_rads: [2.0, 2.0, 1.5],
        })
    }

    fn proc_with(
        ctrl: &mut AttCtrl,
        q: UnitQuaternion<f64>,
        q_d: UnitQuaternion<f64>,
        yaw_rate_ff_rads: f64,
    ) -> RateSetpoint {
        let input = InputData {
            est: StateEstimate {
                q,
                ..Default::default()
            },
            att_sp: AttSetpoint {
                q_d,
                yaw_rate_ff_rads,
                thrust_norm: 0.5,
            },
            mode: CtrlMode {
                att_ctrl_enabled: true,
                manual: true,
                ..Default::default()
            },
        };
        let (output, _) = ctrl.proc(&input).unwrap();
        output
    }

    #[test]
    fn test_zero_error_zero_rates() {
        let mut ctrl = att_ctrl();

        let attitudes = [
            UnitQuaternion::identity(),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
            UnitQuaternion::from_euler_angles(0.3, -0.2, 1.1),
        ];

        for q in attitudes.iter() {
            let out = proc_with(&mut ctrl, *q, *q, 0.0);
            assert_relative_eq!(out.rates_rads.norm(), 0.0, epsilon = 1e-9);
            assert_eq!(out.thrust_norm, 0.5);
        }
    }

    #[test]
    fn test_antipodal_setpoints_equivalent() {
        // q and -q encode the same attitude so both must command the same
        // rates
        let mut ctrl = att_ctrl();
        let q = UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3);
        let qd = UnitQuaternion::from_euler_angles(0.4, -0.1, 0.8);
        let qd_neg = UnitQuaternion::new_unchecked(-qd.into_inner());

        let out_a = proc_with(&mut ctrl, q, qd, 0.0);
        let out_b = proc_with(&mut ctrl, q, qd_neg, 0.0);

        assert_relative_eq!(out_a.rates_rads, out_b.rates_rads, epsilon = 1e-9);
    }

    #[test]
    fn test_tilt_singularity_fallback() {
        // Desired body z exactly opposite the current one, the shortest tilt
        // rotation is undefined and the full setpoint must be used
        let mut ctrl = att_ctrl();
        let q = UnitQuaternion::identity();
        let qd = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI);

        let out = proc_with(&mut ctrl, q, qd, 0.0);

        assert!(ctrl.report.tilt_singularity);
        assert!(out.rates_rads.iter().all(|r| r.is_finite()));

        // Full roll flip demanded, expect a positive roll rate pinned at the
        // manual limit
        assert_relative_eq!(out.rates_rads[0], 3.8, epsilon = 1e-9);
        assert!(ctrl.report.rate_sp_limited[0]);
    }

    #[test]
    fn test_yaw_ff_rotated_into_body() {
        // With the vehicle rolled 90 degrees the world z-axis lies along the
        // body y-axis, so the feed-forward must appear on pitch
        let mut ctrl = att_ctrl();
        let q = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2);

        let out = proc_with(&mut ctrl, q, q, 0.5);

        assert_relative_eq!(out.rates_rads[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(out.rates_rads[1], 0.5, epsilon = 1e-9);
        assert_relative_eq!(out.rates_rads[2], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_yaw_error_reduced_priority() {
        // For a pure yaw error of angle phi the commanded yaw rate is
        // gain * 2 * sin(yaw_w * phi / 2), i.e. strictly less authority than
        // the full-gain correction
        let mut ctrl = att_ctrl();
        let yaw_err = 30f64.to_radians();
        let qd = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw_err);

        let out = proc_with(&mut ctrl, UnitQuaternion::identity(), qd, 0.0);

        let yaw_w: f64 = 2.8 / 6.5;
        let expected = 6.5 * 2.0 * (yaw_w * yaw_err / 2.0).sin();
        let full_gain = 6.5 * 2.0 * (yaw_err / 2.0).sin();

        assert_relative_eq!(out.rates_rads[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(out.rates_rads[1], 0.0, epsilon = 1e-9);
        assert_relative_eq!(out.rates_rads[2], expected, epsilon = 1e-9);
        assert!(out.rates_rads[2] < full_gain);
    }

    #[test]
    fn test_rate_limits_per_mode() {
        // A large yaw demand saturates at the manual limit in manual mode and
        // at the (tighter) auto limit otherwise
        let mut ctrl = att_ctrl();
        let qd = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 3.0);

        let mut input = InputData {
            est: StateEstimate::default(),
            att_sp: AttSetpoint {
                q_d: qd,
                yaw_rate_ff_rads: 40.0,
                thrust_norm: 0.0,
            },
            mode: CtrlMode {
                att_ctrl_enabled: true,
                manual: true,
                ..Default::default()
            },
        };

        let (manual_out, manual_rpt) = ctrl.proc(&input).unwrap();
        assert_relative_eq!(manual_out.rates_rads[2], 3.4, epsilon = 1e-9);
        assert!(manual_rpt.rate_sp_limited[2]);

        input.mode.manual = false;
        let (auto_out, auto_rpt) = ctrl.proc(&input).unwrap();
        assert_relative_eq!(auto_out.rates_rads[2], 1.5, epsilon = 1e-9);
        assert!(auto_rpt.rate_sp_limited[2]);
    }

    #[test]
    fn test_disabled_loop_rejected() {
        let mut ctrl = att_ctrl();
        let input = InputData::default();

        assert!(matches!(
            ctrl.proc(&input),
            Err(AttCtrlError::AttLoopDisabled)
        ));
    }
}
