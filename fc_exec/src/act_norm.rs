//! Actuator output normalisation
//!
//! The last stop before the mixer. Whatever the selected control law
//! produced, every value leaving the core must be finite, so non-finite
//! channels are replaced with a neutral zero here and counted for
//! diagnostics. The normaliser also judges saturation of the outgoing
//! demands, which feeds the rate controller's anti-windup on the next step,
//! and attaches the landing gear demand to the outgoing schema.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use serde::Serialize;

// Internal
use ctrl_if::act::{ActuatorDems, ControlEffort, GearState, SaturationStatus};
use util::{
    archive::{Archived, Archiver},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Output normaliser module state
#[derive(Default)]
pub struct ActNorm {
    pub(crate) report: StatusReport,
    arch_report: Archiver,

    pub(crate) output: Option<ActuatorDems>,
    arch_output: Archiver,
}

/// Input data to the Output normaliser.
#[derive(Clone, Copy, Default)]
pub struct InputData {
    /// The effort produced by the selected control law this step.
    pub effort: ControlEffort,

    /// The landing gear demand for this step.
    pub gear: GearState,
}

/// Status report for ActNorm processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Number of channels replaced with a neutral value this step.
    pub non_finite_subs: u32,

    /// Saturation of the outgoing demands, consumed by the rate controller's
    /// anti-windup on the next step.
    pub sat: SaturationStatus,

    /// True when the outgoing thrust demand left [0, 1].
    pub thrust_saturated: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during ActNorm operation.
///
/// The boundary must never fail, any value it cannot pass through it
/// replaces, so there are no variants.
#[derive(Debug, thiserror::Error)]
pub enum ActNormError {}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for ActNorm {
    type InitData = ();
    type InitError = std::io::Error;

    type InputData = InputData;
    type OutputData = ActuatorDems;
    type StatusReport = StatusReport;
    type ProcError = ActNormError;

    /// Initialise the ActNorm module.
    ///
    /// No parameters are required, only the archive setup.
    fn init(&mut self, _init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        // Create the arch folder for act_norm
        let mut arch_path = session.arch_root.clone();
        arch_path.push("act_norm");
        std::fs::create_dir_all(arch_path)?;

        // Initialise the archivers
        self.arch_report = Archiver::from_path(
            session, "act_norm/status_report.csv"
        ).unwrap();
        self.arch_output = Archiver::from_path(
            session, "act_norm/actuator_dems.csv"
        ).unwrap();

        Ok(())
    }

    /// Perform cyclic processing of the Output normaliser.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report
        self.report = StatusReport::default();

        let mut torque_norm = input_data.effort.torque_norm;
        for i in 0..3 {
            if !torque_norm[i].is_finite() {
                torque_norm[i] = 0.0;
                self.report.non_finite_subs += 1;
            }
        }

        let mut thrust_norm = input_data.effort.thrust_norm;
        if !thrust_norm.is_finite() {
            thrust_norm = 0.0;
            self.report.non_finite_subs += 1;
        }

        if self.report.non_finite_subs > 0 {
            warn!(
                "ActNorm replaced {} non-finite channel(s) with neutral values",
                self.report.non_finite_subs
            );
        }

        // Judge saturation of what actually leaves the core. Values are not
        // clipped, that is the mixer's call, but the rails must be visible
        // both in telemetry and to the anti-windup.
        self.report.sat = SaturationStatus {
            roll_pos: torque_norm[0] >= 1.0,
            roll_neg: torque_norm[0] <= -1.0,
            pitch_pos: torque_norm[1] >= 1.0,
            pitch_neg: torque_norm[1] <= -1.0,
            yaw_pos: torque_norm[2] >= 1.0,
            yaw_neg: torque_norm[2] <= -1.0,
        };
        self.report.thrust_saturated = !(0.0..=1.0).contains(&thrust_norm);

        let output = ActuatorDems {
            torque_norm,
            thrust_norm,
            gear: input_data.gear,
        };

        // Update the output in self
        self.output = Some(output);

        Ok((output, self.report))
    }
}

impl Archived for ActNorm {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report.serialise(self.report)?;
        self.arch_output.serialise(self.output)?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector3;

    fn proc_effort(effort: ControlEffort) -> (ActuatorDems, StatusReport) {
        let mut norm = ActNorm::default();
        norm.proc(&InputData {
            effort,
            gear: GearState::Down,
        })
        .unwrap()
    }

    #[test]
    fn test_finite_values_pass_through() {
        let (dems, report) = proc_effort(ControlEffort {
            torque_norm: Vector3::new(0.1, -0.2, 0.3),
            thrust_norm: 0.6,
        });

        assert_eq!(dems.torque_norm, Vector3::new(0.1, -0.2, 0.3));
        assert_eq!(dems.thrust_norm, 0.6);
        assert_eq!(report.non_finite_subs, 0);
        assert!(!report.sat.any());
        assert!(!report.thrust_saturated);
    }

    #[test]
    fn test_non_finite_replaced_with_neutral() {
        let (dems, report) = proc_effort(ControlEffort {
            torque_norm: Vector3::new(f64::NAN, f64::INFINITY, 0.2),
            thrust_norm: f64::NEG_INFINITY,
        });

        assert_eq!(dems.torque_norm, Vector3::new(0.0, 0.0, 0.2));
        assert_eq!(dems.thrust_norm, 0.0);
        assert_eq!(report.non_finite_subs, 3);

        assert!(dems.torque_norm.iter().all(|v| v.is_finite()));
        assert!(dems.thrust_norm.is_finite());
    }

    #[test]
    fn test_saturation_reported_not_clipped() {
        let (dems, report) = proc_effort(ControlEffort {
            torque_norm: Vector3::new(1.4, -2.0, 0.0),
            thrust_norm: 1.2,
        });

        // The rails are reported but the values pass unclipped
        assert_eq!(dems.torque_norm[0], 1.4);
        assert!(report.sat.roll_pos);
        assert!(!report.sat.roll_neg);
        assert!(report.sat.pitch_neg);
        assert!(!report.sat.yaw_pos);
        assert!(report.thrust_saturated);
    }

    #[test]
    fn test_gear_attached() {
        let mut norm = ActNorm::default();
        let (dems, _) = norm
            .proc(&InputData {
                effort: ControlEffort::default(),
                gear: GearState::Up,
            })
            .unwrap();

        assert_eq!(dems.gear, GearState::Up);
    }
}
