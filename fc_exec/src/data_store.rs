//! # Data Store
//!
//! The single owner of all module state, inputs and outputs for the
//! executable. Everything a cycle reads or writes lives here, so the data
//! flowing between modules is visible in one place and no module hides
//! process-wide state of its own.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;

// Internal
use crate::{act_norm, att_ctrl, gear::LandingGear, mission, rate_ctrl, sim, ss_ctrl};
use ctrl_if::{
    act::{ActuatorDems, ControlEffort, SaturationStatus},
    est::StateEstimate,
    sp::{CtrlMode, GearSwitch, LandFlags, RateSetpoint},
};
use util::archive::Archived;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// Session elapsed time at the start of this cycle
    pub sim_time_s: f64,

    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    // Per-cycle inputs
    /// The measurement snapshot both control paths read this cycle.
    pub est: StateEstimate,

    /// Mode flags for this cycle.
    pub mode: CtrlMode,

    /// Land detector flags for this cycle.
    pub land: LandFlags,

    /// Operator gear switch position for this cycle.
    pub gear_switch: GearSwitch,

    /// Saturation reported by the output boundary on the previous cycle,
    /// consumed by the rate controller's anti-windup.
    pub sat: SaturationStatus,

    /// Inter-sample period for this cycle, already clamped.
    ///
    /// Units: seconds
    pub dt_s: f64,

    // AttCtrl
    pub att_ctrl: att_ctrl::AttCtrl,
    pub att_ctrl_input: att_ctrl::InputData,
    pub att_ctrl_output: RateSetpoint,
    pub att_ctrl_status_rpt: att_ctrl::StatusReport,

    // RateCtrl
    pub rate_ctrl: rate_ctrl::RateCtrl,
    pub rate_ctrl_input: rate_ctrl::InputData,
    pub rate_ctrl_output: ControlEffort,
    pub rate_ctrl_status_rpt: rate_ctrl::StatusReport,

    // Mission
    pub mission: mission::MissionSeq,
    pub mission_input: mission::InputData,
    pub mission_output: mission::OutputData,
    pub mission_status_rpt: mission::StatusReport,

    // SsCtrl
    pub ss_ctrl: ss_ctrl::SsCtrl,
    pub ss_ctrl_input: ss_ctrl::InputData,
    pub ss_ctrl_output: ControlEffort,
    pub ss_ctrl_status_rpt: ss_ctrl::StatusReport,

    /// The effort produced by whichever control law ran this cycle.
    pub effort: ControlEffort,

    // Landing gear
    pub landing_gear: LandingGear,

    // ActNorm
    pub act_norm: act_norm::ActNorm,
    pub act_norm_input: act_norm::InputData,
    pub act_norm_output: ActuatorDems,
    pub act_norm_status_rpt: act_norm::StatusReport,

    // Sim
    pub sim: sim::Sim,
    pub sim_input: sim::InputData,
    pub sim_output: StateEstimate,
    pub sim_status_rpt: sim::StatusReport,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle.
    pub fn cycle_start(&mut self) {
        // Module inputs and outputs are rebuilt every cycle, nothing may
        // carry over
        self.att_ctrl_input = att_ctrl::InputData::default();
        self.att_ctrl_output = RateSetpoint::default();
        self.att_ctrl_status_rpt = att_ctrl::StatusReport::default();

        self.rate_ctrl_input = rate_ctrl::InputData::default();
        self.rate_ctrl_output = ControlEffort::default();
        self.rate_ctrl_status_rpt = rate_ctrl::StatusReport::default();

        self.mission_input = mission::InputData::default();
        self.mission_output = mission::OutputData::default();
        self.mission_status_rpt = mission::StatusReport::default();

        self.ss_ctrl_input = ss_ctrl::InputData::default();
        self.ss_ctrl_output = ControlEffort::default();
        self.ss_ctrl_status_rpt = ss_ctrl::StatusReport::default();

        self.effort = ControlEffort::default();

        self.act_norm_input = act_norm::InputData::default();
        self.act_norm_output = ActuatorDems::default();
        self.act_norm_status_rpt = act_norm::StatusReport::default();

        self.sim_input = sim::InputData::default();
        self.sim_status_rpt = sim::StatusReport::default();
    }

    /// Write the archive rows for every module this cycle.
    pub fn write_archives(&mut self) {
        if let Err(e) = self.att_ctrl.write() {
            warn!("Could not write AttCtrl archives: {}", e);
        }
        if let Err(e) = self.rate_ctrl.write() {
            warn!("Could not write RateCtrl archives: {}", e);
        }
        if let Err(e) = self.mission.write() {
            warn!("Could not write Mission archives: {}", e);
        }
        if let Err(e) = self.ss_ctrl.write() {
            warn!("Could not write SsCtrl archives: {}", e);
        }
        if let Err(e) = self.act_norm.write() {
            warn!("Could not write ActNorm archives: {}", e);
        }
        if let Err(e) = self.sim.write() {
            warn!("Could not write Sim archives: {}", e);
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cycle_start_clears_per_cycle_data() {
        let mut ds = DataStore::default();

        // Pollute per-cycle data as a previous cycle would
        ds.num_cycles = 42;
        ds.effort.thrust_norm = 0.7;
        ds.mission_output.regulator_active = true;
        ds.act_norm_status_rpt.non_finite_subs = 3;

        ds.cycle_start();

        assert_eq!(ds.effort.thrust_norm, 0.0);
        assert!(!ds.mission_output.regulator_active);
        assert_eq!(ds.act_norm_status_rpt.non_finite_subs, 0);

        // Cycle accounting is not per-cycle data and must survive
        assert_eq!(ds.num_cycles, 42);
    }
}
