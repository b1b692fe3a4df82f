//! Implementations for the Mission sequencer state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

// Internal
use super::{MissionError, Params};
use ctrl_if::{
    est::StateEstimate,
    sp::{CtrlLaw, CtrlMode},
};
use util::{
    archive::{Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Mission sequencer module state
#[derive(Default)]
pub struct MissionSeq {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    /// The phase currently being executed.
    pub(crate) phase: Phase,

    /// Mission clock, counts only while armed with the rate loop live.
    ///
    /// Units: seconds
    pub(crate) run_t_s: f64,

    /// The target altitude currently commanded.
    ///
    /// Units: meters
    pub(crate) target_alt_m: f64,

    /// Altitude band armed for the next descent decay.
    ///
    /// Units: meters
    pub(crate) descent_band_m: f64,

    pub(crate) output: Option<OutputData>,
    arch_output: Archiver,
}

/// Input data to the Mission sequencer.
#[derive(Clone, Copy, Default)]
pub struct InputData {
    /// The measurement snapshot for this step.
    pub est: StateEstimate,

    /// Mode flags for this step.
    pub mode: CtrlMode,

    /// Inter-sample period, already clamped by the executor.
    ///
    /// Units: seconds
    pub dt_s: f64,
}

/// Output commands from the Mission sequencer to the regulator.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct OutputData {
    /// The regulator shall evaluate its feedback law this step.
    pub regulator_active: bool,

    /// The regulator output shall be forced neutral this step.
    pub output_suppressed: bool,

    /// One-shot flag, the regulator reference must be rebuilt from
    /// `target_alt_m` this step.
    pub update_reference: bool,

    /// The target altitude.
    ///
    /// Units: meters
    pub target_alt_m: f64,
}

/// Status report for Mission processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// The phase currently being executed.
    pub phase: Phase,

    /// Mission clock.
    ///
    /// Units: seconds
    pub run_t_s: f64,

    /// True once the flight plan has finished and the descent has begun.
    pub return_started: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The phases the sequencer steps through. All transitions are performed by
/// the corresponding `mode_xyz` function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Phase {
    /// Waiting for the vehicle to arm with the rate loop live.
    Idle,

    /// Feedback runs but the output stays suppressed.
    Hold,

    /// Executing the numbered entry of the climb table.
    Climb(usize),

    /// Decaying the target altitude back towards the ground.
    ReturnDescent,

    /// The safety timeout tripped. Latched until the module is
    /// re-initialised.
    Disabled,
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Failed to load parameters: {0}")]
    ParamLoadError(params::LoadError),

    #[error("Loaded parameters are invalid: {0}")]
    ParamsInvalid(super::ParamsError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Phase {
    fn default() -> Self {
        Phase::Idle
    }
}

impl State for MissionSeq {
    type InitData = &'static str;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = MissionError;

    /// Initialise the Mission sequencer.
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

        // Create the arch folder for mission
        let mut arch_path = session.arch_root.clone();
        arch_path.push("mission");
        std::fs::create_dir_all(arch_path).unwrap();

        // Initialise the archivers
        self.arch_report = Archiver::from_path(
            session, "mission/status_report.csv"
        ).unwrap();
        self.arch_output = Archiver::from_path(
            session, "mission/output.csv"
        ).unwrap();

        Ok(())
    }

    /// Perform cyclic processing of the Mission sequencer.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        if input_data.mode.law != CtrlLaw::StateSpace {
            return Err(MissionError::WrongLaw);
        }

        // The mission clock counts only while armed with the rate loop live,
        // any interruption resets the sequence for the next arming cycle
        if input_data.mode.armed && input_data.mode.rate_ctrl_enabled {
            self.run_t_s += input_data.dt_s;
        } else {
            self.run_t_s = 0.0;
            if self.phase != Phase::Disabled && self.phase != Phase::Idle {
                info!("Mission sequence reset");
                self.phase = Phase::Idle;
                self.target_alt_m = 0.0;
                self.descent_band_m = 0.0;
            }
        }

        // Safety timeout, latched until the module is re-initialised
        if self.run_t_s > self.params.safety_timeout_s && self.phase != Phase::Disabled {
            warn!(
                "Mission safety timeout tripped at {:.1} s, sequencing disabled",
                self.run_t_s
            );
            self.phase = Phase::Disabled;
        }

        let output = match self.phase {
            Phase::Idle => self.mode_idle(input_data),
            Phase::Hold => self.mode_hold(input_data),
            Phase::Climb(index) => self.mode_climb(index, input_data),
            Phase::ReturnDescent => self.mode_return(input_data),
            Phase::Disabled => self.mode_disabled(),
        };

        self.report = StatusReport {
            phase: self.phase,
            run_t_s: self.run_t_s,
            return_started: self.phase == Phase::ReturnDescent,
        };

        // Update the output in self
        self.output = Some(output);

        Ok((output, self.report))
    }
}

impl Archived for MissionSeq {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report.serialise(self.report)?;
        self.arch_output.serialise(self.output)?;

        Ok(())
    }
}

impl MissionSeq {
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

    fn mode_idle(&mut self, input_data: &InputData) -> OutputData {
        if self.run_t_s > 0.0 {
            info!("Mission sequence started");
            self.phase = Phase::Hold;

            // The regulator reference starts the sequence zeroed
            let mut output = self.mode_hold(input_data);
            output.update_reference = true;
            return output;
        }

        OutputData {
            output_suppressed: true,
            ..Default::default()
        }
    }

    fn mode_hold(&mut self, input_data: &InputData) -> OutputData {
        if self.run_t_s > self.params.hold_duration_s {
            return self.advance_climb_table(0, input_data);
        }

        OutputData {
            regulator_active: true,
            output_suppressed: true,
            target_alt_m: self.target_alt_m,
            ..Default::default()
        }
    }

    fn mode_climb(&mut self, index: usize, input_data: &InputData) -> OutputData {
        if self.run_t_s > self.climb_phase_end_s(index) {
            return self.advance_climb_table(index + 1, input_data);
        }

        OutputData {
            regulator_active: true,
            target_alt_m: self.target_alt_m,
            ..Default::default()
        }
    }

    fn mode_return(&mut self, input_data: &InputData) -> OutputData {
        let mut output = OutputData {
            regulator_active: true,
            ..Default::default()
        };

        let alt_m = input_data.est.alt_m();
        let ratio = self.params.return_decay_ratio;

        // Decay the target once the vehicle has descended below the altitude
        // at which the previous decay fired
        if alt_m < self.descent_band_m / ratio && self.target_alt_m >= self.params.min_target_alt_m
        {
            self.descent_band_m = alt_m * ratio;
            self.target_alt_m *= ratio;
            output.update_reference = true;
            info!("Return descent target now {:.2} m", self.target_alt_m);
        }

        // Close enough, snap the target to the ground
        if self.target_alt_m < self.params.min_target_alt_m && self.target_alt_m > 0.0 {
            self.target_alt_m = 0.0;
            output.update_reference = true;
            info!("Return descent complete, target grounded");
        }

        // Almost touched down, stop driving the actuators
        if alt_m < self.params.ground_proximity_m {
            output.output_suppressed = true;
        }

        output.target_alt_m = self.target_alt_m;
        output
    }

    fn mode_disabled(&mut self) -> OutputData {
        OutputData {
            output_suppressed: true,
            ..Default::default()
        }
    }

    /// Transition into the given climb table entry, or into the return
    /// descent once the table is exhausted.
    fn advance_climb_table(&mut self, index: usize, input_data: &InputData) -> OutputData {
        if index < self.params.phases.len() {
            self.phase = Phase::Climb(index);
            self.target_alt_m = self.params.phases[index].alt_m;
            info!(
                "Mission climb phase {} of {}, target altitude {} m",
                index + 1,
                self.params.phases.len(),
                self.target_alt_m
            );

            return OutputData {
                regulator_active: true,
                update_reference: true,
                target_alt_m: self.target_alt_m,
                ..Default::default()
            };
        }

        // Flight plan exhausted, begin the descent from wherever we are
        self.phase = Phase::ReturnDescent;
        self.descent_band_m = input_data.est.alt_m() * self.params.return_decay_ratio;
        info!(
            "Flight plan complete, returning to ground from {:.2} m",
            input_data.est.alt_m()
        );

        self.mode_return(input_data)
    }

    /// Mission clock value at which the given climb table entry ends.
    fn climb_phase_end_s(&self, index: usize) -> f64 {
        self.params.hold_duration_s
            + self.params.phases[..=index]
                .iter()
                .map(|p| p.duration_s)
                .sum::<f64>()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
