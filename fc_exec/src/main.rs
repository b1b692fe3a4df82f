//! Main flight control executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Acquire the measurement snapshot for the cycle
//!         - Derive the mode flags from the scenario script
//!         - Run exactly one control law:
//!             - Attitude + rate control (PID path), or
//!             - Mission sequencing + state-space control
//!         - Normalise the output at the actuator boundary
//!         - Update the landing gear
//!         - Propagate the plant simulation
//!
//! # Modules
//!
//! All modules (e.g. `rate_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use fc_lib::{act_norm, att_ctrl, data_store::DataStore, mission, rate_ctrl, sim, ss_ctrl, timing};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use serde::Deserialize;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use ctrl_if::{
    act::ControlEffort,
    sp::{AttSetpoint, CtrlLaw, CtrlMode, GearSwitch, LandFlags, RateSetpoint},
};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the executable itself.
#[derive(Debug, Deserialize)]
struct ExecParams {
    /// Target period of one cycle.
    ///
    /// Units: seconds
    cycle_period_s: f64,

    /// Session elapsed time at which the executable stops.
    ///
    /// Units: seconds
    run_duration_s: f64,

    /// The scenario script driving the mode flags over the run.
    scenario: Scenario,
}

/// A scripted scenario, standing in for the guidance layer and the operator.
///
/// All times are session elapsed times in seconds.
#[derive(Debug, Deserialize)]
struct Scenario {
    /// Time at which the vehicle arms, with the PID path selected.
    arm_time_s: f64,

    /// Time at which the state-space path takes over from the PID path.
    ss_law_time_s: f64,

    /// Thrust setpoint commanded while the PID path flies.
    thrust_norm: f64,

    /// Time at which the operator commands the gear up.
    gear_up_time_s: f64,

    /// Time at which the operator returns the gear switch to down.
    gear_down_time_s: f64,

    /// Time at which flight termination is raised. Negative disables.
    termination_time_s: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "fc_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Info, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Merlin Flight Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams = util::params::load(
        "fc_exec.toml"
    ).wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");
    info!(
        "Scenario: arm at {} s, state-space law at {} s, stop at {} s\n",
        exec_params.scenario.arm_time_s,
        exec_params.scenario.ss_law_time_s,
        exec_params.run_duration_s
    );

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.att_ctrl.init("att_ctrl.toml", &session)
        .wrap_err("Failed to initialise AttCtrl")?;
    info!("AttCtrl init complete");

    ds.rate_ctrl.init("rate_ctrl.toml", &session)
        .wrap_err("Failed to initialise RateCtrl")?;
    info!("RateCtrl init complete");

    ds.mission.init("mission.toml", &session)
        .wrap_err("Failed to initialise Mission")?;
    info!("Mission init complete");

    ds.ss_ctrl.init("ss_ctrl.toml", &session)
        .wrap_err("Failed to initialise SsCtrl")?;
    info!("SsCtrl init complete");

    ds.act_norm.init((), &session)
        .wrap_err("Failed to initialise ActNorm")?;
    info!("ActNorm init complete");

    ds.sim.init("sim.toml", &session)
        .wrap_err("Failed to initialise Sim")?;
    info!("Sim init complete");

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut last_cycle_instant: Option<Instant> = None;

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start();
        ds.sim_time_s = util::session::get_elapsed_seconds();

        // ---- DATA INPUT ----

        // The snapshot both control paths read this cycle comes from the
        // plant propagated at the end of the previous cycle
        ds.est = ds.sim_output;
        ds.land = LandFlags {
            landed: ds.sim_status_rpt.landed,
            maybe_landed: ds.sim_status_rpt.maybe_landed,
        };

        // Mode flags and gear switch from the scenario script
        ds.mode = mode_at(&exec_params.scenario, ds.sim_time_s);
        ds.gear_switch = gear_switch_at(&exec_params.scenario, ds.sim_time_s);

        // Inter-sample period, measured and clamped. The first cycle has no
        // previous sample so the nominal period is used.
        let raw_dt_s = match last_cycle_instant {
            Some(i) => i.elapsed().as_secs_f64(),
            None => exec_params.cycle_period_s,
        };
        ds.dt_s = timing::clamp_dt(raw_dt_s);
        last_cycle_instant = Some(cycle_start_instant);

        // ---- CONTROL ALGORITHM PROCESSING ----

        if ds.mode.termination {
            // Flight termination, neutral demands out and no wound up effort
            // left behind for a recovery
            ds.rate_ctrl.reset_integrator();
            ds.effort = ControlEffort::default();
        } else {
            match ds.mode.law {
                CtrlLaw::RatePid => proc_rate_pid(&mut ds, &exec_params.scenario),
                CtrlLaw::StateSpace => proc_state_space(&mut ds),
            }
        }

        // ---- OUTPUT BOUNDARY ----

        let gear = ds.landing_gear.update(ds.gear_switch, ds.land.landed, ds.mode.armed);

        ds.act_norm_input = act_norm::InputData {
            effort: ds.effort,
            gear,
        };
        match ds.act_norm.proc(&ds.act_norm_input) {
            Ok((o, r)) => {
                ds.act_norm_output = o;
                ds.act_norm_status_rpt = r;

                // Boundary saturation feeds the anti-windup next cycle
                ds.sat = r.sat;
            }
            Err(e) => warn!("Error during ActNorm processing: {}", e),
        }

        // ---- PLANT PROPAGATION ----

        ds.sim_input = sim::InputData {
            dems: ds.act_norm_output,
            dt_s: ds.dt_s,
        };
        match ds.sim.proc(&ds.sim_input) {
            Ok((o, r)) => {
                ds.sim_output = o;
                ds.sim_status_rpt = r;
            }
            Err(e) => warn!("Error during Sim processing: {}", e),
        }

        // ---- WRITE ARCHIVES ----

        ds.write_archives();

        // ---- CYCLE MANAGEMENT ----

        if ds.sim_time_s > exec_params.run_duration_s {
            info!(
                "End of scenario reached at {:.3} s ({} cycles), stopping",
                ds.sim_time_s,
                ds.num_cycles + 1
            );
            break;
        }

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(exec_params.cycle_period_s)
            .checked_sub(cycle_dur)
        {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            },
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - exec_params.cycle_period_s
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!(
        "End of execution after {:.3} s",
        util::session::get_elapsed_seconds()
    );

    session.exit();

    Ok(())
}

/// Run the attitude + rate PID control path for this cycle.
fn proc_rate_pid(ds: &mut DataStore, scenario: &Scenario) {
    // The scenario stands in for the guidance layer: hold level attitude at
    // the scripted thrust
    ds.att_ctrl_input = att_ctrl::InputData {
        est: ds.est,
        att_sp: AttSetpoint {
            q_d: nalgebra::UnitQuaternion::identity(),
            yaw_rate_ff_rads: 0.0,
            thrust_norm: scenario.thrust_norm,
        },
        mode: ds.mode,
    };

    if ds.mode.att_ctrl_enabled {
        match ds.att_ctrl.proc(&ds.att_ctrl_input) {
            Ok((o, r)) => {
                ds.att_ctrl_output = o;
                ds.att_ctrl_status_rpt = r;
            }
            Err(e) => warn!("Error during AttCtrl processing: {}", e),
        }
    }

    if ds.mode.rate_ctrl_enabled {
        ds.rate_ctrl_input = rate_ctrl::InputData {
            est: ds.est,
            rate_sp: RateSetpoint {
                rates_rads: ds.att_ctrl_output.rates_rads,
                thrust_norm: ds.att_ctrl_output.thrust_norm,
            },
            mode: ds.mode,
            land: ds.land,
            sat: ds.sat,
            dt_s: ds.dt_s,
        };
        match ds.rate_ctrl.proc(&ds.rate_ctrl_input) {
            Ok((o, r)) => {
                ds.rate_ctrl_output = o;
                ds.rate_ctrl_status_rpt = r;
                ds.effort = o;
            }
            Err(e) => warn!("Error during RateCtrl processing: {}", e),
        }
    }
}

/// Run the mission sequencing + state-space control path for this cycle.
fn proc_state_space(ds: &mut DataStore) {
    ds.mission_input = mission::InputData {
        est: ds.est,
        mode: ds.mode,
        dt_s: ds.dt_s,
    };
    match ds.mission.proc(&ds.mission_input) {
        Ok((o, r)) => {
            ds.mission_output = o;
            ds.mission_status_rpt = r;
        }
        Err(e) => warn!("Error during Mission processing: {}", e),
    }

    ds.ss_ctrl_input = ss_ctrl::InputData {
        est: ds.est,
        mission: ds.mission_output,
        dt_s: ds.dt_s,
    };
    match ds.ss_ctrl.proc(&ds.ss_ctrl_input) {
        Ok((o, r)) => {
            ds.ss_ctrl_output = o;
            ds.ss_ctrl_status_rpt = r;
            ds.effort = o;
        }
        Err(e) => warn!("Error during SsCtrl processing: {}", e),
    }
}

/// Mode flags for the given session elapsed time.
fn mode_at(scenario: &Scenario, t_s: f64) -> CtrlMode {
    let armed = t_s >= scenario.arm_time_s;
    let law = if t_s >= scenario.ss_law_time_s {
        CtrlLaw::StateSpace
    } else {
        CtrlLaw::RatePid
    };

    CtrlMode {
        armed,
        rate_ctrl_enabled: armed,
        att_ctrl_enabled: armed && law == CtrlLaw::RatePid,
        manual: false,
        rotary_wing: true,
        termination: scenario.termination_time_s >= 0.0 && t_s >= scenario.termination_time_s,
        law,
    }
}

/// Operator gear switch position for the given session elapsed time.
fn gear_switch_at(scenario: &Scenario, t_s: f64) -> GearSwitch {
    if t_s >= scenario.gear_up_time_s && t_s < scenario.gear_down_time_s {
        GearSwitch::Up
    } else {
        GearSwitch::Down
    }
}
