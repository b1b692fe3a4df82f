//! # Control Step Benchmark
//!
//! One full evaluation of each control path, measured at the inputs the hot
//! loop would see mid-flight.

use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::{UnitQuaternion, Vector3};

use ctrl_if::{
    est::StateEstimate,
    sp::{AttSetpoint, CtrlLaw, CtrlMode, LandFlags, RateSetpoint},
};
use fc_lib::{att_ctrl, mission, rate_ctrl, ss_ctrl};
use util::module::State;

fn flight_mode(law: CtrlLaw) -> CtrlMode {
    CtrlMode {
        armed: true,
        rate_ctrl_enabled: true,
        att_ctrl_enabled: law == CtrlLaw::RatePid,
        manual: false,
        rotary_wing: true,
        termination: false,
        law,
    }
}

fn flight_estimate() -> StateEstimate {
    StateEstimate {
        q: UnitQuaternion::from_euler_angles(0.05, -0.02, 0.4),
        rates_rads: Vector3::new(0.1, -0.05, 0.02),
        pos_z_m: -1.2,
        vel_z_ms: -0.3,
    }
}

fn rate_pid_step_benchmark(c: &mut Criterion) {
    let mut att = att_ctrl::AttCtrl::with_params(att_ctrl::Params {
        att_p: [6.5, 6.5, 2.8],
        rate_max_manual_rads: [3.8, 3.8, 3.4],
        rate_max_auto_rads: [2.0, 2.0, 1.5],
    });
    let mut rate = rate_ctrl::RateCtrl::with_params(rate_ctrl::Params {
        rate_p: [0.15, 0.15, 0.2],
        rate_i: [0.2, 0.2, 0.1],
        rate_int_lim: [0.3, 0.3, 0.3],
        rate_d: [0.003, 0.003, 0.0],
        rate_ff: [0.0, 0.0, 0.0],
        tpa_breakpoint_p: 0.7,
        tpa_breakpoint_i: 0.7,
        tpa_breakpoint_d: 0.7,
        tpa_rate_p: 0.3,
        tpa_rate_i: 0.3,
        tpa_rate_d: 0.3,
        d_term_cutoff_freq_hz: 30.0,
        initial_loop_rate_hz: 250.0,
    });

    let att_input = att_ctrl::InputData {
        est: flight_estimate(),
        att_sp: AttSetpoint {
            q_d: UnitQuaternion::from_euler_angles(0.0, 0.0, 0.5),
            yaw_rate_ff_rads: 0.1,
            thrust_norm: 0.55,
        },
        mode: flight_mode(CtrlLaw::RatePid),
    };
    let mut rate_input = rate_ctrl::InputData {
        est: flight_estimate(),
        rate_sp: RateSetpoint::default(),
        mode: flight_mode(CtrlLaw::RatePid),
        land: LandFlags::default(),
        sat: Default::default(),
        dt_s: 0.004,
    };

    c.bench_function("rate_pid_step", |b| {
        b.iter(|| {
            let (rate_sp, _) = att.proc(&att_input).unwrap();
            rate_input.rate_sp = rate_sp;
            rate.proc(&rate_input).unwrap()
        })
    });
}

fn state_space_step_benchmark(c: &mut Criterion) {
    let mut seq = mission::MissionSeq::with_params(mission::Params {
        hold_duration_s: 5.0,
        phases: vec![
            mission::MissionPhase {
                alt_m: 1.0,
                duration_s: 15.0,
            },
            mission::MissionPhase {
                alt_m: 2.0,
                duration_s: 15.0,
            },
        ],
        return_decay_ratio: 0.8,
        min_target_alt_m: 0.25,
        ground_proximity_m: 0.2,
        safety_timeout_s: 120.0,
    });
    let mut ss = ss_ctrl::SsCtrl::with_params(ss_ctrl::Params {
        mass_kg: 1.5,
        inertia_kgm2: [0.029, 0.029, 0.055],
        gravity_ms2: 9.80665,
        thrust_max_init_n: 29.4,
        moment_max_nm: [2.0, 2.0, 1.0],
        ref_alt_scale: 3.0,
        angle_control: true,
    });

    let mission_input = mission::InputData {
        est: flight_estimate(),
        mode: flight_mode(CtrlLaw::StateSpace),
        dt_s: 0.004,
    };
    let mut ss_input = ss_ctrl::InputData {
        est: flight_estimate(),
        mission: Default::default(),
        dt_s: 0.004,
    };

    c.bench_function("state_space_step", |b| {
        b.iter(|| {
            let (mission_out, _) = seq.proc(&mission_input).unwrap();
            ss_input.mission = mission_out;
            ss.proc(&ss_input).unwrap()
        })
    });
}

criterion_group!(benches, rate_pid_step_benchmark, state_space_step_benchmark);
criterion_main!(benches);
