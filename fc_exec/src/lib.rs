//! # Flight control library.
//!
//! This library allows other crates in the workspace to access items defined inside the flight
//! control crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Attitude control module - converts attitude setpoints into body rate setpoints
pub mod att_ctrl;

/// Rate control module - converts body rate setpoints into normalised torque demands
pub mod rate_ctrl;

/// State-space control module - full-state-feedback altitude hold regulator
pub mod ss_ctrl;

/// Mission sequencer module - drives the state-space regulator through the flight plan
pub mod mission;

/// Actuator output normalisation - the final defensive boundary before the mixer
pub mod act_norm;

/// Landing gear state machine - debounces the operator gear switch
pub mod gear;

/// Plant simulation - rigid body stand-in for the vehicle when running offline
pub mod sim;

/// Global data store - owns all module states and inter-module data flows
pub mod data_store;

/// Control loop timing - inter-sample period guards
pub mod timing;
