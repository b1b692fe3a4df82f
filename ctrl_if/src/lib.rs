//! # Control interface crate.
//!
//! Provides the boundary types exchanged between the estimation/guidance side
//! of the software and the control core. Everything crossing the control
//! boundary is defined here so that producers and consumers share one schema.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuator-side types: control efforts, actuator demands, telemetry
pub mod act;

/// Estimation-side types: the per-step measurement snapshot
pub mod est;

/// Setpoint and mode types fed in from the guidance layer
pub mod sp;
