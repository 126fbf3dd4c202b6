//! # Speed planner library.
//!
//! This library allows other crates in the workspace (and the benches) to
//! access items defined inside the planner crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Collision check module - predicts first conflict between the trajectory and moving obstacles
pub mod col_check;

/// Global data store for the executable
pub mod data_store;

/// Plan manager module - runs the planning pipeline once per cycle
pub mod plan_mgr;

/// Simulation client - scenario playback standing in for the transport layer
pub mod sim_client;

/// Speed envelope module - per-point speed and acceleration bounds
pub mod speed_env;

/// Speed optimisation module - solves for the velocity profile
pub mod speed_opt;

/// Trajectory generation module - resamples the lane into a fixed-step trajectory
pub mod traj_gen;
