//! # Plan manager module
//!
//! The plan manager runs the full speed planning pipeline once per control
//! cycle. Each cycle it resamples the target lane into a fixed-step
//! trajectory, derives the speed envelope from its curvature, predicts the
//! first obstacle conflict and solves for the velocity profile. The first
//! profile sample is the commanded velocity for the cycle.
//!
//! The manager carries the previous cycle's plan across cycles. On all but
//! the first successful cycle the profile solve is warm-started from the
//! speed the previous plan commanded at the vehicle's current position, so
//! that consecutive plans join smoothly. A failed cycle leaves the carried
//! plan untouched and produces no output.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::Params;
pub use state::*;

// External
use util::params as param_loader;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during PlanMgr operation.
#[derive(Debug, thiserror::Error)]
pub enum PlanMgrError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(param_loader::LoadError),
}
