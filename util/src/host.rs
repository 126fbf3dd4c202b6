//! Host platform utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name of the environment variable pointing at the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "SPEED_PLANNER_SW_ROOT";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with the host environment.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("The software root environment variable (SPEED_PLANNER_SW_ROOT) is not set")]
    SwRootNotSet,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the software root directory from the environment.
///
/// Parameter files and session directories are resolved relative to this
/// root.
pub fn get_sw_root() -> Result<PathBuf, HostError> {
    std::env::var(SW_ROOT_ENV_VAR)
        .map(PathBuf::from)
        .map_err(|_| HostError::SwRootNotSet)
}

/// Get a short description of the host this executable is running on.
pub fn get_host_desc() -> String {
    format!(
        "{} ({})",
        std::env::var("HOSTNAME").unwrap_or_else(|_| String::from("unknown host")),
        std::env::consts::OS
    )
}
