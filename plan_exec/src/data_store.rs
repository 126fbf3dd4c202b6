//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use crate::plan_mgr;
use msgs_if::{
    geom::{CurrentPose, VehicleStatus},
    lane::Lane,
    obj::DetectedObjectArray,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// Simulation elapsed time
    pub sim_time_s: f64,

    // Input snapshots for the cycle
    pub pose: Option<CurrentPose>,
    pub speed_ms: Option<f64>,
    pub vehicle_status: Option<VehicleStatus>,
    pub lane: Option<Lane>,
    pub detected_objects: Option<DetectedObjectArray>,

    // PlanMgr
    pub plan_mgr: plan_mgr::PlanMgr,
    pub plan_output: Option<plan_mgr::PlanOutput>,
    pub plan_status_rpt: plan_mgr::StatusReport,

    // Monitoring counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Number of cycles dropped without producing a plan
    pub num_dropped_cycles: u64,
}
