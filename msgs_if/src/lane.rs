//! Lane message types
//!
//! A lane is the geometric path handed to the speed planner by the (external)
//! lateral planner. The planner replaces the waypoint geometry and velocities
//! but passes every other field through unchanged.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use crate::geom::{Header, Point3, Quaternion};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single point along a lane.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Point3,
    pub orientation: Quaternion,

    /// The velocity demand at this waypoint
    pub velocity_ms: f64,
}

/// A lane - an ordered sequence of waypoints plus routing metadata.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Lane {
    pub header: Header,
    pub lane_id: i32,
    pub lane_index: i32,
    pub is_blocked: bool,
    pub increment: i32,
    pub cost: f64,
    pub closest_object_distance_m: f64,
    pub closest_object_velocity_ms: f64,
    pub waypoints: Vec<Waypoint>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Lane {
    /// Clone the lane's non-geometric fields into a new lane with empty
    /// waypoints.
    pub fn passthrough(&self) -> Self {
        Lane {
            header: self.header.clone(),
            lane_id: self.lane_id,
            lane_index: self.lane_index,
            is_blocked: self.is_blocked,
            increment: self.increment,
            cost: self.cost,
            closest_object_distance_m: self.closest_object_distance_m,
            closest_object_velocity_ms: self.closest_object_velocity_ms,
            waypoints: Vec::new(),
        }
    }
}
