//! # Simulation Client
//!
//! The SimClient stands in for the vehicle's transport layer during testing
//! and development. Instead of subscribing to live localisation, lane and
//! object topics it plays back a scenario loaded from a TOML file, stepping a
//! simple kinematic ego model with the velocity the planner commands.
//!
//! The scenario describes the lane geometry, the ego starting state, the
//! detected objects (in their own sensor frames) and the static transforms
//! between those frames and the planning frame.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Deserialize;
use std::path::Path;

// Internal
use msgs_if::{
    frame::TransformSet,
    geom::{CurrentPose, Header, Point3, Quaternion, VehicleStatus},
    lane::{Lane, Waypoint},
    obj::{DetectedObject, DetectedObjectArray},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Scenario playback client.
pub struct SimClient {
    scenario: Scenario,

    /// Lane waypoint positions in the planning frame
    lane_x_m: Vec<f64>,
    lane_y_m: Vec<f64>,

    /// Ego distance travelled along the lane
    progress_m: f64,

    /// Current ego speed
    speed_ms: f64,

    /// Elapsed simulation time
    time_s: f64,

    /// Message sequence counter
    seq: u64,
}

/// A complete playback scenario.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// How long the scenario runs for
    pub duration_s: f64,

    pub lane: LaneSpec,
    pub ego: EgoSpec,

    #[serde(default)]
    pub objects: Vec<ObjectSpec>,

    #[serde(default)]
    pub transforms: Vec<TransformSpec>,
}

/// Lane geometry, either an explicit waypoint list or a straight segment
/// between two points.
#[derive(Debug, Deserialize)]
pub struct LaneSpec {
    pub frame_id: String,

    #[serde(default)]
    pub waypoints: Vec<[f64; 2]>,

    pub start_m: Option<[f64; 2]>,
    pub end_m: Option<[f64; 2]>,
    pub spacing_m: Option<f64>,

    #[serde(default)]
    pub z_m: f64,
}

/// Ego starting state.
#[derive(Debug, Deserialize)]
pub struct EgoSpec {
    pub speed_ms: f64,
}

/// A detected object, positioned in its own sensor frame.
#[derive(Debug, Deserialize)]
pub struct ObjectSpec {
    pub frame_id: String,
    pub x_m: f64,
    pub y_m: f64,
    pub dim_x_m: f64,
    pub dim_y_m: f64,
    pub velocity_ms: f64,
}

/// A static transform between two frames.
#[derive(Debug, Deserialize)]
pub struct TransformSpec {
    pub from: String,
    pub to: String,
    pub x_m: f64,
    pub y_m: f64,
    pub rotation_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimClientError {
    #[error("Could not read the scenario file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Could not parse the scenario file: {0}")]
    DeserialiseError(toml::de::Error),

    #[error("The scenario lane has fewer than two waypoints")]
    EmptyLane,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimClient {
    /// Load a scenario file and build the client from it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimClientError> {
        let text = std::fs::read_to_string(path).map_err(SimClientError::FileLoadError)?;
        let scenario: Scenario =
            toml::from_str(&text).map_err(SimClientError::DeserialiseError)?;
        Self::from_scenario(scenario)
    }

    /// Build the client from an already-parsed scenario.
    pub fn from_scenario(scenario: Scenario) -> Result<Self, SimClientError> {
        let (lane_x_m, lane_y_m) = build_lane_points(&scenario.lane)?;

        Ok(SimClient {
            speed_ms: scenario.ego.speed_ms,
            scenario,
            lane_x_m,
            lane_y_m,
            progress_m: 0.0,
            time_s: 0.0,
            seq: 0,
        })
    }

    /// Advance the simulation by one cycle, tracking the commanded velocity.
    pub fn step(&mut self, dt_s: f64, commanded_ms: f64) {
        self.speed_ms = commanded_ms;
        self.progress_m += self.speed_ms * dt_s;
        self.time_s += dt_s;
        self.seq += 1;
    }

    /// True once the scenario duration has elapsed or the ego has run off
    /// the end of the lane.
    pub fn finished(&self) -> bool {
        self.time_s >= self.scenario.duration_s || self.progress_m >= self.lane_length_m()
    }

    pub fn elapsed_s(&self) -> f64 {
        self.time_s
    }

    /// Current ego pose in the planning frame.
    pub fn pose(&self) -> CurrentPose {
        let (x_m, y_m, yaw_rad) = self.interp_at(self.progress_m);
        CurrentPose { x_m, y_m, yaw_rad }
    }

    /// Current measured ego speed.
    pub fn speed_ms(&self) -> f64 {
        self.speed_ms
    }

    /// Current vehicle status message.
    pub fn vehicle_status(&self) -> VehicleStatus {
        VehicleStatus {
            drive_mode: 1,
            speed_ms: self.speed_ms,
            steering_angle_rad: 0.0,
        }
    }

    /// The lane message for this cycle.
    pub fn lane(&self) -> Lane {
        let mut lane = Lane::default();
        lane.header = self.header();
        lane.waypoints = self
            .lane_x_m
            .iter()
            .zip(&self.lane_y_m)
            .map(|(&x_m, &y_m)| Waypoint {
                position: Point3 {
                    x_m,
                    y_m,
                    z_m: self.scenario.lane.z_m,
                },
                orientation: Quaternion::default(),
                velocity_ms: 0.0,
            })
            .collect();
        lane
    }

    /// The detected object array for this cycle, in the objects' own frames.
    pub fn detected_objects(&self) -> DetectedObjectArray {
        DetectedObjectArray {
            header: self.header(),
            objects: self
                .scenario
                .objects
                .iter()
                .map(|obj| DetectedObject {
                    header: Header {
                        seq: self.seq,
                        frame_id: obj.frame_id.clone(),
                    },
                    position: Point3 {
                        x_m: obj.x_m,
                        y_m: obj.y_m,
                        z_m: 0.0,
                    },
                    dimensions: Point3 {
                        x_m: obj.dim_x_m,
                        y_m: obj.dim_y_m,
                        z_m: 0.0,
                    },
                    velocity_ms: obj.velocity_ms,
                })
                .collect(),
        }
    }

    /// The static transforms declared by the scenario.
    pub fn transforms(&self) -> TransformSet {
        let mut set = TransformSet::new();
        for tf in &self.scenario.transforms {
            set.set(&tf.from, &tf.to, Vector2::new(tf.x_m, tf.y_m), tf.rotation_rad);
        }
        set
    }

    fn header(&self) -> Header {
        Header {
            seq: self.seq,
            frame_id: self.scenario.lane.frame_id.clone(),
        }
    }

    fn lane_length_m(&self) -> f64 {
        let mut length = 0.0;
        for i in 0..self.lane_x_m.len() - 1 {
            length += ((self.lane_x_m[i + 1] - self.lane_x_m[i]).powi(2)
                + (self.lane_y_m[i + 1] - self.lane_y_m[i]).powi(2))
            .sqrt();
        }
        length
    }

    /// Interpolate the pose at a given arc length along the lane.
    fn interp_at(&self, arc_m: f64) -> (f64, f64, f64) {
        let mut remaining = arc_m.max(0.0);

        for i in 0..self.lane_x_m.len() - 1 {
            let dx = self.lane_x_m[i + 1] - self.lane_x_m[i];
            let dy = self.lane_y_m[i + 1] - self.lane_y_m[i];
            let seg_len = (dx * dx + dy * dy).sqrt();

            if remaining <= seg_len && seg_len > 0.0 {
                let frac = remaining / seg_len;
                return (
                    self.lane_x_m[i] + frac * dx,
                    self.lane_y_m[i] + frac * dy,
                    dy.atan2(dx),
                );
            }

            remaining -= seg_len;
        }

        // Past the end, clamp to the final point
        let n = self.lane_x_m.len();
        let dx = self.lane_x_m[n - 1] - self.lane_x_m[n - 2];
        let dy = self.lane_y_m[n - 1] - self.lane_y_m[n - 2];
        (self.lane_x_m[n - 1], self.lane_y_m[n - 1], dy.atan2(dx))
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Expand the lane spec into waypoint positions.
fn build_lane_points(spec: &LaneSpec) -> Result<(Vec<f64>, Vec<f64>), SimClientError> {
    if !spec.waypoints.is_empty() {
        if spec.waypoints.len() < 2 {
            return Err(SimClientError::EmptyLane);
        }
        let x = spec.waypoints.iter().map(|p| p[0]).collect();
        let y = spec.waypoints.iter().map(|p| p[1]).collect();
        return Ok((x, y));
    }

    match (spec.start_m, spec.end_m, spec.spacing_m) {
        (Some(start), Some(end), Some(spacing)) if spacing > 0.0 => {
            let length = ((end[0] - start[0]).powi(2) + (end[1] - start[1]).powi(2)).sqrt();
            let n = (length / spacing).floor() as usize + 1;
            if n < 2 {
                return Err(SimClientError::EmptyLane);
            }

            let mut x = Vec::with_capacity(n);
            let mut y = Vec::with_capacity(n);
            for i in 0..n {
                let frac = (i as f64 * spacing) / length;
                x.push(start[0] + frac * (end[0] - start[0]));
                y.push(start[1] + frac * (end[1] - start[1]));
            }
            Ok((x, y))
        }
        _ => Err(SimClientError::EmptyLane),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const SCENARIO_TOML: &str = r#"
        duration_s = 30.0

        [lane]
        frame_id = "map"
        start_m = [0.0, 0.0]
        end_m = [100.0, 0.0]
        spacing_m = 1.0

        [ego]
        speed_ms = 0.0

        [[objects]]
        frame_id = "sensor"
        x_m = 5.0
        y_m = 0.0
        dim_x_m = 2.0
        dim_y_m = 2.0
        velocity_ms = 0.0

        [[transforms]]
        from = "sensor"
        to = "map"
        x_m = 10.0
        y_m = 0.0
        rotation_rad = 0.0
    "#;

    fn test_client() -> SimClient {
        let scenario: Scenario = toml::from_str(SCENARIO_TOML).unwrap();
        SimClient::from_scenario(scenario).unwrap()
    }

    #[test]
    fn test_lane_expansion() {
        let client = test_client();
        let lane = client.lane();

        assert_eq!(lane.waypoints.len(), 101);
        assert!((lane.waypoints[100].position.x_m - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_step_advances_along_lane() {
        let mut client = test_client();

        for _ in 0..10 {
            client.step(0.1, 2.0);
        }

        let pose = client.pose();
        assert!((pose.x_m - 2.0).abs() < 1e-9);
        assert!(pose.y_m.abs() < 1e-9);
        assert!((client.speed_ms() - 2.0).abs() < 1e-9);
        assert!(!client.finished());
    }

    #[test]
    fn test_object_transform_into_planning_frame() {
        let client = test_client();
        let transforms = client.transforms();
        let objects = client.detected_objects();

        let (x_m, y_m) = transforms
            .transform_point(
                (objects.objects[0].position.x_m, objects.objects[0].position.y_m),
                &objects.objects[0].header.frame_id,
                "map",
            )
            .unwrap();

        assert!((x_m - 15.0).abs() < 1e-9);
        assert!(y_m.abs() < 1e-9);
    }

    #[test]
    fn test_finished_at_duration() {
        let mut client = test_client();

        for _ in 0..300 {
            client.step(0.1, 0.0);
        }

        assert!(client.finished());
    }
}
