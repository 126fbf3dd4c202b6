//! Geometric message types

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Header attached to messages which carry a coordinate frame.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Header {
    /// Message sequence counter
    pub seq: u64,

    /// The coordinate frame the message's geometry is expressed in
    pub frame_id: String,
}

/// The ego vehicle's current pose in the planning frame.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct CurrentPose {
    pub x_m: f64,
    pub y_m: f64,
    pub yaw_rad: f64,
}

/// A longitudinal velocity message.
///
/// Used both for the measured ego velocity coming in and the desired velocity
/// going out.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Twist {
    pub linear_x_ms: f64,
}

/// Status of the vehicle platform.
///
/// The planner consumes this as an opaque passthrough - none of the fields
/// affect the plan.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct VehicleStatus {
    pub drive_mode: u8,
    pub speed_ms: f64,
    pub steering_angle_rad: f64,
}

/// A position in 3D space.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
}

/// An orientation as a quaternion.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

impl Quaternion {
    /// Build the quaternion representing a rotation of `yaw_rad` about the
    /// vertical axis.
    pub fn from_yaw(yaw_rad: f64) -> Self {
        let q = UnitQuaternion::from_euler_angles(0.0, 0.0, yaw_rad);

        Quaternion {
            x: q.coords[0],
            y: q.coords[1],
            z: q.coords[2],
            w: q.coords[3],
        }
    }

    /// Get the yaw angle represented by this quaternion.
    pub fn yaw_rad(&self) -> f64 {
        UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(
            self.w, self.x, self.y, self.z,
        ))
        .euler_angles()
        .2
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_quaternion_yaw_round_trip() {
        for yaw in [-2.0f64, -0.5, 0.0, 0.5, 1.5].iter() {
            let q = Quaternion::from_yaw(*yaw);
            assert!((q.yaw_rad() - yaw).abs() < 1e-9);
        }
    }
}
