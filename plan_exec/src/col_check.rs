//! # Collision check module
//!
//! Predicts whether, when and where the ego vehicle will first come into
//! conflict with a dynamic obstacle while following the trajectory.
//!
//! The ego footprint is an oriented rectangle placed at each trajectory
//! sample; each obstacle occupies a disc whose reach grows with time at the
//! obstacle's reported speed (a conservative straight-line projection - the
//! obstacle's heading is not reported). Arrival times come from holding the
//! current ego speed constant. Obstacle motion is assumed linear over the
//! horizon; the fixed re-plan period re-projects every cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Rotation2, Vector2};
use serde::Serialize;

// Internal
use crate::traj_gen::Trajectory;
use msgs_if::{
    frame::{TransformError, TransformSet},
    obj::DetectedObjectArray,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Floor on the ego speed hypothesis when converting arc length to time.
const MIN_HYPOTHESIS_SPEED_MS: f64 = 0.1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Static geometric description of the ego vehicle.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct VehicleInfo {
    pub length_m: f64,
    pub width_m: f64,
    pub wheelbase_m: f64,
    pub safety_margin_m: f64,
}

/// A dynamic obstacle snapshot in the planning frame.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Obstacle {
    pub x_m: f64,
    pub y_m: f64,

    /// Occupancy radius, from the bounding-box diagonal
    pub radius_m: f64,

    /// Longitudinal speed of the obstacle
    pub vel_ms: f64,
}

/// The outcome of a collision prediction.
///
/// `time_s` and `dist_m` are only meaningful when `collides` is true.
/// `dist_m` is measured along the trajectory's arc from the first sample.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct CollisionOutcome {
    pub collides: bool,
    pub time_s: f64,
    pub dist_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleInfo {
    pub fn new(length_m: f64, width_m: f64, wheelbase_m: f64, safety_margin_m: f64) -> Self {
        VehicleInfo {
            length_m,
            width_m,
            wheelbase_m,
            safety_margin_m,
        }
    }
}

impl Obstacle {
    /// Build the cycle's obstacle set from a detected object array,
    /// transforming positions into the given planning frame.
    ///
    /// A failed transform lookup fails the whole set - the caller degrades to
    /// "obstacles unavailable" for the cycle.
    pub fn set_from_objects(
        objects: &DetectedObjectArray,
        transforms: &TransformSet,
        planning_frame: &str,
    ) -> Result<Vec<Obstacle>, TransformError> {
        let mut obstacles = Vec::with_capacity(objects.objects.len());

        for object in &objects.objects {
            let (x_m, y_m) = transforms.transform_point(
                (object.position.x_m, object.position.y_m),
                &object.header.frame_id,
                planning_frame,
            )?;

            obstacles.push(Obstacle {
                x_m,
                y_m,
                radius_m: (object.dimensions.x_m.powi(2) + object.dimensions.y_m.powi(2)).sqrt(),
                vel_ms: object.velocity_ms,
            });
        }

        Ok(obstacles)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Predict the earliest conflict between the trajectory and the obstacles.
///
/// Returns `{collides: false}` when the obstacle set is empty or no conflict
/// occurs within `horizon_s`.
pub fn predict(
    traj: &Trajectory,
    vehicle: &VehicleInfo,
    obstacles: &[Obstacle],
    ego_speed_ms: f64,
    horizon_s: f64,
) -> CollisionOutcome {
    let speed = ego_speed_ms.abs().max(MIN_HYPOTHESIS_SPEED_MS);

    let half_len = 0.5 * vehicle.length_m + vehicle.safety_margin_m;
    let half_wid = 0.5 * vehicle.width_m + vehicle.safety_margin_m;

    for i in 0..traj.num_points() {
        let arrival_s = traj.s_m[i] / speed;
        if arrival_s > horizon_s {
            break;
        }

        let centre = traj.point(i);
        let to_body = Rotation2::new(-traj.yaw_rad[i]);

        for obstacle in obstacles {
            // Reach of the obstacle at the ego's arrival time
            let reach_m = obstacle.radius_m + obstacle.vel_ms.abs() * arrival_s;

            // Distance from the obstacle centre to the footprint rectangle,
            // evaluated in the body frame of this sample
            let local = to_body * (Vector2::new(obstacle.x_m, obstacle.y_m) - centre);
            let dx = (local[0].abs() - half_len).max(0.0);
            let dy = (local[1].abs() - half_wid).max(0.0);
            let separation_m = (dx * dx + dy * dy).sqrt() - reach_m;

            if separation_m <= 0.0 {
                return CollisionOutcome {
                    collides: true,
                    time_s: arrival_s,
                    dist_m: traj.s_m[i],
                };
            }
        }
    }

    CollisionOutcome::default()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn straight_trajectory(length_m: f64, ds_m: f64) -> Trajectory {
        let n = (length_m / ds_m) as usize;
        Trajectory {
            x_m: (0..n).map(|i| i as f64 * ds_m).collect(),
            y_m: vec![0.0; n],
            yaw_rad: vec![0.0; n],
            curv_m: vec![0.0; n],
            s_m: (0..n).map(|i| i as f64 * ds_m).collect(),
            ds_m,
        }
    }

    fn test_vehicle() -> VehicleInfo {
        VehicleInfo::new(5.0, 1.895, 2.790, 0.1)
    }

    #[test]
    fn test_no_obstacles_no_conflict() {
        let traj = straight_trajectory(20.0, 0.1);
        let outcome = predict(&traj, &test_vehicle(), &[], 2.0, 10.0);
        assert!(!outcome.collides);
    }

    #[test]
    fn test_obstacle_on_path_conflicts() {
        let traj = straight_trajectory(20.0, 0.1);

        let obstacle = Obstacle {
            x_m: 15.0,
            y_m: 0.0,
            radius_m: 2.0,
            vel_ms: 0.0,
        };

        let outcome = predict(&traj, &test_vehicle(), &[obstacle], 2.0, 10.0);

        assert!(outcome.collides);

        // First contact happens before the obstacle centre, offset by the
        // obstacle radius and the front of the footprint
        assert!(outcome.dist_m > 9.0 && outcome.dist_m < 14.0);
        assert!((outcome.time_s - outcome.dist_m / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_obstacle_off_path_no_conflict() {
        let traj = straight_trajectory(20.0, 0.1);

        let obstacle = Obstacle {
            x_m: 10.0,
            y_m: 8.0,
            radius_m: 1.0,
            vel_ms: 0.0,
        };

        let outcome = predict(&traj, &test_vehicle(), &[obstacle], 2.0, 10.0);
        assert!(!outcome.collides);
    }

    #[test]
    fn test_moving_obstacle_reach_grows() {
        let traj = straight_trajectory(20.0, 0.1);

        // Static: no conflict at 4 m lateral offset. Moving at 2 m/s the
        // reach covers the offset by the time the ego draws level.
        let mut obstacle = Obstacle {
            x_m: 15.0,
            y_m: 4.0,
            radius_m: 1.0,
            vel_ms: 0.0,
        };

        assert!(!predict(&traj, &test_vehicle(), &[obstacle], 2.0, 10.0).collides);

        obstacle.vel_ms = 2.0;
        assert!(predict(&traj, &test_vehicle(), &[obstacle], 2.0, 10.0).collides);
    }

    #[test]
    fn test_horizon_bounds_prediction() {
        let traj = straight_trajectory(20.0, 0.1);

        let obstacle = Obstacle {
            x_m: 15.0,
            y_m: 0.0,
            radius_m: 2.0,
            vel_ms: 0.0,
        };

        // At 1 m/s the conflict is ~10 s away; a 5 s horizon never sees it
        let outcome = predict(&traj, &test_vehicle(), &[obstacle], 1.0, 5.0);
        assert!(!outcome.collides);
    }
}
