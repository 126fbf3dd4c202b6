//! Plan manager parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::speed_opt::Weights;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the plan manager
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Planning cycle period
    pub planning_period_s: f64,

    /// Frame all planning happens in. Obstacle positions reported in other
    /// frames are transformed into this one.
    pub planning_frame: String,

    /// Arc-length step between trajectory samples
    pub sample_step_m: f64,

    /// Arc length of the planning horizon
    pub preview_distance_m: f64,

    /// Keep every n-th lane waypoint before smoothing
    pub decimation: usize,

    /// Window of the moving-average path smoother, in kept waypoints
    pub smoothing_window: usize,

    /// Vehicle length
    pub vehicle_length_m: f64,

    /// Vehicle width
    pub vehicle_width_m: f64,

    /// Vehicle wheelbase
    pub wheelbase_m: f64,

    /// Margin inflating the vehicle footprint for collision checks
    pub safety_margin_m: f64,

    /// Vehicle mass
    pub mass_kg: f64,

    /// Tyre-road friction coefficient
    pub mu: f64,

    /// Lateral acceleration bound for the curvature speed limit
    pub lateral_g_ms2: f64,

    /// Scaling of how strongly curvature tightens the lateral comfort bound
    pub curvature_weight: f64,

    /// Per-sample decay blending comfort bounds towards the hard bounds
    pub decay_factor: f64,

    /// Hard speed limit
    pub speed_limit_ms: f64,

    /// Margin keeping the desired speed below the limit
    pub speed_margin_ms: f64,

    /// Absolute ceiling on the commanded velocity
    pub max_speed_ms: f64,

    /// How far ahead in time collisions are predicted
    pub collision_horizon_s: f64,

    /// Extra time margin on the collision approach speed cap
    pub safe_time_margin_s: f64,

    /// Iteration cap for the profile solver
    pub solver_max_iters: usize,

    /// Convergence threshold for the profile solver
    pub solver_tolerance: f64,

    /// Cost weights for the profile solver
    pub weights: Weights,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Params {
            planning_period_s: 0.1,
            planning_frame: String::from("map"),
            sample_step_m: 0.1,
            preview_distance_m: 20.0,
            decimation: 10,
            smoothing_window: 50,
            vehicle_length_m: 5.0,
            vehicle_width_m: 1.895,
            wheelbase_m: 2.790,
            safety_margin_m: 0.1,
            mass_kg: 1500.0,
            mu: 0.8,
            lateral_g_ms2: 0.4,
            curvature_weight: 20.0,
            decay_factor: 0.8,
            speed_limit_ms: 5.0,
            speed_margin_ms: 0.1,
            max_speed_ms: 4.9,
            collision_horizon_s: 10.0,
            safe_time_margin_s: 10.0,
            solver_max_iters: 200,
            solver_tolerance: 1e-3,
            weights: Weights {
                time: 0.0,
                smooth: 15.0,
                velocity: 0.001,
                lon_slack: 1.0,
                lat_slack: 10.0,
            },
        }
    }
}
