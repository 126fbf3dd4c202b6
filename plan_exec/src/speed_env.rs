//! # Speed envelope module
//!
//! Derives per-sample speed and acceleration bounds from the trajectory's
//! curvature and the friction configuration. Two levels are produced for
//! each quantity: a hard (restricted) bound that must never be exceeded, and
//! a tighter comfort target the optimiser steers towards. The envelope is a
//! pure function of the trajectory and configuration.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use crate::traj_gen::Trajectory;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Gravitational acceleration used by the friction model.
const GRAV_ACCEL_MS2: f64 = 9.83;

/// Fraction of the friction limit available as a hard acceleration bound.
const K_HARD: f64 = 0.5;

/// Fraction of the friction limit used as the comfort acceleration target.
/// Must stay below `K_HARD`.
const K_COMFORT: f64 = 0.4;

/// Floor on curvature denominators for straight segments.
const CURV_EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Per-sample speed and acceleration bounds.
///
/// All vectors share the owning trajectory's length.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SpeedEnvelope {
    /// Hard speed ceiling (restricted speed)
    pub vr_ms: Vec<f64>,

    /// Comfort speed target (desired speed), curvature-limited
    pub vd_ms: Vec<f64>,

    /// Hard longitudinal acceleration bound
    pub ar_lon_ms2: Vec<f64>,

    /// Hard lateral acceleration bound
    pub ar_lat_ms2: Vec<f64>,

    /// Comfort longitudinal acceleration target
    pub ac_lon_ms2: Vec<f64>,

    /// Comfort lateral acceleration target
    pub ac_lat_ms2: Vec<f64>,
}

/// Configuration for envelope generation, a subset of the planner params.
#[derive(Clone, Copy, Debug)]
pub struct EnvelopeConfig {
    /// Hard speed limit applied to every sample
    pub speed_limit_ms: f64,

    /// Margin keeping the desired speed strictly below the limit
    pub speed_margin_ms: f64,

    /// Tyre-road friction coefficient
    pub mu: f64,

    /// Lateral acceleration bound used for the curvature speed limit
    pub lateral_g_ms2: f64,

    /// Scaling of how strongly curvature tightens the lateral comfort bound
    pub curvature_weight: f64,

    /// Per-sample decay blending comfort bounds towards the hard bounds
    /// further along the horizon
    pub decay_factor: f64,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the speed envelope for the given trajectory.
pub fn build(traj: &Trajectory, cfg: &EnvelopeConfig) -> SpeedEnvelope {
    let n = traj.num_points();

    let mut env = SpeedEnvelope {
        vr_ms: vec![0.0; n],
        vd_ms: vec![0.0; n],
        ar_lon_ms2: vec![0.0; n],
        ar_lat_ms2: vec![0.0; n],
        ac_lon_ms2: vec![0.0; n],
        ac_lat_ms2: vec![0.0; n],
    };

    let ar = K_HARD * cfg.mu * GRAV_ACCEL_MS2;
    let ac = K_COMFORT * cfg.mu * GRAV_ACCEL_MS2;

    for i in 0..n {
        let curv_abs = traj.curv_m[i].abs();

        env.vr_ms[i] = cfg.speed_limit_ms;
        env.vd_ms[i] = (cfg.speed_limit_ms - cfg.speed_margin_ms)
            .min((cfg.lateral_g_ms2 / (curv_abs + CURV_EPSILON)).sqrt());

        env.ar_lon_ms2[i] = ar;
        env.ar_lat_ms2[i] = ar;

        // Comfort bounds blend towards the hard bounds further along the
        // horizon, where prediction confidence is lower. Pure tuning knob.
        let blend = 1.0 - cfg.decay_factor.powi(i as i32);

        env.ac_lon_ms2[i] = ac + blend * (ar - ac);

        // Lateral comfort additionally tightens with curvature
        let ac_lat = ac / (1.0 + cfg.curvature_weight * curv_abs);
        env.ac_lat_ms2[i] = ac_lat + blend * (ar - ac_lat);
    }

    env
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn test_config() -> EnvelopeConfig {
        EnvelopeConfig {
            speed_limit_ms: 5.0,
            speed_margin_ms: 0.1,
            mu: 0.8,
            lateral_g_ms2: 0.4,
            curvature_weight: 20.0,
            decay_factor: 0.8,
        }
    }

    fn straight_trajectory(n: usize) -> Trajectory {
        Trajectory {
            x_m: (0..n).map(|i| i as f64 * 0.1).collect(),
            y_m: vec![0.0; n],
            yaw_rad: vec![0.0; n],
            curv_m: vec![0.0; n],
            s_m: (0..n).map(|i| i as f64 * 0.1).collect(),
            ds_m: 0.1,
        }
    }

    #[test]
    fn test_straight_path_desired_speed() {
        let traj = straight_trajectory(50);
        let env = build(&traj, &test_config());

        // With zero curvature the curvature limit is far above the speed
        // limit, so the desired speed is limit minus margin everywhere
        for i in 0..50 {
            assert!((env.vd_ms[i] - 4.9).abs() < 1e-9);
            assert!(env.vd_ms[i] < env.vr_ms[i]);
        }
    }

    #[test]
    fn test_curvature_lowers_desired_speed() {
        let mut traj = straight_trajectory(10);
        traj.curv_m[5] = 0.5;

        let env = build(&traj, &test_config());

        // sqrt(0.4 / 0.5) ~ 0.894
        assert!(env.vd_ms[5] < 1.0);
        assert!(env.vd_ms[4] > env.vd_ms[5]);
    }

    #[test]
    fn test_comfort_within_hard_bounds() {
        let mut traj = straight_trajectory(100);
        for i in 0..100 {
            traj.curv_m[i] = 0.01 * i as f64;
        }

        let env = build(&traj, &test_config());

        for i in 0..100 {
            assert!(env.ac_lon_ms2[i] <= env.ar_lon_ms2[i] + 1e-12);
            assert!(env.ac_lat_ms2[i] <= env.ar_lat_ms2[i] + 1e-12);
            assert!(env.ac_lon_ms2[i] > 0.0);
            assert!(env.ac_lat_ms2[i] > 0.0);
        }
    }

    #[test]
    fn test_decay_relaxes_comfort_ahead() {
        let traj = straight_trajectory(100);
        let env = build(&traj, &test_config());

        // Comfort bound grows towards the hard bound with index
        assert!(env.ac_lon_ms2[0] < env.ac_lon_ms2[50]);
        assert!(env.ac_lon_ms2[99] <= env.ar_lon_ms2[99] + 1e-12);

        // At the first sample the comfort bound is the raw comfort fraction
        let expected = 0.4 * 0.8 * GRAV_ACCEL_MS2;
        assert!((env.ac_lon_ms2[0] - expected).abs() < 1e-9);
    }
}
