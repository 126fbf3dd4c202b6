//! # Speed optimisation module
//!
//! Solves for the velocity profile over the trajectory. The profile is the
//! minimiser of a convex cost balancing travel time, smoothness and tracking
//! of the desired speed, subject to per-point speed caps and longitudinal
//! acceleration limits between consecutive points.
//!
//! The solver is a projected gradient descent over the squared-speed
//! formulation: acceleration between points i and i+1 over a fixed step ds
//! is (v[i+1]^2 - v[i]^2) / (2 ds), which keeps the feasibility projection
//! a pair of linear sweeps. Hard caps are enforced by projection after every
//! iteration; the comfort bounds and the initial condition enter the cost as
//! quadratic penalties.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Internal
use crate::col_check::CollisionOutcome;
use crate::speed_env::SpeedEnvelope;
use crate::traj_gen::Trajectory;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Gradient descent step size. Must stay below the inverse of the largest
/// cost curvature, which for the default weight set is dominated by the
/// smoothness and initial-condition terms.
const DESCENT_STEP: f64 = 0.002;

/// Stiffness of the initial-condition penalty tying the first two samples to
/// the warm-start speed and acceleration. Scaled by the longitudinal slack
/// weight.
const INITIAL_CONDITION_STIFFNESS: f64 = 50.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Cost weights for the profile optimisation.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Weights {
    /// Travel time (rewards higher speeds)
    pub time: f64,

    /// Smoothness (penalises speed changes between consecutive samples)
    pub smooth: f64,

    /// Tracking of the desired speed
    pub velocity: f64,

    /// Exceedance of the longitudinal comfort bound
    pub lon_slack: f64,

    /// Exceedance of the lateral comfort bound
    pub lat_slack: f64,
}

/// Warm-start condition for the first profile samples.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct InitialCondition {
    pub v0_ms: f64,
    pub a0_ms2: f64,
}

/// The optimised velocity profile, one sample per trajectory point.
#[derive(Clone, Debug, Default, Serialize)]
pub struct OptimizedProfile {
    pub velocity_ms: Vec<f64>,
}

/// Solver configuration, a subset of the planner params.
#[derive(Clone, Copy, Debug)]
pub struct SolverConfig {
    /// Iteration cap for the descent loop
    pub max_iters: usize,

    /// Convergence threshold on the largest per-sample update
    pub tolerance: f64,

    /// Absolute ceiling applied to the output profile
    pub max_speed_ms: f64,

    /// Extra time margin added to a predicted collision time when deriving
    /// the approach speed cap
    pub safe_time_margin_s: f64,
}

/// Errors which can occur during profile optimisation.
#[derive(Debug, Error)]
pub enum SpeedOptError {
    #[error("Trajectory has too few points ({0}) to optimise over")]
    EmptyTrajectory(usize),

    #[error("Solver failed to converge after {iters} iterations (residual {residual})")]
    Infeasible { iters: usize, residual: f64 },
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve for the velocity profile.
///
/// The returned profile has exactly one sample per trajectory point, lies in
/// `[0, max_speed_ms]`, respects the envelope's hard bounds and slows to the
/// collision approach cap when `collision.collides` is set.
pub fn solve(
    traj: &Trajectory,
    env: &SpeedEnvelope,
    collision: &CollisionOutcome,
    init: &InitialCondition,
    weights: &Weights,
    cfg: &SolverConfig,
) -> Result<OptimizedProfile, SpeedOptError> {
    let n = traj.num_points();
    if n < 2 {
        return Err(SpeedOptError::EmptyTrajectory(n));
    }

    let ds = traj.ds_m;

    // Per-point hard speed caps: restricted speed, curvature limit from the
    // hard lateral bound, and the collision approach cap where one applies
    let mut cap_ms = vec![0.0; n];
    for i in 0..n {
        let lat_cap = (env.ar_lat_ms2[i] / traj.curv_m[i].abs().max(1e-6)).sqrt();
        cap_ms[i] = env.vr_ms[i].min(lat_cap).min(cfg.max_speed_ms);
    }

    if collision.collides {
        // Speed that reaches the conflict point no earlier than the
        // predicted time plus the safety margin
        let approach_cap = collision.dist_m / (collision.time_s + cfg.safe_time_margin_s);
        for i in 0..n {
            if traj.s_m[i] <= collision.dist_m {
                cap_ms[i] = cap_ms[i].min(approach_cap.max(0.0));
            }
        }
    }

    // Initial guess: desired speed clamped to the caps
    let mut v: Vec<f64> = (0..n).map(|i| env.vd_ms[i].min(cap_ms[i])).collect();
    project_feasible(&mut v, &cap_ms, env, ds);

    let v1_target = init.v0_ms + init.a0_ms2 * (ds / init.v0_ms.max(0.5));

    let mut residual = f64::INFINITY;

    for iter in 0..cfg.max_iters {
        let mut grad = vec![0.0; n];

        for i in 0..n {
            // Travel time: faster is cheaper
            grad[i] -= weights.time;

            // Desired speed tracking
            grad[i] += 2.0 * weights.velocity * (v[i] - env.vd_ms[i]);

            // Longitudinal comfort exceedance, one-sided quadratic on the
            // segment acceleration
            if i + 1 < n {
                let a = (v[i + 1].powi(2) - v[i].powi(2)) / (2.0 * ds);
                let excess = a.abs() - env.ac_lon_ms2[i];
                if excess > 0.0 {
                    let d_a = weights.lon_slack * 2.0 * excess * a.signum() / ds;
                    grad[i + 1] += d_a * v[i + 1];
                    grad[i] -= d_a * v[i];
                }
            }

            // Lateral comfort exceedance: a_lat = v^2 |k|
            let a_lat = v[i].powi(2) * traj.curv_m[i].abs();
            let lat_excess = a_lat - env.ac_lat_ms2[i];
            if lat_excess > 0.0 {
                grad[i] += weights.lat_slack * 4.0 * lat_excess * v[i] * traj.curv_m[i].abs();
            }
        }

        // Smoothness: first difference of the speed series
        for i in 0..n - 1 {
            let d = v[i + 1] - v[i];
            grad[i] -= 2.0 * weights.smooth * d;
            grad[i + 1] += 2.0 * weights.smooth * d;
        }

        // Soft initial condition ties the head of the profile to the warm
        // start without risking infeasibility against the hard caps
        let ic_weight = weights.lon_slack * INITIAL_CONDITION_STIFFNESS;
        grad[0] += 2.0 * ic_weight * (v[0] - init.v0_ms);
        grad[1] += 2.0 * ic_weight * (v[1] - v1_target);

        residual = 0.0;
        for i in 0..n {
            let step = DESCENT_STEP * grad[i];
            v[i] -= step;
            residual = residual.max(step.abs());
        }

        project_feasible(&mut v, &cap_ms, env, ds);

        if !residual.is_finite() {
            return Err(SpeedOptError::Infeasible {
                iters: iter + 1,
                residual,
            });
        }

        if residual < cfg.tolerance {
            return Ok(OptimizedProfile { velocity_ms: v });
        }
    }

    if residual.is_finite() && residual < cfg.tolerance * 10.0 {
        // Close enough to converged that the profile is usable
        return Ok(OptimizedProfile { velocity_ms: v });
    }

    Err(SpeedOptError::Infeasible {
        iters: cfg.max_iters,
        residual,
    })
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Project the profile onto the hard constraint set: per-point caps and the
/// longitudinal acceleration limit between consecutive points.
///
/// The forward sweep limits acceleration, the backward sweep limits
/// deceleration. Both work on squared speeds so the bound is linear.
fn project_feasible(v: &mut [f64], cap_ms: &[f64], env: &SpeedEnvelope, ds: f64) {
    let n = v.len();

    for i in 0..n {
        v[i] = v[i].max(0.0).min(cap_ms[i]);
    }

    for i in 0..n - 1 {
        let limit_sq = v[i].powi(2) + 2.0 * env.ar_lon_ms2[i] * ds;
        if v[i + 1].powi(2) > limit_sq {
            v[i + 1] = limit_sq.sqrt();
        }
    }

    for i in (0..n - 1).rev() {
        let limit_sq = v[i + 1].powi(2) + 2.0 * env.ar_lon_ms2[i] * ds;
        if v[i].powi(2) > limit_sq {
            v[i] = limit_sq.sqrt();
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::speed_env::{self, EnvelopeConfig};

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

    fn test_env(traj: &Trajectory) -> SpeedEnvelope {
        speed_env::build(
            traj,
            &EnvelopeConfig {
                speed_limit_ms: 5.0,
                speed_margin_ms: 0.1,
                mu: 0.8,
                lateral_g_ms2: 0.4,
                curvature_weight: 20.0,
                decay_factor: 0.8,
            },
        )
    }

    fn test_weights() -> Weights {
        Weights {
            time: 0.0,
            smooth: 15.0,
            velocity: 0.001,
            lon_slack: 1.0,
            lat_slack: 10.0,
        }
    }

    fn test_config() -> SolverConfig {
        SolverConfig {
            max_iters: 200,
            tolerance: 1e-3,
            max_speed_ms: 4.9,
            safe_time_margin_s: 10.0,
        }
    }

    #[test]
    fn test_profile_size_and_bounds() {
        let traj = straight_trajectory(200);
        let env = test_env(&traj);

        let profile = solve(
            &traj,
            &env,
            &CollisionOutcome::default(),
            &InitialCondition {
                v0_ms: 2.0,
                a0_ms2: 0.0,
            },
            &test_weights(),
            &test_config(),
        )
        .unwrap();

        assert_eq!(profile.velocity_ms.len(), 200);
        for &v in &profile.velocity_ms {
            assert!(v >= 0.0 && v <= 4.9 + 1e-9);
        }
    }

    #[test]
    fn test_accel_limits_respected() {
        let traj = straight_trajectory(200);
        let env = test_env(&traj);

        let profile = solve(
            &traj,
            &env,
            &CollisionOutcome::default(),
            &InitialCondition {
                v0_ms: 0.5,
                a0_ms2: 0.0,
            },
            &test_weights(),
            &test_config(),
        )
        .unwrap();

        let v = &profile.velocity_ms;
        for i in 0..v.len() - 1 {
            let a = (v[i + 1].powi(2) - v[i].powi(2)) / (2.0 * traj.ds_m);
            assert!(a.abs() <= env.ar_lon_ms2[i] + 1e-6);
        }
    }

    #[test]
    fn test_straight_path_approaches_desired_speed() {
        let traj = straight_trajectory(200);
        let env = test_env(&traj);

        let profile = solve(
            &traj,
            &env,
            &CollisionOutcome::default(),
            &InitialCondition {
                v0_ms: 4.9,
                a0_ms2: 0.0,
            },
            &test_weights(),
            &test_config(),
        )
        .unwrap();

        // Already at the desired speed with no constraints active, the
        // profile should stay close to it over the whole horizon
        for &v in &profile.velocity_ms {
            assert!(v > 4.0, "profile dropped to {}", v);
        }
    }

    #[test]
    fn test_collision_caps_approach_speed() {
        let traj = straight_trajectory(200);
        let env = test_env(&traj);

        let collision = CollisionOutcome {
            collides: true,
            time_s: 6.5,
            dist_m: 13.0,
        };

        let profile = solve(
            &traj,
            &env,
            &collision,
            &InitialCondition {
                v0_ms: 0.5,
                a0_ms2: 0.0,
            },
            &test_weights(),
            &test_config(),
        )
        .unwrap();

        // 13.0 / (6.5 + 10.0) ~ 0.788 m/s cap on samples before the
        // conflict point
        let cap = 13.0 / 16.5;
        for i in 0..130 {
            assert!(
                profile.velocity_ms[i] <= cap + 1e-9,
                "sample {} at {} exceeds cap {}",
                i,
                profile.velocity_ms[i],
                cap
            );
        }
    }

    #[test]
    fn test_too_few_points_rejected() {
        let traj = straight_trajectory(1);
        let env = test_env(&traj);

        let result = solve(
            &traj,
            &env,
            &CollisionOutcome::default(),
            &InitialCondition::default(),
            &test_weights(),
            &test_config(),
        );

        assert!(matches!(result, Err(SpeedOptError::EmptyTrajectory(1))));
    }

    #[test]
    fn test_zero_iterations_infeasible() {
        let traj = straight_trajectory(50);
        let env = test_env(&traj);

        let cfg = SolverConfig {
            max_iters: 0,
            ..test_config()
        };

        let result = solve(
            &traj,
            &env,
            &CollisionOutcome::default(),
            &InitialCondition {
                v0_ms: 2.0,
                a0_ms2: 0.0,
            },
            &test_weights(),
            &cfg,
        );

        assert!(matches!(result, Err(SpeedOptError::Infeasible { .. })));
    }
}
