//! Plan manager module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::*;
use crate::col_check::{self, CollisionOutcome, Obstacle, VehicleInfo};
use crate::speed_env::{self, EnvelopeConfig};
use crate::speed_opt::{self, InitialCondition, OptimizedProfile, SolverConfig};
use crate::traj_gen::{self, Trajectory};
use msgs_if::{
    geom::{CurrentPose, Quaternion, Twist, VehicleStatus},
    lane::{Lane, Waypoint},
};
use util::{module::State, params as param_loader, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Plan manager state
#[derive(Default)]
pub struct PlanMgr {
    params: Params,

    /// Executing mode
    mode: PlanMode,

    /// The plan carried over from the last successful cycle
    memory: Option<PlannerMemory>,

    report: StatusReport,
}

/// The inputs the plan manager needs each cycle.
#[derive(Clone, Debug)]
pub struct InputData {
    /// Current vehicle pose in the planning frame
    pub pose: CurrentPose,

    /// Measured vehicle speed
    pub speed_ms: f64,

    /// Raw vehicle status, passed through to consumers untouched
    pub status: VehicleStatus,

    /// The lane to plan speeds over
    pub lane: Lane,

    /// Obstacles in the planning frame. `None` means obstacle data was
    /// unavailable this cycle, which disables collision prediction.
    pub obstacles: Option<Vec<Obstacle>>,
}

/// The plan produced by a successful cycle.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PlanOutput {
    /// The input lane with re-planned waypoint velocities
    pub lane: Lane,

    /// The velocity to command this cycle
    pub desired_velocity: Twist,

    /// Path curvature at the vehicle's position
    pub curvature_m: f64,
}

/// The status report containing monitoring quantities for the cycle.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct StatusReport {
    /// Number of points in this cycle's trajectory
    pub num_traj_points: usize,

    /// The collision prediction for this cycle
    pub collision: CollisionOutcome,

    /// True if the solve was warm-started from the previous plan
    pub warm_started: bool,

    /// The initial condition handed to the solver
    pub initial_condition: InitialCondition,

    /// True if this cycle produced no plan
    pub cycle_dropped: bool,
}

/// The plan retained between cycles for warm starting.
struct PlannerMemory {
    trajectory: Trajectory,
    profile: OptimizedProfile,

    /// The velocity commanded when this plan was produced
    commanded_ms: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible modes of execution of PlanMgr.
///
/// The transition out of `Uninitialised` is one way, on the first successful
/// plan. Dropped cycles in `Steady` mode do not fall back.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PlanMode {
    Uninitialised,
    Steady,
}

impl Default for PlanMode {
    fn default() -> Self {
        PlanMode::Uninitialised
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for PlanMgr {
    type InitData = &'static str;
    type InitError = PlanMgrError;

    type InputData = InputData;
    type OutputData = Option<PlanOutput>;
    type StatusReport = StatusReport;
    type ProcError = PlanMgrError;

    /// Initialise the plan manager.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), PlanMgrError> {
        self.params = match param_loader::load(init_data) {
            Ok(p) => p,
            Err(e) => return Err(PlanMgrError::ParamLoadError(e)),
        };

        info!(
            "PlanMgr initialised: {} kg vehicle, {} s cycle, {} m horizon",
            self.params.mass_kg, self.params.planning_period_s, self.params.preview_distance_m
        );

        Ok(())
    }

    /// Run one planning cycle.
    ///
    /// A cycle that cannot produce a plan (too little path data, or an
    /// infeasible solve) outputs `None` and leaves the carried plan
    /// untouched. Only genuine faults are errors.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), PlanMgrError> {
        self.report = StatusReport::default();

        let current_pos = Vector2::new(input_data.pose.x_m, input_data.pose.y_m);

        // ---- TRAJECTORY ----

        let path_x_m: Vec<f64> = input_data
            .lane
            .waypoints
            .iter()
            .map(|w| w.position.x_m)
            .collect();
        let path_y_m: Vec<f64> = input_data
            .lane
            .waypoints
            .iter()
            .map(|w| w.position.y_m)
            .collect();

        let traj = match traj_gen::build(
            current_pos,
            &path_x_m,
            &path_y_m,
            self.params.sample_step_m,
            self.params.preview_distance_m,
            self.params.decimation,
            self.params.smoothing_window,
        ) {
            Ok(t) => t,
            Err(e) => {
                warn!("Dropping cycle, cannot build trajectory: {}", e);
                self.report.cycle_dropped = true;
                return Ok((None, self.report));
            }
        };

        self.report.num_traj_points = traj.num_points();

        // ---- ENVELOPE ----

        let env = speed_env::build(
            &traj,
            &EnvelopeConfig {
                speed_limit_ms: self.params.speed_limit_ms,
                speed_margin_ms: self.params.speed_margin_ms,
                mu: self.params.mu,
                lateral_g_ms2: self.params.lateral_g_ms2,
                curvature_weight: self.params.curvature_weight,
                decay_factor: self.params.decay_factor,
            },
        );

        // ---- WARM START ----

        let init = match &self.memory {
            Some(mem) => {
                let idx = traj_gen::nearest_point_index(current_pos, &mem.trajectory.x_m, &mem.trajectory.y_m);
                let v0_ms = mem.profile.velocity_ms[idx.min(mem.profile.velocity_ms.len() - 1)];

                self.report.warm_started = true;

                InitialCondition {
                    v0_ms,
                    a0_ms2: (v0_ms - mem.commanded_ms) / self.params.planning_period_s,
                }
            }
            None => InitialCondition {
                v0_ms: input_data.speed_ms,
                a0_ms2: 0.0,
            },
        };

        self.report.initial_condition = init;

        // ---- COLLISION PREDICTION ----

        let vehicle = VehicleInfo::new(
            self.params.vehicle_length_m,
            self.params.vehicle_width_m,
            self.params.wheelbase_m,
            self.params.safety_margin_m,
        );

        self.report.collision = match &input_data.obstacles {
            Some(obstacles) if !obstacles.is_empty() => col_check::predict(
                &traj,
                &vehicle,
                obstacles,
                input_data.speed_ms,
                self.params.collision_horizon_s,
            ),
            _ => CollisionOutcome::default(),
        };

        if self.report.collision.collides {
            debug!(
                "Predicted conflict in {:.2} s at {:.2} m along the path",
                self.report.collision.time_s, self.report.collision.dist_m
            );
        }

        // ---- PROFILE SOLVE ----

        let profile = match speed_opt::solve(
            &traj,
            &env,
            &self.report.collision,
            &init,
            &self.params.weights,
            &SolverConfig {
                max_iters: self.params.solver_max_iters,
                tolerance: self.params.solver_tolerance,
                max_speed_ms: self.params.max_speed_ms,
                safe_time_margin_s: self.params.safe_time_margin_s,
            },
        ) {
            Ok(p) => p,
            Err(e) => {
                warn!("Dropping cycle, profile solve failed: {}", e);
                self.report.cycle_dropped = true;
                return Ok((None, self.report));
            }
        };

        // ---- OUTPUT ----

        let commanded_ms = profile.velocity_ms[0];
        let output = self.build_output(input_data, &traj, &profile);

        self.memory = Some(PlannerMemory {
            trajectory: traj,
            profile,
            commanded_ms,
        });

        if self.mode == PlanMode::Uninitialised {
            self.mode = PlanMode::Steady;
            info!("First plan produced, entering steady planning");
        }

        Ok((Some(output), self.report))
    }
}

impl PlanMgr {
    /// The current executing mode.
    pub fn mode(&self) -> PlanMode {
        self.mode
    }

    /// The loaded parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Assemble the output lane and velocity command from the solved plan.
    fn build_output(
        &self,
        input_data: &InputData,
        traj: &Trajectory,
        profile: &OptimizedProfile,
    ) -> PlanOutput {
        let mut lane = input_data.lane.passthrough();

        // Waypoint height is not re-planned, carry it over from the input
        let z_m = input_data
            .lane
            .waypoints
            .first()
            .map(|w| w.position.z_m)
            .unwrap_or(0.0);

        lane.waypoints = (0..traj.num_points())
            .map(|i| {
                let mut wp = Waypoint::default();
                wp.position.x_m = traj.x_m[i];
                wp.position.y_m = traj.y_m[i];
                wp.position.z_m = z_m;
                wp.orientation = Quaternion::from_yaw(traj.yaw_rad[i]);
                wp.velocity_ms = profile.velocity_ms[i];
                wp
            })
            .collect();

        PlanOutput {
            lane,
            desired_velocity: Twist {
                linear_x_ms: profile.velocity_ms[0],
            },
            curvature_m: traj.curv_m[0],
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use msgs_if::geom::Point3;

    fn straight_lane(length_m: f64, spacing_m: f64) -> Lane {
        let n = (length_m / spacing_m) as usize + 1;
        let mut lane = Lane::default();
        lane.lane_id = 3;
        lane.cost = 1.5;
        lane.waypoints = (0..n)
            .map(|i| Waypoint {
                position: Point3 {
                    x_m: i as f64 * spacing_m,
                    y_m: 0.0,
                    z_m: 0.2,
                },
                orientation: Quaternion::default(),
                velocity_ms: 0.0,
            })
            .collect();
        lane
    }

    fn test_input(speed_ms: f64) -> InputData {
        InputData {
            pose: CurrentPose {
                x_m: 0.0,
                y_m: 0.0,
                yaw_rad: 0.0,
            },
            speed_ms,
            status: VehicleStatus::default(),
            lane: straight_lane(100.0, 0.1),
            obstacles: Some(Vec::new()),
        }
    }

    fn test_mgr() -> PlanMgr {
        PlanMgr {
            params: Params::default(),
            ..PlanMgr::default()
        }
    }

    #[test]
    fn test_cold_start_produces_plan() {
        let mut mgr = test_mgr();
        let (output, report) = mgr.proc(&test_input(1.0)).unwrap();

        let output = output.expect("expected a plan");
        assert!(!report.warm_started);
        assert_eq!(mgr.mode(), PlanMode::Steady);

        // Output waypoint count matches the trajectory, lane metadata is
        // passed through, heights carried from the input
        assert_eq!(output.lane.waypoints.len(), report.num_traj_points);
        assert_eq!(output.lane.lane_id, 3);
        assert!((output.lane.waypoints[10].position.z_m - 0.2).abs() < 1e-12);

        // The commanded velocity is the first profile sample
        assert!(
            (output.desired_velocity.linear_x_ms - output.lane.waypoints[0].velocity_ms).abs()
                < 1e-12
        );
    }

    #[test]
    fn test_cold_start_initial_condition() {
        let mut mgr = test_mgr();
        let (_, report) = mgr.proc(&test_input(1.7)).unwrap();

        assert!((report.initial_condition.v0_ms - 1.7).abs() < 1e-12);
        assert!(report.initial_condition.a0_ms2.abs() < 1e-12);
    }

    #[test]
    fn test_warm_start_continuity() {
        let mut mgr = test_mgr();

        let (_, first) = mgr.proc(&test_input(1.0)).unwrap();
        assert!(!first.warm_started);

        // Vehicle hasn't moved and its speed hasn't changed: the warm start
        // picks up the previously commanded speed with zero implied
        // acceleration
        let (output, second) = mgr.proc(&test_input(1.0)).unwrap();
        assert!(second.warm_started);
        assert!(output.is_some());
        assert!(second.initial_condition.a0_ms2.abs() < 1e-9);
    }

    #[test]
    fn test_warm_start_accel_uses_planning_period() {
        // Run the same two cycles at two planning periods. The second cycle
        // moves the ego down the path so the warm start reads the previous
        // profile away from its head and implies a non-zero acceleration.
        let a0_at = |period_s: f64| {
            let mut mgr = PlanMgr {
                params: Params {
                    planning_period_s: period_s,
                    ..Params::default()
                },
                ..PlanMgr::default()
            };

            mgr.proc(&test_input(1.0)).unwrap();

            // Past the head of the previous trajectory (smoothing pulls the
            // first sample to roughly x = 12.5 on this lane)
            let mut input = test_input(1.0);
            input.pose.x_m = 14.0;
            let (_, report) = mgr.proc(&input).unwrap();
            assert!(report.warm_started);
            report.initial_condition.a0_ms2
        };

        let fast = a0_at(0.1);
        let slow = a0_at(0.2);

        // Doubling the period halves the implied acceleration
        assert!(fast.abs() > 1e-6);
        assert!((fast - 2.0 * slow).abs() < 1e-9);
    }

    #[test]
    fn test_short_lane_drops_cycle() {
        let mut mgr = test_mgr();

        let mut input = test_input(1.0);
        input.lane.waypoints.truncate(1);

        let (output, report) = mgr.proc(&input).unwrap();
        assert!(output.is_none());
        assert!(report.cycle_dropped);
        assert_eq!(mgr.mode(), PlanMode::Uninitialised);
    }

    #[test]
    fn test_failed_cycle_keeps_memory() {
        let mut mgr = test_mgr();

        let (_, first) = mgr.proc(&test_input(1.0)).unwrap();
        assert!(!first.cycle_dropped);

        // Starve the next cycle of path data
        let mut input = test_input(1.0);
        input.lane.waypoints.clear();
        let (output, report) = mgr.proc(&input).unwrap();
        assert!(output.is_none());
        assert!(report.cycle_dropped);

        // The cycle after still warm-starts from the plan carried before the
        // failure
        let (_, third) = mgr.proc(&test_input(1.0)).unwrap();
        assert!(third.warm_started);
    }

    #[test]
    fn test_obstacle_slows_command() {
        let mut mgr = test_mgr();

        let mut blocked = test_input(2.0);
        blocked.obstacles = Some(vec![Obstacle {
            x_m: 15.0,
            y_m: 0.0,
            radius_m: 2.0,
            vel_ms: 0.0,
        }]);

        let (with_obstacle, report) = mgr.proc(&blocked).unwrap();
        assert!(report.collision.collides);

        let mut clear_mgr = test_mgr();
        let (without_obstacle, _) = clear_mgr.proc(&test_input(2.0)).unwrap();

        let v_blocked = with_obstacle.unwrap().desired_velocity.linear_x_ms;
        let v_clear = without_obstacle.unwrap().desired_velocity.linear_x_ms;
        assert!(v_blocked < v_clear);
    }

    #[test]
    fn test_missing_obstacle_data_disables_prediction() {
        let mut mgr = test_mgr();

        let mut input = test_input(1.0);
        input.obstacles = None;

        let (output, report) = mgr.proc(&input).unwrap();
        assert!(output.is_some());
        assert!(!report.collision.collides);
    }
}
