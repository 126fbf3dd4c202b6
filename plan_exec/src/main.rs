//! Speed planner executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - System input acquisition:
//!             - Pose, speed and status from the simulation client
//!             - Lane and detected objects from the simulation client
//!         - Obstacle transformation into the planning frame
//!         - Plan manager processing
//!         - Command feedback into the simulation
//!
//! # Modules
//!
//! All modules (e.g. `plan_mgr`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use plan_lib::{
    col_check::Obstacle,
    data_store::DataStore,
    plan_mgr,
    sim_client::SimClient,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("plan_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Speed Planner Executable\n");
    info!("Running on: {}", host::get_host_desc());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- INITIALISE SIMULATION ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        return Err(eyre!(
            "Expected a single scenario file argument, found {}",
            args.len() - 1
        ));
    }

    info!("Loading scenario from \"{}\"", &args[1]);

    let mut sim_client = SimClient::from_file(&args[1]).wrap_err("Failed to load scenario")?;

    // The scenario's transforms are static, fetch them once
    let transforms = sim_client.transforms();

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.plan_mgr
        .init("plan_mgr.toml", &session)
        .wrap_err("Failed to initialise PlanMgr")?;
    info!("PlanMgr init complete");

    info!("Module initialisation complete\n");

    // The loop runs at the planning period, so the warm-start acceleration
    // inside PlanMgr is computed over the same interval the loop sleeps for
    let cycle_period_s = ds.plan_mgr.params().planning_period_s;

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    // The velocity currently commanded to the vehicle. Dropped cycles hold
    // the last command.
    let mut commanded_ms = sim_client.speed_ms();

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        if sim_client.finished() {
            info!("End of scenario reached, stopping");
            break;
        }

        ds.num_cycles += 1;
        ds.sim_time_s = sim_client.elapsed_s();

        // ---- DATA INPUT ----

        ds.pose = Some(sim_client.pose());
        ds.speed_ms = Some(sim_client.speed_ms());
        ds.vehicle_status = Some(sim_client.vehicle_status());
        ds.lane = Some(sim_client.lane());
        ds.detected_objects = Some(sim_client.detected_objects());

        // ---- OBSTACLE TRANSFORMATION ----

        // A failed transform disables collision prediction for the cycle
        // rather than stopping the planner
        let obstacles = match ds.detected_objects {
            Some(ref objects) => {
                match Obstacle::set_from_objects(
                    objects,
                    &transforms,
                    &ds.plan_mgr.params().planning_frame,
                ) {
                    Ok(o) => Some(o),
                    Err(e) => {
                        warn!("Could not transform detected objects: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        // ---- PLAN PROCESSING ----

        // Plan only when every required snapshot is present, a cycle without
        // them is a silent no-op
        match (ds.pose, ds.speed_ms, ds.vehicle_status, ds.lane.take()) {
            (Some(pose), Some(speed_ms), Some(status), Some(lane)) => {
                let input = plan_mgr::InputData {
                    pose,
                    speed_ms,
                    status,
                    lane,
                    obstacles,
                };

                match ds.plan_mgr.proc(&input) {
                    Ok((output, report)) => {
                        if report.cycle_dropped {
                            ds.num_dropped_cycles += 1;
                        }

                        ds.plan_status_rpt = report;
                        ds.plan_output = output;
                    }
                    Err(e) => {
                        // PlanMgr errors are faults in the module itself, stop
                        return Err(e).wrap_err("Error during PlanMgr processing");
                    }
                };
            }
            _ => {
                debug!("Input snapshots incomplete, skipping cycle");
                ds.num_dropped_cycles += 1;
            }
        }

        // ---- COMMAND FEEDBACK ----

        if let Some(ref output) = ds.plan_output {
            commanded_ms = output.desired_velocity.linear_x_ms;

            session.save(
                format!("plans/cycle_{:06}.json", ds.num_cycles),
                output.clone(),
            );
        }

        sim_client.step(cycle_period_s, commanded_ms);

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(cycle_period_s).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period_s
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }
    }

    // ---- SHUTDOWN ----

    info!(
        "Scenario complete: {} cycles run, {} dropped",
        ds.num_cycles, ds.num_dropped_cycles
    );

    session.exit();

    Ok(())
}
