//! # Speed Optimiser Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use nalgebra::Vector2;
use plan_lib::{
    col_check::CollisionOutcome,
    speed_env::{self, EnvelopeConfig},
    speed_opt::{self, InitialCondition, SolverConfig, Weights},
    traj_gen,
};

fn speed_opt_benchmark(c: &mut Criterion) {
    // ---- Build a curved path and its trajectory ----

    // A 200 m path with a gentle sine weave, at 1 m waypoint spacing
    let path_x_m: Vec<f64> = (0..200).map(|i| i as f64).collect();
    let path_y_m: Vec<f64> = (0..200).map(|i| (i as f64 * 0.05).sin() * 3.0).collect();

    let traj = traj_gen::build(
        Vector2::new(0.0, 0.0),
        &path_x_m,
        &path_y_m,
        0.1,
        20.0,
        1,
        5,
    )
    .unwrap();

    let env = speed_env::build(
        &traj,
        &EnvelopeConfig {
            speed_limit_ms: 5.0,
            speed_margin_ms: 0.1,
            mu: 0.8,
            lateral_g_ms2: 0.4,
            curvature_weight: 20.0,
            decay_factor: 0.8,
        },
    );

    let weights = Weights {
        time: 0.0,
        smooth: 15.0,
        velocity: 0.001,
        lon_slack: 1.0,
        lat_slack: 10.0,
    };

    let cfg = SolverConfig {
        max_iters: 200,
        tolerance: 1e-3,
        max_speed_ms: 4.9,
        safe_time_margin_s: 10.0,
    };

    let collision = CollisionOutcome {
        collides: true,
        time_s: 6.5,
        dist_m: 13.0,
    };

    // ---- Benchmarks ----

    c.bench_function("solve clear path", |b| {
        b.iter(|| {
            speed_opt::solve(
                &traj,
                &env,
                &CollisionOutcome::default(),
                &InitialCondition {
                    v0_ms: 2.0,
                    a0_ms2: 0.0,
                },
                &weights,
                &cfg,
            )
            .unwrap()
        })
    });

    c.bench_function("solve with conflict", |b| {
        b.iter(|| {
            speed_opt::solve(
                &traj,
                &env,
                &collision,
                &InitialCondition {
                    v0_ms: 2.0,
                    a0_ms2: 0.0,
                },
                &weights,
                &cfg,
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, speed_opt_benchmark);
criterion_main!(benches);
