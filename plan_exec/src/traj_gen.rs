//! # Trajectory generation module
//!
//! Resamples the raw lane waypoints into a trajectory with constant
//! arc-length spacing, starting near the ego vehicle's current position. The
//! raw path is decimated and smoothed with a moving average before
//! resampling to suppress sensor and discretisation noise, then heading and
//! curvature are derived per sample.
//!
//! The resampling origin is the path point nearest (Euclidean) to the current
//! position. Callers must guarantee paths are simple curves - on a
//! self-intersecting path the nearest point can jump between branches.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use util::maths::{moving_average, wrap_pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Floor on arc-length denominators when differencing heading.
const ARC_EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A trajectory - the resampled path with per-sample heading and curvature.
///
/// All per-sample vectors have identical length. The nominal spacing between
/// consecutive samples is `ds_m`; the final segment may be shorter if the
/// source path was exhausted before the preview distance was covered.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Trajectory {
    pub x_m: Vec<f64>,
    pub y_m: Vec<f64>,
    pub yaw_rad: Vec<f64>,

    /// Signed curvature, positive turning towards +yaw
    pub curv_m: Vec<f64>,

    /// Cumulative arc length from the first sample
    pub s_m: Vec<f64>,

    /// Nominal sample spacing
    pub ds_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised during trajectory generation.
#[derive(Debug, thiserror::Error)]
pub enum TrajGenError {
    #[error("The input path has too few points to build a trajectory ({0} usable)")]
    InsufficientPathData(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trajectory {
    /// Get the number of samples in the trajectory.
    pub fn num_points(&self) -> usize {
        self.x_m.len()
    }

    /// Get the position of the sample at the given index.
    pub fn point(&self, index: usize) -> Vector2<f64> {
        Vector2::new(self.x_m[index], self.y_m[index])
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build a trajectory from the raw path.
///
/// The path is decimated (keeping every `decimation`-th point plus the last),
/// smoothed over `smoothing_window` points, then resampled at `ds_m` from the
/// point nearest `current_pos` until `preview_distance_m` is covered or the
/// path runs out. Running out early truncates the trajectory - it is not an
/// error.
pub fn build(
    current_pos: Vector2<f64>,
    path_x_m: &[f64],
    path_y_m: &[f64],
    ds_m: f64,
    preview_distance_m: f64,
    decimation: usize,
    smoothing_window: usize,
) -> Result<Trajectory, TrajGenError> {
    let num_raw = usize::min(path_x_m.len(), path_y_m.len());
    if num_raw < 2 {
        return Err(TrajGenError::InsufficientPathData(num_raw));
    }

    // ---- DECIMATE AND SMOOTH ----

    let (dec_x, dec_y) = decimate(&path_x_m[..num_raw], &path_y_m[..num_raw], decimation);
    let smooth_x = moving_average(&dec_x, smoothing_window);
    let smooth_y = moving_average(&dec_y, smoothing_window);

    if smooth_x.len() < 2 {
        return Err(TrajGenError::InsufficientPathData(smooth_x.len()));
    }

    // ---- RESAMPLE FROM THE NEAREST POINT ----

    let origin = nearest_point_index(current_pos, &smooth_x, &smooth_y);

    let (res_x, res_y, res_s) = resample(
        &smooth_x[origin..],
        &smooth_y[origin..],
        ds_m,
        preview_distance_m,
    );

    let num_samples = res_x.len();
    if num_samples < 2 {
        return Err(TrajGenError::InsufficientPathData(num_samples));
    }

    // ---- HEADING AND CURVATURE ----

    let mut yaw_rad = vec![0.0; num_samples];
    for i in 0..num_samples - 1 {
        yaw_rad[i] = (res_y[i + 1] - res_y[i]).atan2(res_x[i + 1] - res_x[i]);
    }
    yaw_rad[num_samples - 1] = yaw_rad[num_samples - 2];

    // Curvature is the change of heading per unit arc length, central
    // differenced where both neighbours exist.
    let mut curv_m = vec![0.0; num_samples];
    for i in 1..num_samples - 1 {
        let arc = (res_s[i + 1] - res_s[i - 1]).max(ARC_EPSILON);
        curv_m[i] = wrap_pi(yaw_rad[i + 1] - yaw_rad[i - 1]) / arc;
    }
    if num_samples > 2 {
        curv_m[0] = curv_m[1];
        curv_m[num_samples - 1] = curv_m[num_samples - 2];
    }

    Ok(Trajectory {
        x_m: res_x,
        y_m: res_y,
        yaw_rad,
        curv_m,
        s_m: res_s,
        ds_m,
    })
}

/// Find the index of the path point nearest to the given position.
///
/// Ties break to the first index.
pub fn nearest_point_index(pos: Vector2<f64>, path_x_m: &[f64], path_y_m: &[f64]) -> usize {
    let mut nearest = 0;
    let mut nearest_dist_sq = f64::INFINITY;

    for i in 0..path_x_m.len() {
        let dist_sq = (path_x_m[i] - pos[0]).powi(2) + (path_y_m[i] - pos[1]).powi(2);
        if dist_sq < nearest_dist_sq {
            nearest_dist_sq = dist_sq;
            nearest = i;
        }
    }

    nearest
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Keep every `decimation`-th point of the path, always keeping the last.
fn decimate(path_x_m: &[f64], path_y_m: &[f64], decimation: usize) -> (Vec<f64>, Vec<f64>) {
    let step = usize::max(decimation, 1);

    let mut dec_x: Vec<f64> = path_x_m.iter().step_by(step).copied().collect();
    let mut dec_y: Vec<f64> = path_y_m.iter().step_by(step).copied().collect();

    // The final point anchors the end of the path, keep it even if it doesn't
    // fall on the decimation grid.
    if (path_x_m.len() - 1) % step != 0 {
        dec_x.push(path_x_m[path_x_m.len() - 1]);
        dec_y.push(path_y_m[path_y_m.len() - 1]);
    }

    (dec_x, dec_y)
}

/// Resample the polyline at constant arc step `ds_m`, up to `preview_m` of
/// arc or the end of the polyline, whichever comes first.
fn resample(
    path_x_m: &[f64],
    path_y_m: &[f64],
    ds_m: f64,
    preview_m: f64,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut res_x = vec![path_x_m[0]];
    let mut res_y = vec![path_y_m[0]];
    let mut res_s = vec![0.0];

    // Arc length of the most recent sample and distance still needed along
    // the polyline to the next one
    let mut total_s = 0.0;
    let mut need = ds_m;

    'segments: for i in 0..path_x_m.len() - 1 {
        let seg = Vector2::new(path_x_m[i + 1] - path_x_m[i], path_y_m[i + 1] - path_y_m[i]);
        let seg_len = seg.norm();

        if seg_len < ARC_EPSILON {
            continue;
        }

        let dir = seg / seg_len;
        let mut along = 0.0;

        while seg_len - along >= need {
            along += need;
            need = ds_m;

            // Consecutive samples are exactly ds_m of arc apart - a carry
            // across a raw segment boundary only moves where the sample
            // lands, not how far apart the samples are. Taking s from the
            // sample index keeps it equal to the arc actually travelled.
            total_s = res_s.len() as f64 * ds_m;

            // Stop one step short of the preview distance so the trajectory
            // covers [0, preview).
            if total_s >= preview_m {
                break 'segments;
            }

            res_x.push(path_x_m[i] + dir[0] * along);
            res_y.push(path_y_m[i] + dir[1] * along);
            res_s.push(total_s);
        }

        need -= seg_len - along;
    }

    // Path exhausted before the preview distance: close with the final point
    // as a shorter last segment.
    let remaining = ds_m - need;
    if total_s < preview_m && remaining > ARC_EPSILON {
        res_x.push(path_x_m[path_x_m.len() - 1]);
        res_y.push(path_y_m[path_y_m.len() - 1]);
        res_s.push(total_s + remaining);
    }

    (res_x, res_y, res_s)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
