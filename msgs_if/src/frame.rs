//! Coordinate-frame transform capability
//!
//! The planner needs obstacle positions in the planning frame, but the
//! perception stack reports them in its own frame. An externally supplied
//! [`TransformSet`] performs the conversion. Lookups can fail - the planner
//! treats a failed lookup as "obstacles unavailable this cycle" rather than
//! an error.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Isometry2, Point2, Vector2};
use std::collections::HashMap;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A set of known transforms between named 2D coordinate frames.
#[derive(Clone, Debug, Default)]
pub struct TransformSet {
    transforms: HashMap<(String, String), Isometry2<f64>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by transform lookups.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("No transform from frame \"{from}\" to frame \"{to}\" is known")]
    UnknownFrames { from: String, to: String },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TransformSet {
    /// Create an empty transform set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the transform taking points in `from` into `to`.
    ///
    /// The inverse transform is registered as well.
    pub fn set(&mut self, from: &str, to: &str, translation: Vector2<f64>, rotation_rad: f64) {
        let iso = Isometry2::new(translation, rotation_rad);

        self.transforms
            .insert((String::from(from), String::from(to)), iso);
        self.transforms
            .insert((String::from(to), String::from(from)), iso.inverse());
    }

    /// Transform a point expressed in frame `from` into frame `to`.
    pub fn transform_point(
        &self,
        point: (f64, f64),
        from: &str,
        to: &str,
    ) -> Result<(f64, f64), TransformError> {
        // Identity for matching frames
        if from == to {
            return Ok(point);
        }

        let iso = self
            .transforms
            .get(&(String::from(from), String::from(to)))
            .ok_or_else(|| TransformError::UnknownFrames {
                from: String::from(from),
                to: String::from(to),
            })?;

        let transformed = iso.transform_point(&Point2::new(point.0, point.1));

        Ok((transformed.x, transformed.y))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_identity_for_same_frame() {
        let tf = TransformSet::new();
        assert_eq!(
            tf.transform_point((1.0, 2.0), "map", "map").unwrap(),
            (1.0, 2.0)
        );
    }

    #[test]
    fn test_translation_and_inverse() {
        let mut tf = TransformSet::new();
        tf.set("velodyne", "map", Vector2::new(10.0, -5.0), 0.0);

        let p = tf.transform_point((1.0, 1.0), "velodyne", "map").unwrap();
        assert!((p.0 - 11.0).abs() < 1e-12);
        assert!((p.1 + 4.0).abs() < 1e-12);

        // Inverse direction is registered automatically
        let q = tf.transform_point(p, "map", "velodyne").unwrap();
        assert!((q.0 - 1.0).abs() < 1e-12);
        assert!((q.1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_frames_error() {
        let tf = TransformSet::new();
        assert!(tf.transform_point((0.0, 0.0), "a", "b").is_err());
    }
}
