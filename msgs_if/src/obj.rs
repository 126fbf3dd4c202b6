//! Detected object message types

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use crate::geom::{Header, Point3};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single object reported by the perception stack.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DetectedObject {
    pub header: Header,

    /// Position of the object's bounding-box centre, in the frame given by
    /// `header.frame_id`
    pub position: Point3,

    /// Bounding-box dimensions
    pub dimensions: Point3,

    /// Longitudinal velocity of the object
    pub velocity_ms: f64,
}

/// A set of detected objects sharing a source frame.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DetectedObjectArray {
    pub header: Header,
    pub objects: Vec<DetectedObject>,
}
