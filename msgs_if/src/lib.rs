//! # Messages interface library
//!
//! Typed definitions of the messages exchanged between the speed planner core
//! and its external collaborators: ego state snapshots, lanes, detected
//! objects, and the coordinate-frame transform capability. The transport that
//! delivers these messages is outside the planner - collaborators hand over
//! already-deserialized structures and accept typed outputs back.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod frame;
pub mod geom;
pub mod lane;
pub mod obj;
