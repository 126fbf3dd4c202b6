//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of nanoseconds, or `None` if overflow
pub fn duration_to_nanos(duration: chrono::Duration) -> Option<f64> {
    duration.num_nanoseconds().map(|ns| ns as f64)
}

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration_to_nanos(duration).map(|ns| ns / NANOS_PER_SECOND as f64)
}
