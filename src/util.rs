//! Small shared helpers.

use chrono::Utc;

/// Current unix time in milliseconds.
pub fn unix_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}
