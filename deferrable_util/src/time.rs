use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current time as seconds since the Unix epoch.
///
/// Centralized so that every timestamp field in the item envelope
/// (`first_push_time`, `last_push_time`, `item_queued_timestamp`, …) is
/// computed the same way.
pub fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs_f64()
}
