use std::time::Duration;

use serde::Deserialize;

/// Tuning knobs for a [`crate::RedisReliableQueue`].
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RedisQueueConfig {
    /// How long `pop` blocks (polls) before giving up and returning `None`.
    /// Defaults to 3 seconds, per spec.
    pub wait_time: Duration,
    /// How long a popped-but-not-completed item stays in flight before the
    /// reliable queue reclaims it back onto the main list. Defaults to 300
    /// seconds, per spec.
    pub timeout: Duration,
    /// Upper bound on how many due-delayed or expired in-flight ids a
    /// single `pop` call will migrate back onto the main list.
    pub reclaim_batch_size: u32,
}

impl Default for RedisQueueConfig {
    fn default() -> Self {
        Self {
            wait_time: Duration::from_secs(3),
            timeout: Duration::from_secs(300),
            reclaim_batch_size: 100,
        }
    }
}
