use serde::Deserialize;

/// Redrive policy: after `max_receive_count` receives without a `complete`,
/// the cloud service auto-moves the message to `dead_letter_queue_name`.
#[derive(Clone, Debug, Deserialize)]
pub struct RedrivePolicy {
    /// The name of the queue to move exhausted messages to.
    pub dead_letter_queue_name: String,
    /// How many receives before a message is considered exhausted.
    pub max_receive_count: u32,
}

/// Tuning knobs for a [`crate::CloudQueue`].
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CloudQueueConfig {
    /// Long-poll wait time, in seconds, capped at 20 (the SQS maximum).
    pub wait_time_seconds: u32,
    /// Visibility timeout applied to received messages, in seconds.
    pub visibility_timeout_seconds: u32,
    /// Whether `push`/`pop` should create the underlying queue (and its
    /// error-queue sibling) if it does not already exist.
    pub create_if_missing: bool,
    /// Optional redrive policy applied to the main queue at creation time.
    pub redrive: Option<RedrivePolicy>,
}

/// Hard cap on batch operation size, per spec.md §4.3.3 and the real SQS API.
pub const MAX_BATCH_SIZE: usize = 10;

/// Hard cap on a single message's delay, in seconds.
pub const MAX_DELAY_SECONDS: u64 = 900;

impl Default for CloudQueueConfig {
    fn default() -> Self {
        Self {
            wait_time_seconds: 20,
            visibility_timeout_seconds: 30,
            create_if_missing: false,
            redrive: None,
        }
    }
}
