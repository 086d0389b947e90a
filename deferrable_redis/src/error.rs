use thiserror::Error;

/// Failures a redis-backed queue or debounce store can surface.
#[derive(Debug, Error)]
pub enum RedisQueueError {
    /// The underlying redis connection or command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    /// An item could not be encoded or decoded to/from its hash representation.
    #[error("item codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
