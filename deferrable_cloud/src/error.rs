use thiserror::Error;

/// Failures a [`crate::CloudQueue`] operation can surface.
#[derive(Debug, Error)]
pub enum CloudQueueError {
    /// The queue's URL could not be resolved and `create_if_missing` was
    /// false (or creation itself failed).
    #[error("queue {0} does not exist and create_if_missing is false")]
    QueueNotFound(String),
    /// An item could not be encoded or decoded to/from the message body.
    #[error("item codec error: {0}")]
    Codec(#[from] serde_json::Error),
    /// The SDK call itself failed.
    #[error("sqs request failed: {0}")]
    Sdk(String),
}

impl<E, R> From<aws_sdk_sqs::error::SdkError<E, R>> for CloudQueueError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    fn from(error: aws_sdk_sqs::error::SdkError<E, R>) -> Self {
        CloudQueueError::Sdk(error.to_string())
    }
}
