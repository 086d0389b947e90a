use thiserror::Error;

/// Failure to encode or decode a value through the wire codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The underlying JSON encoding failed.
    #[error("failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),
    /// The underlying JSON decoding failed.
    #[error("failed to decode value: {0}")]
    Decode(#[source] serde_json::Error),
}
