use crate::error::CodecError;
use crate::value::Value;

/// Encodes a [`Value`] to a transport-safe string and back.
///
/// Implementations must be deterministic for equal inputs: two equal
/// [`Value`]s must always encode to the same string, since debounce
/// fingerprints and the `kwargs` envelope field depend on it.
pub trait Codec {
    /// Encodes `value` to a transport-safe string.
    fn encode(value: &Value) -> Result<String, CodecError>;
    /// Decodes a string previously produced by [`Codec::encode`].
    fn decode(bytes: &str) -> Result<Value, CodecError>;
}

/// The default [`Codec`]: plain JSON, via `serde_json`.
///
/// JSON objects serialize their keys in the order a `serde_json::Map`
/// iterates them; since [`Value::Map`] is a [`std::collections::BTreeMap`],
/// that order is always the sorted key order, which is what makes this
/// codec's output deterministic.
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(value: &Value) -> Result<String, CodecError> {
        serde_json::to_string(value).map_err(CodecError::Encode)
    }

    fn decode(bytes: &str) -> Result<Value, CodecError> {
        serde_json::from_str(bytes).map_err(CodecError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trip_is_lossless() {
        let value = Value::List(vec![Value::Int(1), Value::Str("x".to_string())]);

        let encoded = JsonCodec::encode(&value).unwrap();
        let decoded = JsonCodec::decode(&encoded).unwrap();

        assert_eq!(value, decoded);
    }

    #[test]
    fn encoding_is_deterministic() {
        let value = Value::Str("same".to_string());

        assert_eq!(
            JsonCodec::encode(&value).unwrap(),
            JsonCodec::encode(&value).unwrap()
        );
    }
}
