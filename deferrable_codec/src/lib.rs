#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// A tagged-union value used for arguments, keyword arguments, and metadata.
mod value;
pub use self::value::Value;

/// Deterministic encode/decode between [`Value`] and a transport-safe string.
mod codec;
pub use self::codec::{Codec, JsonCodec};

/// The item envelope, its fingerprint, and call resolution helpers.
pub mod item;
pub use self::item::{decode_call, fingerprint, pretty_describe, ErrorInfo, Item};

/// The name-indexed table of registered callables.
pub mod registry;
pub use self::registry::{CallError, CallResult, Callable, CallRegistry, RegistryError, SourceLocation};

/// Codec-level errors.
mod error;
pub use self::error::CodecError;
