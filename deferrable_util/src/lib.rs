#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// Current-time helper shared by the other modules in this crate.
mod time;
pub use self::time::now_seconds;

/// TTL stamping and expiry checks.
pub mod ttl;
pub use self::ttl::{is_expired, is_expired_at, stamp_ttl};

/// The exponential backoff formula applied to retried items.
pub mod backoff;
pub use self::backoff::{apply_exponential_backoff, backoff_delay_seconds, BACKOFF_BASE, BACKOFF_CONSTANT, MAXIMUM_DELAY_SECONDS};
