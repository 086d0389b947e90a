use async_trait::async_trait;
use std::error::Error as StdError;

/// A shared key-value store capable of the one atomic read/write pair the
/// debounce controller needs.
///
/// Implementations are expected to back `debounce.{fingerprint}` and
/// `last_push.{fingerprint}` with per-key TTLs; the exact key naming is up
/// to the implementation, but the two keys must be read together
/// atomically where the backend supports it (a server-side script for
/// redis) so that concurrent producers can't observe a torn state.
#[async_trait]
pub trait DebounceStore: Send + Sync {
    /// The error type this store's transport can fail with.
    type Error: StdError + Send + Sync + 'static;

    /// Reads both keys for `fingerprint` in one round trip, returning
    /// `(last_push_time, debounce_time)`. Either may be absent.
    async fn get_debounce_keys(
        &self,
        fingerprint: &str,
    ) -> Result<(Option<f64>, Option<f64>), Self::Error>;

    /// Atomically sets `last_push.{fingerprint} = now` (TTL `2 * window_seconds`)
    /// and, when `seconds_to_delay > 0`, `debounce.{fingerprint} = now`
    /// (TTL `seconds_to_delay`).
    async fn set_debounce_keys(
        &self,
        fingerprint: &str,
        now: f64,
        seconds_to_delay: f64,
        window_seconds: f64,
    ) -> Result<(), Self::Error>;
}
