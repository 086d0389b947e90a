use thiserror::Error;
use tracing::warn;

use crate::store::DebounceStore;
use crate::strategy::{decide, Strategy};
use deferrable_util::now_seconds;

/// Wraps a [`DebounceStore`] with the decision algorithm from
/// `get_debounce_strategy`.
///
/// Any store failure is caught and surfaced as
/// [`DebounceError::StoreUnavailable`] rather than propagated raw — callers
/// (the engine) are expected to fall back to an immediate, undelayed push
/// and emit a `debounce_error` event, per the invariant that a debounce
/// store outage must never lose work.
pub struct DebounceController<S> {
    store: S,
}

/// A debounce decision failed because the backing store could not be
/// reached or returned malformed data.
#[derive(Debug, Error)]
#[error("debounce store unavailable: {0}")]
pub struct DebounceError<E>(#[source] pub E);

impl<S: DebounceStore> DebounceController<S> {
    /// Wraps `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Runs the full decide-then-persist sequence for `fingerprint`, per
    /// spec §4.2: read both keys, decide a [`Strategy`], and — unless the
    /// strategy is [`Strategy::Skip`] — persist the keys implied by that
    /// strategy.
    pub async fn decide(
        &self,
        fingerprint: &str,
        window_seconds: u64,
        always_delay: bool,
    ) -> Result<Strategy, DebounceError<S::Error>> {
        let window_seconds = window_seconds as f64;
        let now = now_seconds();

        let (last_push_time, debounce_time) = self
            .store
            .get_debounce_keys(fingerprint)
            .await
            .map_err(DebounceError)?;

        let strategy = decide(last_push_time, debounce_time, now, window_seconds, always_delay);

        if strategy != Strategy::Skip {
            let seconds_to_delay = match strategy {
                Strategy::PushDelayed(seconds) => seconds,
                _ => 0.0,
            };
            if let Err(error) = self
                .store
                .set_debounce_keys(fingerprint, now, seconds_to_delay, window_seconds)
                .await
            {
                warn!(fingerprint, error = %error, "failed to persist debounce keys");
                return Err(DebounceError(error));
            }
        }

        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDebounceStore;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn first_call_pushes_now() {
        let controller = DebounceController::new(MemoryDebounceStore::new());
        let strategy = controller.decide("f.[].{}", 1, false).await.unwrap();
        assert_eq!(strategy, Strategy::PushNow);
    }

    #[tokio::test]
    async fn second_call_within_window_is_delayed() {
        let controller = DebounceController::new(MemoryDebounceStore::new());
        controller.decide("f.[].{}", 10, false).await.unwrap();
        let strategy = controller.decide("f.[].{}", 10, false).await.unwrap();
        assert!(matches!(strategy, Strategy::PushDelayed(_)));
    }

    #[tokio::test]
    async fn third_call_is_skipped() {
        let controller = DebounceController::new(MemoryDebounceStore::new());
        controller.decide("f.[].{}", 10, false).await.unwrap();
        controller.decide("f.[].{}", 10, false).await.unwrap();
        let strategy = controller.decide("f.[].{}", 10, false).await.unwrap();
        assert_eq!(strategy, Strategy::Skip);
    }

    #[tokio::test]
    async fn always_delay_skips_the_second_call() {
        let controller = DebounceController::new(MemoryDebounceStore::new());
        let first = controller.decide("f.[].{}", 1, true).await.unwrap();
        let second = controller.decide("f.[].{}", 1, true).await.unwrap();
        assert_eq!(first, Strategy::PushDelayed(1.0));
        assert_eq!(second, Strategy::Skip);
    }
}
