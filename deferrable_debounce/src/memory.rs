use std::collections::HashMap;
use std::convert::Infallible;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::store::DebounceStore;
use deferrable_util::now_seconds;

struct Entry {
    value: f64,
    expires_at: f64,
}

/// A process-local [`DebounceStore`], sufficient for a single-process
/// caller or for tests — the two-key read/write here is already atomic
/// (guarded by one mutex), unlike the best-effort pair of calls a
/// non-scripting redis client would have to fall back to.
#[derive(Default)]
pub struct MemoryDebounceStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryDebounceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn get(entries: &HashMap<String, Entry>, key: &str, now: f64) -> Option<f64> {
        entries.get(key).filter(|entry| entry.expires_at > now).map(|entry| entry.value)
    }
}

#[async_trait]
impl DebounceStore for MemoryDebounceStore {
    type Error = Infallible;

    async fn get_debounce_keys(
        &self,
        fingerprint: &str,
    ) -> Result<(Option<f64>, Option<f64>), Self::Error> {
        let entries = self.entries.lock();
        let now = now_seconds();
        let last_push = Self::get(&entries, &format!("last_push.{fingerprint}"), now);
        let debounce = Self::get(&entries, &format!("debounce.{fingerprint}"), now);
        Ok((last_push, debounce))
    }

    async fn set_debounce_keys(
        &self,
        fingerprint: &str,
        now: f64,
        seconds_to_delay: f64,
        window_seconds: f64,
    ) -> Result<(), Self::Error> {
        let mut entries = self.entries.lock();

        let last_push_value = now + seconds_to_delay;
        entries.insert(
            format!("last_push.{fingerprint}"),
            Entry {
                value: last_push_value,
                expires_at: now + 2.0 * window_seconds,
            },
        );

        if seconds_to_delay > 0.0 {
            entries.insert(
                format!("debounce.{fingerprint}"),
                Entry {
                    value: now,
                    expires_at: now + seconds_to_delay,
                },
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn round_trips_unset_keys_as_none() {
        let store = MemoryDebounceStore::new();
        let (last_push, debounce) = store.get_debounce_keys("f").await.unwrap();
        assert_eq!(last_push, None);
        assert_eq!(debounce, None);
    }

    #[tokio::test]
    async fn set_then_get_reflects_debounce_key_only_when_delayed() {
        let store = MemoryDebounceStore::new();
        store.set_debounce_keys("f", 100.0, 0.0, 10.0).await.unwrap();
        let (last_push, debounce) = store.get_debounce_keys("f").await.unwrap();
        assert_eq!(last_push, Some(100.0));
        assert_eq!(debounce, None);

        store.set_debounce_keys("f", 100.0, 5.0, 10.0).await.unwrap();
        let (_, debounce) = store.get_debounce_keys("f").await.unwrap();
        assert_eq!(debounce, Some(100.0));
    }
}
