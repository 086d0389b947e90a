use async_trait::async_trait;
use deferrable_debounce::DebounceStore;
use redis::aio::ConnectionManager;
use redis::Script;

use crate::error::RedisQueueError;

/// A [`DebounceStore`] backed by the two scripts named in spec.md §6: one
/// atomic two-key read, one atomic two-key write.
///
/// Both scripts are compiled once at construction and sent with
/// `EVALSHA`/`EVAL` by the `redis` crate's [`Script`] on every call, which
/// is what makes the read in [`DebounceStore::get_debounce_keys`]
/// effectively atomic even though it touches two keys.
pub struct RedisDebounceStore {
    conn: ConnectionManager,
    get_script: Script,
    set_script: Script,
}

impl RedisDebounceStore {
    /// Wraps `conn`.
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            get_script: Script::new(include_str!("lua/get_debounce_keys.lua")),
            set_script: Script::new(include_str!("lua/set_debounce_keys.lua")),
        }
    }

    fn last_push_key(fingerprint: &str) -> String {
        format!("last_push.{fingerprint}")
    }

    fn debounce_key(fingerprint: &str) -> String {
        format!("debounce.{fingerprint}")
    }
}

#[async_trait]
impl DebounceStore for RedisDebounceStore {
    type Error = RedisQueueError;

    async fn get_debounce_keys(
        &self,
        fingerprint: &str,
    ) -> Result<(Option<f64>, Option<f64>), Self::Error> {
        let mut conn = self.conn.clone();
        let (last_push, debounce): (Option<String>, Option<String>) = self
            .get_script
            .key(Self::last_push_key(fingerprint))
            .key(Self::debounce_key(fingerprint))
            .invoke_async(&mut conn)
            .await?;

        Ok((
            last_push.and_then(|value| value.parse().ok()),
            debounce.and_then(|value| value.parse().ok()),
        ))
    }

    async fn set_debounce_keys(
        &self,
        fingerprint: &str,
        now: f64,
        seconds_to_delay: f64,
        window_seconds: f64,
    ) -> Result<(), Self::Error> {
        let mut conn = self.conn.clone();
        self.set_script
            .key(Self::last_push_key(fingerprint))
            .key(Self::debounce_key(fingerprint))
            .arg(now)
            .arg(seconds_to_delay)
            .arg(window_seconds)
            .invoke_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}
