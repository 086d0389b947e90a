use async_trait::async_trait;
use deferrable_codec::Item;
use deferrable_queue::{Queue, QueueStats};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::warn;

use crate::error::RedisQueueError;

/// The error-hash pair to a [`crate::RedisReliableQueue`]: a hash of
/// `deferrable:<group>:errors`, keyed by `error.id`.
///
/// Unlike the main queue, `pop` does not remove the entry it returns — per
/// spec.md §4.3.2 the error queue is meant to be *browsed*, with entries
/// only ever removed by an explicit [`complete`](Queue::complete) on the
/// id. FIFO and delay are both unsupported; iteration order over a redis
/// hash is unspecified.
pub struct RedisErrorQueue {
    conn: ConnectionManager,
    hash_key: String,
}

impl RedisErrorQueue {
    /// Wraps `conn`, scoping the hash under `group`.
    pub fn new(conn: ConnectionManager, group: impl Into<String>) -> Self {
        Self {
            conn,
            hash_key: format!("deferrable:{}:errors", group.into()),
        }
    }
}

#[async_trait]
impl Queue for RedisErrorQueue {
    const FIFO: bool = false;
    const SUPPORTS_DELAY: bool = false;

    type Envelope = String;
    type Error = RedisQueueError;

    async fn push(&self, mut item: Item) -> Result<(), Self::Error> {
        let id = match &mut item.error {
            Some(error) if !error.id.is_empty() => error.id.clone(),
            Some(error) => {
                let id = uuid::Uuid::new_v4().to_string();
                warn!(method = %item.method, "error item missing error.id, generating one");
                error.id = id.clone();
                id
            }
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                warn!(method = %item.method, "error item has no error info, generating an id anyway");
                id
            }
        };

        let encoded = serde_json::to_string(&item)?;
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(&self.hash_key, &id, &encoded).await?;
        Ok(())
    }

    async fn pop(&self) -> Result<Option<(Self::Envelope, Item)>, Self::Error> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.hkeys(&self.hash_key).await?;
        let Some(id) = keys.into_iter().next() else {
            return Ok(None);
        };
        let encoded: Option<String> = conn.hget(&self.hash_key, &id).await?;
        let Some(encoded) = encoded else {
            // Raced with a concurrent complete(); treat as empty.
            return Ok(None);
        };
        let item: Item = serde_json::from_str(&encoded)?;
        Ok(Some((id, item)))
    }

    async fn complete(&self, envelope: Self::Envelope) -> Result<(), Self::Error> {
        let mut conn = self.conn.clone();
        conn.hdel::<_, _, ()>(&self.hash_key, &envelope).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Self::Error> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&self.hash_key).await?;
        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats, Self::Error> {
        let mut conn = self.conn.clone();
        let available: u64 = conn.hlen(&self.hash_key).await?;
        Ok(QueueStats {
            available: Some(available),
            in_flight: Some(0),
            delayed: None,
        })
    }
}
