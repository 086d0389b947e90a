use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use deferrable_codec::Item;
use deferrable_queue::{Queue, QueueStats};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use crate::config::RedisQueueConfig;
use crate::error::RedisQueueError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

struct Keys {
    main: String,
    delayed: String,
    items: String,
    inflight: String,
}

impl Keys {
    fn for_group(group: &str) -> Self {
        Self {
            main: format!("deferrable:{group}:main"),
            delayed: format!("deferrable:{group}:delayed"),
            items: format!("deferrable:{group}:items"),
            inflight: format!("deferrable:{group}:inflight"),
        }
    }
}

fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// A reliable queue backed by redis: a main list, an in-flight zset keyed by
/// reclaim deadline, a delay zset keyed by deliver time, and an item hash.
///
/// Mirrors the "dockets" reliable-queue primitive's semantics (spec.md
/// §4.3.2) directly against redis primitives: `push` with a delay lands in
/// the delay zset instead of the main list; `pop` migrates due-delayed and
/// expired in-flight ids back onto the main list before popping, then
/// records the popped id's reclaim deadline in the in-flight zset;
/// `complete` removes both the in-flight entry and the item hash entry.
pub struct RedisReliableQueue {
    conn: ConnectionManager,
    keys: Keys,
    config: RedisQueueConfig,
    push_script: Script,
    pop_script: Script,
    complete_script: Script,
}

impl RedisReliableQueue {
    /// Wraps `conn`, scoping all keys under `group`.
    pub fn new(conn: ConnectionManager, group: impl Into<String>, config: RedisQueueConfig) -> Self {
        Self {
            conn,
            keys: Keys::for_group(&group.into()),
            config,
            push_script: Script::new(include_str!("lua/push.lua")),
            pop_script: Script::new(include_str!("lua/pop.lua")),
            complete_script: Script::new(include_str!("lua/complete.lua")),
        }
    }
}

#[async_trait]
impl Queue for RedisReliableQueue {
    const FIFO: bool = true;
    const SUPPORTS_DELAY: bool = true;

    type Envelope = String;
    type Error = RedisQueueError;

    async fn push(&self, item: Item) -> Result<(), Self::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_seconds();
        let deliver_at = now + item.effective_delay() as f64;
        let encoded = serde_json::to_string(&item)?;

        let mut conn = self.conn.clone();
        self.push_script
            .key(&self.keys.main)
            .key(&self.keys.delayed)
            .key(&self.keys.items)
            .arg(&id)
            .arg(&encoded)
            .arg(deliver_at)
            .arg(now)
            .invoke_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn pop(&self) -> Result<Option<(Self::Envelope, Item)>, Self::Error> {
        let deadline = Instant::now() + self.config.wait_time;
        let mut conn = self.conn.clone();

        loop {
            let now = now_seconds();
            let reclaim_at = now + self.config.timeout.as_secs_f64();

            let popped: Option<(String, String)> = self
                .pop_script
                .key(&self.keys.main)
                .key(&self.keys.delayed)
                .key(&self.keys.items)
                .key(&self.keys.inflight)
                .arg(now)
                .arg(reclaim_at)
                .arg(self.config.reclaim_batch_size)
                .invoke_async(&mut conn)
                .await?;

            if let Some((id, encoded)) = popped {
                let item: Item = serde_json::from_str(&encoded)?;
                return Ok(Some((id, item)));
            }

            if self.config.wait_time.is_zero() || Instant::now() >= deadline {
                return Ok(None);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(POLL_INTERVAL.min(remaining)).await;
        }
    }

    async fn complete(&self, envelope: Self::Envelope) -> Result<(), Self::Error> {
        let mut conn = self.conn.clone();
        self.complete_script
            .key(&self.keys.inflight)
            .key(&self.keys.items)
            .arg(&envelope)
            .invoke_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Self::Error> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .del(&self.keys.main)
            .del(&self.keys.delayed)
            .del(&self.keys.items)
            .del(&self.keys.inflight)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats, Self::Error> {
        let mut conn = self.conn.clone();
        let available: u64 = conn.llen(&self.keys.main).await?;
        let in_flight: u64 = conn.zcard(&self.keys.inflight).await?;
        let delayed: u64 = conn.zcard(&self.keys.delayed).await?;
        Ok(QueueStats {
            available: Some(available),
            in_flight: Some(in_flight),
            delayed: Some(delayed),
        })
    }
}
