use crate::stats::QueueStats;
use async_trait::async_trait;
use deferrable_codec::Item;
use std::error::Error as StdError;

/// The contract every backend (in-memory, redis, cloud bus) implements.
///
/// `push`/`pop`/`complete` are the only operations the engine relies on for
/// correctness; `flush` is test-only, `stats` is best-effort observability,
/// and the `*_batch` methods are optional conveniences with a naive default
/// implementation in terms of the single-item operations.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Whether this queue delivers items in push order.
    const FIFO: bool;
    /// Whether this queue honors `item.delay`.
    const SUPPORTS_DELAY: bool;

    /// The backend-native handle needed to [`complete`](Queue::complete) a pop.
    type Envelope: Send + Sync + 'static;
    /// The error type this queue's transport can fail with.
    type Error: StdError + Send + Sync + 'static;

    /// Enqueues `item`. If `item.delay` is set, the item must not be
    /// observable via [`pop`](Queue::pop) until at least that many seconds
    /// have elapsed.
    async fn push(&self, item: Item) -> Result<(), Self::Error>;

    /// Returns the next available item, or `None` if none became available
    /// within this queue's configured wait time.
    async fn pop(&self) -> Result<Option<(Self::Envelope, Item)>, Self::Error>;

    /// Acknowledges a pop, permanently removing the item from this queue.
    /// A no-op for fire-and-forget backends.
    async fn complete(&self, envelope: Self::Envelope) -> Result<(), Self::Error>;

    /// Drops every item in this queue. Test-only.
    async fn flush(&self) -> Result<(), Self::Error>;

    /// Reports point-in-time counts. Fields this backend cannot know are
    /// `None`.
    async fn stats(&self) -> Result<QueueStats, Self::Error>;

    /// Pops up to `n` items. The default implementation calls
    /// [`pop`](Queue::pop) in a loop, stopping at the first empty result.
    async fn pop_batch(&self, n: usize) -> Result<Vec<(Self::Envelope, Item)>, Self::Error> {
        let mut batch = Vec::with_capacity(n);
        for _ in 0..n {
            match self.pop().await? {
                Some(popped) => batch.push(popped),
                None => break,
            }
        }
        Ok(batch)
    }

    /// Pushes every item in `items`, reporting per-item success. The default
    /// implementation calls [`push`](Queue::push) in a loop and never fails
    /// the whole batch on one item's error.
    async fn push_batch(&self, items: Vec<Item>) -> Result<Vec<bool>, Self::Error> {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            results.push(self.push(item).await.is_ok());
        }
        Ok(results)
    }

    /// Completes every envelope in `envelopes`, reporting per-envelope
    /// success. The default implementation calls
    /// [`complete`](Queue::complete) in a loop.
    async fn complete_batch(&self, envelopes: Vec<Self::Envelope>) -> Result<Vec<bool>, Self::Error> {
        let mut results = Vec::with_capacity(envelopes.len());
        for envelope in envelopes {
            results.push(self.complete(envelope).await.is_ok());
        }
        Ok(results)
    }
}
