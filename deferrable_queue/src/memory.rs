use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::convert::Infallible;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use deferrable_codec::Item;
use parking_lot::Mutex;

use crate::queue::Queue;
use crate::stats::QueueStats;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

struct DelayedEntry {
    deliver_at_millis: u64,
    seq: u64,
    item: Item,
}

impl PartialEq for DelayedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deliver_at_millis == other.deliver_at_millis && self.seq == other.seq
    }
}

impl Eq for DelayedEntry {}

impl Ord for DelayedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so `BinaryHeap` (a max-heap) pops the earliest delivery time first.
        other
            .deliver_at_millis
            .cmp(&self.deliver_at_millis)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for DelayedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct State {
    main: VecDeque<Item>,
    delayed: BinaryHeap<DelayedEntry>,
    next_seq: u64,
}

impl State {
    fn drain_due(&mut self, now_millis: u64) {
        while let Some(top) = self.delayed.peek() {
            if top.deliver_at_millis > now_millis {
                break;
            }
            let entry = self.delayed.pop().expect("peeked entry must exist");
            self.main.push_back(entry.item);
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A process-local, non-persistent [`Queue`] backed by a `VecDeque` plus a
/// delay-ordered binary heap.
///
/// Used by the engine's own tests and as the default backend for callers who
/// don't need durability across restarts.
pub struct InMemoryQueue {
    state: Mutex<State>,
    wait_time: Duration,
}

impl InMemoryQueue {
    /// Creates an empty queue whose `pop` polls for up to `wait_time` before
    /// giving up and returning `None`.
    pub fn new(wait_time: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            wait_time,
        }
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl Queue for InMemoryQueue {
    const FIFO: bool = true;
    const SUPPORTS_DELAY: bool = true;

    type Envelope = Item;
    type Error = Infallible;

    async fn push(&self, item: Item) -> Result<(), Self::Error> {
        let delay = item.effective_delay();
        let mut state = self.state.lock();
        if delay > 0 {
            let seq = state.next_seq;
            state.next_seq += 1;
            state.delayed.push(DelayedEntry {
                deliver_at_millis: now_millis() + delay * 1000,
                seq,
                item,
            });
        } else {
            state.main.push_back(item);
        }
        Ok(())
    }

    async fn pop(&self) -> Result<Option<(Self::Envelope, Item)>, Self::Error> {
        let deadline = Instant::now() + self.wait_time;
        loop {
            {
                let mut state = self.state.lock();
                state.drain_due(now_millis());
                if let Some(item) = state.main.pop_front() {
                    return Ok(Some((item.clone(), item)));
                }
            }
            if self.wait_time.is_zero() || Instant::now() >= deadline {
                return Ok(None);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(POLL_INTERVAL.min(remaining)).await;
        }
    }

    async fn complete(&self, _envelope: Self::Envelope) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn flush(&self) -> Result<(), Self::Error> {
        let mut state = self.state.lock();
        state.main.clear();
        state.delayed.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats, Self::Error> {
        let state = self.state.lock();
        Ok(QueueStats {
            available: Some(state.main.len() as u64),
            in_flight: Some(0),
            delayed: Some(state.delayed.len() as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deferrable_codec::Item;
    use pretty_assertions::assert_eq;

    fn item(method: &str) -> Item {
        Item::new(method.to_string(), Vec::new(), [])
    }

    #[tokio::test]
    async fn pushes_and_pops_in_fifo_order() {
        let queue = InMemoryQueue::new(Duration::from_millis(50));
        queue.push(item("a")).await.unwrap();
        queue.push(item("b")).await.unwrap();

        let (_, first) = queue.pop().await.unwrap().unwrap();
        let (_, second) = queue.pop().await.unwrap().unwrap();
        assert_eq!(first.method, "a");
        assert_eq!(second.method, "b");
    }

    #[tokio::test]
    async fn pop_times_out_on_empty_queue() {
        let queue = InMemoryQueue::new(Duration::from_millis(20));
        let result = queue.pop().await.unwrap();
        assert_eq!(result.is_none(), true);
    }

    #[tokio::test]
    async fn delayed_item_is_not_immediately_available() {
        let queue = InMemoryQueue::new(Duration::from_millis(10));
        let mut delayed = item("later");
        delayed.delay = Some(1);
        queue.push(delayed).await.unwrap();

        let immediate = queue.pop().await.unwrap();
        assert_eq!(immediate.is_none(), true);

        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.delayed, Some(1));
        assert_eq!(stats.available, Some(0));
    }

    #[tokio::test]
    async fn flush_clears_both_collections() {
        let queue = InMemoryQueue::new(Duration::from_millis(10));
        queue.push(item("a")).await.unwrap();
        let mut delayed = item("b");
        delayed.delay = Some(10);
        queue.push(delayed).await.unwrap();

        queue.flush().await.unwrap();

        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.available, Some(0));
        assert_eq!(stats.delayed, Some(0));
    }
}
