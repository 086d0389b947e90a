//! Requires a running redis instance; point `REDIS_URL` at it to run these
//! (`cargo test -p deferrable-redis -- --ignored`).

use deferrable_codec::Item;
use deferrable_queue::Queue;
use deferrable_redis::{RedisQueueConfig, RedisReliableQueue};
use pretty_assertions::assert_eq;
use redis::Client;
use std::time::Duration;

async fn connection() -> redis::aio::ConnectionManager {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
    Client::open(url)
        .expect("valid redis url")
        .get_connection_manager()
        .await
        .expect("redis reachable")
}

#[tokio::test]
#[ignore]
async fn pushed_item_is_popped_and_completed() {
    let conn = connection().await;
    let queue = RedisReliableQueue::new(conn, "test-group", RedisQueueConfig::default());
    queue.flush().await.unwrap();

    queue.push(Item::new("f", vec![], [])).await.unwrap();
    let (envelope, item) = queue.pop().await.unwrap().expect("item available");
    assert_eq!(item.method, "f");

    queue.complete(envelope).await.unwrap();
    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.in_flight, Some(0));
}

#[tokio::test]
#[ignore]
async fn delayed_push_is_not_immediately_visible() {
    let conn = connection().await;
    let mut config = RedisQueueConfig::default();
    config.wait_time = Duration::from_millis(50);
    let queue = RedisReliableQueue::new(conn, "test-group-delay", config);
    queue.flush().await.unwrap();

    let mut item = Item::new("f", vec![], []);
    item.delay = Some(5);
    queue.push(item).await.unwrap();

    let popped = queue.pop().await.unwrap();
    assert_eq!(popped.is_none(), true);
}
