#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

mod config;
mod debounce;
mod error;
mod error_queue;
mod reliable;

pub use config::RedisQueueConfig;
pub use debounce::RedisDebounceStore;
pub use error::RedisQueueError;
pub use error_queue::RedisErrorQueue;
pub use reliable::RedisReliableQueue;
