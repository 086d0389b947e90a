#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

mod memory;
mod queue;
mod stats;

pub use memory::InMemoryQueue;
pub use queue::Queue;
pub use stats::QueueStats;
