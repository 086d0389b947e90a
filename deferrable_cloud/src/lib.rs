#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

mod config;
mod error;
mod lazy;
mod queue;

pub use config::{CloudQueueConfig, RedrivePolicy, MAX_BATCH_SIZE, MAX_DELAY_SECONDS};
pub use error::CloudQueueError;
pub use lazy::{default_client_factory, ClientFactory};
pub use queue::CloudQueue;
