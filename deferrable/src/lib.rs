#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

/// The item envelope, its `Value` type, and the name-indexed callable registry.
pub use deferrable_codec as codec;
/// TTL and exponential backoff helpers.
pub use deferrable_util as util;
/// The `Queue` trait and the in-memory reference implementation.
pub use deferrable_queue as queue;
/// The debounce controller and `DebounceStore` trait.
pub use deferrable_debounce as debounce;
/// `Backend`, metadata pairs, events, and the `Deferrable` engine.
pub use deferrable_core as core;

/// The redis-backed reliable queue, error queue, and debounce store.
#[cfg(feature = "redis")]
pub use deferrable_redis as redis;

/// The SQS-shaped cloud message bus queue.
#[cfg(feature = "cloud")]
pub use deferrable_cloud as cloud;

pub use deferrable_codec::{
    fingerprint, here, CallError, CallRegistry, Callable, CallResult, Item, SourceLocation, Value,
};
pub use deferrable_core::{
    Backend, BackendFactory, Deferrable, EngineError, EventObserver, MetadataProducerConsumer,
    OptionValue, RegisterOptions, RegistrationError, RunOutcome,
};
pub use deferrable_debounce::{DebounceController, DebounceError, DebounceStore, MemoryDebounceStore, Strategy};
pub use deferrable_queue::{InMemoryQueue, Queue, QueueStats};
