#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

mod backend;
mod engine;
mod error;
mod events;
mod metadata;
mod options;

pub use backend::{Backend, BackendFactory};
pub use engine::{Deferrable, RunOutcome};
pub use error::EngineError;
pub use events::{EventObserver, EventRegistrar};
pub use metadata::MetadataProducerConsumer;
pub use options::{OptionValue, RegisterOptions, RegistrationError, MAX_WINDOW_SECONDS};
