#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

mod controller;
mod memory;
mod store;
mod strategy;

pub use controller::{DebounceController, DebounceError};
pub use memory::MemoryDebounceStore;
pub use store::DebounceStore;
pub use strategy::{decide, Strategy};
