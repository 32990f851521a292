//! Remote property/event broker interface
//!
//! Provides the [`Broker`] trait the bindings call into, the registration
//! metadata they announce, and an in-process [`MemoryBroker`].

pub mod client;
mod error;
mod memory;
mod types;

pub use client::Broker;
pub use error::BrokerError;
pub use memory::MemoryBroker;
pub use types::{Behaviour, Direction, Kind, RegisterOptions, Registration, WatchCallback};

#[cfg(test)]
pub use client::mock;
