//! valuebridge - reactive values bound to a property/event broker
//!
//! A broker holds named paths that carry either retained properties or
//! instantaneous events. This crate connects such paths to local reactive
//! [`Value`]s, one direction per binding.
//!
//! # Core Concepts
//!
//! - **One direction per binding**: inbound bindings only write their value,
//!   outbound bindings only call the broker, so nothing echoes back
//! - **Ordered broker calls**: every call goes through a single [`Scheduler`]
//!   worker, so calls from one binding arrive in the order they were made
//! - **Asynchronous failures on a bus**: registration, delivery and listener
//!   failures are reported as [`BridgeEvent`]s and never retried
//!
//! # Modules
//!
//! - [`value`] - Reactive values and their read/write capabilities
//! - [`broker`] - Broker trait, registration metadata, in-memory broker
//! - [`scheduler`] - Ordered execution of broker calls
//! - [`binding`] - The four binding protocols
//! - [`bridge`] - Context that creates bindings
//! - [`events`] - Event bus for bridge activity
//! - [`config`] - Configuration types and loading
//! - [`repl`] - Interactive session behind `vb run`

pub mod binding;
pub mod bridge;
pub mod broker;
pub mod cli;
pub mod config;
pub mod events;
pub mod repl;
pub mod scheduler;
pub mod value;

// Re-export commonly used types
pub use binding::{
    BindingError, BindingOptions, InboundEventBinding, InboundPropertyBinding, OutboundEventBinding,
    OutboundPropertyBinding, Payload,
};
pub use bridge::Bridge;
pub use broker::{Behaviour, Broker, BrokerError, Direction, Kind, MemoryBroker, RegisterOptions, Registration};
pub use config::{BindingConfig, Config, Flow};
pub use events::{BridgeEvent, EventBus, EventEmitter, spawn_event_logger};
pub use scheduler::{Scheduler, SchedulerError, SchedulerStats};
pub use value::{ListenerId, Value, ValueError, ValueReader, ValueWriter};
