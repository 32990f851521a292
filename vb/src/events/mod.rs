//! Event bus for bridge observability
//!
//! Broker calls run asynchronously on the scheduler, so their outcomes cannot
//! be returned to whoever created the binding. Instead every binding reports
//! through the bus:
//!
//! ```text
//!   InboundPropertyBinding   InboundEventBinding   Outbound*Binding
//!            │                       │                     │
//!            └──────────── EventEmitter (per path) ────────┘
//!                                    │
//!                         EventBus (tokio broadcast)
//!                                    │
//!                  ┌─────────────────┴─────────────────┐
//!            event logger                         callers/tests
//! ```
//!
//! See [`BridgeEvent`] for the complete list of events.

mod bus;
mod logger;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter};
pub use logger::{log_event, spawn_event_logger};
pub use types::BridgeEvent;
