//! Ordered execution of broker calls
//!
//! The Scheduler owns a single worker task and processes jobs via a channel,
//! so calls posted by one binding reach the broker in the order they were made.

mod core;
mod messages;

pub use self::core::{Scheduler, SchedulerStats};
pub use messages::SchedulerError;
