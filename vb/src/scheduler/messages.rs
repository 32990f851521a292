//! Scheduler messages
//!
//! Commands consumed by the scheduler worker and the errors callers see.

use std::fmt;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors from scheduler operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Scheduler is stopped")]
    Stopped,

    #[error("Channel error")]
    ChannelError,
}

/// A unit of asynchronous work, usually a single broker call
pub type Job = BoxFuture<'static, ()>;

/// Commands sent to the scheduler worker
pub enum SchedulerCommand {
    /// Run a job to completion before looking at the next command
    Run { label: String, job: Job },

    /// Reply once every command queued before this one has finished
    Barrier { reply: oneshot::Sender<()> },

    /// Stop the worker; commands queued after this are dropped
    Shutdown,
}

impl fmt::Debug for SchedulerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerCommand::Run { label, .. } => f.debug_struct("Run").field("label", label).finish(),
            SchedulerCommand::Barrier { .. } => f.write_str("Barrier"),
            SchedulerCommand::Shutdown => f.write_str("Shutdown"),
        }
    }
}
