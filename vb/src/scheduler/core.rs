//! Scheduler - single worker that runs broker calls in order
//!
//! Bindings post jobs from synchronous code (value listeners, constructors).
//! One tokio task drains the queue and awaits each job before starting the
//! next, so jobs run in exactly the order they were posted.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use super::messages::{SchedulerCommand, SchedulerError};

/// Counters for jobs passing through the scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Jobs accepted by `schedule`
    pub scheduled: u64,
    /// Jobs that ran to completion
    pub completed: u64,
    /// Jobs that panicked
    pub panicked: u64,
}

#[derive(Debug, Default)]
struct Counters {
    scheduled: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
}

/// Handle to post work to the scheduler worker
#[derive(Clone)]
pub struct Scheduler {
    tx: mpsc::UnboundedSender<SchedulerCommand>,
    counters: Arc<Counters>,
}

impl Scheduler {
    /// Spawn the worker task; must be called from within a tokio runtime
    pub fn spawn() -> Self {
        debug!("Scheduler::spawn: called");
        // Unbounded: listeners post from synchronous code and nothing is dropped
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());

        tokio::spawn(worker_loop(rx, counters.clone()));

        info!("Scheduler spawned");
        Self { tx, counters }
    }

    /// Queue a job behind everything already scheduled
    pub fn schedule<F>(&self, label: impl Into<String>, job: F) -> Result<(), SchedulerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let label = label.into();
        debug!(%label, "Scheduler::schedule: called");
        self.tx
            .send(SchedulerCommand::Run {
                label,
                job: Box::pin(job),
            })
            .map_err(|_| SchedulerError::Stopped)?;
        self.counters.scheduled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Wait until every job scheduled before this call has finished
    pub async fn flush(&self) -> Result<(), SchedulerError> {
        debug!("Scheduler::flush: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SchedulerCommand::Barrier { reply: reply_tx })
            .map_err(|_| SchedulerError::Stopped)?;
        reply_rx.await.map_err(|_| SchedulerError::ChannelError)
    }

    /// Stop the worker once the jobs already queued have run
    pub fn shutdown(&self) -> Result<(), SchedulerError> {
        debug!("Scheduler::shutdown: called");
        self.tx
            .send(SchedulerCommand::Shutdown)
            .map_err(|_| SchedulerError::Stopped)
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            scheduled: self.counters.scheduled.load(Ordering::SeqCst),
            completed: self.counters.completed.load(Ordering::SeqCst),
            panicked: self.counters.panicked.load(Ordering::SeqCst),
        }
    }
}

async fn worker_loop(mut rx: mpsc::UnboundedReceiver<SchedulerCommand>, counters: Arc<Counters>) {
    debug!("worker_loop: called");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            SchedulerCommand::Run { label, job } => {
                debug!(%label, "worker_loop: Run command");
                // A panicking job must not take the other bindings down with it
                match AssertUnwindSafe(job).catch_unwind().await {
                    Ok(()) => {
                        counters.completed.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(_) => {
                        error!(%label, "Scheduled job panicked");
                        counters.panicked.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }

            SchedulerCommand::Barrier { reply } => {
                debug!("worker_loop: Barrier command");
                let _ = reply.send(());
            }

            SchedulerCommand::Shutdown => {
                info!("Scheduler shutting down");
                break;
            }
        }
    }

    debug!("worker_loop: exiting");
}
