//! Event Logger - mirrors bridge events into the tracing log

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::types::BridgeEvent;

/// Log a single bridge event at a level matching its severity
pub fn log_event(event: &BridgeEvent) {
    match event {
        BridgeEvent::Delivered { path, kind, value } => {
            debug!(%path, %kind, %value, "Delivered");
        }
        event if event.is_failure() => {
            warn!(path = event.path(), event_type = event.event_type(), ?event, "Bridge failure");
        }
        event => {
            info!(path = event.path(), event_type = event.event_type(), "Bridge event");
        }
    }
}

/// Spawn a task that logs every event received on `rx` until the bus closes
pub fn spawn_event_logger(mut rx: broadcast::Receiver<BridgeEvent>) -> JoinHandle<()> {
    debug!("spawn_event_logger: called");
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger lagged behind the bus");
                }
                Err(RecvError::Closed) => {
                    debug!("spawn_event_logger: bus closed");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;

    #[tokio::test]
    async fn test_logger_exits_when_bus_dropped() {
        let bus = EventBus::new(4);
        let handle = spawn_event_logger(bus.subscribe());

        bus.emitter_for("a/b").closed();
        drop(bus);

        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("logger should stop")
            .unwrap();
    }
}
