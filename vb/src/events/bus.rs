//! Event Bus - pub/sub for bridge activity and failures
//!
//! The EventBus uses a tokio broadcast channel. Bindings emit through an
//! [`EventEmitter`] bound to their path; callers subscribe to learn about
//! registrations, deliveries and failures that happen asynchronously.

use tokio::sync::broadcast;
use tracing::debug;

use super::types::BridgeEvent;
use crate::broker::{Behaviour, Kind};

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Central event bus for bridge activity
pub struct EventBus {
    tx: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// This is fire-and-forget: if there are no subscribers, the event is dropped.
    pub fn emit(&self, event: BridgeEvent) {
        debug!(event_type = event.event_type(), path = event.path(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter handle for a specific path
    pub fn emitter_for(&self, path: impl Into<String>) -> EventEmitter {
        let path = path.into();
        debug!(%path, "EventBus::emitter_for: creating emitter");
        EventEmitter {
            tx: self.tx.clone(),
            path,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle for a binding to emit events about its path
///
/// EventEmitter is cheap to clone and can be moved into scheduled jobs and
/// broker callbacks.
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<BridgeEvent>,
    path: String,
}

impl EventEmitter {
    /// Get the path this emitter is bound to
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Emit a raw event
    pub fn emit(&self, event: BridgeEvent) {
        debug!(event_type = event.event_type(), "EventEmitter::emit");
        let _ = self.tx.send(event);
    }

    // === Convenience methods ===

    pub fn registered(&self, behaviour: Behaviour) {
        self.emit(BridgeEvent::Registered {
            path: self.path.clone(),
            behaviour,
        });
    }

    pub fn registration_failed(&self, behaviour: Behaviour, message: &str) {
        self.emit(BridgeEvent::RegistrationFailed {
            path: self.path.clone(),
            behaviour,
            message: message.to_string(),
        });
    }

    pub fn watching(&self, kind: Kind) {
        self.emit(BridgeEvent::Watching {
            path: self.path.clone(),
            kind,
        });
    }

    pub fn watch_failed(&self, kind: Kind, message: &str) {
        self.emit(BridgeEvent::WatchFailed {
            path: self.path.clone(),
            kind,
            message: message.to_string(),
        });
    }

    pub fn delivered(&self, kind: Kind, value: serde_json::Value) {
        self.emit(BridgeEvent::Delivered {
            path: self.path.clone(),
            kind,
            value,
        });
    }

    pub fn delivery_failed(&self, kind: Kind, message: &str) {
        self.emit(BridgeEvent::DeliveryFailed {
            path: self.path.clone(),
            kind,
            message: message.to_string(),
        });
    }

    pub fn decode_failed(&self, message: &str) {
        self.emit(BridgeEvent::DecodeFailed {
            path: self.path.clone(),
            message: message.to_string(),
        });
    }

    pub fn listener_failed(&self, failed: usize, message: &str) {
        self.emit(BridgeEvent::ListenerFailed {
            path: self.path.clone(),
            failed,
            message: message.to_string(),
        });
    }

    pub fn closed(&self) {
        self.emit(BridgeEvent::Closed {
            path: self.path.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_event_bus_subscribe() {
        let bus = EventBus::new(16);
        assert_eq!(bus.subscriber_count(), 0);
        let _rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_bus_no_subscribers() {
        let bus = EventBus::new(16);
        // This should not panic even with no subscribers
        bus.emitter_for("foo/bar").closed();
    }

    #[tokio::test]
    async fn test_emitter_stamps_path() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let emitter = bus.emitter_for("foo/bar");

        emitter.registered(Behaviour::PropertyManyToOne);
        emitter.watching(Kind::Property);
        emitter.delivery_failed(Kind::Event, "gone");

        for _ in 0..3 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.path(), "foo/bar");
        }
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emitter_for("a/b").decode_failed("not a number");

        let event1 = rx1.recv().await.unwrap();
        let event2 = rx2.recv().await.unwrap();
        assert_eq!(event1, event2);
        assert!(event1.is_failure());
    }
}
