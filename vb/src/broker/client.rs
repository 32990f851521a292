//! Broker trait definition

use async_trait::async_trait;

use super::{BrokerError, Registration, WatchCallback};

/// Client side of a networked property/event broker
///
/// Every operation completes at some later point. The broker makes no
/// promise about the relative order of operations issued independently;
/// callers that need ordering must issue them one after another.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Announce a path together with its behaviour and description
    async fn register(&self, registration: Registration) -> Result<(), BrokerError>;

    /// Withdraw every registration this client made for `path`
    async fn unregister(&self, path: &str) -> Result<(), BrokerError>;

    /// Receive every update of the property at `path`
    async fn watch_property(&self, path: &str, callback: WatchCallback) -> Result<(), BrokerError>;

    /// Stop delivering property updates to `callback`
    async fn unwatch_property(&self, path: &str, callback: &WatchCallback) -> Result<(), BrokerError>;

    /// Receive every occurrence of the event at `path`
    async fn watch_event(&self, path: &str, callback: WatchCallback) -> Result<(), BrokerError>;

    /// Stop delivering event occurrences to `callback`
    async fn unwatch_event(&self, path: &str, callback: &WatchCallback) -> Result<(), BrokerError>;

    /// Replace the retained value of the property at `path`
    async fn set_property(&self, path: &str, value: serde_json::Value) -> Result<(), BrokerError>;

    /// Deliver one occurrence of the event at `path`
    async fn send_event(&self, path: &str, value: serde_json::Value) -> Result<(), BrokerError>;
}
