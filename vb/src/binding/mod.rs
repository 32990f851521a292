//! One-directional bindings between a broker path and a reactive value
//!
//! - [`InboundPropertyBinding`]: broker property -> local value
//! - [`InboundEventBinding`]: broker event -> local instantaneous value
//! - [`OutboundPropertyBinding`]: local value -> broker property
//! - [`OutboundEventBinding`]: local instantaneous value -> broker event
//!
//! Every broker call a binding makes goes through the [`Scheduler`], so calls
//! from one binding reach the broker in the order they were made. Outcomes are
//! reported on the [`EventBus`](crate::events::EventBus).

mod inbound;
mod outbound;

pub use inbound::{InboundEventBinding, InboundPropertyBinding};
pub use outbound::{OutboundEventBinding, OutboundPropertyBinding};

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::broker::{Broker, Kind, Registration, WatchCallback};
use crate::events::EventEmitter;
use crate::scheduler::{Scheduler, SchedulerError};

/// Types that can travel between a reactive value and the broker
pub trait Payload: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Payload for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Errors from creating or closing a binding
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Failed to encode value for {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Per-binding settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingOptions {
    /// Registration is sent if and only if a description is present
    pub description: Option<String>,

    /// Retention policy announced for properties; ignored for events
    pub delete_on_unregister: bool,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            description: None,
            delete_on_unregister: true,
        }
    }
}

impl BindingOptions {
    /// Options that register the path with the given description
    pub fn registered(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    pub fn with_delete_on_unregister(mut self, delete: bool) -> Self {
        self.delete_on_unregister = delete;
        self
    }
}

/// Everything a binding needs to talk to the broker about one path
#[derive(Clone)]
pub(crate) struct BindingContext {
    pub(crate) path: String,
    pub(crate) broker: Arc<dyn Broker>,
    pub(crate) scheduler: Scheduler,
    pub(crate) emitter: EventEmitter,
}

impl BindingContext {
    pub(crate) fn schedule_register(&self, registration: Registration) -> Result<(), SchedulerError> {
        debug!(path = %self.path, behaviour = %registration.behaviour, "schedule_register: called");
        let broker = self.broker.clone();
        let emitter = self.emitter.clone();
        let behaviour = registration.behaviour;
        self.scheduler
            .schedule(format!("register {}", self.path), async move {
                match broker.register(registration).await {
                    Ok(()) => emitter.registered(behaviour),
                    Err(e) => {
                        // Registration failure does not stop data from flowing
                        warn!(path = %emitter.path(), error = %e, "Registration failed");
                        emitter.registration_failed(behaviour, &e.to_string());
                    }
                }
            })
    }

    pub(crate) fn schedule_unregister(&self) -> Result<(), SchedulerError> {
        debug!(path = %self.path, "schedule_unregister: called");
        let broker = self.broker.clone();
        let path = self.path.clone();
        self.scheduler.schedule(format!("unregister {}", self.path), async move {
            if let Err(e) = broker.unregister(&path).await {
                warn!(%path, error = %e, "Unregister failed");
            }
        })
    }

    pub(crate) fn schedule_watch(&self, kind: Kind, callback: WatchCallback) -> Result<(), SchedulerError> {
        debug!(path = %self.path, %kind, "schedule_watch: called");
        let broker = self.broker.clone();
        let emitter = self.emitter.clone();
        let path = self.path.clone();
        self.scheduler.schedule(format!("watch {} {}", kind, self.path), async move {
            let result = match kind {
                Kind::Property => broker.watch_property(&path, callback).await,
                Kind::Event => broker.watch_event(&path, callback).await,
            };
            match result {
                Ok(()) => emitter.watching(kind),
                Err(e) => {
                    warn!(%path, %kind, error = %e, "Watch failed");
                    emitter.watch_failed(kind, &e.to_string());
                }
            }
        })
    }

    pub(crate) fn schedule_unwatch(&self, kind: Kind, callback: WatchCallback) -> Result<(), SchedulerError> {
        debug!(path = %self.path, %kind, "schedule_unwatch: called");
        let broker = self.broker.clone();
        let path = self.path.clone();
        self.scheduler.schedule(format!("unwatch {} {}", kind, self.path), async move {
            let result = match kind {
                Kind::Property => broker.unwatch_property(&path, &callback).await,
                Kind::Event => broker.unwatch_event(&path, &callback).await,
            };
            if let Err(e) = result {
                warn!(%path, %kind, error = %e, "Unwatch failed");
            }
        })
    }

    /// Schedule a `set_property` or `send_event` carrying `payload`
    pub(crate) fn schedule_forward(&self, kind: Kind, payload: serde_json::Value) -> Result<(), SchedulerError> {
        debug!(path = %self.path, %kind, %payload, "schedule_forward: called");
        let broker = self.broker.clone();
        let emitter = self.emitter.clone();
        let path = self.path.clone();
        let label = match kind {
            Kind::Property => format!("set_property {}", self.path),
            Kind::Event => format!("send_event {}", self.path),
        };
        self.scheduler.schedule(label, async move {
            let result = match kind {
                Kind::Property => broker.set_property(&path, payload.clone()).await,
                Kind::Event => broker.send_event(&path, payload.clone()).await,
            };
            match result {
                Ok(()) => emitter.delivered(kind, payload),
                Err(e) => {
                    // At most once: the value is reported and not retried
                    warn!(%path, %kind, error = %e, "Delivery failed");
                    emitter.delivery_failed(kind, &e.to_string());
                }
            }
        })
    }
}

pub(crate) fn encode<T: Payload>(path: &str, value: &T) -> Result<serde_json::Value, BindingError> {
    serde_json::to_value(value).map_err(|source| BindingError::Encode {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_do_not_register() {
        let options = BindingOptions::default();
        assert!(options.description.is_none());
        assert!(options.delete_on_unregister);
    }

    #[test]
    fn test_registered_options() {
        let options = BindingOptions::registered("Something").with_delete_on_unregister(false);
        assert_eq!(options.description.as_deref(), Some("Something"));
        assert!(!options.delete_on_unregister);
    }

    #[test]
    fn test_encode_error_names_path() {
        use std::collections::HashMap;
        // Maps with non-string keys cannot become JSON objects
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], 1);
        let err = encode("foo/bar", &bad).unwrap_err();
        assert!(err.to_string().contains("foo/bar"));
    }
}
