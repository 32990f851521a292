//! Bridge - the context every binding is created from
//!
//! A Bridge owns one broker handle, one scheduler and one event bus. All
//! bindings created from the same bridge share them.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::binding::{
    BindingContext, BindingError, BindingOptions, InboundEventBinding, InboundPropertyBinding, OutboundEventBinding,
    OutboundPropertyBinding, Payload,
};
use crate::broker::Broker;
use crate::events::{BridgeEvent, EventBus};
use crate::scheduler::{Scheduler, SchedulerError};
use crate::value::Value;

/// Connects reactive values to paths on one broker
#[derive(Clone)]
pub struct Bridge {
    broker: Arc<dyn Broker>,
    scheduler: Scheduler,
    events: Arc<EventBus>,
}

impl Bridge {
    /// Create a bridge with its own event bus; must be called within a tokio runtime
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self::with_event_bus(broker, Arc::new(EventBus::with_default_capacity()))
    }

    /// Create a bridge that reports on an existing event bus
    pub fn with_event_bus(broker: Arc<dyn Broker>, events: Arc<EventBus>) -> Self {
        debug!("Bridge::with_event_bus: called");
        let scheduler = Scheduler::spawn();
        info!("Bridge created");
        Self {
            broker,
            scheduler,
            events,
        }
    }

    pub fn broker(&self) -> &Arc<dyn Broker> {
        &self.broker
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Subscribe to bridge events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    fn context(&self, path: &str) -> BindingContext {
        BindingContext {
            path: path.to_string(),
            broker: self.broker.clone(),
            scheduler: self.scheduler.clone(),
            emitter: self.events.emitter_for(path),
        }
    }

    /// Mirror a remote property into a new local value that starts at `default`
    pub fn get_property<T: Payload>(
        &self,
        path: &str,
        default: T,
        options: &BindingOptions,
    ) -> Result<InboundPropertyBinding<T>, BindingError> {
        debug!(%path, "Bridge::get_property: called");
        InboundPropertyBinding::start(self.context(path), default, options)
    }

    /// Re-emit remote event occurrences on a new local value
    pub fn watch_event<T: Payload>(
        &self,
        path: &str,
        options: &BindingOptions,
    ) -> Result<InboundEventBinding<T>, BindingError> {
        debug!(%path, "Bridge::watch_event: called");
        InboundEventBinding::start(self.context(path), options)
    }

    /// Publish `value` and all its later changes as a remote property
    pub fn set_property<T: Payload>(
        &self,
        path: &str,
        value: &Value<T>,
        options: &BindingOptions,
    ) -> Result<OutboundPropertyBinding<T>, BindingError> {
        debug!(%path, "Bridge::set_property: called");
        OutboundPropertyBinding::start(self.context(path), value, options)
    }

    /// Send every instantaneous value of `value` as a remote event
    pub fn send_event<T: Payload>(
        &self,
        path: &str,
        value: &Value<T>,
        options: &BindingOptions,
    ) -> Result<OutboundEventBinding<T>, BindingError> {
        debug!(%path, "Bridge::send_event: called");
        OutboundEventBinding::start(self.context(path), value, options)
    }

    /// Wait until every broker call scheduled so far has completed
    pub async fn flush(&self) -> Result<(), SchedulerError> {
        self.scheduler.flush().await
    }

    /// Stop the scheduler after the calls already queued
    pub fn shutdown(&self) -> Result<(), SchedulerError> {
        info!("Bridge shutting down");
        self.scheduler.shutdown()
    }
}
