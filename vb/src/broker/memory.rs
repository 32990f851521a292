//! In-process broker
//!
//! MemoryBroker keeps retained properties, registrations and watchers in
//! memory. It is what `vb run` bridges against, and it stands in for a
//! networked broker in integration tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Broker, BrokerError, Kind, Registration, WatchCallback};

#[derive(Default)]
struct MemoryState {
    properties: HashMap<String, serde_json::Value>,
    registrations: HashMap<String, Registration>,
    property_watchers: HashMap<String, Vec<WatchCallback>>,
    event_watchers: HashMap<String, Vec<WatchCallback>>,
}

/// Broker that lives entirely inside this process
#[derive(Default)]
pub struct MemoryBroker {
    state: RwLock<MemoryState>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        debug!("MemoryBroker::new: called");
        Self::default()
    }

    /// Retained value of the property at `path`
    pub fn property(&self, path: &str) -> Option<serde_json::Value> {
        self.read_state().properties.get(path).cloned()
    }

    /// All retained properties, sorted by path
    pub fn properties(&self) -> Vec<(String, serde_json::Value)> {
        let mut props: Vec<_> = self
            .read_state()
            .properties
            .iter()
            .map(|(path, value)| (path.clone(), value.clone()))
            .collect();
        props.sort_by(|a, b| a.0.cmp(&b.0));
        props
    }

    pub fn registration(&self, path: &str) -> Option<Registration> {
        self.read_state().registrations.get(path).cloned()
    }

    pub fn watcher_count(&self, kind: Kind, path: &str) -> usize {
        let state = self.read_state();
        let watchers = match kind {
            Kind::Property => &state.property_watchers,
            Kind::Event => &state.event_watchers,
        };
        watchers.get(path).map(Vec::len).unwrap_or(0)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn watchers(&self, kind: Kind, path: &str) -> Vec<WatchCallback> {
        let state = self.read_state();
        let watchers = match kind {
            Kind::Property => &state.property_watchers,
            Kind::Event => &state.event_watchers,
        };
        watchers.get(path).cloned().unwrap_or_default()
    }

    fn remove_watcher(&self, kind: Kind, path: &str, callback: &WatchCallback) -> Result<(), BrokerError> {
        let mut state = self.write_state();
        let watchers = match kind {
            Kind::Property => &mut state.property_watchers,
            Kind::Event => &mut state.event_watchers,
        };
        let list = watchers
            .get_mut(path)
            .ok_or_else(|| BrokerError::rejected(path, format!("no {} watchers", kind)))?;
        let before = list.len();
        list.retain(|cb| !Arc::ptr_eq(cb, callback));
        if list.len() == before {
            return Err(BrokerError::rejected(path, format!("callback is not watching this {}", kind)));
        }
        if list.is_empty() {
            watchers.remove(path);
        }
        Ok(())
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn register(&self, registration: Registration) -> Result<(), BrokerError> {
        debug!(path = %registration.path, behaviour = %registration.behaviour, "MemoryBroker::register: called");
        let mut state = self.write_state();
        if let Some(existing) = state.registrations.get(&registration.path)
            && existing.kind() != registration.kind()
        {
            return Err(BrokerError::rejected(
                &registration.path,
                format!("already registered as {}", existing.behaviour),
            ));
        }
        info!(path = %registration.path, behaviour = %registration.behaviour, "Registered path");
        state.registrations.insert(registration.path.clone(), registration);
        Ok(())
    }

    async fn unregister(&self, path: &str) -> Result<(), BrokerError> {
        debug!(%path, "MemoryBroker::unregister: called");
        let mut state = self.write_state();
        let registration = state
            .registrations
            .remove(path)
            .ok_or_else(|| BrokerError::rejected(path, "not registered"))?;
        if registration.kind() == Kind::Property && registration.options.delete_on_unregister == Some(true) {
            debug!(%path, "MemoryBroker::unregister: deleting retained property");
            state.properties.remove(path);
        }
        Ok(())
    }

    async fn watch_property(&self, path: &str, callback: WatchCallback) -> Result<(), BrokerError> {
        debug!(%path, "MemoryBroker::watch_property: called");
        let retained = {
            let mut state = self.write_state();
            state
                .property_watchers
                .entry(path.to_string())
                .or_default()
                .push(callback.clone());
            state.properties.get(path).cloned()
        };
        // New watchers see the retained value straight away
        if let Some(value) = retained {
            debug!(%path, "MemoryBroker::watch_property: delivering retained value");
            callback(path, value);
        }
        Ok(())
    }

    async fn unwatch_property(&self, path: &str, callback: &WatchCallback) -> Result<(), BrokerError> {
        debug!(%path, "MemoryBroker::unwatch_property: called");
        self.remove_watcher(Kind::Property, path, callback)
    }

    async fn watch_event(&self, path: &str, callback: WatchCallback) -> Result<(), BrokerError> {
        debug!(%path, "MemoryBroker::watch_event: called");
        self.write_state()
            .event_watchers
            .entry(path.to_string())
            .or_default()
            .push(callback);
        Ok(())
    }

    async fn unwatch_event(&self, path: &str, callback: &WatchCallback) -> Result<(), BrokerError> {
        debug!(%path, "MemoryBroker::unwatch_event: called");
        self.remove_watcher(Kind::Event, path, callback)
    }

    async fn set_property(&self, path: &str, value: serde_json::Value) -> Result<(), BrokerError> {
        debug!(%path, %value, "MemoryBroker::set_property: called");
        {
            let mut state = self.write_state();
            if let Some(existing) = state.registrations.get(path)
                && existing.kind() == Kind::Event
            {
                return Err(BrokerError::rejected(path, "registered as an event"));
            }
            state.properties.insert(path.to_string(), value.clone());
        }
        for callback in self.watchers(Kind::Property, path) {
            callback(path, value.clone());
        }
        Ok(())
    }

    async fn send_event(&self, path: &str, value: serde_json::Value) -> Result<(), BrokerError> {
        debug!(%path, %value, "MemoryBroker::send_event: called");
        if let Some(existing) = self.read_state().registrations.get(path)
            && existing.kind() == Kind::Property
        {
            return Err(BrokerError::rejected(path, "registered as a property"));
        }
        for callback in self.watchers(Kind::Event, path) {
            callback(path, value.clone());
        }
        Ok(())
    }
}
