//! Event types for bridge activity
//!
//! These events describe what bindings did with the broker:
//! - Registration (sent, failed)
//! - Subscription (watching, failed)
//! - Forwarding (delivered, failed)
//! - Inbound problems (undecodable payloads, panicking listeners)

use serde::{Deserialize, Serialize};

use crate::broker::{Behaviour, Kind};

/// Core event enum - the vocabulary of bridge activity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeEvent {
    // === Registration ===
    /// The broker accepted a registration
    Registered { path: String, behaviour: Behaviour },
    /// The broker rejected or never completed a registration
    RegistrationFailed {
        path: String,
        behaviour: Behaviour,
        message: String,
    },

    // === Subscription ===
    /// An inbound binding is now watching its path
    Watching { path: String, kind: Kind },
    /// An inbound binding could not watch its path
    WatchFailed { path: String, kind: Kind, message: String },

    // === Forwarding ===
    /// An outbound binding delivered a value to the broker
    Delivered {
        path: String,
        kind: Kind,
        value: serde_json::Value,
    },
    /// An outbound binding could not deliver a value
    DeliveryFailed { path: String, kind: Kind, message: String },

    // === Inbound problems ===
    /// A remote payload did not decode into the local value type
    DecodeFailed { path: String, message: String },
    /// Local listeners panicked while handling an inbound value
    ListenerFailed { path: String, failed: usize, message: String },

    // === Lifecycle ===
    /// A binding was closed by its owner
    Closed { path: String },
}

impl BridgeEvent {
    /// Get the path this event concerns
    pub fn path(&self) -> &str {
        match self {
            BridgeEvent::Registered { path, .. }
            | BridgeEvent::RegistrationFailed { path, .. }
            | BridgeEvent::Watching { path, .. }
            | BridgeEvent::WatchFailed { path, .. }
            | BridgeEvent::Delivered { path, .. }
            | BridgeEvent::DeliveryFailed { path, .. }
            | BridgeEvent::DecodeFailed { path, .. }
            | BridgeEvent::ListenerFailed { path, .. }
            | BridgeEvent::Closed { path } => path,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            BridgeEvent::Registered { .. } => "Registered",
            BridgeEvent::RegistrationFailed { .. } => "RegistrationFailed",
            BridgeEvent::Watching { .. } => "Watching",
            BridgeEvent::WatchFailed { .. } => "WatchFailed",
            BridgeEvent::Delivered { .. } => "Delivered",
            BridgeEvent::DeliveryFailed { .. } => "DeliveryFailed",
            BridgeEvent::DecodeFailed { .. } => "DecodeFailed",
            BridgeEvent::ListenerFailed { .. } => "ListenerFailed",
            BridgeEvent::Closed { .. } => "Closed",
        }
    }

    /// Whether this event reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            BridgeEvent::RegistrationFailed { .. }
                | BridgeEvent::WatchFailed { .. }
                | BridgeEvent::DeliveryFailed { .. }
                | BridgeEvent::DecodeFailed { .. }
                | BridgeEvent::ListenerFailed { .. }
        )
    }
}
