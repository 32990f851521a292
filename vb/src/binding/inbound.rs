//! Inbound bindings: broker -> local value

use std::sync::Arc;

use tracing::{debug, warn};

use super::{BindingContext, BindingError, BindingOptions, Payload, encode};
use crate::broker::{Direction, Kind, Registration, WatchCallback};
use crate::events::EventEmitter;
use crate::value::{Value, ValueError, ValueWriter};

/// Keeps a local value equal to the latest remote value of a property
///
/// The value holds `default` as soon as the binding exists; remote updates
/// replace it in delivery order.
///
/// A registered binding publishes `default` itself, and a broker that hands
/// new watchers the retained value will deliver it straight back: listeners
/// then see one change carrying the value the binding already held.
pub struct InboundPropertyBinding<T> {
    value: Value<T>,
    subscription: Subscription,
}

impl<T: Payload> InboundPropertyBinding<T> {
    pub(crate) fn start(ctx: BindingContext, default: T, options: &BindingOptions) -> Result<Self, BindingError> {
        debug!(path = %ctx.path, registered = options.description.is_some(), "InboundPropertyBinding::start: called");
        let value = Value::new(default.clone());

        let registered = match &options.description {
            Some(description) => {
                let payload = encode(&ctx.path, &default)?;
                ctx.schedule_register(Registration::property(
                    &ctx.path,
                    Direction::ManyToOne,
                    description,
                    options.delete_on_unregister,
                ))?;
                // Many producers share this path, so publish our default too
                ctx.schedule_forward(Kind::Property, payload)?;
                true
            }
            None => false,
        };

        let subscription = Subscription::start(ctx, Kind::Property, value.writer(), registered)?;
        Ok(Self { value, subscription })
    }

    /// The local value this binding writes to
    pub fn value(&self) -> &Value<T> {
        &self.value
    }

    pub fn path(&self) -> &str {
        &self.subscription.ctx.path
    }

    /// Stop watching the property, and unregister if this binding registered it
    pub fn close(self) -> Result<(), BindingError> {
        self.subscription.close()
    }
}

/// Re-emits every remote occurrence of an event on a local value
///
/// The value never holds a current value; each occurrence reaches the
/// listeners registered at that moment and is then gone.
pub struct InboundEventBinding<T> {
    value: Value<T>,
    subscription: Subscription,
}

impl<T: Payload> InboundEventBinding<T> {
    pub(crate) fn start(ctx: BindingContext, options: &BindingOptions) -> Result<Self, BindingError> {
        debug!(path = %ctx.path, registered = options.description.is_some(), "InboundEventBinding::start: called");
        let value = Value::no_value();

        let registered = match &options.description {
            Some(description) => {
                ctx.schedule_register(Registration::event(&ctx.path, Direction::ManyToOne, description))?;
                true
            }
            None => false,
        };

        let subscription = Subscription::start(ctx, Kind::Event, value.writer(), registered)?;
        Ok(Self { value, subscription })
    }

    /// The local value occurrences are emitted on
    pub fn value(&self) -> &Value<T> {
        &self.value
    }

    pub fn path(&self) -> &str {
        &self.subscription.ctx.path
    }

    /// Stop watching the event, and unregister if this binding registered it
    pub fn close(self) -> Result<(), BindingError> {
        self.subscription.close()
    }
}

/// A scheduled watch and the callback it handed to the broker
struct Subscription {
    ctx: BindingContext,
    kind: Kind,
    callback: WatchCallback,
    registered: bool,
}

impl Subscription {
    fn start<T: Payload>(
        ctx: BindingContext,
        kind: Kind,
        writer: ValueWriter<T>,
        registered: bool,
    ) -> Result<Self, BindingError> {
        let callback = apply_remote(writer, ctx.emitter.clone(), kind);
        ctx.schedule_watch(kind, callback.clone())?;
        Ok(Self {
            ctx,
            kind,
            callback,
            registered,
        })
    }

    fn close(self) -> Result<(), BindingError> {
        debug!(path = %self.ctx.path, kind = %self.kind, "Subscription::close: called");
        self.ctx.schedule_unwatch(self.kind, self.callback)?;
        if self.registered {
            self.ctx.schedule_unregister()?;
        }
        let emitter = self.ctx.emitter.clone();
        self.ctx
            .scheduler
            .schedule(format!("closed {}", self.ctx.path), async move { emitter.closed() })?;
        Ok(())
    }
}

/// Broker callback that writes each remote value into the local value
///
/// The callback only holds the write side of the value and no broker handle.
fn apply_remote<T: Payload>(writer: ValueWriter<T>, emitter: EventEmitter, kind: Kind) -> WatchCallback {
    Arc::new(move |path: &str, payload: serde_json::Value| {
        debug!(%path, %kind, %payload, "apply_remote: called");
        let value: T = match serde_json::from_value(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(%path, error = %e, "Remote value does not decode");
                emitter.decode_failed(&e.to_string());
                return;
            }
        };
        let result = match kind {
            Kind::Property => writer.set(value),
            Kind::Event => writer.set_instantaneous(value),
        };
        match result {
            Ok(()) => {}
            Err(ValueError::ListenerPanicked { failed, message, .. }) => {
                emitter.listener_failed(failed, &message);
            }
        }
    })
}
