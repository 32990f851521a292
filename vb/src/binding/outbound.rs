//! Outbound bindings: local value -> broker

use tracing::{debug, warn};

use super::{BindingContext, BindingError, BindingOptions, Payload, encode};
use crate::broker::{Direction, Kind, Registration};
use crate::value::{ListenerId, Value, ValueReader};

/// Publishes a local value as a broker property
///
/// The current value is pushed at construction and every later change is
/// pushed in the order it happened.
pub struct OutboundPropertyBinding<T> {
    forwarder: Forwarder<T>,
}

impl<T: Payload> OutboundPropertyBinding<T> {
    pub(crate) fn start(ctx: BindingContext, value: &Value<T>, options: &BindingOptions) -> Result<Self, BindingError> {
        debug!(path = %ctx.path, registered = options.description.is_some(), "OutboundPropertyBinding::start: called");
        let registration = options.description.as_ref().map(|description| {
            Registration::property(
                &ctx.path,
                Direction::OneToMany,
                description,
                options.delete_on_unregister,
            )
        });

        let forwarder = Forwarder::attach(ctx, Kind::Property, value.reader(), registration, true)?;
        Ok(Self { forwarder })
    }

    pub fn path(&self) -> &str {
        &self.forwarder.ctx.path
    }

    /// Stop publishing changes, and unregister if this binding registered the path
    pub fn close(self) -> Result<(), BindingError> {
        self.forwarder.close()
    }
}

/// Sends every instantaneous value of a local value as a broker event
///
/// Nothing is sent at construction.
pub struct OutboundEventBinding<T> {
    forwarder: Forwarder<T>,
}

impl<T: Payload> OutboundEventBinding<T> {
    pub(crate) fn start(ctx: BindingContext, value: &Value<T>, options: &BindingOptions) -> Result<Self, BindingError> {
        debug!(path = %ctx.path, registered = options.description.is_some(), "OutboundEventBinding::start: called");
        let registration = options
            .description
            .as_ref()
            .map(|description| Registration::event(&ctx.path, Direction::OneToMany, description));

        let forwarder = Forwarder::attach(ctx, Kind::Event, value.reader(), registration, false)?;
        Ok(Self { forwarder })
    }

    pub fn path(&self) -> &str {
        &self.forwarder.ctx.path
    }

    /// Stop sending occurrences, and unregister if this binding registered the path
    pub fn close(self) -> Result<(), BindingError> {
        self.forwarder.close()
    }
}

/// A listener on a local value that schedules one broker call per change
struct Forwarder<T> {
    ctx: BindingContext,
    reader: ValueReader<T>,
    listener: ListenerId,
    registered: bool,
}

impl<T: Payload> Forwarder<T> {
    /// Schedule the registration and, with `push_initial`, the current value,
    /// then start forwarding changes. A concurrent write lands either before
    /// the current value is read or after the listener is attached.
    fn attach(
        ctx: BindingContext,
        kind: Kind,
        reader: ValueReader<T>,
        registration: Option<Registration>,
        push_initial: bool,
    ) -> Result<Self, BindingError> {
        let registered = registration.is_some();
        // The listener captures the broker side only, never the value
        let listener_ctx = ctx.clone();
        let init = |current: Option<T>| -> Result<(), BindingError> {
            // Encode first so a value that cannot be sent schedules nothing
            let initial = match current {
                Some(v) if push_initial => Some(encode(&ctx.path, &v)?),
                _ => None,
            };
            if let Some(registration) = registration {
                ctx.schedule_register(registration)?;
            }
            match initial {
                Some(payload) => ctx.schedule_forward(kind, payload)?,
                None if push_initial => debug!(path = %ctx.path, "Forwarder::attach: no current value to publish"),
                None => {}
            }
            Ok(())
        };
        let listener = reader.on_change_from_current(init, move |value: &T| {
            let result = encode(&listener_ctx.path, value).and_then(|payload| {
                listener_ctx
                    .schedule_forward(kind, payload)
                    .map_err(BindingError::from)
            });
            if let Err(e) = result {
                warn!(path = %listener_ctx.path, %kind, error = %e, "Could not forward local change");
                listener_ctx.emitter.delivery_failed(kind, &e.to_string());
            }
        })?;
        Ok(Self {
            ctx,
            reader,
            listener,
            registered,
        })
    }

    fn close(self) -> Result<(), BindingError> {
        debug!(path = %self.ctx.path, "Forwarder::close: called");
        self.reader.remove_listener(self.listener);
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
