//! Reactive values
//!
//! A [`Value`] holds either a current value or nothing (pure event sources)
//! and calls its listeners synchronously whenever it is set or emits an
//! instantaneous value.
//!
//! Bindings never hold a `Value` directly. Inbound bindings get a
//! [`ValueWriter`], which can only set and emit; outbound bindings get a
//! [`ValueReader`], which can only read and listen. Neither side can echo a
//! change back to where it came from.
//!
//! Storing a value and notifying listeners about it is one step: concurrent
//! writers are serialized per value, so listeners see changes in the same
//! order the value took them.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use parking_lot::ReentrantMutex;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from notifying listeners
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueError {
    /// The value was updated and every listener ran, but some of them panicked
    #[error("{failed} of {total} listeners panicked: {message}")]
    ListenerPanicked { failed: usize, total: usize, message: String },
}

/// Identifies a listener so it can be removed later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Shared<T> {
    current: RwLock<Option<T>>,
    listeners: RwLock<Vec<(ListenerId, Listener<T>)>>,
    next_id: AtomicU64,
    // Held across store + notify; reentrant so a listener may write the value it observes
    gate: ReentrantMutex<()>,
}

/// A time-varying value with synchronous change notification
pub struct Value<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Value<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("current", &*read_lock(&self.shared.current))
            .field("listeners", &read_lock(&self.shared.listeners).len())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Value<T> {
    /// A value with a meaningful current value
    pub fn new(initial: T) -> Self {
        Self::from_option(Some(initial))
    }

    /// A value with no current value, as used for pure event sources
    pub fn no_value() -> Self {
        Self::from_option(None)
    }

    fn from_option(current: Option<T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                current: RwLock::new(current),
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(0),
                gate: ReentrantMutex::new(()),
            }),
        }
    }

    /// Current value, or `None` for the "no value" sentinel
    pub fn read(&self) -> Option<T> {
        read_lock(&self.shared.current).clone()
    }

    pub fn has_no_value(&self) -> bool {
        read_lock(&self.shared.current).is_none()
    }

    /// Replace the current value and notify every listener
    pub fn set(&self, value: T) -> Result<(), ValueError> {
        let _gate = self.shared.gate.lock();
        *write_lock(&self.shared.current) = Some(value.clone());
        self.notify(&value)
    }

    /// Notify every listener without changing the current value
    pub fn set_instantaneous(&self, value: T) -> Result<(), ValueError> {
        let _gate = self.shared.gate.lock();
        self.notify(&value)
    }

    /// Register a listener; listeners run in registration order
    pub fn on_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = ListenerId(self.shared.next_id.fetch_add(1, Ordering::SeqCst));
        write_lock(&self.shared.listeners).push((id, Arc::new(listener)));
        id
    }

    /// Run `init` with the current value, then register `listener`
    ///
    /// No write can land between the two, so every change is either part of
    /// what `init` saw or reaches `listener`. Nothing is registered if `init`
    /// fails.
    pub fn on_change_from_current<E, I, F>(&self, init: I, listener: F) -> Result<ListenerId, E>
    where
        I: FnOnce(Option<T>) -> Result<(), E>,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let _gate = self.shared.gate.lock();
        init(self.read())?;
        Ok(self.on_change(listener))
    }

    /// Remove a listener, returning whether it was registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = write_lock(&self.shared.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        read_lock(&self.shared.listeners).len()
    }

    /// Whether both handles refer to the same underlying value
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Write-only view of this value
    pub fn writer(&self) -> ValueWriter<T> {
        ValueWriter { value: self.clone() }
    }

    /// Read-and-listen view of this value
    pub fn reader(&self) -> ValueReader<T> {
        ValueReader { value: self.clone() }
    }

    fn notify(&self, value: &T) -> Result<(), ValueError> {
        // Snapshot first so listeners may add or remove listeners themselves
        let listeners: Vec<Listener<T>> = read_lock(&self.shared.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        let total = listeners.len();

        let mut messages = Vec::new();
        for listener in listeners {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(value))) {
                let message = panic_message(payload.as_ref());
                warn!(%message, "Value listener panicked");
                messages.push(message);
            }
        }

        if messages.is_empty() {
            return Ok(());
        }
        debug!(failed = messages.len(), total, "Value::notify: listeners failed");
        Err(ValueError::ListenerPanicked {
            failed: messages.len(),
            total,
            message: messages.join("; "),
        })
    }
}

/// Capability to change a value, without the ability to observe it
pub struct ValueWriter<T> {
    value: Value<T>,
}

impl<T> Clone for ValueWriter<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ValueWriter<T> {
    pub fn set(&self, value: T) -> Result<(), ValueError> {
        self.value.set(value)
    }

    pub fn set_instantaneous(&self, value: T) -> Result<(), ValueError> {
        self.value.set_instantaneous(value)
    }
}

/// Capability to observe a value, without the ability to change it
pub struct ValueReader<T> {
    value: Value<T>,
}

impl<T> Clone for ValueReader<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ValueReader<T> {
    pub fn read(&self) -> Option<T> {
        self.value.read()
    }

    pub fn has_no_value(&self) -> bool {
        self.value.has_no_value()
    }

    pub fn on_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.value.on_change(listener)
    }

    pub fn on_change_from_current<E, I, F>(&self, init: I, listener: F) -> Result<ListenerId, E>
    where
        I: FnOnce(Option<T>) -> Result<(), E>,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.value.on_change_from_current(init, listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.value.remove_listener(id)
    }
}

fn read_lock<L>(lock: &RwLock<L>) -> RwLockReadGuard<'_, L> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock<L>(lock: &RwLock<L>) -> RwLockWriteGuard<'_, L> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn recording(value: &Value<i64>) -> Arc<Mutex<Vec<i64>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        value.on_change(move |v| sink.lock().unwrap().push(*v));
        seen
    }

    #[test]
    fn test_new_value_reads_initial() {
        let value = Value::new(123);
        assert_eq!(value.read(), Some(123));
        assert!(!value.has_no_value());
    }

    #[test]
    fn test_set_updates_and_notifies() {
        let value = Value::new(1);
        let seen = recording(&value);

        value.set(2).unwrap();
        value.set(3).unwrap();

        assert_eq!(value.read(), Some(3));
        assert_eq!(*seen.lock().unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_instantaneous_does_not_retain() {
        let value: Value<i64> = Value::no_value();
        let seen = recording(&value);

        value.set_instantaneous(321).unwrap();

        assert!(value.has_no_value());
        assert_eq!(value.read(), None);
        assert_eq!(*seen.lock().unwrap(), vec![321]);
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let value = Value::new(0);
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            value.on_change(move |_| order.lock().unwrap().push(i));
        }

        value.set(1).unwrap();

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_listener() {
        let value = Value::new(0);
        let seen = Arc::new(Mutex::new(0));
        let sink = seen.clone();
        let id = value.on_change(move |_| *sink.lock().unwrap() += 1);

        assert!(value.remove_listener(id));
        assert!(!value.remove_listener(id));
        value.set(1).unwrap();

        assert_eq!(*seen.lock().unwrap(), 0);
        assert_eq!(value.listener_count(), 0);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let value = Value::new(0);
        value.on_change(|_| panic!("listener exploded"));
        let seen = recording(&value);

        let result = value.set(7);

        assert_eq!(value.read(), Some(7));
        assert_eq!(*seen.lock().unwrap(), vec![7]);
        match result {
            Err(ValueError::ListenerPanicked { failed, total, message }) => {
                assert_eq!(failed, 1);
                assert_eq!(total, 2);
                assert!(message.contains("listener exploded"));
            }
            other => panic!("Expected ListenerPanicked, got {:?}", other),
        }

        // Still usable afterwards
        value.set(8).unwrap_err();
        assert_eq!(value.read(), Some(8));
    }

    #[test]
    fn test_listener_may_register_listener() {
        let value = Value::new(0);
        let inner = value.clone();
        value.on_change(move |_| {
            inner.on_change(|_| {});
        });

        value.set(1).unwrap();
        assert_eq!(value.listener_count(), 2);
    }

    #[test]
    fn test_reader_and_writer_share_value() {
        let value = Value::new(1);
        let writer = value.writer();
        let reader = value.reader();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        reader.on_change(move |v| sink.lock().unwrap().push(*v));

        writer.set(5).unwrap();
        writer.set_instantaneous(6).unwrap();

        assert_eq!(reader.read(), Some(5));
        assert_eq!(value.read(), Some(5));
        assert_eq!(*seen.lock().unwrap(), vec![5, 6]);
        assert!(value.ptr_eq(&value.clone()));
        assert!(!value.ptr_eq(&Value::new(1)));
    }

    #[test]
    fn test_concurrent_sets_notify_in_store_order() {
        let value = Value::new(0i64);
        let (entered_tx, entered_rx) = mpsc::channel();
        let entered_tx = Mutex::new(entered_tx);
        // Stall the first write's notification while a second writer races it
        value.on_change(move |v| {
            if *v == 1 {
                let _ = entered_tx.lock().unwrap().send(());
                thread::sleep(Duration::from_millis(100));
            }
        });
        let seen = recording(&value);

        let first = {
            let value = value.clone();
            thread::spawn(move || value.set(1).unwrap())
        };
        entered_rx.recv().unwrap();
        let second = {
            let value = value.clone();
            thread::spawn(move || value.set(2).unwrap())
        };
        first.join().unwrap();
        second.join().unwrap();

        assert_eq!(value.read(), Some(2));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_listener_may_set_its_own_value() {
        let value = Value::new(0i64);
        let inner = value.clone();
        value.on_change(move |v| {
            if *v == 1 {
                inner.set(2).unwrap();
            }
        });

        value.set(1).unwrap();
        assert_eq!(value.read(), Some(2));
    }

    #[test]
    fn test_on_change_from_current() {
        let value = Value::new(5i64);
        let initial = Arc::new(Mutex::new(None));
        let sink = initial.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_sink = seen.clone();

        value
            .reader()
            .on_change_from_current(
                move |current| {
                    *sink.lock().unwrap() = current;
                    Ok::<(), String>(())
                },
                move |v| seen_sink.lock().unwrap().push(*v),
            )
            .unwrap();
        value.set(6).unwrap();

        assert_eq!(*initial.lock().unwrap(), Some(5));
        assert_eq!(*seen.lock().unwrap(), vec![6]);
    }

    #[test]
    fn test_on_change_from_current_failure_registers_nothing() {
        let value = Value::new(5i64);
        let result = value.on_change_from_current(|_| Err("no"), |_| {});
        assert_eq!(result, Err("no"));
        assert_eq!(value.listener_count(), 0);
    }
}
