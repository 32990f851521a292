//! Integration tests for valuebridge
//!
//! These tests wire bridges together through a shared MemoryBroker and check
//! end-to-end behaviour of the four binding protocols.

use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use serde_json::json;
use tokio::sync::broadcast;

use valuebridge::broker::WatchCallback;
use valuebridge::{BindingOptions, Bridge, BridgeEvent, Broker, Kind, MemoryBroker, Value};

fn drain(rx: &mut broadcast::Receiver<BridgeEvent>) -> Vec<BridgeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn recorder() -> (WatchCallback, Arc<Mutex<Vec<serde_json::Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: WatchCallback = Arc::new(move |_path: &str, value| {
        sink.lock().unwrap().push(value);
    });
    (callback, seen)
}

// =============================================================================
// Property Tests
// =============================================================================

#[tokio::test]
async fn test_property_flows_between_bridges() {
    let broker = Arc::new(MemoryBroker::new());
    let producer = Bridge::new(broker.clone());
    let consumer = Bridge::new(broker.clone());

    let local = Value::new(20.0_f64);
    let _outbound = producer
        .set_property("lounge/temperature", &local, &BindingOptions::registered("Lounge temperature"))
        .unwrap();
    let inbound = consumer
        .get_property("lounge/temperature", 0.0_f64, &BindingOptions::default())
        .unwrap();

    // The default is visible before anything reaches the broker
    assert_eq!(inbound.value().read(), Some(0.0));

    producer.flush().await.unwrap();
    consumer.flush().await.unwrap();
    assert_eq!(inbound.value().read(), Some(20.0));

    local.set(21.5).unwrap();
    producer.flush().await.unwrap();
    assert_eq!(inbound.value().read(), Some(21.5));
    assert_eq!(broker.property("lounge/temperature"), Some(json!(21.5)));
}

#[tokio::test]
async fn test_close_deletes_registered_property() {
    let broker = Arc::new(MemoryBroker::new());
    let bridge = Bridge::new(broker.clone());

    let local = Value::new("on".to_string());
    let binding = bridge
        .set_property("lounge/light", &local, &BindingOptions::registered("Lounge light"))
        .unwrap();
    bridge.flush().await.unwrap();
    assert_eq!(broker.property("lounge/light"), Some(json!("on")));
    assert!(broker.registration("lounge/light").is_some());

    binding.close().unwrap();
    bridge.flush().await.unwrap();
    assert_eq!(broker.property("lounge/light"), None);
    assert!(broker.registration("lounge/light").is_none());

    // Later changes stay local
    local.set("off".to_string()).unwrap();
    bridge.flush().await.unwrap();
    assert_eq!(broker.property("lounge/light"), None);
}

#[tokio::test]
async fn test_close_keeps_property_when_asked() {
    let broker = Arc::new(MemoryBroker::new());
    let bridge = Bridge::new(broker.clone());

    let local = Value::new(1_u32);
    let options = BindingOptions::registered("Counter").with_delete_on_unregister(false);
    let binding = bridge.set_property("counter", &local, &options).unwrap();
    bridge.flush().await.unwrap();

    binding.close().unwrap();
    bridge.flush().await.unwrap();
    assert_eq!(broker.property("counter"), Some(json!(1)));
}

#[tokio::test]
async fn test_registered_inbound_property_sees_its_default_echoed() {
    let broker = Arc::new(MemoryBroker::new());
    let bridge = Bridge::new(broker.clone());

    let binding = bridge
        .get_property("hall/motion", false, &BindingOptions::registered("Hall motion"))
        .unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    binding.value().on_change(move |v: &bool| sink.lock().unwrap().push(*v));
    bridge.flush().await.unwrap();

    // Published default comes back through the watch as an unchanged value
    assert_eq!(*seen.lock().unwrap(), vec![false]);
    assert_eq!(binding.value().read(), Some(false));
    assert_eq!(broker.property("hall/motion"), Some(json!(false)));
}

// =============================================================================
// Event Tests
// =============================================================================

#[tokio::test]
async fn test_events_flow_between_bridges() {
    let broker = Arc::new(MemoryBroker::new());
    let producer = Bridge::new(broker.clone());
    let consumer = Bridge::new(broker.clone());

    let inbound = consumer
        .watch_event::<String>("door/bell", &BindingOptions::default())
        .unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    inbound.value().on_change(move |v: &String| sink.lock().unwrap().push(v.clone()));
    consumer.flush().await.unwrap();

    let local = Value::<String>::no_value();
    let _outbound = producer
        .send_event("door/bell", &local, &BindingOptions::default())
        .unwrap();
    producer.flush().await.unwrap();
    // No initial send for events
    assert!(received.lock().unwrap().is_empty());

    local.set_instantaneous("ding".to_string()).unwrap();
    local.set_instantaneous("dong".to_string()).unwrap();
    producer.flush().await.unwrap();

    assert_eq!(*received.lock().unwrap(), vec!["ding".to_string(), "dong".to_string()]);
    assert!(inbound.value().has_no_value());
    assert_eq!(broker.property("door/bell"), None);
}

// =============================================================================
// Event Bus Tests
// =============================================================================

#[tokio::test]
async fn test_rejected_delivery_is_reported() {
    let broker = Arc::new(MemoryBroker::new());
    let owner = Bridge::new(broker.clone());
    let intruder = Bridge::new(broker.clone());
    let mut rx = intruder.subscribe();

    let owned = Value::new(true);
    let _property = owner
        .set_property("shared/path", &owned, &BindingOptions::registered("Owned"))
        .unwrap();
    owner.flush().await.unwrap();

    let local = Value::<bool>::no_value();
    let _event = intruder
        .send_event("shared/path", &local, &BindingOptions::default())
        .unwrap();
    local.set_instantaneous(false).unwrap();
    intruder.flush().await.unwrap();

    let events = drain(&mut rx);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, BridgeEvent::DeliveryFailed { path, kind: Kind::Event, .. } if path == "shared/path")),
        "expected DeliveryFailed, got {:?}",
        events
    );
    // The failed value is not retried
    assert_eq!(broker.property("shared/path"), Some(json!(true)));
}

#[tokio::test]
async fn test_registration_and_closure_events() {
    let broker = Arc::new(MemoryBroker::new());
    let bridge = Bridge::new(broker.clone());
    let mut rx = bridge.subscribe();

    let binding = bridge
        .get_property("hall/motion", false, &BindingOptions::registered("Hall motion"))
        .unwrap();
    binding.close().unwrap();
    bridge.flush().await.unwrap();

    let types: Vec<&str> = drain(&mut rx).iter().map(|e| e.event_type()).collect();
    assert_eq!(types.first(), Some(&"Registered"));
    assert!(types.contains(&"Watching"));
    assert_eq!(types.last(), Some(&"Closed"));
    assert_eq!(broker.watcher_count(Kind::Property, "hall/motion"), 0);
}

// =============================================================================
// Ordering
// =============================================================================

proptest! {
    #[test]
    fn prop_property_changes_arrive_in_order(values in prop::collection::vec(any::<i64>(), 1..50)) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let broker = Arc::new(MemoryBroker::new());
            let (callback, seen) = recorder();
            broker.watch_property("ordered", callback).await.unwrap();

            let bridge = Bridge::new(broker.clone());
            let local = Value::new(values[0]);
            let _binding = bridge.set_property("ordered", &local, &BindingOptions::default()).unwrap();
            for v in &values[1..] {
                local.set(*v).unwrap();
            }
            bridge.flush().await.unwrap();

            let expected: Vec<serde_json::Value> = values.iter().map(|v| json!(v)).collect();
            prop_assert_eq!(seen.lock().unwrap().clone(), expected);
            Ok(())
        })?;
    }
}
