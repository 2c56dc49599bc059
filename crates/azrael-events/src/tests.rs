use serde_json::json;

use crate::{EventBus, TOPIC_TICK};

#[test]
fn delivers_in_order() {
    let bus = EventBus::new();
    let rx = bus.subscribe(TOPIC_TICK);

    bus.publish(TOPIC_TICK, json!([1]));
    bus.publish(TOPIC_TICK, json!([2]));

    assert_eq!(rx.recv().unwrap().payload, json!([1]));
    assert_eq!(rx.recv().unwrap().payload, json!([2]));
}

#[test]
fn topics_are_independent() {
    let bus = EventBus::new();
    let phys = bus.subscribe(TOPIC_TICK);
    let other = bus.subscribe("other");

    assert_eq!(bus.publish(TOPIC_TICK, json!(null)), 1);
    assert_eq!(phys.try_recv().unwrap().topic, TOPIC_TICK);
    assert!(other.try_recv().is_err());
}

#[test]
fn publish_without_subscribers_is_a_noop() {
    let bus = EventBus::new();
    assert_eq!(bus.publish("nobody", json!(1)), 0);
}

#[test]
fn dropped_subscribers_are_pruned() {
    let bus = EventBus::new();
    let rx = bus.subscribe(TOPIC_TICK);
    drop(rx);
    assert_eq!(bus.publish(TOPIC_TICK, json!(1)), 0);
}
