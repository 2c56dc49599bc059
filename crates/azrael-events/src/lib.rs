//! Topic-oriented event bus. Leonard publishes a tick-complete message with
//! the tick's collision pairs; game-logic subscribers drain their receiver at
//! their own pace.

#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex};

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Topic carrying the tick-complete collision list.
pub const TOPIC_TICK: &str = "phys";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMsg {
    pub topic: String,
    pub payload: Value,
}

#[derive(Default)]
struct Topics {
    subscribers: Vec<(String, Sender<EventMsg>)>,
}

/// Cheap to clone; all clones publish into the same set of subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Topics>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber for `topic`. Dropping the receiver
    /// unsubscribes; dead subscribers are pruned on publish.
    pub fn subscribe(&self, topic: &str) -> Receiver<EventMsg> {
        let (tx, rx) = unbounded();
        self.inner
            .lock()
            .expect("event bus poisoned")
            .subscribers
            .push((topic.to_string(), tx));
        rx
    }

    /// Delivers `payload` to every live subscriber of `topic`. Returns the
    /// number of subscribers reached; no subscribers is a no-op.
    pub fn publish(&self, topic: &str, payload: Value) -> usize {
        let msg = EventMsg {
            topic: topic.to_string(),
            payload,
        };
        let mut inner = self.inner.lock().expect("event bus poisoned");
        let mut delivered = 0;
        inner.subscribers.retain(|(t, tx)| {
            if t != topic {
                return true;
            }
            match tx.send(msg.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        delivered
    }
}
