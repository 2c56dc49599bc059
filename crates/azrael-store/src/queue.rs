use serde_json::{json, Value};

use crate::collection::Collection;
use crate::{StoreResult, COUNTER_CMD_SEQ};

/// One command queue: multi-writer (clients via the Broker), single-reader
/// (Leonard, once per tick).
///
/// Entries are keyed by object id, so a re-enqueue for the same object
/// overwrites the pending command (most-recent wins). A sequence number from
/// the shared `cmdseq` counter preserves enqueue order across objects.
#[derive(Clone)]
pub struct CommandQueue {
    docs: Collection,
    counters: Collection,
}

impl CommandQueue {
    pub(crate) fn new(docs: Collection, counters: Collection) -> Self {
        Self { docs, counters }
    }

    pub fn name(&self) -> &str {
        self.docs.name()
    }

    pub fn len(&self) -> usize {
        self.docs.count()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.count() == 0
    }

    pub fn enqueue(&self, aid: &str, payload: Value) -> StoreResult<()> {
        let seq = self.counters.fetch_add(COUNTER_CMD_SEQ, 1)?;
        self.docs.upsert(aid, json!({ "seq": seq, "cmd": payload }))
    }

    /// Removes and returns all queued commands, in enqueue order. The queue
    /// is empty afterwards (truncated at tick start).
    pub fn drain(&self) -> Vec<Value> {
        let snapshot = self.docs.get_all(None);
        let keys: Vec<String> = snapshot.keys().cloned().collect();
        self.docs.remove(&keys);

        let mut entries: Vec<(i64, Value)> = snapshot
            .into_values()
            .filter_map(|mut doc| {
                let seq = doc.get("seq").and_then(|v| v.as_i64())?;
                let cmd = doc.get_mut("cmd")?.take();
                Some((seq, cmd))
            })
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, cmd)| cmd).collect()
    }
}
