//! The object registry and datastore.
//!
//! Named collections of JSON documents keyed by an `aid` string. All
//! operations are single-document atomic; cross-collection consistency is the
//! tick loop's job. Counters back monotonic id allocation, and the five
//! command queues live here as sequence-stamped documents.

pub mod collection;
pub mod keypath;
pub mod queue;


use dashmap::DashMap;
use serde_json::json;
use thiserror::Error;

pub use collection::{Collection, ModifyOp};
pub use keypath::{KeyPath, Projection};
pub use queue::CommandQueue;

pub mod prelude {
    pub use crate::collection::*;
    pub use crate::keypath::*;
    pub use crate::queue::*;
    pub use crate::{Datastore, StoreError, StoreResult};
    pub use crate::{AABBS, BODIES, COUNTERS, TEMPLATES};
    pub use crate::{CMD_BOOSTER_FORCE, CMD_DIRECT_FORCE, CMD_MODIFY, CMD_REMOVE, CMD_SPAWN};
}

/// Live body documents, keyed by stringified object id.
pub const BODIES: &str = "bodies";
/// Cached bounding boxes, keyed like `BODIES`.
pub const AABBS: &str = "aabbs";
/// Write-once templates, keyed by template id.
pub const TEMPLATES: &str = "templates";
/// Counter documents `{value: int}`, keyed by counter name.
pub const COUNTERS: &str = "counters";

pub const CMD_SPAWN: &str = "cmd_spawn";
pub const CMD_REMOVE: &str = "cmd_remove";
pub const CMD_MODIFY: &str = "cmd_modify";
pub const CMD_DIRECT_FORCE: &str = "cmd_direct_force";
pub const CMD_BOOSTER_FORCE: &str = "cmd_booster_force";

/// All command queues, in no particular order. The drain order is fixed by
/// the tick loop, not by this list.
pub const COMMAND_QUEUES: [&str; 5] = [
    CMD_SPAWN,
    CMD_REMOVE,
    CMD_MODIFY,
    CMD_DIRECT_FORCE,
    CMD_BOOSTER_FORCE,
];

/// Counter that hands out object ids.
pub const COUNTER_OBJECT_ID: &str = "objectid";
/// Counter that stamps command-queue entries with their enqueue order.
pub const COUNTER_CMD_SEQ: &str = "cmdseq";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unknown collection `{0}`")]
    UnknownCollection(String),
    #[error("invalid key `{0}`")]
    InvalidKey(String),
    #[error("document must be a JSON object")]
    NotAnObject,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keys may not contain the key-path delimiter and must be non-empty.
pub fn valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains('.')
}

/// The process-wide datastore. Cheap to clone via `Arc` at the call sites;
/// the collections themselves are shared concurrent maps.
pub struct Datastore {
    collections: DashMap<String, Collection>,
}

impl Default for Datastore {
    fn default() -> Self {
        Self::new()
    }
}

impl Datastore {
    /// Creates the canonical collection set: bodies, AABBs, templates,
    /// counters and the five command queues.
    pub fn new() -> Self {
        let collections = DashMap::new();
        for name in [BODIES, AABBS, TEMPLATES, COUNTERS]
            .into_iter()
            .chain(COMMAND_QUEUES)
        {
            collections.insert(name.to_string(), Collection::new(name));
        }
        Self { collections }
    }

    pub fn collection(&self, name: &str) -> StoreResult<Collection> {
        self.collections
            .get(name)
            .map(|c| c.clone())
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }

    pub fn queue(&self, name: &str) -> StoreResult<CommandQueue> {
        if !COMMAND_QUEUES.contains(&name) {
            return Err(StoreError::UnknownCollection(name.to_string()));
        }
        Ok(CommandQueue::new(self.collection(name)?, self.collection(COUNTERS)?))
    }

    /// Drops every document in every collection. Counters reset with it.
    pub fn reset(&self) {
        for entry in self.collections.iter() {
            entry.value().clear();
        }
    }

    // ------------------------------------------------------------------
    // Counters. Stored as `{value: int}` documents in the counters
    // collection, mutated under the entry lock for atomicity.
    // ------------------------------------------------------------------

    pub fn set_counter(&self, name: &str, value: i64) -> StoreResult<()> {
        let counters = self.collection(COUNTERS)?;
        counters.upsert(name, json!({ "value": value }))?;
        Ok(())
    }

    pub fn get_counter(&self, name: &str) -> StoreResult<Option<i64>> {
        let counters = self.collection(COUNTERS)?;
        Ok(counters
            .get_one(name, None)
            .and_then(|doc| doc.get("value").and_then(|v| v.as_i64())))
    }

    /// Atomically adds `delta` and returns the new value. A missing counter
    /// starts at zero.
    pub fn increment_counter(&self, name: &str, delta: i64) -> StoreResult<i64> {
        let counters = self.collection(COUNTERS)?;
        counters.fetch_add(name, delta)
    }

    pub fn remove_counter(&self, name: &str) -> StoreResult<()> {
        let counters = self.collection(COUNTERS)?;
        counters.remove(&[name.to_string()]);
        Ok(())
    }

    /// Reserves a contiguous block of `n` fresh object ids with a single
    /// atomic increment. Returns the first id of the block.
    pub fn reserve_ids(&self, n: u64) -> StoreResult<u64> {
        let last = self.increment_counter(COUNTER_OBJECT_ID, n as i64)?;
        Ok(last as u64 - n + 1)
    }
}
