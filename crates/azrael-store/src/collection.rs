use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{json, Value};

use crate::keypath::{get_path, inc_path, set_path, unset_path, KeyPath, Projection};
use crate::{valid_key, StoreError, StoreResult};

/// An atomic read-modify-write against one document. Constraints are checked
/// before anything is applied; the whole operation is all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct ModifyOp {
    pub inc: Vec<(KeyPath, f64)>,
    pub set: Vec<(KeyPath, Value)>,
    pub unset: Vec<KeyPath>,
    /// `(path, must_exist)` guards.
    pub exists: Vec<(KeyPath, bool)>,
}

impl ModifyOp {
    pub fn set(mut self, path: KeyPath, value: Value) -> Self {
        self.set.push((path, value));
        self
    }

    pub fn inc(mut self, path: KeyPath, delta: f64) -> Self {
        self.inc.push((path, delta));
        self
    }

    pub fn unset(mut self, path: KeyPath) -> Self {
        self.unset.push(path);
        self
    }

    pub fn require(mut self, path: KeyPath, must_exist: bool) -> Self {
        self.exists.push((path, must_exist));
        self
    }
}

/// One named collection of documents. Documents are JSON objects keyed by an
/// `aid` string carrying a unique index (the map key). Mutations run under
/// the map's entry guard, which is what "single-document atomic" means here.
#[derive(Clone)]
pub struct Collection {
    name: Arc<str>,
    docs: Arc<DashMap<String, Value>>,
}

impl Collection {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            docs: Arc::new(DashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> usize {
        self.docs.len()
    }

    pub fn clear(&self) {
        self.docs.clear();
    }

    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.docs.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    fn check(aid: &str, doc: &Value) -> StoreResult<()> {
        if !valid_key(aid) {
            return Err(StoreError::InvalidKey(aid.to_string()));
        }
        if !doc.is_object() {
            return Err(StoreError::NotAnObject);
        }
        Ok(())
    }

    /// Insert-if-absent. Returns `false` when a document with this aid
    /// already exists (the existing document is untouched).
    pub fn put(&self, aid: &str, doc: Value) -> StoreResult<bool> {
        Self::check(aid, &doc)?;
        let mut inserted = false;
        self.docs.entry(aid.to_string()).or_insert_with(|| {
            inserted = true;
            doc
        });
        Ok(inserted)
    }

    /// Replace-if-present. Returns `false` when no document with this aid
    /// exists.
    pub fn replace(&self, aid: &str, doc: Value) -> StoreResult<bool> {
        Self::check(aid, &doc)?;
        match self.docs.get_mut(aid) {
            Some(mut entry) => {
                *entry = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Unconditional write.
    pub fn upsert(&self, aid: &str, doc: Value) -> StoreResult<()> {
        Self::check(aid, &doc)?;
        self.docs.insert(aid.to_string(), doc);
        Ok(())
    }

    /// Unconditional write of a whole batch.
    pub fn upsert_multi(&self, docs: Vec<(String, Value)>) -> StoreResult<()> {
        for (aid, doc) in &docs {
            Self::check(aid, doc)?;
        }
        for (aid, doc) in docs {
            self.docs.insert(aid, doc);
        }
        Ok(())
    }

    pub fn get_one(&self, aid: &str, prj: Option<&Projection>) -> Option<Value> {
        self.docs.get(aid).map(|doc| match prj {
            Some(prj) => prj.project(&doc),
            None => doc.clone(),
        })
    }

    /// Missing aids map to `None`.
    pub fn get_multi(
        &self,
        aids: &[String],
        prj: Option<&Projection>,
    ) -> BTreeMap<String, Option<Value>> {
        aids.iter()
            .map(|aid| (aid.clone(), self.get_one(aid, prj)))
            .collect()
    }

    pub fn get_all(&self, prj: Option<&Projection>) -> BTreeMap<String, Value> {
        self.docs
            .iter()
            .map(|entry| {
                let doc = match prj {
                    Some(prj) => prj.project(entry.value()),
                    None => entry.value().clone(),
                };
                (entry.key().clone(), doc)
            })
            .collect()
    }

    /// Applies `op` atomically. Returns `false` without touching the
    /// document when it is missing or an `exists` guard fails.
    pub fn modify(&self, aid: &str, op: &ModifyOp) -> StoreResult<bool> {
        let Some(mut entry) = self.docs.get_mut(aid) else {
            return Ok(false);
        };
        let doc = entry.value_mut();

        for (path, must_exist) in &op.exists {
            if get_path(doc, path).is_some() != *must_exist {
                return Ok(false);
            }
        }
        // Increments require an existing numeric leaf; verify before applying
        // anything so the operation stays all-or-nothing.
        for (path, _) in &op.inc {
            if !get_path(doc, path).map(|v| v.is_number()).unwrap_or(false) {
                return Ok(false);
            }
        }

        for (path, delta) in &op.inc {
            inc_path(doc, path, *delta);
        }
        for (path, value) in &op.set {
            set_path(doc, path, value.clone());
        }
        for path in &op.unset {
            unset_path(doc, path);
        }
        Ok(true)
    }

    /// Removes the listed documents; missing aids are silently tolerated.
    /// Returns how many documents were actually deleted.
    pub fn remove(&self, aids: &[String]) -> usize {
        aids.iter().filter(|aid| self.docs.remove(*aid).is_some()).count()
    }

    /// Atomic add on a `{value: int}` document, creating it at zero. Used by
    /// the counter API.
    pub(crate) fn fetch_add(&self, aid: &str, delta: i64) -> StoreResult<i64> {
        if !valid_key(aid) {
            return Err(StoreError::InvalidKey(aid.to_string()));
        }
        let mut entry = self
            .docs
            .entry(aid.to_string())
            .or_insert_with(|| json!({ "value": 0 }));
        let doc = entry.value_mut();
        let old = doc.get("value").and_then(|v| v.as_i64()).unwrap_or(0);
        let new = old + delta;
        doc["value"] = Value::from(new);
        Ok(new)
    }
}
