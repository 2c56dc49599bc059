//! The command broker: the request/reply façade clients talk to.
//!
//! Every operation validates its payload, touches the datastore atomically
//! (per document) and either enqueues commands for Leonard or reads the last
//! committed tick snapshot. The broker holds no state of its own; a fresh
//! instance over the same store behaves identically.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::sync::Arc;

use azrael_log::debug;
use azrael_math::Vec3;
use azrael_store::prelude::*;
use azrael_types::prelude::*;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub mod prelude {
    pub use crate::{Broker, SpawnRequest};
}

/// One entry of a spawn batch: which template, and which fields of its
/// reference body to override.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SpawnRequest {
    pub template_id: String,
    #[serde(default)]
    pub overrides: BodyUpdate,
}

#[derive(Clone)]
pub struct Broker {
    store: Arc<Datastore>,
}

fn to_doc<T: Serialize>(value: &T) -> AzResult<Value> {
    serde_json::to_value(value).map_err(AzError::store)
}

fn from_doc<T: DeserializeOwned>(value: Value) -> AzResult<T> {
    serde_json::from_value(value).map_err(AzError::store)
}

impl Broker {
    pub fn new(store: Arc<Datastore>) -> AzResult<Self> {
        // Surface a broken store at construction time.
        store.collection(BODIES).map_err(AzError::store)?;
        Ok(Self { store })
    }

    fn collection(&self, name: &str) -> AzResult<Collection> {
        self.store.collection(name).map_err(AzError::store)
    }

    fn queue(&self, name: &str) -> AzResult<CommandQueue> {
        self.store.queue(name).map_err(AzError::store)
    }

    // ------------------------------------------------------------------
    // Templates.
    // ------------------------------------------------------------------

    /// Adds a batch of write-once templates. The whole call is rejected if
    /// any template is malformed; otherwise each entry reports whether it
    /// was inserted (`true`) or collided with an existing name (`false`).
    pub fn add_templates(&self, templates: Vec<Template>) -> AzResult<Vec<bool>> {
        for template in &templates {
            template.validate()?;
            if !azrael_store::valid_key(&template.id) {
                return Err(AzError::bad_input(format!(
                    "template id `{}` is not a valid key",
                    template.id
                )));
            }
        }

        let col = self.collection(TEMPLATES)?;
        let mut flags = Vec::with_capacity(templates.len());
        for template in templates {
            let doc = to_doc(&template)?;
            let inserted = col.put(&template.id, doc).map_err(AzError::store)?;
            if !inserted {
                debug!("template `{}` already exists", template.id);
            }
            flags.push(inserted);
        }
        Ok(flags)
    }

    pub fn get_templates(
        &self,
        ids: &[String],
    ) -> AzResult<BTreeMap<String, Option<Template>>> {
        let col = self.collection(TEMPLATES)?;
        let mut out = BTreeMap::new();
        for (id, doc) in col.get_multi(ids, None) {
            let template = doc.map(from_doc::<Template>).transpose()?;
            out.insert(id, template);
        }
        Ok(out)
    }

    fn require_template(&self, id: &str) -> AzResult<Template> {
        let col = self.collection(TEMPLATES)?;
        let doc = col
            .get_one(id, None)
            .ok_or_else(|| AzError::UnknownTemplate(id.to_string()))?;
        from_doc(doc)
    }

    // ------------------------------------------------------------------
    // Spawning and removal.
    // ------------------------------------------------------------------

    /// Enqueues one spawn per request and returns the allocated ids. The
    /// bodies become observable after the next tick boundary. Fails fast
    /// (before reserving any ids) if a template is unknown or an override is
    /// invalid.
    pub fn spawn(&self, requests: Vec<SpawnRequest>) -> AzResult<Vec<ObjectId>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let mut resolved = Vec::with_capacity(requests.len());
        for request in &requests {
            request.overrides.validate()?;
            resolved.push(self.require_template(&request.template_id)?);
        }

        let first = self
            .store
            .reserve_ids(requests.len() as u64)
            .map_err(AzError::store)?;
        let queue = self.queue(CMD_SPAWN)?;

        let mut ids = Vec::with_capacity(requests.len());
        for (offset, (request, template)) in requests.iter().zip(resolved).enumerate() {
            let id = ObjectId(first + offset as u64);
            let mut body = template.body.clone();
            body.apply_update(&request.overrides);
            body.template_id = template.id.clone();
            body.version = 0;

            let cmd = CmdSpawn {
                object_id: id,
                body,
                boosters: template.boosters,
                factories: template.factories,
            };
            queue
                .enqueue(&id.to_string(), to_doc(&cmd)?)
                .map_err(AzError::store)?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Enqueues one remove per id. Unknown ids are tolerated; Leonard skips
    /// them at drain time.
    pub fn remove_objects(&self, ids: &[ObjectId]) -> AzResult<()> {
        let queue = self.queue(CMD_REMOVE)?;
        for id in ids {
            let cmd = CmdRemove { object_id: *id };
            queue
                .enqueue(&id.to_string(), to_doc(&cmd)?)
                .map_err(AzError::store)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // State mutation commands.
    // ------------------------------------------------------------------

    fn require_object(&self, id: ObjectId) -> AzResult<Value> {
        let col = self.collection(BODIES)?;
        col.get_one(&id.to_string(), None)
            .ok_or(AzError::UnknownObject(id))
    }

    pub fn set_body_state(&self, id: ObjectId, update: BodyUpdate) -> AzResult<()> {
        update.validate()?;
        self.require_object(id)?;
        let cmd = CmdModify {
            object_id: id,
            update,
        };
        self.queue(CMD_MODIFY)?
            .enqueue(&id.to_string(), to_doc(&cmd)?)
            .map_err(AzError::store)
    }

    /// Sets the world-space force/torque target. Persists across ticks until
    /// changed.
    pub fn set_direct_force(&self, id: ObjectId, force: Vec3, torque: Vec3) -> AzResult<()> {
        self.require_object(id)?;
        let cmd = CmdDirectForce {
            object_id: id,
            force,
            torque,
        };
        self.queue(CMD_DIRECT_FORCE)?
            .enqueue(&id.to_string(), to_doc(&cmd)?)
            .map_err(AzError::store)
    }

    /// Sets the body-local booster force/torque target directly, bypassing
    /// the per-part bookkeeping of `control_parts`.
    pub fn set_booster_force(&self, id: ObjectId, force: Vec3, torque: Vec3) -> AzResult<()> {
        self.require_object(id)?;
        let cmd = CmdBoosterForce {
            object_id: id,
            force,
            torque,
            parts: BTreeMap::new(),
        };
        self.queue(CMD_BOOSTER_FORCE)?
            .enqueue(&id.to_string(), to_doc(&cmd)?)
            .map_err(AzError::store)
    }

    // ------------------------------------------------------------------
    // Parts: boosters and factories.
    // ------------------------------------------------------------------

    /// Applies booster and factory commands to one object.
    ///
    /// Booster commands clamp the requested output into the booster's force
    /// range and enqueue the summed body-local force/torque together with the
    /// clamped per-part outputs; Leonard merges those into its mirror at the
    /// next drain, so the persisted `current_force` catches up one tick
    /// later. Factory commands reserve fresh ids and enqueue spawns whose
    /// velocity is the parent's plus the world-rotated exit velocity; the
    /// returned ids are live after the next tick.
    pub fn control_parts(
        &self,
        id: ObjectId,
        booster_cmds: &[CmdBooster],
        factory_cmds: &[CmdFactory],
    ) -> AzResult<Vec<ObjectId>> {
        let doc = self.require_object(id)?;
        let parent: Body = from_doc(doc["body"].clone())?;
        let mut boosters: BTreeMap<String, Booster> =
            from_doc(doc["boosters"].clone()).unwrap_or_default();
        let factories: BTreeMap<String, Factory> =
            from_doc(doc["factories"].clone()).unwrap_or_default();

        if !booster_cmds.is_empty() {
            let mut parts = BTreeMap::new();
            for cmd in booster_cmds {
                let booster = boosters.get_mut(&cmd.part_id).ok_or_else(|| {
                    AzError::bad_input(format!("object {id} has no booster `{}`", cmd.part_id))
                })?;
                booster.current_force = cmd.force.clamp(booster.min_force, booster.max_force);
                parts.insert(cmd.part_id.clone(), booster.current_force);
            }

            let mut force = Vec3::ZERO;
            let mut torque = Vec3::ZERO;
            for booster in boosters.values() {
                let thrust = booster.current_force * booster.unit_direction();
                force += thrust;
                torque += (booster.position * parent.scale).cross(thrust);
            }
            let cmd = CmdBoosterForce {
                object_id: id,
                force,
                torque,
                parts,
            };
            self.queue(CMD_BOOSTER_FORCE)?
                .enqueue(&id.to_string(), to_doc(&cmd)?)
                .map_err(AzError::store)?;
        }

        let mut spawned = Vec::new();
        if !factory_cmds.is_empty() {
            let queue = self.queue(CMD_SPAWN)?;
            let first = self
                .store
                .reserve_ids(factory_cmds.len() as u64)
                .map_err(AzError::store)?;
            let mut rng = rand::thread_rng();

            for (offset, cmd) in factory_cmds.iter().enumerate() {
                let factory = factories.get(&cmd.part_id).ok_or_else(|| {
                    AzError::bad_input(format!("object {id} has no factory `{}`", cmd.part_id))
                })?;
                let template = self.require_template(&factory.template_id)?;

                let [lo, hi] = factory.exit_speed;
                let speed = if hi > lo { rng.gen_range(lo..=hi) } else { lo };

                let mut body = template.body.clone();
                body.position =
                    parent.position + parent.orientation * (factory.position * parent.scale);
                body.orientation = parent.orientation;
                body.velocity_lin = parent.velocity_lin
                    + parent.orientation * (factory.unit_direction() * speed);
                body.template_id = template.id.clone();
                body.version = 0;

                let new_id = ObjectId(first + offset as u64);
                let spawn = CmdSpawn {
                    object_id: new_id,
                    body,
                    boosters: template.boosters,
                    factories: template.factories,
                };
                queue
                    .enqueue(&new_id.to_string(), to_doc(&spawn)?)
                    .map_err(AzError::store)?;
                spawned.push(new_id);
            }
        }
        Ok(spawned)
    }

    // ------------------------------------------------------------------
    // Snapshot reads. These only ever see the last committed tick.
    // ------------------------------------------------------------------

    pub fn get_body_states(
        &self,
        ids: &[ObjectId],
    ) -> AzResult<BTreeMap<ObjectId, Option<Body>>> {
        let col = self.collection(BODIES)?;
        let prj = Projection::of(&[&["body"]]);
        let mut out = BTreeMap::new();
        for id in ids {
            let body = col
                .get_one(&id.to_string(), Some(&prj))
                .map(|doc| from_doc::<Body>(doc["body"].clone()))
                .transpose()?;
            out.insert(*id, body);
        }
        Ok(out)
    }

    pub fn get_aabbs(&self, ids: &[ObjectId]) -> AzResult<BTreeMap<ObjectId, Option<Aabb>>> {
        let col = self.collection(AABBS)?;
        let mut out = BTreeMap::new();
        for id in ids {
            let aabb = col
                .get_one(&id.to_string(), None)
                .map(|doc| from_doc::<Aabb>(doc["aabb"].clone()))
                .transpose()?;
            out.insert(*id, aabb);
        }
        Ok(out)
    }

    pub fn get_all_object_ids(&self) -> AzResult<Vec<ObjectId>> {
        let col = self.collection(BODIES)?;
        let mut ids = Vec::new();
        for key in col.all_keys() {
            match key.parse::<ObjectId>() {
                Ok(id) => ids.push(id),
                Err(_) => debug!("ignoring non-numeric body key `{key}`"),
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Fragment metadata of each object, resolved through its template.
    pub fn get_fragments(
        &self,
        ids: &[ObjectId],
    ) -> AzResult<BTreeMap<ObjectId, Option<BTreeMap<String, FragmentMeta>>>> {
        let bodies = self.collection(BODIES)?;
        let prj = Projection::of(&[&["body", "template_id"]]);
        let mut out = BTreeMap::new();
        for id in ids {
            let template_id = bodies
                .get_one(&id.to_string(), Some(&prj))
                .and_then(|doc| doc["body"]["template_id"].as_str().map(str::to_string));
            let fragments = match template_id {
                Some(tid) => Some(self.require_template(&tid)?.fragments),
                None => None,
            };
            out.insert(*id, fragments);
        }
        Ok(out)
    }
}
