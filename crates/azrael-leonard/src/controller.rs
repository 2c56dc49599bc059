use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use azrael_events::{EventBus, TOPIC_TICK};
use azrael_grid::ForceGrid;
use azrael_log::{debug, error, info, warn};
use azrael_math::{quat_renormalize, Vec3};
use azrael_store::prelude::*;
use azrael_types::prelude::*;
use azrael_worker::WorkerPool;
use crossbeam_channel::RecvTimeoutError;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::LeonardConfig;

/// Per-body force targets. Direct values are world-space; booster values are
/// body-local and get rotated with the body's current orientation each tick.
/// All of them persist until changed or the object is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ForceState {
    pub direct_force: Vec3,
    pub direct_torque: Vec3,
    pub booster_force: Vec3,
    pub booster_torque: Vec3,
}

/// `wpid → (token, island member ids)` for the packages of one tick.
type Outstanding = HashMap<u64, (u64, Vec<ObjectId>)>;

pub struct Leonard {
    config: LeonardConfig,
    grid: Arc<ForceGrid>,
    bus: EventBus,
    pool: WorkerPool,

    bodies_col: Collection,
    aabbs_col: Collection,
    q_spawn: CommandQueue,
    q_modify: CommandQueue,
    q_direct: CommandQueue,
    q_booster: CommandQueue,
    q_remove: CommandQueue,

    bodies: FxHashMap<ObjectId, Body>,
    boosters: FxHashMap<ObjectId, BTreeMap<String, Booster>>,
    factories: FxHashMap<ObjectId, BTreeMap<String, Factory>>,
    aabbs: FxHashMap<ObjectId, Aabb>,
    forces: FxHashMap<ObjectId, ForceState>,
    /// Removed this lifetime but not yet deleted from the store.
    pending_removals: Vec<ObjectId>,

    next_wpid: u64,
    next_token: u64,
    stop: Arc<AtomicBool>,
}

impl Leonard {
    pub fn new(
        config: LeonardConfig,
        store: &Datastore,
        bus: EventBus,
        grid: Arc<ForceGrid>,
        pool: WorkerPool,
    ) -> StoreResult<Self> {
        let mut leonard = Self {
            config,
            grid,
            bus,
            pool,
            bodies_col: store.collection(BODIES)?,
            aabbs_col: store.collection(AABBS)?,
            q_spawn: store.queue(CMD_SPAWN)?,
            q_modify: store.queue(CMD_MODIFY)?,
            q_direct: store.queue(CMD_DIRECT_FORCE)?,
            q_booster: store.queue(CMD_BOOSTER_FORCE)?,
            q_remove: store.queue(CMD_REMOVE)?,
            bodies: FxHashMap::default(),
            boosters: FxHashMap::default(),
            factories: FxHashMap::default(),
            aabbs: FxHashMap::default(),
            forces: FxHashMap::default(),
            pending_removals: Vec::new(),
            next_wpid: 0,
            next_token: 0,
            stop: Arc::new(AtomicBool::new(false)),
        };
        leonard.load_mirror();
        Ok(leonard)
    }

    /// Flag that ends `run` at the next tick boundary.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Changes the tick rate for subsequent ticks.
    pub fn set_tick_interval(&mut self, interval: std::time::Duration) {
        self.config.tick_interval = interval;
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Rebuilds the in-memory mirror from the store. Called once at startup;
    /// this is also the recovery path after a dropped commit.
    fn load_mirror(&mut self) {
        for (aid, doc) in self.bodies_col.get_all(None) {
            let Ok(id) = aid.parse::<ObjectId>() else {
                warn!("ignoring body document with non-numeric id `{aid}`");
                continue;
            };
            match parse_body_doc(&doc) {
                Ok((body, boosters, factories, force)) => {
                    self.aabbs.insert(id, Aabb::of_body(&body));
                    self.bodies.insert(id, body);
                    self.boosters.insert(id, boosters);
                    self.factories.insert(id, factories);
                    self.forces.insert(id, force);
                }
                Err(err) => warn!("ignoring unreadable body document `{aid}`: {err}"),
            }
        }
        if !self.bodies.is_empty() {
            info!("leonard: recovered {} bodies from the store", self.bodies.len());
        }
    }

    /// The fixed-rate loop. Runs ticks until the stop flag is set. A tick
    /// that overruns the target interval is followed immediately by the next
    /// one; there is no catch-up substepping.
    pub fn run(&mut self) {
        info!(
            "leonard: entering tick loop (interval {:?})",
            self.config.tick_interval
        );
        while !self.stop.load(Ordering::Relaxed) {
            let start = Instant::now();
            self.tick();
            let elapsed = start.elapsed();
            match self.config.tick_interval.checked_sub(elapsed) {
                Some(remaining) => std::thread::sleep(remaining),
                None => warn!(
                    "leonard: tick overran its interval ({:?} > {:?})",
                    elapsed, self.config.tick_interval
                ),
            }
        }
        info!("leonard: tick loop stopped");
    }

    /// One full tick: drain → resolve forces → AABBs → partition → dispatch
    /// → collect → commit → publish.
    pub fn tick(&mut self) {
        self.drain_queues();
        let net_forces = self.resolved_forces();
        self.refresh_aabbs();

        let outstanding = self.dispatch(&net_forces);
        let collisions = self.collect(outstanding);

        self.commit();
        self.publish(collisions);
    }

    // ------------------------------------------------------------------
    // Step 1: command queues, in fixed order.
    // ------------------------------------------------------------------

    fn drain_queues(&mut self) {
        for cmd in self.q_spawn.drain() {
            match serde_json::from_value::<CmdSpawn>(cmd) {
                Ok(spawn) => {
                    let id = spawn.object_id;
                    if self.bodies.contains_key(&id) {
                        warn!("spawn for live object {id}; ignoring");
                        continue;
                    }
                    self.aabbs.insert(id, Aabb::of_body(&spawn.body));
                    self.bodies.insert(id, spawn.body);
                    self.boosters.insert(id, spawn.boosters);
                    self.factories.insert(id, spawn.factories);
                    self.forces.insert(id, ForceState::default());
                }
                Err(err) => warn!("dropping malformed spawn command: {err}"),
            }
        }

        for cmd in self.q_modify.drain() {
            match serde_json::from_value::<CmdModify>(cmd) {
                Ok(modify) => {
                    // Unknown ids are skipped silently.
                    if let Some(body) = self.bodies.get_mut(&modify.object_id) {
                        body.apply_update(&modify.update);
                    }
                }
                Err(err) => warn!("dropping malformed modify command: {err}"),
            }
        }

        for cmd in self.q_direct.drain() {
            match serde_json::from_value::<CmdDirectForce>(cmd) {
                Ok(force) => {
                    if self.bodies.contains_key(&force.object_id) {
                        let state = self.forces.entry(force.object_id).or_default();
                        state.direct_force = force.force;
                        state.direct_torque = force.torque;
                    }
                }
                Err(err) => warn!("dropping malformed direct-force command: {err}"),
            }
        }

        for cmd in self.q_booster.drain() {
            match serde_json::from_value::<CmdBoosterForce>(cmd) {
                Ok(force) => {
                    if !self.bodies.contains_key(&force.object_id) {
                        continue;
                    }
                    // The mirror owns the per-part state; merging here is
                    // what makes the clamped outputs reach the store at the
                    // next commit.
                    if let Some(boosters) = self.boosters.get_mut(&force.object_id) {
                        for (part_id, output) in &force.parts {
                            if let Some(booster) = boosters.get_mut(part_id) {
                                booster.current_force = *output;
                            }
                        }
                    }
                    let state = self.forces.entry(force.object_id).or_default();
                    state.booster_force = force.force;
                    state.booster_torque = force.torque;
                }
                Err(err) => warn!("dropping malformed booster-force command: {err}"),
            }
        }

        for cmd in self.q_remove.drain() {
            match serde_json::from_value::<CmdRemove>(cmd) {
                Ok(remove) => {
                    let id = remove.object_id;
                    if self.bodies.remove(&id).is_some() {
                        self.aabbs.remove(&id);
                        self.boosters.remove(&id);
                        self.factories.remove(&id);
                        self.forces.remove(&id);
                        self.pending_removals.push(id);
                    }
                }
                Err(err) => warn!("dropping malformed remove command: {err}"),
            }
        }
    }

    // ------------------------------------------------------------------
    // Steps 2 and 4: net force per body. Booster targets are body-local and
    // rotate with the current orientation; the force grid samples at the
    // body centre and contributes zero outside set regions.
    // ------------------------------------------------------------------

    pub fn resolved_forces(&self) -> FxHashMap<ObjectId, (Vec3, Vec3)> {
        self.bodies
            .iter()
            .map(|(id, body)| {
                let state = self.forces.get(id).copied().unwrap_or_default();
                let force = state.direct_force
                    + body.orientation * state.booster_force
                    + self.grid.sample_at(body.position);
                let torque = state.direct_torque + body.orientation * state.booster_torque;
                (*id, (force, torque))
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Step 3: AABB cache.
    // ------------------------------------------------------------------

    fn refresh_aabbs(&mut self) {
        for (id, body) in &self.bodies {
            self.aabbs.insert(*id, Aabb::of_body(body));
        }
    }

    // ------------------------------------------------------------------
    // Steps 5 and 6: partition into islands and emit one work package per
    // island, each under a fresh token.
    // ------------------------------------------------------------------

    fn dispatch(&mut self, net_forces: &FxHashMap<ObjectId, (Vec3, Vec3)>) -> Outstanding {
        let mut entries: Vec<(ObjectId, Aabb)> =
            self.aabbs.iter().map(|(id, aabb)| (*id, *aabb)).collect();
        entries.sort_by_key(|(id, _)| *id);

        let islands = azrael_broadphase::islands(&entries);
        let dt = self.config.tick_interval.as_secs_f32();

        let mut outstanding = Outstanding::default();
        for island in islands {
            let wpid = self.next_wpid;
            let token = self.next_token;
            self.next_wpid += 1;
            self.next_token += 1;

            let bodies = island
                .iter()
                .filter_map(|id| {
                    let body = self.bodies.get(id)?.clone();
                    let (force, torque) = net_forces.get(id).copied().unwrap_or_default();
                    Some(WpBody {
                        object_id: *id,
                        body,
                        force,
                        torque,
                    })
                })
                .collect::<Vec<_>>();
            if bodies.is_empty() {
                continue;
            }

            outstanding.insert(wpid, (token, island));
            self.pool.submit(WorkPackage {
                wpid,
                token,
                dt,
                max_substeps: self.config.max_substeps,
                bodies,
            });
        }
        outstanding
    }

    // ------------------------------------------------------------------
    // Step 7: collect results until done or past the deadline. Anything
    // still outstanding afterwards is cancelled: the token dies with the
    // map and the affected bodies keep their pre-tick state.
    // ------------------------------------------------------------------

    fn collect(&mut self, mut outstanding: Outstanding) -> CollisionList {
        let deadline = Instant::now() + self.config.wp_deadline;
        let mut collisions: BTreeMap<(ObjectId, ObjectId), Vec<Vec3>> = BTreeMap::new();

        while !outstanding.is_empty() {
            let now = Instant::now();
            let Some(remaining) = deadline.checked_duration_since(now).filter(|d| !d.is_zero())
            else {
                break;
            };
            match self.pool.results().recv_timeout(remaining) {
                Ok(result) => self.apply_result(&mut outstanding, result, &mut collisions),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    error!("leonard: worker pool disconnected");
                    break;
                }
            }
        }

        for (wpid, (_, ids)) in &outstanding {
            warn!(
                "leonard: cancelling work package {wpid}; {} bodies keep their pre-tick state",
                ids.len()
            );
        }
        collisions
            .into_iter()
            .map(|((a, b), points)| (a, b, points))
            .collect()
    }

    /// Applies one worker result if its token is still valid. Stale results
    /// and results for removed bodies are discarded.
    pub(crate) fn apply_result(
        &mut self,
        outstanding: &mut Outstanding,
        result: WorkResult,
        collisions: &mut BTreeMap<(ObjectId, ObjectId), Vec<Vec3>>,
    ) {
        match outstanding.get(&result.wpid) {
            Some(&(token, _)) if token == result.token => {
                outstanding.remove(&result.wpid);
            }
            _ => {
                debug!(
                    "leonard: discarding stale result for package {} (token {})",
                    result.wpid, result.token
                );
                return;
            }
        }

        if result.failed {
            warn!(
                "leonard: work package {} failed; its bodies keep their pre-tick state",
                result.wpid
            );
            return;
        }

        for (id, body) in result.bodies {
            if let Some(slot) = self.bodies.get_mut(&id) {
                *slot = body;
            }
        }
        for contact in result.contacts {
            collisions
                .entry((contact.id_a, contact.id_b))
                .or_default()
                .push(contact.position);
        }
    }

    // ------------------------------------------------------------------
    // Step 8: one write batch per collection, with retry and backoff. After
    // the last failed attempt the tick's results are dropped; the mirror is
    // re-read from the store on the next start.
    // ------------------------------------------------------------------

    fn commit(&mut self) {
        for body in self.bodies.values_mut() {
            body.orientation = quat_renormalize(body.orientation);
        }

        let mut body_docs = Vec::with_capacity(self.bodies.len());
        let mut aabb_docs = Vec::with_capacity(self.bodies.len());
        for (id, body) in &self.bodies {
            let doc = match body_doc(
                body,
                self.boosters.get(id),
                self.factories.get(id),
                self.forces.get(id),
            ) {
                Ok(doc) => doc,
                Err(err) => {
                    error!("leonard: cannot serialize body {id}: {err}");
                    continue;
                }
            };
            body_docs.push((id.to_string(), doc));
            match serde_json::to_value(self.aabbs.get(id)) {
                Ok(aabb) => aabb_docs.push((id.to_string(), json!({ "aabb": aabb }))),
                Err(err) => error!("leonard: cannot serialize AABB of {id}: {err}"),
            }
        }
        let removed: Vec<String> = self.pending_removals.iter().map(|id| id.to_string()).collect();

        let mut attempt = 0;
        loop {
            match self.try_commit(&body_docs, &aabb_docs, &removed) {
                Ok(()) => {
                    self.pending_removals.clear();
                    return;
                }
                Err(err) if attempt < self.config.commit_retries => {
                    attempt += 1;
                    warn!("leonard: commit attempt {attempt} failed: {err}; retrying");
                    std::thread::sleep(self.config.commit_backoff);
                }
                Err(err) => {
                    error!(
                        "leonard: dropping tick results after {} failed commits: {err}",
                        attempt + 1
                    );
                    return;
                }
            }
        }
    }

    fn try_commit(
        &self,
        body_docs: &[(String, Value)],
        aabb_docs: &[(String, Value)],
        removed: &[String],
    ) -> StoreResult<()> {
        self.bodies_col.upsert_multi(body_docs.to_vec())?;
        self.aabbs_col.upsert_multi(aabb_docs.to_vec())?;
        self.bodies_col.remove(removed);
        self.aabbs_col.remove(removed);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Step 9: tick-complete event.
    // ------------------------------------------------------------------

    fn publish(&self, collisions: CollisionList) {
        match serde_json::to_value(&collisions) {
            Ok(payload) => {
                self.bus.publish(TOPIC_TICK, payload);
            }
            Err(err) => error!("leonard: cannot serialize tick event: {err}"),
        }
    }
}

/// The store document of one live body.
fn body_doc(
    body: &Body,
    boosters: Option<&BTreeMap<String, Booster>>,
    factories: Option<&BTreeMap<String, Factory>>,
    force: Option<&ForceState>,
) -> serde_json::Result<Value> {
    Ok(json!({
        "body": serde_json::to_value(body)?,
        "boosters": serde_json::to_value(boosters.cloned().unwrap_or_default())?,
        "factories": serde_json::to_value(factories.cloned().unwrap_or_default())?,
        "force": serde_json::to_value(force.copied().unwrap_or_default())?,
    }))
}

type ParsedBodyDoc = (
    Body,
    BTreeMap<String, Booster>,
    BTreeMap<String, Factory>,
    ForceState,
);

fn parse_body_doc(doc: &Value) -> serde_json::Result<ParsedBodyDoc> {
    let body: Body = serde_json::from_value(doc["body"].clone())?;
    let boosters = serde_json::from_value(doc["boosters"].clone()).unwrap_or_default();
    let factories = serde_json::from_value(doc["factories"].clone()).unwrap_or_default();
    let force = serde_json::from_value(doc["force"].clone()).unwrap_or_default();
    Ok((body, boosters, factories, force))
}
