use azrael_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::body::Body;
use crate::ObjectId;

/// One body inside a work package, together with the net world-space force
/// and torque Leonard resolved for this tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WpBody {
    pub object_id: ObjectId,
    pub body: Body,
    pub force: Vec3,
    pub torque: Vec3,
}

/// The unit of work dispatched to a worker: one collision island plus the
/// timing for this tick. `token` is a nonce the worker must echo back;
/// results bearing a stale token are discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPackage {
    pub wpid: u64,
    pub token: u64,
    pub dt: f32,
    pub max_substeps: u32,
    pub bodies: Vec<WpBody>,
}

/// A representative contact between two bodies, reported once per pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id_a: ObjectId,
    pub id_b: ObjectId,
    pub position: Vec3,
}

/// What a worker hands back to Leonard. If `failed` is set the bodies are the
/// unmodified input and Leonard treats the package as "no progress".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkResult {
    pub wpid: u64,
    pub token: u64,
    pub bodies: Vec<(ObjectId, Body)>,
    pub contacts: Vec<Contact>,
    pub failed: bool,
}

/// Tick-complete event payload: `[idA, idB, [contact positions...]]` per
/// colliding pair.
pub type CollisionList = Vec<(ObjectId, ObjectId, Vec<Vec3>)>;
