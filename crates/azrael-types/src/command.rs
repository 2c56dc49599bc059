use std::collections::BTreeMap;

use azrael_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::body::{Body, BodyUpdate};
use crate::parts::{Booster, Factory};
use crate::ObjectId;

/// Spawn an object at the next tick boundary. The Broker resolves the
/// template into a full body and part tables before enqueueing, so Leonard
/// needs no template state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmdSpawn {
    pub object_id: ObjectId,
    pub body: Body,
    #[serde(default)]
    pub boosters: BTreeMap<String, Booster>,
    #[serde(default)]
    pub factories: BTreeMap<String, Factory>,
}

/// Remove an object at the next tick boundary. Unknown ids are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CmdRemove {
    pub object_id: ObjectId,
}

/// Overwrite parts of an object's state at the next tick boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmdModify {
    pub object_id: ObjectId,
    pub update: BodyUpdate,
}

/// Set the world-space direct force/torque target. Persists across ticks
/// until changed or the object is removed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CmdDirectForce {
    pub object_id: ObjectId,
    pub force: Vec3,
    pub torque: Vec3,
}

/// Set the net booster force/torque target, in the body-local frame. Leonard
/// rotates it into world space each tick with the body's current orientation.
///
/// `parts` carries the clamped per-booster outputs of a `control_parts`
/// call. Leonard merges them into its booster mirror at drain time, so the
/// object's store document picks them up at the next commit without anyone
/// but Leonard writing that collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmdBoosterForce {
    pub object_id: ObjectId,
    pub force: Vec3,
    pub torque: Vec3,
    #[serde(default)]
    pub parts: BTreeMap<String, f32>,
}
