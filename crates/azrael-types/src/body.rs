use std::collections::BTreeMap;

use azrael_math::{quat_is_unit, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{AzError, AzResult};
use crate::shape::ShapeFragment;

/// Fragment name → collision shape, in deterministic iteration order.
pub type ShapeMap = BTreeMap<String, ShapeFragment>;

/// Authoritative physical state of one rigid body.
///
/// The owning `ObjectId` is the key under which the body is stored (datastore
/// document id, mirror map key, work-package entry) and is not duplicated
/// here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity_lin: Vec3,
    pub velocity_rot: Vec3,
    /// Zero makes the body immovable.
    pub inverse_mass: f32,
    pub principal_inertia: Vec3,
    pub com_offset: Vec3,
    pub paxis: Quat,
    pub scale: f32,
    pub shapes: ShapeMap,
    pub restitution: f32,
    pub friction: f32,
    /// Per-axis translation mask, each component 0 or 1.
    pub linear_factor: Vec3,
    /// Per-axis rotation mask, each component 0 or 1.
    pub rotation_factor: Vec3,
    pub template_id: String,
    /// Bumped on structural changes (collision-shape swap, rescale) so
    /// consumers can detect that cached geometry is stale.
    pub version: u64,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            velocity_lin: Vec3::ZERO,
            velocity_rot: Vec3::ZERO,
            inverse_mass: 1.0,
            principal_inertia: Vec3::ONE,
            com_offset: Vec3::ZERO,
            paxis: Quat::IDENTITY,
            scale: 1.0,
            shapes: ShapeMap::new(),
            restitution: 0.9,
            friction: 0.5,
            linear_factor: Vec3::ONE,
            rotation_factor: Vec3::ONE,
            template_id: String::new(),
            version: 0,
        }
    }
}

fn valid_factor(v: Vec3) -> bool {
    [v.x, v.y, v.z].iter().all(|c| *c == 0.0 || *c == 1.0)
}

impl Body {
    pub fn validate(&self) -> AzResult<()> {
        if !quat_is_unit(self.orientation) {
            return Err(AzError::bad_input("orientation is not a unit quaternion"));
        }
        if !quat_is_unit(self.paxis) {
            return Err(AzError::bad_input("principal axis is not a unit quaternion"));
        }
        if !(self.inverse_mass.is_finite() && self.inverse_mass >= 0.0) {
            return Err(AzError::bad_input(format!(
                "inverse mass must be non-negative, got {}",
                self.inverse_mass
            )));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(AzError::bad_input(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if !valid_factor(self.linear_factor) || !valid_factor(self.rotation_factor) {
            return Err(AzError::bad_input("axis factors must be 0 or 1 per component"));
        }
        for frag in self.shapes.values() {
            frag.validate()?;
        }
        Ok(())
    }

    /// Merges a partial update into the body. Absent fields keep their
    /// current value. Returns `true` if the change was structural, in which
    /// case `version` has been bumped.
    pub fn apply_update(&mut self, update: &BodyUpdate) -> bool {
        if let Some(v) = update.position {
            self.position = v;
        }
        if let Some(v) = update.orientation {
            self.orientation = v;
        }
        if let Some(v) = update.velocity_lin {
            self.velocity_lin = v;
        }
        if let Some(v) = update.velocity_rot {
            self.velocity_rot = v;
        }
        if let Some(v) = update.inverse_mass {
            self.inverse_mass = v;
        }
        if let Some(v) = update.principal_inertia {
            self.principal_inertia = v;
        }
        if let Some(v) = update.com_offset {
            self.com_offset = v;
        }
        if let Some(v) = update.paxis {
            self.paxis = v;
        }
        if let Some(v) = update.restitution {
            self.restitution = v;
        }
        if let Some(v) = update.friction {
            self.friction = v;
        }
        if let Some(v) = update.linear_factor {
            self.linear_factor = v;
        }
        if let Some(v) = update.rotation_factor {
            self.rotation_factor = v;
        }

        let mut structural = false;
        if let Some(v) = update.scale {
            if v != self.scale {
                self.scale = v;
                structural = true;
            }
        }
        if let Some(shapes) = &update.shapes {
            if *shapes != self.shapes {
                self.shapes = shapes.clone();
                structural = true;
            }
        }
        if structural {
            self.version += 1;
        }
        structural
    }
}

/// A partial body state for `setBodyState` and spawn overrides. Every field
/// is optional; absent means "keep the current value".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyUpdate {
    pub position: Option<Vec3>,
    pub orientation: Option<Quat>,
    pub velocity_lin: Option<Vec3>,
    pub velocity_rot: Option<Vec3>,
    pub inverse_mass: Option<f32>,
    pub principal_inertia: Option<Vec3>,
    pub com_offset: Option<Vec3>,
    pub paxis: Option<Quat>,
    pub scale: Option<f32>,
    pub shapes: Option<ShapeMap>,
    pub restitution: Option<f32>,
    pub friction: Option<f32>,
    pub linear_factor: Option<Vec3>,
    pub rotation_factor: Option<Vec3>,
}

impl BodyUpdate {
    pub fn validate(&self) -> AzResult<()> {
        if let Some(q) = self.orientation {
            if !quat_is_unit(q) {
                return Err(AzError::bad_input("orientation is not a unit quaternion"));
            }
        }
        if let Some(q) = self.paxis {
            if !quat_is_unit(q) {
                return Err(AzError::bad_input("principal axis is not a unit quaternion"));
            }
        }
        if let Some(m) = self.inverse_mass {
            if !(m.is_finite() && m >= 0.0) {
                return Err(AzError::bad_input("inverse mass must be non-negative"));
            }
        }
        if let Some(s) = self.scale {
            if !(s.is_finite() && s > 0.0) {
                return Err(AzError::bad_input("scale must be positive"));
            }
        }
        if let Some(v) = self.linear_factor {
            if !valid_factor(v) {
                return Err(AzError::bad_input("linear factor must be 0 or 1 per axis"));
            }
        }
        if let Some(v) = self.rotation_factor {
            if !valid_factor(v) {
                return Err(AzError::bad_input("rotation factor must be 0 or 1 per axis"));
            }
        }
        if let Some(shapes) = &self.shapes {
            for frag in shapes.values() {
                frag.validate()?;
            }
        }
        Ok(())
    }
}
