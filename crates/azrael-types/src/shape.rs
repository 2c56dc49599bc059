use azrael_math::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{AzError, AzResult};

/// Collision geometry of a single fragment, in the fragment's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CollisionShape {
    /// No collision geometry. The fragment is purely visual.
    Empty,
    Sphere {
        radius: f32,
    },
    Box {
        half_extents: Vec3,
    },
    /// Infinite halfspace. `normal` points away from the solid side and the
    /// surface sits at `normal * offset`.
    Plane {
        normal: Vec3,
        offset: f32,
    },
}

impl CollisionShape {
    pub fn validate(&self) -> AzResult<()> {
        match self {
            CollisionShape::Empty => Ok(()),
            CollisionShape::Sphere { radius } => {
                if radius.is_finite() && *radius > 0.0 {
                    Ok(())
                } else {
                    Err(AzError::bad_input(format!("invalid sphere radius {radius}")))
                }
            }
            CollisionShape::Box { half_extents } => {
                let h = *half_extents;
                if h.is_finite() && h.min_element() > 0.0 {
                    Ok(())
                } else {
                    Err(AzError::bad_input(format!("invalid box half extents {h}")))
                }
            }
            CollisionShape::Plane { normal, offset } => {
                if normal.is_finite() && normal.length_squared() > f32::EPSILON && offset.is_finite()
                {
                    Ok(())
                } else {
                    Err(AzError::bad_input("invalid plane definition"))
                }
            }
        }
    }
}

/// A named sub-part of a body's collision description, positioned in the
/// body-local frame. Geometry assets of the fragment are opaque to the core
/// and live in the template (`FragmentMeta`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeFragment {
    pub shape: CollisionShape,
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for ShapeFragment {
    fn default() -> Self {
        Self {
            shape: CollisionShape::Empty,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

impl ShapeFragment {
    pub fn new(shape: CollisionShape) -> Self {
        Self {
            shape,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> AzResult<()> {
        self.shape.validate()?;
        if !azrael_math::quat_is_unit(self.orientation) {
            return Err(AzError::bad_input("fragment orientation is not a unit quaternion"));
        }
        Ok(())
    }
}
