use azrael_math::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use crate::body::Body;
use crate::shape::CollisionShape;

/// Half extent assigned to an unbounded plane. Large enough that the plane
/// joins any island it could possibly touch.
pub const PLANE_HALF_EXTENT: f32 = 1e9;

/// Axis-aligned bounding box, cached per body for broad-phase culling.
/// Intervals are closed: boxes touching on a face count as overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Degenerate box around a single point.
    pub fn point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    pub fn centered(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Closed-interval overlap test on one axis (0 = x, 1 = y, 2 = z).
    pub fn overlaps_on_axis(&self, other: &Aabb, axis: usize) -> bool {
        self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis]
    }

    /// Closed-interval overlap test on all three axes.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        (0..3).all(|axis| self.overlaps_on_axis(other, axis))
    }

    /// The world-space bounding box of a body, derived from its collision
    /// shapes, pose and scale. A body with no collision geometry gets a
    /// degenerate box at its position.
    pub fn of_body(body: &Body) -> Aabb {
        let mut out: Option<Aabb> = None;
        for frag in body.shapes.values() {
            let frag_pos = body.position + body.orientation * (frag.position * body.scale);
            let aabb = match frag.shape {
                CollisionShape::Empty => continue,
                CollisionShape::Sphere { radius } => {
                    Aabb::centered(frag_pos, Vec3::splat(radius * body.scale))
                }
                CollisionShape::Box { half_extents } => {
                    let m = Mat3::from_quat(body.orientation * frag.orientation);
                    let h = half_extents * body.scale;
                    // Extent of the rotated box: |R| * h, per world axis.
                    let ext = Vec3::new(
                        m.x_axis.x.abs() * h.x + m.y_axis.x.abs() * h.y + m.z_axis.x.abs() * h.z,
                        m.x_axis.y.abs() * h.x + m.y_axis.y.abs() * h.y + m.z_axis.y.abs() * h.z,
                        m.x_axis.z.abs() * h.x + m.y_axis.z.abs() * h.y + m.z_axis.z.abs() * h.z,
                    );
                    Aabb::centered(frag_pos, ext)
                }
                CollisionShape::Plane { .. } => {
                    Aabb::centered(body.position, Vec3::splat(PLANE_HALF_EXTENT))
                }
            };
            out = Some(match out {
                Some(acc) => acc.union(&aabb),
                None => aabb,
            });
        }
        out.unwrap_or_else(|| Aabb::point(body.position))
    }
}
