pub use glam::*;

/// Tolerance for unit-quaternion checks on client input and tick commits.
pub const QUAT_EPS: f32 = 1e-6;

/// `true` if the quaternion norm is within `QUAT_EPS` of one.
#[inline]
pub fn quat_is_unit(q: Quat) -> bool {
    (q.length() - 1.0).abs() <= QUAT_EPS
}

/// Renormalizes a quaternion, falling back to identity for degenerate input.
#[inline]
pub fn quat_renormalize(q: Quat) -> Quat {
    if q.length_squared() > f32::EPSILON {
        q.normalize()
    } else {
        Quat::IDENTITY
    }
}
