//! Explicit conversions at the glam/nalgebra boundary. The rest of the
//! repository only ever sees glam types.

use azrael_math::{Quat, Vec3};
use nalgebra as na;

pub(crate) fn to_na_vec(v: Vec3) -> na::Vector3<f32> {
    na::vector![v.x, v.y, v.z]
}

pub(crate) fn to_na_point(v: Vec3) -> na::Point3<f32> {
    na::point![v.x, v.y, v.z]
}

pub(crate) fn to_na_quat(q: Quat) -> na::UnitQuaternion<f32> {
    na::UnitQuaternion::from_quaternion(na::Quaternion::new(q.w, q.x, q.y, q.z))
}

pub(crate) fn to_na_iso(position: Vec3, orientation: Quat) -> na::Isometry3<f32> {
    na::Isometry3::from_parts(na::Translation3::from(to_na_vec(position)), to_na_quat(orientation))
}

pub(crate) fn from_na_vec(v: &na::Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub(crate) fn from_na_point(p: &na::Point3<f32>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

pub(crate) fn from_na_quat(q: &na::UnitQuaternion<f32>) -> Quat {
    let q = q.quaternion();
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}
