use azrael_math::{Quat, Vec3};

use crate::prelude::*;

fn sphere_body(radius: f32) -> Body {
    let mut body = Body::default();
    body.shapes.insert(
        "cs".into(),
        ShapeFragment::new(CollisionShape::Sphere { radius }),
    );
    body
}

#[test]
fn body_defaults_are_valid() {
    Body::default().validate().unwrap();
}

#[test]
fn body_rejects_negative_mass_and_scale() {
    let mut body = Body::default();
    body.inverse_mass = -1.0;
    assert!(matches!(body.validate(), Err(AzError::BadInput(_))));

    let mut body = Body::default();
    body.scale = 0.0;
    assert!(matches!(body.validate(), Err(AzError::BadInput(_))));
}

#[test]
fn body_rejects_non_unit_quaternion() {
    let mut body = Body::default();
    body.orientation = Quat::from_xyzw(0.0, 0.0, 0.0, 2.0);
    assert!(body.validate().is_err());
}

#[test]
fn shape_validation() {
    assert!(CollisionShape::Sphere { radius: 1.0 }.validate().is_ok());
    assert!(CollisionShape::Sphere { radius: 0.0 }.validate().is_err());
    assert!(CollisionShape::Box {
        half_extents: Vec3::new(1.0, -1.0, 1.0)
    }
    .validate()
    .is_err());
    assert!(CollisionShape::Plane {
        normal: Vec3::ZERO,
        offset: 0.0
    }
    .validate()
    .is_err());
    assert!(CollisionShape::Empty.validate().is_ok());
}

#[test]
fn update_keeps_absent_fields() {
    let mut body = sphere_body(1.0);
    body.position = Vec3::new(1.0, 2.0, 3.0);

    let update = BodyUpdate {
        velocity_lin: Some(Vec3::X),
        ..Default::default()
    };
    let structural = body.apply_update(&update);

    assert!(!structural);
    assert_eq!(body.position, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(body.velocity_lin, Vec3::X);
    assert_eq!(body.version, 0);
}

#[test]
fn update_is_idempotent() {
    let mut body = sphere_body(1.0);
    let mut shapes = ShapeMap::new();
    shapes.insert("cs".into(), ShapeFragment::new(CollisionShape::Box {
        half_extents: Vec3::ONE,
    }));
    let update = BodyUpdate {
        position: Some(Vec3::X),
        shapes: Some(shapes),
        ..Default::default()
    };

    assert!(body.apply_update(&update));
    let after_once = body.clone();

    // A second application changes nothing, including the version.
    assert!(!body.apply_update(&update));
    assert_eq!(body, after_once);
    assert_eq!(body.version, 1);
}

#[test]
fn aabb_of_sphere_body() {
    let mut body = sphere_body(2.0);
    body.position = Vec3::new(1.0, 0.0, 0.0);
    body.scale = 2.0;

    let aabb = Aabb::of_body(&body);
    assert_eq!(aabb.min, Vec3::new(-3.0, -4.0, -4.0));
    assert_eq!(aabb.max, Vec3::new(5.0, 4.0, 4.0));
}

#[test]
fn aabb_of_rotated_box() {
    let mut body = Body::default();
    body.shapes.insert(
        "cs".into(),
        ShapeFragment::new(CollisionShape::Box {
            half_extents: Vec3::new(2.0, 1.0, 1.0),
        }),
    );
    // 90 degrees around z swaps the x and y extents.
    body.orientation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);

    let aabb = Aabb::of_body(&body);
    assert!((aabb.max.x - 1.0).abs() < 1e-5);
    assert!((aabb.max.y - 2.0).abs() < 1e-5);
    assert!((aabb.max.z - 1.0).abs() < 1e-5);
}

#[test]
fn aabb_of_shapeless_body_is_a_point() {
    let mut body = Body::default();
    body.position = Vec3::new(3.0, 2.0, 1.0);
    let aabb = Aabb::of_body(&body);
    assert_eq!(aabb.min, body.position);
    assert_eq!(aabb.max, body.position);
}

#[test]
fn aabb_touching_faces_overlap() {
    let a = Aabb::centered(Vec3::ZERO, Vec3::ONE);
    let b = Aabb::centered(Vec3::new(2.0, 0.0, 0.0), Vec3::ONE);
    let c = Aabb::centered(Vec3::new(2.1, 0.0, 0.0), Vec3::ONE);
    assert!(a.overlaps(&b));
    assert!(!a.overlaps(&c));
}

#[test]
fn booster_clamps_and_normalizes() {
    let booster = Booster::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0), -1.0, 1.0);
    booster.validate().unwrap();
    assert!((booster.unit_direction() - Vec3::Z).length() < 1e-6);

    let bad = Booster::new(Vec3::ZERO, Vec3::ZERO, 0.0, 1.0);
    assert!(bad.validate().is_err());
}

#[test]
fn body_serde_roundtrip() {
    let mut body = sphere_body(1.0);
    body.position = Vec3::new(0.5, -0.25, 8.0);
    let json = serde_json::to_value(&body).unwrap();
    let back: Body = serde_json::from_value(json).unwrap();
    assert_eq!(body, back);
}
