use azrael_math::Vec3;
use azrael_types::prelude::*;

use crate::{EulerIntegrator, Integrator, IntegratorError, RapierIntegrator};

fn sphere_body() -> Body {
    let mut body = Body::default();
    body.shapes.insert(
        "cs".into(),
        ShapeFragment::new(CollisionShape::Sphere { radius: 1.0 }),
    );
    body
}

fn integrators() -> Vec<Box<dyn Integrator>> {
    vec![
        Box::new(RapierIntegrator::new()),
        Box::new(EulerIntegrator::new()),
    ]
}

#[test]
fn duplicate_and_unknown_ids_are_errors() {
    for mut integ in integrators() {
        let id = ObjectId(1);
        integ.add_body(id, &sphere_body()).unwrap();
        assert_eq!(
            integ.add_body(id, &sphere_body()),
            Err(IntegratorError::DuplicateBody(id))
        );
        assert_eq!(
            integ.get_body(ObjectId(2)).unwrap_err(),
            IntegratorError::UnknownBody(ObjectId(2))
        );
        assert_eq!(
            integ.remove_body(ObjectId(2)),
            Err(IntegratorError::UnknownBody(ObjectId(2)))
        );
    }
}

#[test]
fn free_flight_under_constant_force() {
    // F = 1 N on a 1 kg body for 1 s: x ≈ 0.5 m, v ≈ 1 m/s.
    for mut integ in integrators() {
        let id = ObjectId(1);
        integ.add_body(id, &sphere_body()).unwrap();
        integ.apply_force(id, Vec3::X, Vec3::ZERO).unwrap();
        integ.step(1.0, 60);

        let body = integ.get_body(id).unwrap();
        assert!((body.position.x - 0.5).abs() < 1e-2, "x = {}", body.position.x);
        assert!((body.velocity_lin.x - 1.0).abs() < 1e-2);
        assert!(body.position.y.abs() < 1e-4);
        assert!(body.position.z.abs() < 1e-4);
    }
}

#[test]
fn zero_inverse_mass_never_moves() {
    for mut integ in integrators() {
        let id = ObjectId(1);
        let mut body = sphere_body();
        body.inverse_mass = 0.0;
        integ.add_body(id, &body).unwrap();
        integ.apply_force(id, Vec3::splat(100.0), Vec3::ZERO).unwrap();
        integ.step(1.0, 60);

        let out = integ.get_body(id).unwrap();
        assert_eq!(out.position, Vec3::ZERO);
        assert_eq!(out.velocity_lin, Vec3::ZERO);
    }
}

#[test]
fn linear_factor_masks_translation() {
    for mut integ in integrators() {
        let id = ObjectId(1);
        let mut body = sphere_body();
        body.linear_factor = Vec3::new(0.0, 1.0, 1.0);
        integ.add_body(id, &body).unwrap();
        integ.apply_force(id, Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO).unwrap();
        integ.step(1.0, 60);

        let out = integ.get_body(id).unwrap();
        assert!(out.position.x.abs() < 1e-5);
        assert!(out.velocity_lin.x.abs() < 1e-5);
    }
}

#[test]
fn zero_dt_is_a_noop() {
    for mut integ in integrators() {
        let id = ObjectId(1);
        let mut body = sphere_body();
        body.velocity_lin = Vec3::X;
        integ.add_body(id, &body).unwrap();
        integ.step(0.0, 60);
        let out = integ.get_body(id).unwrap();
        assert_eq!(out.position, Vec3::ZERO);
    }
}

#[test]
fn read_back_preserves_shapes_and_metadata() {
    for mut integ in integrators() {
        let id = ObjectId(9);
        let mut body = sphere_body();
        body.template_id = "t1".into();
        body.version = 4;
        integ.add_body(id, &body).unwrap();
        integ.step(0.5, 60);

        let out = integ.get_body(id).unwrap();
        assert_eq!(out.shapes, body.shapes);
        assert_eq!(out.template_id, "t1");
        assert_eq!(out.version, 4);
    }
}

#[test]
fn removed_bodies_are_gone() {
    for mut integ in integrators() {
        let id = ObjectId(1);
        integ.add_body(id, &sphere_body()).unwrap();
        integ.remove_body(id).unwrap();
        assert!(integ.get_body(id).is_err());
        // The id can be registered again after removal.
        integ.add_body(id, &sphere_body()).unwrap();
    }
}

#[test]
fn overlapping_spheres_report_a_contact() {
    let mut integ = RapierIntegrator::new();
    let a = ObjectId(1);
    let b = ObjectId(2);
    let mut body_b = sphere_body();
    body_b.position = Vec3::new(1.5, 0.0, 0.0);
    integ.add_body(a, &sphere_body()).unwrap();
    integ.add_body(b, &body_b).unwrap();
    integ.step(1.0 / 60.0, 1);

    let contacts = integ.contacts();
    assert!(!contacts.is_empty());
    assert_eq!(contacts[0].id_a, a);
    assert_eq!(contacts[0].id_b, b);
}

#[test]
fn separated_bodies_have_no_contacts() {
    let mut integ = RapierIntegrator::new();
    let mut far = sphere_body();
    far.position = Vec3::new(100.0, 0.0, 0.0);
    integ.add_body(ObjectId(1), &sphere_body()).unwrap();
    integ.add_body(ObjectId(2), &far).unwrap();
    integ.step(1.0 / 60.0, 1);
    assert!(integ.contacts().is_empty());
}

#[test]
fn euler_rotated_body_keeps_orientation_without_torque() {
    let mut integ = EulerIntegrator::new();
    let id = ObjectId(1);
    let mut body = sphere_body();
    body.orientation = azrael_math::Quat::from_rotation_x(std::f32::consts::PI);
    integ.add_body(id, &body).unwrap();
    integ.apply_force(id, Vec3::X, Vec3::ZERO).unwrap();
    integ.step(1.0, 60);

    let out = integ.get_body(id).unwrap();
    assert!((out.orientation.dot(body.orientation).abs() - 1.0).abs() < 1e-5);
}

#[test]
fn substep_count_respects_caps() {
    assert_eq!(crate::substeps(1.0, 60), 60);
    assert_eq!(crate::substeps(1.0, 10), 10);
    assert_eq!(crate::substeps(0.01, 60), 1);
    assert_eq!(crate::substeps(0.5, 60), 30);
}
