use std::collections::BTreeMap;
use std::time::Duration;

use azrael_math::Vec3;
use azrael_physics::{EulerIntegrator, Integrator, IntegratorError};
use azrael_types::prelude::*;

use crate::{process_package, WorkerPool, WorkerPoolConfig};

fn package(wpid: u64, ids: &[u64]) -> WorkPackage {
    WorkPackage {
        wpid,
        token: wpid * 100,
        dt: 1.0,
        max_substeps: 60,
        bodies: ids
            .iter()
            .map(|id| WpBody {
                object_id: ObjectId(*id),
                body: Body::default(),
                force: Vec3::X,
                torque: Vec3::ZERO,
            })
            .collect(),
    }
}

#[test]
fn package_moves_bodies_and_echoes_token() {
    let mut integrator = EulerIntegrator::new();
    let result = process_package(&mut integrator, &package(7, &[1, 2]));

    assert_eq!(result.wpid, 7);
    assert_eq!(result.token, 700);
    assert!(!result.failed);
    assert_eq!(result.bodies.len(), 2);
    for (_, body) in &result.bodies {
        assert!((body.position.x - 0.5).abs() < 1e-2);
        assert!((body.velocity_lin.x - 1.0).abs() < 1e-2);
    }
}

#[test]
fn workers_are_stateless_between_packages() {
    let mut integrator = EulerIntegrator::new();
    let wp = package(1, &[5]);
    let first = process_package(&mut integrator, &wp);
    // The same body can be staged again: nothing lingered in the integrator.
    let second = process_package(&mut integrator, &wp);
    assert_eq!(first.bodies, second.bodies);
    assert!(integrator.get_body(ObjectId(5)).is_err());
}

/// An integrator that always refuses bodies, for the failure path.
struct BrokenIntegrator;

impl Integrator for BrokenIntegrator {
    fn add_body(&mut self, id: ObjectId, _: &Body) -> Result<(), IntegratorError> {
        Err(IntegratorError::BadShape(id))
    }
    fn apply_force(&mut self, id: ObjectId, _: Vec3, _: Vec3) -> Result<(), IntegratorError> {
        Err(IntegratorError::UnknownBody(id))
    }
    fn step(&mut self, _: f32, _: u32) {}
    fn get_body(&self, id: ObjectId) -> Result<Body, IntegratorError> {
        Err(IntegratorError::UnknownBody(id))
    }
    fn remove_body(&mut self, id: ObjectId) -> Result<(), IntegratorError> {
        Err(IntegratorError::UnknownBody(id))
    }
    fn contacts(&self) -> Vec<Contact> {
        Vec::new()
    }
}

#[test]
fn integrator_failure_returns_bodies_unchanged() {
    let mut integrator = BrokenIntegrator;
    let wp = package(3, &[1]);
    let result = process_package(&mut integrator, &wp);

    assert!(result.failed);
    assert_eq!(result.bodies.len(), 1);
    assert_eq!(result.bodies[0].1, wp.bodies[0].body);
    assert!(result.contacts.is_empty());
}

#[test]
fn pool_processes_all_packages_exactly_once() {
    let pool = WorkerPool::new(
        WorkerPoolConfig {
            workers: 4,
            recycle_after: None,
        },
        Box::new(|| Box::new(EulerIntegrator::new())),
    );

    for wpid in 0..20 {
        pool.submit(package(wpid, &[wpid + 1]));
    }

    let mut seen = BTreeMap::new();
    for _ in 0..20 {
        let result = pool
            .results()
            .recv_timeout(Duration::from_secs(5))
            .expect("worker result");
        *seen.entry(result.wpid).or_insert(0) += 1;
    }
    assert_eq!(seen.len(), 20);
    assert!(seen.values().all(|&count| count == 1));

    pool.shutdown();
}

#[test]
fn recycling_worker_still_completes_packages() {
    let pool = WorkerPool::new(
        WorkerPoolConfig {
            workers: 1,
            recycle_after: Some(1),
        },
        Box::new(|| Box::new(EulerIntegrator::new())),
    );

    for wpid in 0..5 {
        pool.submit(package(wpid, &[1]));
    }
    for _ in 0..5 {
        let result = pool
            .results()
            .recv_timeout(Duration::from_secs(5))
            .expect("worker result");
        assert!(!result.failed);
        assert!((result.bodies[0].1.position.x - 0.5).abs() < 1e-2);
    }

    pool.shutdown();
}
