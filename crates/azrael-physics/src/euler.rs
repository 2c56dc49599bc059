use std::collections::HashMap;

use azrael_math::{quat_renormalize, Quat, Vec3};
use azrael_types::prelude::{Body, Contact};
use azrael_types::ObjectId;

use crate::integrator::{Integrator, IntegratorError};
use crate::substeps;

/// Collision-free semi-implicit Euler stepper.
///
/// Deterministic and dependency-free, which makes it the integrator of
/// choice for tick-loop tests: velocity integrates the applied force, pose
/// integrates velocity, and bodies never interact. Bodies with zero inverse
/// mass do not move at all.
#[derive(Default)]
pub struct EulerIntegrator {
    bodies: HashMap<ObjectId, (Body, Vec3, Vec3)>,
}

impl EulerIntegrator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Integrator for EulerIntegrator {
    fn add_body(&mut self, id: ObjectId, body: &Body) -> Result<(), IntegratorError> {
        if self.bodies.contains_key(&id) {
            return Err(IntegratorError::DuplicateBody(id));
        }
        self.bodies.insert(id, (body.clone(), Vec3::ZERO, Vec3::ZERO));
        Ok(())
    }

    fn apply_force(
        &mut self,
        id: ObjectId,
        force: Vec3,
        torque: Vec3,
    ) -> Result<(), IntegratorError> {
        let entry = self
            .bodies
            .get_mut(&id)
            .ok_or(IntegratorError::UnknownBody(id))?;
        entry.1 = force;
        entry.2 = torque;
        Ok(())
    }

    fn step(&mut self, dt: f32, max_substeps: u32) {
        if !(dt > 0.0) || max_substeps == 0 {
            return;
        }
        let n = substeps(dt, max_substeps);
        let h = dt / n as f32;

        for (body, force, torque) in self.bodies.values_mut() {
            if body.inverse_mass <= 0.0 {
                continue;
            }
            let inv_inertia = Vec3::new(
                if body.principal_inertia.x > 0.0 { 1.0 / body.principal_inertia.x } else { 0.0 },
                if body.principal_inertia.y > 0.0 { 1.0 / body.principal_inertia.y } else { 0.0 },
                if body.principal_inertia.z > 0.0 { 1.0 / body.principal_inertia.z } else { 0.0 },
            );
            for _ in 0..n {
                body.velocity_lin +=
                    (*force * body.inverse_mass * h) * body.linear_factor;
                body.velocity_rot += (*torque * inv_inertia * h) * body.rotation_factor;
                body.position += body.velocity_lin * h;

                let w = body.velocity_rot;
                if w.length_squared() > 0.0 {
                    let dq = Quat::from_xyzw(w.x, w.y, w.z, 0.0) * body.orientation;
                    let q = body.orientation;
                    body.orientation = quat_renormalize(Quat::from_xyzw(
                        q.x + 0.5 * h * dq.x,
                        q.y + 0.5 * h * dq.y,
                        q.z + 0.5 * h * dq.z,
                        q.w + 0.5 * h * dq.w,
                    ));
                }
            }
        }
    }

    fn get_body(&self, id: ObjectId) -> Result<Body, IntegratorError> {
        self.bodies
            .get(&id)
            .map(|(body, _, _)| body.clone())
            .ok_or(IntegratorError::UnknownBody(id))
    }

    fn remove_body(&mut self, id: ObjectId) -> Result<(), IntegratorError> {
        self.bodies
            .remove(&id)
            .map(|_| ())
            .ok_or(IntegratorError::UnknownBody(id))
    }

    fn contacts(&self) -> Vec<Contact> {
        Vec::new()
    }
}
