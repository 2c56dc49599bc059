use std::collections::HashMap;

use azrael_math::Vec3;
use azrael_types::prelude::{Body, CollisionShape, Contact, ShapeFragment};
use azrael_types::ObjectId;
use rapier3d::dynamics::{
    CCDSolver, ImpulseJointSet, IntegrationParameters, IslandManager, LockedAxes, MassProperties,
    MultibodyJointSet, RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
};
use rapier3d::geometry::{
    Collider, ColliderBuilder, ColliderHandle, ColliderSet, DefaultBroadPhase, NarrowPhase,
};
use rapier3d::pipeline::{PhysicsPipeline, QueryPipeline};

use crate::convert::{from_na_point, from_na_quat, from_na_vec, to_na_iso, to_na_point, to_na_quat, to_na_vec};
use crate::integrator::{Integrator, IntegratorError};
use crate::substeps;

/// The production integrator: one rapier world per worker. Bodies are added
/// at the start of a work package and removed at the end, so no state leaks
/// between packages.
pub struct RapierIntegrator {
    pipeline: PhysicsPipeline,
    query_pipeline: QueryPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    ccd_solver: CCDSolver,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    gravity: nalgebra::Vector3<f32>,
    handles: HashMap<ObjectId, RigidBodyHandle>,
    owners: HashMap<ColliderHandle, ObjectId>,
    /// Source bodies, kept so read-back preserves shapes, material and
    /// metadata the integrator does not track.
    originals: HashMap<ObjectId, Body>,
}

impl Default for RapierIntegrator {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierIntegrator {
    pub fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            query_pipeline: QueryPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            // The world is open space; all motion comes from applied forces.
            gravity: nalgebra::Vector3::zeros(),
            handles: HashMap::new(),
            owners: HashMap::new(),
            originals: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    fn locked_axes(body: &Body) -> LockedAxes {
        let mut axes = LockedAxes::empty();
        if body.linear_factor.x == 0.0 {
            axes |= LockedAxes::TRANSLATION_LOCKED_X;
        }
        if body.linear_factor.y == 0.0 {
            axes |= LockedAxes::TRANSLATION_LOCKED_Y;
        }
        if body.linear_factor.z == 0.0 {
            axes |= LockedAxes::TRANSLATION_LOCKED_Z;
        }
        if body.rotation_factor.x == 0.0 {
            axes |= LockedAxes::ROTATION_LOCKED_X;
        }
        if body.rotation_factor.y == 0.0 {
            axes |= LockedAxes::ROTATION_LOCKED_Y;
        }
        if body.rotation_factor.z == 0.0 {
            axes |= LockedAxes::ROTATION_LOCKED_Z;
        }
        axes
    }

    /// A collider for one fragment, positioned relative to the body. Mass
    /// comes exclusively from the body record, so all colliders carry zero
    /// density.
    fn build_collider(frag: &ShapeFragment, body: &Body) -> Option<Collider> {
        let mut local_pos = frag.position * body.scale;
        let builder = match frag.shape {
            CollisionShape::Empty => return None,
            CollisionShape::Sphere { radius } => ColliderBuilder::ball(radius * body.scale),
            CollisionShape::Box { half_extents } => {
                let h = half_extents * body.scale;
                ColliderBuilder::cuboid(h.x, h.y, h.z)
            }
            CollisionShape::Plane { normal, offset } => {
                let n = normal.normalize();
                local_pos += n * offset;
                ColliderBuilder::halfspace(nalgebra::Unit::new_normalize(to_na_vec(n)))
            }
        };
        Some(
            builder
                .position(to_na_iso(local_pos, frag.orientation))
                .density(0.0)
                .restitution(body.restitution)
                .friction(body.friction)
                .build(),
        )
    }
}

impl Integrator for RapierIntegrator {
    fn add_body(&mut self, id: ObjectId, body: &Body) -> Result<(), IntegratorError> {
        if self.handles.contains_key(&id) {
            return Err(IntegratorError::DuplicateBody(id));
        }

        let dynamic = body.inverse_mass > 0.0;
        let mut builder = if dynamic {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        }
        .position(to_na_iso(body.position, body.orientation))
        .linvel(to_na_vec(body.velocity_lin))
        .angvel(to_na_vec(body.velocity_rot))
        .can_sleep(false);

        if dynamic {
            let mass = 1.0 / body.inverse_mass;
            let props = MassProperties::with_principal_inertia_frame(
                to_na_point(body.com_offset * body.scale),
                mass,
                to_na_vec(body.principal_inertia),
                to_na_quat(body.paxis),
            );
            builder = builder
                .additional_mass_properties(props)
                .locked_axes(Self::locked_axes(body));
        }

        let handle = self.bodies.insert(builder.build());
        for frag in body.shapes.values() {
            if let Some(collider) = Self::build_collider(frag, body) {
                let ch = self
                    .colliders
                    .insert_with_parent(collider, handle, &mut self.bodies);
                self.owners.insert(ch, id);
            }
        }

        self.handles.insert(id, handle);
        self.originals.insert(id, body.clone());
        Ok(())
    }

    fn apply_force(
        &mut self,
        id: ObjectId,
        force: Vec3,
        torque: Vec3,
    ) -> Result<(), IntegratorError> {
        let handle = *self
            .handles
            .get(&id)
            .ok_or(IntegratorError::UnknownBody(id))?;
        let rb = self
            .bodies
            .get_mut(handle)
            .ok_or(IntegratorError::UnknownBody(id))?;
        rb.reset_forces(true);
        rb.reset_torques(true);
        rb.add_force(to_na_vec(force), true);
        rb.add_torque(to_na_vec(torque), true);
        Ok(())
    }

    fn step(&mut self, dt: f32, max_substeps: u32) {
        if !(dt > 0.0) || max_substeps == 0 {
            return;
        }
        let n = substeps(dt, max_substeps);
        let integration_parameters = IntegrationParameters {
            dt: dt / n as f32,
            ..Default::default()
        };

        let physics_hooks = ();
        let event_handler = ();
        for _ in 0..n {
            self.pipeline.step(
                &self.gravity,
                &integration_parameters,
                &mut self.island_manager,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                Some(&mut self.query_pipeline),
                &physics_hooks,
                &event_handler,
            );
        }
    }

    fn get_body(&self, id: ObjectId) -> Result<Body, IntegratorError> {
        let handle = *self
            .handles
            .get(&id)
            .ok_or(IntegratorError::UnknownBody(id))?;
        let rb = self
            .bodies
            .get(handle)
            .ok_or(IntegratorError::UnknownBody(id))?;
        let mut out = self
            .originals
            .get(&id)
            .cloned()
            .ok_or(IntegratorError::UnknownBody(id))?;
        out.position = from_na_vec(rb.translation());
        out.orientation = from_na_quat(rb.rotation());
        out.velocity_lin = from_na_vec(rb.linvel());
        out.velocity_rot = from_na_vec(rb.angvel());
        Ok(out)
    }

    fn remove_body(&mut self, id: ObjectId) -> Result<(), IntegratorError> {
        let handle = self
            .handles
            .remove(&id)
            .ok_or(IntegratorError::UnknownBody(id))?;
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        self.owners.retain(|_, owner| *owner != id);
        self.originals.remove(&id);
        Ok(())
    }

    fn contacts(&self) -> Vec<Contact> {
        let mut out = Vec::new();
        for pair in self.narrow_phase.contact_pairs() {
            if !pair.has_any_active_contact {
                continue;
            }
            let (Some(&a), Some(&b)) = (
                self.owners.get(&pair.collider1),
                self.owners.get(&pair.collider2),
            ) else {
                continue;
            };
            if a == b {
                continue;
            }

            let Some(collider) = self.colliders.get(pair.collider1) else {
                continue;
            };
            let point = pair
                .manifolds
                .iter()
                .flat_map(|m| m.points.iter())
                .next()
                .map(|contact| from_na_point(&(collider.position() * contact.local_p1)));
            if let Some(position) = point {
                out.push(Contact {
                    id_a: a.min(b),
                    id_b: a.max(b),
                    position,
                });
            }
        }
        out
    }
}
