use azrael_math::Vec3;
use azrael_types::prelude::{Body, Contact};
use azrael_types::ObjectId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegratorError {
    #[error("body {0} is already registered")]
    DuplicateBody(ObjectId),
    #[error("unknown body {0}")]
    UnknownBody(ObjectId),
    #[error("body {0} has an unusable collision shape")]
    BadShape(ObjectId),
}

/// The fixed contract between a worker and its physics backend. One instance
/// per worker; instances are assumed single-threaded.
pub trait Integrator: Send {
    /// Registers a body. Fails if the id is already present.
    fn add_body(&mut self, id: ObjectId, body: &Body) -> Result<(), IntegratorError>;

    /// Sets the world-space force and torque applied during `step`.
    fn apply_force(&mut self, id: ObjectId, force: Vec3, torque: Vec3)
        -> Result<(), IntegratorError>;

    /// Advances all registered bodies by `dt` with at most `max_substeps`
    /// internal substeps. `dt <= 0` is a no-op.
    fn step(&mut self, dt: f32, max_substeps: u32);

    /// Reads a body's post-step state.
    fn get_body(&self, id: ObjectId) -> Result<Body, IntegratorError>;

    /// Deregisters a body and its collision geometry.
    fn remove_body(&mut self, id: ObjectId) -> Result<(), IntegratorError>;

    /// One representative contact per currently-colliding pair.
    fn contacts(&self) -> Vec<Contact>;
}
