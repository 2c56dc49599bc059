//! The rigid-body integrator behind the worker pool.
//!
//! The simulation core treats the integrator as a black box with a fixed
//! contract (`Integrator`); `RapierIntegrator` is the production
//! implementation and `EulerIntegrator` a collision-free reference stepper
//! used by tests and diagnostics.

mod convert;
pub mod euler;
pub mod integrator;
pub mod rapier;

#[cfg(test)]
mod tests;

pub use euler::EulerIntegrator;
pub use integrator::{Integrator, IntegratorError};
pub use rapier::RapierIntegrator;

/// Internal substep frequency: `step(dt, n)` subdivides `dt` into steps of at
/// most 1/60 s, capped at `n` substeps.
pub const INTERNAL_HZ: f32 = 60.0;

/// Number of internal substeps for a step of `dt` with at most `max_substeps`.
pub(crate) fn substeps(dt: f32, max_substeps: u32) -> u32 {
    ((dt * INTERNAL_HZ).ceil() as u32).clamp(1, max_substeps.max(1))
}
