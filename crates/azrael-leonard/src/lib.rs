//! Leonard, the single-writer tick controller.
//!
//! Leonard owns the authoritative in-memory mirror of the simulation between
//! ticks. Once per tick it drains the command queues, resolves forces,
//! refreshes bounding boxes, partitions the world into collision islands,
//! dispatches each island to the worker pool, collects the results, commits
//! the mirror to the datastore and publishes the tick event. Clients never
//! mutate anything directly; everything funnels through the queues.

pub mod config;
pub mod controller;


pub use config::LeonardConfig;
pub use controller::{ForceState, Leonard};

pub mod prelude {
    pub use crate::config::LeonardConfig;
    pub use crate::controller::{ForceState, Leonard};
}
