pub mod aabb;
pub mod body;
pub mod command;
pub mod error;
pub mod parts;
pub mod shape;
pub mod template;
pub mod work;

#[cfg(test)]
mod tests;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod prelude {
    pub use crate::aabb::*;
    pub use crate::body::*;
    pub use crate::command::*;
    pub use crate::error::*;
    pub use crate::parts::*;
    pub use crate::shape::*;
    pub use crate::template::*;
    pub use crate::work::*;
    pub use crate::ObjectId;
}

/// Identity of a simulated object. Allocated from an atomic counter and never
/// reused for the lifetime of the server.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ObjectId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ObjectId(s.parse()?))
    }
}

impl From<u64> for ObjectId {
    fn from(value: u64) -> Self {
        ObjectId(value)
    }
}
