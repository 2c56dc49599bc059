use azrael_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{AzError, AzResult};

/// A body-local force generator. `direction` is a unit vector in the parent's
/// local frame; `current_force` is the clamped output set through
/// `control_parts` and persists until changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booster {
    pub position: Vec3,
    pub direction: Vec3,
    pub min_force: f32,
    pub max_force: f32,
    pub current_force: f32,
}

impl Booster {
    pub fn new(position: Vec3, direction: Vec3, min_force: f32, max_force: f32) -> Self {
        Self {
            position,
            direction,
            min_force,
            max_force,
            current_force: 0.0,
        }
    }

    pub fn validate(&self) -> AzResult<()> {
        if self.direction.length_squared() <= f32::EPSILON || !self.direction.is_finite() {
            return Err(AzError::bad_input("booster direction must be a non-zero vector"));
        }
        if self.min_force > self.max_force {
            return Err(AzError::bad_input("booster min force exceeds max force"));
        }
        Ok(())
    }

    /// Direction normalized to unit length.
    pub fn unit_direction(&self) -> Vec3 {
        self.direction.normalize()
    }
}

/// A body-local spawn point. Products are instances of `template_id`, ejected
/// along `direction` with a speed drawn uniformly from `exit_speed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factory {
    pub position: Vec3,
    pub direction: Vec3,
    pub template_id: String,
    pub exit_speed: [f32; 2],
}

impl Factory {
    pub fn validate(&self) -> AzResult<()> {
        if self.direction.length_squared() <= f32::EPSILON || !self.direction.is_finite() {
            return Err(AzError::bad_input("factory direction must be a non-zero vector"));
        }
        if self.exit_speed[0] > self.exit_speed[1] {
            return Err(AzError::bad_input("factory exit speed range is inverted"));
        }
        Ok(())
    }

    pub fn unit_direction(&self) -> Vec3 {
        self.direction.normalize()
    }
}

/// Client command for one booster: set its output force. The value is clamped
/// into the booster's `[min_force, max_force]` range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmdBooster {
    pub part_id: String,
    pub force: f32,
}

/// Client command for one factory: eject one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmdFactory {
    pub part_id: String,
}
