//! The external force grid: a sparse vector field sampled at body centres
//! each tick. Values default to zero outside set regions, and reads are
//! lock-free from the tick loop's point of view.

#[cfg(test)]
mod tests;

use azrael_math::Vec3;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("granularity must be positive")]
    BadGranularity,
    #[error("region block has {got} values, dimensions require {want}")]
    DimensionMismatch { want: usize, got: usize },
}

/// A uniform grid of 3-vectors with cubic cells of edge `granularity`.
pub struct ForceGrid {
    granularity: f32,
    cells: DashMap<(i64, i64, i64), Vec3>,
}

impl ForceGrid {
    pub fn new(granularity: f32) -> Result<Self, GridError> {
        if !(granularity.is_finite() && granularity > 0.0) {
            return Err(GridError::BadGranularity);
        }
        Ok(Self {
            granularity,
            cells: DashMap::new(),
        })
    }

    pub fn granularity(&self) -> f32 {
        self.granularity
    }

    fn cell(&self, p: Vec3) -> (i64, i64, i64) {
        let c = (p / self.granularity).floor();
        (c.x as i64, c.y as i64, c.z as i64)
    }

    /// The field value at `point`; zero anywhere no value was set.
    pub fn sample_at(&self, point: Vec3) -> Vec3 {
        self.cells
            .get(&self.cell(point))
            .map(|v| *v)
            .unwrap_or(Vec3::ZERO)
    }

    /// Sets individual cell values, one per sample position.
    pub fn set_values(&self, values: &[(Vec3, Vec3)]) {
        for (pos, value) in values {
            self.cells.insert(self.cell(*pos), *value);
        }
    }

    /// Uploads a dense block of `dims` cells whose lowest corner contains
    /// `offset`. `values` is laid out x-fastest.
    pub fn set_region(
        &self,
        offset: Vec3,
        dims: [usize; 3],
        values: &[Vec3],
    ) -> Result<(), GridError> {
        let want = dims[0] * dims[1] * dims[2];
        if values.len() != want {
            return Err(GridError::DimensionMismatch {
                want,
                got: values.len(),
            });
        }

        let (bx, by, bz) = self.cell(offset);
        let mut idx = 0;
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    self.cells
                        .insert((bx + x as i64, by + y as i64, bz + z as i64), values[idx]);
                    idx += 1;
                }
            }
        }
        Ok(())
    }

    /// Clears the whole field back to zero.
    pub fn reset(&self) {
        self.cells.clear();
    }
}
