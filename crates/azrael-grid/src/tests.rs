use azrael_math::Vec3;

use crate::{ForceGrid, GridError};

#[test]
fn rejects_bad_granularity() {
    assert_eq!(ForceGrid::new(0.0).err(), Some(GridError::BadGranularity));
    assert_eq!(ForceGrid::new(-1.0).err(), Some(GridError::BadGranularity));
}

#[test]
fn defaults_to_zero() {
    let grid = ForceGrid::new(1.0).unwrap();
    assert_eq!(grid.sample_at(Vec3::new(3.5, -2.0, 100.0)), Vec3::ZERO);
}

#[test]
fn set_values_round_trip() {
    let grid = ForceGrid::new(1.0).unwrap();
    grid.set_values(&[(Vec3::new(0.5, 0.5, 0.5), Vec3::X)]);
    // Any point inside the same cell samples the same value.
    assert_eq!(grid.sample_at(Vec3::new(0.9, 0.1, 0.4)), Vec3::X);
    assert_eq!(grid.sample_at(Vec3::new(1.1, 0.0, 0.0)), Vec3::ZERO);
}

#[test]
fn set_region_covers_block_only() {
    let grid = ForceGrid::new(2.0).unwrap();
    let values = vec![Vec3::Y; 2 * 2 * 2];
    grid.set_region(Vec3::ZERO, [2, 2, 2], &values).unwrap();

    assert_eq!(grid.sample_at(Vec3::new(1.0, 1.0, 1.0)), Vec3::Y);
    assert_eq!(grid.sample_at(Vec3::new(3.9, 3.9, 3.9)), Vec3::Y);
    assert_eq!(grid.sample_at(Vec3::new(4.1, 0.0, 0.0)), Vec3::ZERO);
    assert_eq!(grid.sample_at(Vec3::new(-0.1, 0.0, 0.0)), Vec3::ZERO);
}

#[test]
fn set_region_checks_dimensions() {
    let grid = ForceGrid::new(1.0).unwrap();
    let err = grid.set_region(Vec3::ZERO, [2, 2, 2], &[Vec3::ZERO; 7]);
    assert_eq!(err, Err(GridError::DimensionMismatch { want: 8, got: 7 }));
}

#[test]
fn reset_clears_field() {
    let grid = ForceGrid::new(1.0).unwrap();
    grid.set_values(&[(Vec3::ZERO, Vec3::Z)]);
    grid.reset();
    assert_eq!(grid.sample_at(Vec3::ZERO), Vec3::ZERO);
}
