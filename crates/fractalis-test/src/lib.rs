//! Test harness for the Fractalis engine.
//!
//! Provides structural checks on generated grids (door-to-door reachability,
//! density sampling across depths) shared by the property tests.

pub mod harness;

pub use harness::{
    check_navigable, context_at_depth, door_cells, first_splittable, reachable_from, sample_density,
    solid_fraction,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestError {
    #[error("door {to:?} is not reachable from door {from:?}")]
    Unreachable {
        from: fractalis_core::LocalPos,
        to: fractalis_core::LocalPos,
    },
    #[error("door {0:?} is blocked")]
    BlockedDoor(fractalis_core::LocalPos),
    #[error("density {actual:.3} at depth {depth} deviates from the mean {expected:.3} by more than {tolerance}")]
    DensityDrift {
        depth: u32,
        actual: f64,
        expected: f64,
        tolerance: f64,
    },
}

pub type Result<T> = std::result::Result<T, TestError>;

/// Density sampling configuration.
#[derive(Debug, Clone)]
pub struct DensityTestConfig {
    /// Grids sampled per depth.
    pub grids_per_depth: usize,
    /// Deepest depth sampled.
    pub max_depth: u32,
    /// Allowed absolute deviation from the mean solid fraction.
    pub tolerance: f64,
}

impl Default for DensityTestConfig {
    fn default() -> Self {
        Self {
            grids_per_depth: 8,
            max_depth: 5,
            tolerance: 0.15,
        }
    }
}
