//! Core types and math for the Fractalis engine.
//!
//! This crate provides the foundational types used throughout the engine:
//! - Block types and their static property table
//! - Coordinate systems (grid-local voxels, fractal coordinates, exact lattice positions)
//! - Ray and bounding-box math
//! - Common error types

pub mod coords;
pub mod error;
pub mod math;
pub mod types;

pub use coords::{FractalCoord, LatticeCoord, LocalPos, VoxelIndex};
pub use error::{Error, Result};
pub use types::{BlockProperties, BlockType};

/// Engine-wide constants
pub mod constants {
    /// Edge length of a grid in voxels
    pub const GRID_SIZE: usize = 16;
    /// Total voxels in a grid (16^3)
    pub const GRID_VOLUME: usize = GRID_SIZE * GRID_SIZE * GRID_SIZE;
    /// Scale factor between a grid and its children
    pub const GRID_SCALE: f64 = GRID_SIZE as f64;
    /// Edge length of one voxel in its grid's local space
    pub const BLOCK_SIZE: f64 = 1.0;
    /// Half the edge length of a grid in its local space
    pub const HALF_GRID_EXTENT: f64 = GRID_SCALE * BLOCK_SIZE / 2.0;
}
