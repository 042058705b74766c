//! Fractal grid generation, lifecycle, navigation and streaming.
//!
//! Grids live in an arena ([`GridTree`]) keyed by stable [`GridId`]s. Every
//! splittable voxel can be expanded into a child grid of the same voxel count,
//! giving unbounded zoom depth. The [`ScaleNavigator`] rescales the world
//! around the player when moving between depths, and the
//! [`StreamingScheduler`] materializes and collapses grids by distance.

pub mod events;
pub mod generation;
pub mod grid;
pub mod navigation;
pub mod streaming;
pub mod transform;
pub mod tree;

pub use events::WorldEvent;
pub use generation::{CosmeticMode, GeneratorConfig, GridContext, TerrainGenerator, ValueNoise};
pub use grid::{GridId, GridNode, ParentLink};
pub use navigation::{DepthChange, ScaleNavigator, Snapshot, TransformFrame};
pub use streaming::{StreamingConfig, StreamingReport, StreamingScheduler, StreamingView};
pub use transform::{GridTransform, GridTransforms};
pub use tree::GridTree;

/// World seed for procedural generation.
pub type WorldSeed = u64;

/// Per-grid generation entropy, derived from the parent's seed and voxel index.
pub type GridSeed = u64;
