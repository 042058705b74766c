//! Voxel collision and ray picking for the Fractalis engine.
//!
//! Both work on grid-local voxel coordinates derived from the anchored
//! [`GridTransforms`](fractalis_world::GridTransforms), so results are exact
//! at any depth.

pub mod collision;
pub mod raycast;

pub use collision::CollisionQuery;
pub use raycast::{raycast_grid, RaycastHit};
