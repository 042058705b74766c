//! Scale-space transforms between grid-local and world coordinates.
//!
//! Transforms are always derived outward from the active grid's exact
//! transform (the anchor) rather than top-down from the root. Grids near the
//! player therefore only involve small coordinates, at any depth.

use std::collections::VecDeque;

use fractalis_core::constants::GRID_SCALE;
use fractalis_core::coords::voxel_center;
use fractalis_core::VoxelIndex;
use glam::DVec3;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::grid::GridId;
use crate::tree::GridTree;

/// Uniform scale plus translation mapping grid-local space to world space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridTransform {
    /// World position of the grid's local origin (its center)
    pub position: DVec3,
    /// World size of one local unit
    pub scale: f64,
}

impl GridTransform {
    pub const IDENTITY: Self = Self::new(DVec3::ZERO, 1.0);

    #[inline]
    pub const fn new(position: DVec3, scale: f64) -> Self {
        Self { position, scale }
    }

    #[inline]
    pub fn to_world(&self, local: DVec3) -> DVec3 {
        self.position + local * self.scale
    }

    #[inline]
    pub fn to_local(&self, world: DVec3) -> DVec3 {
        (world - self.position) / self.scale
    }

    /// Transform of the child grid occupying the voxel at `index`
    #[inline]
    pub fn child_at(&self, index: VoxelIndex) -> Self {
        Self::new(self.to_world(voxel_center(index)), self.scale / GRID_SCALE)
    }

    /// Transform of the parent grid, given the voxel this grid occupies in it
    #[inline]
    pub fn parent_from(&self, index: VoxelIndex) -> Self {
        let scale = self.scale * GRID_SCALE;
        Self::new(self.position - voxel_center(index) * scale, scale)
    }
}

impl Default for GridTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// World transforms of every grid in a tree, relative to one anchor.
#[derive(Debug, Clone)]
pub struct GridTransforms {
    transforms: HashMap<GridId, GridTransform>,
    anchor: GridId,
    anchor_transform: GridTransform,
    revision: u64,
}

impl GridTransforms {
    /// Walk the tree outward from the anchor grid.
    pub fn compute(tree: &GridTree, anchor: GridId, anchor_transform: GridTransform) -> Self {
        let mut transforms = HashMap::with_capacity(tree.len());
        let mut queue = VecDeque::new();

        if tree.contains(anchor) {
            transforms.insert(anchor, anchor_transform);
            queue.push_back(anchor);
        }

        while let Some(id) = queue.pop_front() {
            let (Some(node), Some(&transform)) = (tree.get(id), transforms.get(&id)) else {
                continue;
            };

            if let Some(link) = node.parent() {
                if !transforms.contains_key(&link.grid) {
                    transforms.insert(link.grid, transform.parent_from(link.index));
                    queue.push_back(link.grid);
                }
            }

            for (index, child) in node.children() {
                if !transforms.contains_key(&child) {
                    transforms.insert(child, transform.child_at(index));
                    queue.push_back(child);
                }
            }
        }

        Self {
            transforms,
            anchor,
            anchor_transform,
            revision: tree.revision(),
        }
    }

    #[inline]
    pub fn get(&self, grid: GridId) -> Option<GridTransform> {
        self.transforms.get(&grid).copied()
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Returns true if the tree structure and anchor are unchanged since compute
    pub fn is_current(&self, tree: &GridTree, anchor: GridId, anchor_transform: GridTransform) -> bool {
        self.revision == tree.revision()
            && self.anchor == anchor
            && self.anchor_transform == anchor_transform
    }

    /// World-space center of a voxel
    pub fn voxel_world_center(&self, grid: GridId, index: VoxelIndex) -> Option<DVec3> {
        self.get(grid).map(|t| t.to_world(voxel_center(index)))
    }

    pub(crate) fn insert(&mut self, grid: GridId, transform: GridTransform) {
        self.transforms.insert(grid, transform);
    }
}
