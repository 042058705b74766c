//! Grid nodes of the fractal hierarchy.

use std::fmt;

use fractalis_core::constants::{GRID_SIZE, GRID_VOLUME, HALF_GRID_EXTENT};
use fractalis_core::{BlockType, FractalCoord, LatticeCoord, LocalPos, VoxelIndex};
use glam::DVec3;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::generation::{GridContext, TerrainGenerator};
use crate::GridSeed;

/// Pull-back from the first open spawn voxel so the player starts just
/// outside it, facing in.
const SPAWN_NUDGE: f64 = 0.6;

/// Stable identifier of a grid. Ids are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridId(pub u64);

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grid#{}", self.0)
    }
}

/// Back-link from a child grid to the voxel it subdivides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentLink {
    pub grid: GridId,
    pub index: VoxelIndex,
}

/// One 16^3 grid of voxels.
#[derive(Debug, Clone)]
pub struct GridNode {
    id: GridId,
    depth: u32,
    seed: GridSeed,
    offset: FractalCoord,
    lattice: LatticeCoord,
    origin: Option<BlockType>,
    parent: Option<ParentLink>,
    blocks: Vec<BlockType>,
    children: HashMap<VoxelIndex, GridId>,
    visible: bool,
}

impl GridNode {
    /// Create and populate a grid.
    pub(crate) fn generate(
        id: GridId,
        ctx: &GridContext,
        parent: Option<ParentLink>,
        generator: &TerrainGenerator,
    ) -> Self {
        Self {
            id,
            depth: ctx.depth,
            seed: ctx.seed,
            offset: ctx.offset,
            lattice: ctx.lattice,
            origin: ctx.origin,
            parent,
            blocks: generator.generate_grid(ctx),
            children: HashMap::new(),
            visible: true,
        }
    }

    pub const fn id(&self) -> GridId {
        self.id
    }

    pub const fn depth(&self) -> u32 {
        self.depth
    }

    pub const fn seed(&self) -> GridSeed {
        self.seed
    }

    pub const fn offset(&self) -> FractalCoord {
        self.offset
    }

    pub const fn lattice(&self) -> LatticeCoord {
        self.lattice
    }

    /// Type of the parent voxel before it was split
    pub const fn origin_block(&self) -> Option<BlockType> {
        self.origin
    }

    pub const fn parent(&self) -> Option<ParentLink> {
        self.parent
    }

    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Generation context this grid was built from
    pub const fn context(&self) -> GridContext {
        GridContext {
            depth: self.depth,
            seed: self.seed,
            offset: self.offset,
            lattice: self.lattice,
            origin: self.origin,
        }
    }

    /// All voxels in index order
    pub fn blocks(&self) -> &[BlockType] {
        &self.blocks
    }

    /// Voxels as raw type ids, for upload to a renderer
    pub fn block_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.blocks)
    }

    #[inline]
    pub fn block(&self, index: VoxelIndex) -> Option<BlockType> {
        self.blocks.get(index).copied()
    }

    #[inline]
    pub fn block_at(&self, pos: LocalPos) -> BlockType {
        self.blocks[pos.to_index()]
    }

    /// Child grid occupying a voxel, if split
    #[inline]
    pub fn child(&self, index: VoxelIndex) -> Option<GridId> {
        self.children.get(&index).copied()
    }

    #[inline]
    pub fn is_split(&self, index: VoxelIndex) -> bool {
        self.children.contains_key(&index)
    }

    /// Split voxels and their child grids, in index order
    pub fn children(&self) -> Vec<(VoxelIndex, GridId)> {
        let mut children: Vec<_> = self.children.iter().map(|(i, id)| (*i, *id)).collect();
        children.sort_unstable_by_key(|(index, _)| *index);
        children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Number of voxels that block movement
    pub fn solid_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_solid()).count()
    }

    /// Grid-local spawn point from the center-column air search.
    ///
    /// Takes the first open voxel along the central z column and backs off
    /// slightly toward the -z door. Falls back to a point above the grid when
    /// the column is fully blocked.
    pub fn spawn_point(&self) -> DVec3 {
        let center = (GRID_SIZE / 2) as u8;
        (1..(GRID_SIZE - 1) as u8)
            .map(|z| LocalPos::new(center, center, z))
            .find(|pos| self.block_at(*pos) == BlockType::Air)
            .map_or_else(
                || DVec3::new(0.0, 0.0, HALF_GRID_EXTENT + 2.0),
                |pos| pos.center() - DVec3::new(0.0, 0.0, SPAWN_NUDGE),
            )
    }

    pub(crate) fn set_block(&mut self, index: VoxelIndex, block: BlockType) {
        debug_assert!(index < GRID_VOLUME);
        self.blocks[index] = block;
    }

    pub(crate) fn insert_child(&mut self, index: VoxelIndex, child: GridId) {
        self.children.insert(index, child);
    }

    pub(crate) fn remove_child(&mut self, index: VoxelIndex) -> Option<GridId> {
        self.children.remove(&index)
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(seed: u64) -> GridNode {
        let generator = TerrainGenerator::with_seed(seed);
        GridNode::generate(GridId(0), &GridContext::root(seed), None, &generator)
    }

    #[test]
    fn new_grid_is_full_and_unsplit() {
        let grid = root(42);
        assert_eq!(grid.blocks().len(), GRID_VOLUME);
        assert_eq!(grid.block_bytes().len(), GRID_VOLUME);
        assert_eq!(grid.child_count(), 0);
        assert!(grid.is_visible());
        assert!(grid.blocks().iter().all(|b| !b.is_hitbox()));
        assert_eq!(grid.block(GRID_VOLUME), None);
    }

    #[test]
    fn spawn_point_is_open() {
        let grid = root(42);
        let spawn = grid.spawn_point();
        let nudged_back = spawn + DVec3::new(0.0, 0.0, SPAWN_NUDGE);
        let pos = LocalPos::from_local_point(nudged_back).unwrap();
        assert_eq!(grid.block_at(pos), BlockType::Air);
        assert_eq!((pos.x, pos.y), (8, 8));
    }
}
