//! Arena of grid nodes and the split/unsplit lifecycle.

use fractalis_core::constants::GRID_VOLUME;
use fractalis_core::{BlockType, LocalPos, VoxelIndex};
use hashbrown::HashMap;
use tracing::{debug, trace};

use crate::events::WorldEvent;
use crate::generation::{GridContext, TerrainGenerator};
use crate::grid::{GridId, GridNode, ParentLink};
use crate::WorldSeed;

/// Owns every live grid. The root is created on construction and never dropped.
#[derive(Debug)]
pub struct GridTree {
    nodes: HashMap<GridId, GridNode>,
    root: GridId,
    next_id: u64,
    generator: TerrainGenerator,
    locked: bool,
    revision: u64,
    events: Vec<WorldEvent>,
}

impl GridTree {
    /// Create a tree and generate its root grid.
    pub fn new(generator: TerrainGenerator) -> Self {
        let root = GridId(0);
        let ctx = GridContext::root(generator.seed());
        let node = GridNode::generate(root, &ctx, None, &generator);

        let mut nodes = HashMap::new();
        nodes.insert(root, node);

        Self {
            nodes,
            root,
            next_id: 1,
            generator,
            locked: false,
            revision: 0,
            events: vec![WorldEvent::GridCreated {
                grid: root,
                parent: None,
                depth: 0,
            }],
        }
    }

    /// Create a tree with the default generator configuration.
    pub fn with_seed(seed: WorldSeed) -> Self {
        Self::new(TerrainGenerator::with_seed(seed))
    }

    pub const fn root(&self) -> GridId {
        self.root
    }

    pub const fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    #[inline]
    pub fn get(&self, grid: GridId) -> Option<&GridNode> {
        self.nodes.get(&grid)
    }

    #[inline]
    pub fn contains(&self, grid: GridId) -> bool {
        self.nodes.contains_key(&grid)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; the root exists for the tree's lifetime
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Live grid ids in creation order
    pub fn ids(&self) -> Vec<GridId> {
        let mut ids: Vec<_> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &GridNode> {
        self.nodes.values()
    }

    /// Deepest live grid
    pub fn max_depth(&self) -> u32 {
        self.nodes.values().map(GridNode::depth).max().unwrap_or(0)
    }

    /// Counter bumped on every structural change
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// While locked, split and unsplit are suppressed.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Take all pending change notifications.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    /// Subdivide a splittable voxel into a child grid.
    ///
    /// Returns the new grid, or `None` when the tree is locked, the voxel does
    /// not exist or its type does not split.
    pub fn split(&mut self, grid: GridId, index: VoxelIndex) -> Option<GridId> {
        if self.locked {
            trace!(%grid, index, "split suppressed while locked");
            return None;
        }

        let node = self.nodes.get(&grid)?;
        let block = node.block(index)?;
        if !block.splits() || node.is_split(index) {
            return None;
        }
        let hitbox = block.hitbox()?;
        let ctx = node.context().child(LocalPos::from_index(index), block);

        let id = GridId(self.next_id);
        self.next_id += 1;
        let parent = ParentLink { grid, index };
        let child = GridNode::generate(id, &ctx, Some(parent), &self.generator);

        let node = self.nodes.get_mut(&grid)?;
        node.set_block(index, hitbox);
        node.insert_child(index, id);
        self.nodes.insert(id, child);
        self.revision += 1;

        trace!(%grid, index, child = %id, depth = ctx.depth, ?block, "split");
        self.events.push(WorldEvent::BlockChanged {
            grid,
            index,
            block: hitbox,
        });
        self.events.push(WorldEvent::GridCreated {
            grid: id,
            parent: Some(parent),
            depth: ctx.depth,
        });

        Some(id)
    }

    /// Collapse a split voxel, dropping its child grid and every descendant.
    ///
    /// Returns false when the tree is locked or the voxel is not split.
    pub fn unsplit(&mut self, grid: GridId, index: VoxelIndex) -> bool {
        if self.locked {
            trace!(%grid, index, "unsplit suppressed while locked");
            return false;
        }

        let Some(node) = self.nodes.get_mut(&grid) else {
            return false;
        };
        let Some(base) = node.block(index).and_then(BlockType::split_from) else {
            return false;
        };
        let Some(child) = node.remove_child(index) else {
            return false;
        };
        node.set_block(index, base);

        let released = self.release_subtree(child);
        self.revision += 1;

        trace!(%grid, index, child = %child, released, "unsplit");
        self.events.push(WorldEvent::BlockChanged {
            grid,
            index,
            block: base,
        });

        true
    }

    fn release_subtree(&mut self, top: GridId) -> usize {
        let mut stack = vec![top];
        let mut released = 0;
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                stack.extend(node.children().into_iter().map(|(_, child)| child));
                self.events.push(WorldEvent::GridDestroyed { grid: id });
                released += 1;
            }
        }
        released
    }

    /// Rewrite a voxel that is not split.
    ///
    /// Hitbox types and split voxels are refused so that a voxel holds a
    /// hitbox type exactly when it has a child grid.
    pub fn set_block(&mut self, grid: GridId, index: VoxelIndex, block: BlockType) -> bool {
        if block.is_hitbox() || index >= GRID_VOLUME {
            return false;
        }
        let Some(node) = self.nodes.get_mut(&grid) else {
            return false;
        };
        if node.is_split(index) {
            return false;
        }
        node.set_block(index, block);
        self.events.push(WorldEvent::BlockChanged { grid, index, block });
        true
    }

    /// Voxel indices leading from the root down to `grid`.
    pub fn path_to(&self, grid: GridId) -> Option<Vec<VoxelIndex>> {
        let mut path = Vec::new();
        let mut current = self.nodes.get(&grid)?;
        while let Some(link) = current.parent() {
            path.push(link.index);
            current = self.nodes.get(&link.grid)?;
        }
        path.reverse();
        Some(path)
    }

    /// Grid reached by following `path` from the root, if it is materialized.
    pub fn resolve_path(&self, path: &[VoxelIndex]) -> Option<GridId> {
        path.iter().try_fold(self.root, |grid, index| self.nodes.get(&grid)?.child(*index))
    }

    /// Follow `path` from the root, splitting any voxel that is not yet split.
    ///
    /// Generation is deterministic, so a collapsed grid comes back with the
    /// same contents it had before.
    pub fn materialize_path(&mut self, path: &[VoxelIndex]) -> Option<GridId> {
        let mut grid = self.root;
        for &index in path {
            let existing = self.nodes.get(&grid)?.child(index);
            grid = match existing {
                Some(child) => child,
                None => self.split(grid, index)?,
            };
        }
        debug!(depth = path.len(), %grid, "materialized grid path");
        Some(grid)
    }

    /// Returns true if `ancestor` is `grid` or lies on its parent chain
    pub fn is_ancestor_or_self(&self, ancestor: GridId, grid: GridId) -> bool {
        let mut current = Some(grid);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(GridNode::parent).map(|link| link.grid);
        }
        false
    }

    /// Show or hide a single grid. Hidden grids are skipped by distance-based
    /// streaming.
    pub fn set_visible(&mut self, grid: GridId, visible: bool) -> bool {
        self.nodes.get_mut(&grid).map(|node| node.set_visible(visible)).is_some()
    }

    /// Restrict visibility to the region around the active grid.
    ///
    /// The root, the active grid's ancestor chain, and the direct children of
    /// every chain member stay visible; everything else is hidden.
    pub fn refresh_visibility(&mut self, active: GridId) {
        let mut chain = Vec::new();
        let mut current = Some(active);
        while let Some(id) = current {
            chain.push(id);
            current = self.nodes.get(&id).and_then(GridNode::parent).map(|link| link.grid);
        }

        let mut visible: Vec<GridId> = vec![self.root];
        for id in &chain {
            visible.push(*id);
            if let Some(node) = self.nodes.get(id) {
                visible.extend(node.children().into_iter().map(|(_, child)| child));
            }
        }

        for node in self.nodes.values_mut() {
            node.set_visible(false);
        }
        for id in visible {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.set_visible(true);
            }
        }
    }
}
