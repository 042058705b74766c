//! Point and body collision against grids near the active depth.

use std::cmp::Reverse;

use fractalis_core::math::Aabb;
use fractalis_core::{BlockType, LocalPos};
use fractalis_world::{GridNode, GridTransform, GridTransforms, GridTree};
use glam::DVec3;

/// Half the edge length of the player's collision cube.
pub const PLAYER_HALF_EXTENT: f64 = 0.35;

/// Shrink applied to the collision cube so the player can slide along seams.
pub const SEAM_MARGIN: f64 = 0.01;

/// Collision query over the grids within one level of the active depth.
///
/// Deeper and shallower grids are ignored; they are either too small to
/// matter or fully represented by their hitbox voxels.
pub struct CollisionQuery<'a> {
    candidates: Vec<(&'a GridNode, GridTransform)>,
    half_extent: f64,
}

impl<'a> CollisionQuery<'a> {
    /// Candidates are ordered deepest first, then by id, so where a child
    /// overlaps its parent's hitbox voxel the child answers.
    pub fn new(tree: &'a GridTree, transforms: &GridTransforms, depth: u32) -> Self {
        let mut candidates: Vec<_> = tree
            .iter()
            .filter(|grid| grid.depth().abs_diff(depth) <= 1)
            .filter_map(|grid| transforms.get(grid.id()).map(|t| (grid, t)))
            .collect();
        candidates.sort_by_key(|(grid, _)| (Reverse(grid.depth()), grid.id()));
        Self {
            candidates,
            half_extent: PLAYER_HALF_EXTENT - SEAM_MARGIN,
        }
    }

    /// Use a different collision cube
    #[must_use]
    pub fn with_extent(mut self, half_extent: f64, margin: f64) -> Self {
        self.half_extent = half_extent - margin;
        self
    }

    /// Number of grids consulted
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Block at a world point in the first candidate grid containing it
    pub fn block_at(&self, point: DVec3) -> Option<BlockType> {
        self.candidates.iter().find_map(|(grid, transform)| {
            LocalPos::from_local_point(transform.to_local(point)).map(|pos| grid.block_at(pos))
        })
    }

    /// Returns true if any candidate grid has a solid voxel at the point.
    pub fn is_point_blocked(&self, point: DVec3) -> bool {
        self.candidates.iter().any(|(grid, transform)| {
            LocalPos::from_local_point(transform.to_local(point))
                .is_some_and(|pos| grid.block_at(pos).is_solid())
        })
    }

    /// Returns true if the player's collision cube centered at `center` overlaps
    /// a solid voxel, sampled at its center and eight corners.
    pub fn is_blocked(&self, center: DVec3) -> bool {
        self.is_point_blocked(center)
            || Aabb::from_center(center, self.half_extent)
                .corners()
                .into_iter()
                .any(|corner| self.is_point_blocked(corner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractalis_world::GridId;

    fn root_query(tree: &GridTree) -> GridTransforms {
        GridTransforms::compute(tree, tree.root(), GridTransform::IDENTITY)
    }

    fn find(tree: &GridTree, grid: GridId, pred: impl Fn(BlockType) -> bool) -> LocalPos {
        let node = tree.get(grid).unwrap();
        LocalPos::all()
            .find(|pos| !pos.is_shell() && pred(node.block_at(*pos)))
            .unwrap()
    }

    #[test]
    fn solid_voxel_blocks() {
        let tree = GridTree::with_seed(42);
        let transforms = root_query(&tree);
        let query = CollisionQuery::new(&tree, &transforms, 0);
        let solid = find(&tree, tree.root(), BlockType::is_solid);
        assert!(query.is_point_blocked(solid.center()));
        assert!(query.is_blocked(solid.center()));
    }

    #[test]
    fn door_is_free() {
        let tree = GridTree::with_seed(42);
        let transforms = root_query(&tree);
        let query = CollisionQuery::new(&tree, &transforms, 0);
        // Center of the 2x2 door on the -z face
        let door = DVec3::new(0.0, 0.0, -7.5);
        assert!(!query.is_point_blocked(door));
        assert!(!query.is_blocked(door));
    }

    #[test]
    fn outside_every_grid_is_free() {
        let tree = GridTree::with_seed(42);
        let transforms = root_query(&tree);
        let query = CollisionQuery::new(&tree, &transforms, 0);
        assert!(!query.is_blocked(DVec3::new(0.0, 100.0, 0.0)));
        assert_eq!(query.block_at(DVec3::new(0.0, 100.0, 0.0)), None);
    }

    #[test]
    fn corners_catch_adjacent_solids() {
        let mut tree = GridTree::with_seed(42);
        let root = tree.root();
        let open = LocalPos::new(7, 7, 7);
        let wall = LocalPos::new(6, 7, 7);
        tree.set_block(root, open.to_index(), BlockType::Air);
        tree.set_block(root, wall.to_index(), BlockType::Stone);
        let transforms = root_query(&tree);
        let query = CollisionQuery::new(&tree, &transforms, 0);

        let near_wall = open.center() - DVec3::new(0.2, 0.0, 0.0);
        assert!(!query.is_point_blocked(near_wall));
        assert!(query.is_blocked(near_wall));
    }

    #[test]
    fn child_grid_answers_over_parent_hitbox() {
        let mut tree = GridTree::with_seed(42);
        let root = tree.root();
        let voxel = LocalPos::new(0, 2, 3);
        let child = tree.split(root, voxel.to_index()).unwrap();
        let transforms = root_query(&tree);

        let expected = tree.get(child).unwrap().block_at(LocalPos::new(8, 8, 8));
        for _ in 0..4 {
            let query = CollisionQuery::new(&tree, &transforms, 0);
            assert_eq!(query.block_at(voxel.center()), Some(expected));
        }
        assert!(!expected.is_hitbox());
    }

    #[test]
    fn only_neighbouring_depths_collide() {
        let mut tree = GridTree::with_seed(42);
        let root = tree.root();
        let index = LocalPos::new(0, 2, 3).to_index();
        let child = tree.split(root, index).unwrap();
        let grandchild_pos = find(&tree, child, BlockType::splits);
        tree.split(child, grandchild_pos.to_index()).unwrap();

        let transforms = root_query(&tree);
        assert_eq!(CollisionQuery::new(&tree, &transforms, 0).candidate_count(), 2);
        assert_eq!(CollisionQuery::new(&tree, &transforms, 1).candidate_count(), 3);
        assert_eq!(CollisionQuery::new(&tree, &transforms, 3).candidate_count(), 1);
    }
}
