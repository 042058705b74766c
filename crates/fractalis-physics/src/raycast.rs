//! Voxel ray picking inside a single grid.

use fractalis_core::constants::{BLOCK_SIZE, GRID_SCALE, GRID_SIZE, HALF_GRID_EXTENT};
use fractalis_core::math::{Aabb, Ray};
use fractalis_core::{BlockType, LocalPos, VoxelIndex};
use fractalis_world::{GridId, GridNode, GridTransform};
use glam::{DVec3, IVec3};

/// Nudge past the entry face so the first cell is inside the grid.
const ENTRY_EPSILON: f64 = 1e-6;

/// Result of a raycast against a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub grid: GridId,
    pub index: VoxelIndex,
    pub block: BlockType,
    /// World-space point where the ray enters the voxel
    pub position: DVec3,
    /// Face normal of the entered face, zero if the ray started inside
    pub normal: IVec3,
    /// World-space distance along the ray
    pub distance: f64,
}

/// Walk the voxels of one grid along a ray and return the first non-air voxel
/// within `max_distance` world units.
///
/// The voxel containing the ray origin is skipped, so a player standing in a
/// marker or decorative voxel targets what lies ahead.
#[allow(clippy::cast_possible_truncation)]
pub fn raycast_grid(
    grid: &GridNode,
    transform: GridTransform,
    ray: &Ray,
    max_distance: f64,
) -> Option<RaycastHit> {
    if !ray.is_valid() || max_distance <= 0.0 {
        return None;
    }

    // Cell space: one unit per voxel, grid spanning [0, GRID_SIZE)
    let units_per_cell = transform.scale * BLOCK_SIZE;
    let origin = (transform.to_local(ray.origin) + DVec3::splat(HALF_GRID_EXTENT)) / BLOCK_SIZE;
    let dir = ray.direction;
    let max_t = max_distance / units_per_cell;

    let bounds = Aabb::new(DVec3::ZERO, DVec3::splat(GRID_SCALE));
    let (t_enter, t_exit) = bounds.intersect_ray(&Ray::new(origin, dir))?;
    if t_enter > max_t {
        return None;
    }

    let start = origin + dir * (t_enter + ENTRY_EPSILON);
    let mut cell = start.floor().as_ivec3().clamp(IVec3::ZERO, IVec3::splat(GRID_SIZE as i32 - 1));
    let mut normal = IVec3::ZERO;
    if t_enter > 0.0 {
        // The entry face belongs to the slab entered last
        let near = ((bounds.min - origin) / dir).min((bounds.max - origin) / dir);
        let axis = if near.x >= near.y && near.x >= near.z {
            0
        } else if near.y >= near.z {
            1
        } else {
            2
        };
        normal[axis] = if dir[axis] > 0.0 { -1 } else { 1 };
    }

    let mut step = IVec3::ZERO;
    let mut t_max = DVec3::splat(f64::INFINITY);
    let mut t_delta = DVec3::splat(f64::INFINITY);
    for axis in 0..3 {
        let d = dir[axis];
        if d > 1e-12 {
            step[axis] = 1;
            t_max[axis] = (f64::from(cell[axis]) + 1.0 - origin[axis]) / d;
            t_delta[axis] = 1.0 / d;
        } else if d < -1e-12 {
            step[axis] = -1;
            t_max[axis] = (f64::from(cell[axis]) - origin[axis]) / d;
            t_delta[axis] = -1.0 / d;
        }
    }

    let mut t = t_enter;
    let mut skip = t_enter <= 0.0;
    loop {
        let pos = LocalPos::from_coords(i64::from(cell.x), i64::from(cell.y), i64::from(cell.z))?;
        let block = grid.block_at(pos);
        if !block.is_air() && !skip {
            return Some(RaycastHit {
                grid: grid.id(),
                index: pos.to_index(),
                block,
                position: ray.at(t * units_per_cell),
                normal,
                distance: t * units_per_cell,
            });
        }

        let axis = if t_max.x <= t_max.y && t_max.x <= t_max.z {
            0
        } else if t_max.y <= t_max.z {
            1
        } else {
            2
        };
        t = t_max[axis];
        if !t.is_finite() || t > max_t || t > t_exit {
            return None;
        }
        cell[axis] += step[axis];
        t_max[axis] += t_delta[axis];
        skip = false;
        normal = IVec3::ZERO;
        normal[axis] = -step[axis];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fractalis_world::GridTree;

    fn open_root() -> (GridTree, GridId) {
        let mut tree = GridTree::with_seed(42);
        let root = tree.root();
        // Clear a straight line along +x at (y, z) = (8, 8) apart from one stone
        for x in 0..16 {
            let index = LocalPos::new(x, 8, 8).to_index();
            tree.set_block(root, index, BlockType::Air);
        }
        tree.set_block(root, LocalPos::new(12, 8, 8).to_index(), BlockType::Stone);
        (tree, root)
    }

    #[test]
    fn hits_first_block_along_ray() {
        let (tree, root) = open_root();
        let grid = tree.get(root).unwrap();
        let origin = LocalPos::new(2, 8, 8).center();
        let ray = Ray::new(origin, DVec3::X);

        let hit = raycast_grid(grid, GridTransform::IDENTITY, &ray, 20.0).unwrap();
        assert_eq!(hit.index, LocalPos::new(12, 8, 8).to_index());
        assert_eq!(hit.block, BlockType::Stone);
        assert_eq!(hit.normal, IVec3::new(-1, 0, 0));
        assert_relative_eq!(hit.distance, 9.5, epsilon = 1e-9);
    }

    #[test]
    fn skips_origin_voxel() {
        let (mut tree, root) = open_root();
        tree.set_block(root, LocalPos::new(2, 8, 8).to_index(), BlockType::Waypoint);
        let grid = tree.get(root).unwrap();
        let ray = Ray::new(LocalPos::new(2, 8, 8).center(), DVec3::X);
        let hit = raycast_grid(grid, GridTransform::IDENTITY, &ray, 20.0).unwrap();
        assert_eq!(hit.block, BlockType::Stone);
    }

    #[test]
    fn respects_range() {
        let (tree, root) = open_root();
        let grid = tree.get(root).unwrap();
        let ray = Ray::new(LocalPos::new(2, 8, 8).center(), DVec3::X);
        assert!(raycast_grid(grid, GridTransform::IDENTITY, &ray, 5.0).is_none());
    }

    #[test]
    fn distances_scale_with_grid() {
        let (tree, root) = open_root();
        let grid = tree.get(root).unwrap();
        let transform = GridTransform::new(DVec3::new(100.0, 0.0, 0.0), 16.0);
        let origin = transform.to_world(LocalPos::new(2, 8, 8).center());
        let ray = Ray::new(origin, DVec3::X);
        let hit = raycast_grid(grid, transform, &ray, 1000.0).unwrap();
        assert_relative_eq!(hit.distance, 9.5 * 16.0, epsilon = 1e-6);
    }

    #[test]
    fn enters_from_outside() {
        let (tree, root) = open_root();
        let grid = tree.get(root).unwrap();
        let origin = DVec3::new(-20.0, 0.5, 0.5);
        let ray = Ray::new(origin, DVec3::X);
        let hit = raycast_grid(grid, GridTransform::IDENTITY, &ray, 100.0).unwrap();
        // The carved row is open from the door up to the stone
        assert_eq!(hit.index, LocalPos::new(12, 8, 8).to_index());
        assert_relative_eq!(hit.distance, 24.0, epsilon = 1e-6);
        assert!(raycast_grid(grid, GridTransform::IDENTITY, &ray, 10.0).is_none());
    }
}
