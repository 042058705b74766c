//! Collectible orbs scattered through grid interiors.

use fractalis_core::constants::GRID_SIZE;
use fractalis_core::coords::voxel_center;
use fractalis_core::math::Ray;
use fractalis_core::{BlockType, LocalPos, VoxelIndex};
use fractalis_world::{GridId, GridNode, GridTransforms, GridTree};

use crate::config::CollectibleConfig;

/// Decorrelates collectible placement from terrain cosmetics.
const PLACEMENT_SALT: u64 = 0xC011_EC71_B1E5_5EED;

/// A collectible floating at the center of an air voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collectible {
    pub grid: GridId,
    pub index: VoxelIndex,
}

/// Live collectibles, owned per grid.
#[derive(Debug, Default)]
pub struct Collectibles {
    config: CollectibleConfig,
    items: Vec<Collectible>,
    collected: usize,
}

impl Collectibles {
    pub fn new(config: CollectibleConfig) -> Self {
        Self {
            config,
            items: Vec::new(),
            collected: 0,
        }
    }

    /// Scatter collectibles through a newly created grid.
    ///
    /// Placement is seeded from the grid seed, so a regenerated grid gets the
    /// same collectibles back.
    pub fn spawn_for(&mut self, grid: &GridNode) -> usize {
        let mut rng = fastrand::Rng::with_seed(grid.seed() ^ PLACEMENT_SALT);
        let interior = 1..(GRID_SIZE - 1) as u8;
        let mut placed = 0;

        for _ in 0..self.config.max_attempts {
            if placed >= self.config.per_grid {
                break;
            }
            let pos = LocalPos::new(
                rng.u8(interior.clone()),
                rng.u8(interior.clone()),
                rng.u8(interior.clone()),
            );
            if grid.block_at(pos) == BlockType::Air {
                self.items.push(Collectible {
                    grid: grid.id(),
                    index: pos.to_index(),
                });
                placed += 1;
            }
        }
        placed
    }

    /// Drop every collectible belonging to a destroyed grid.
    pub fn remove_grid(&mut self, grid: GridId) {
        self.items.retain(|item| item.grid != grid);
    }

    /// Nearest collectible hit by a ray among grids at `depth`.
    pub fn pick(
        &self,
        ray: &Ray,
        max_distance: f64,
        tree: &GridTree,
        transforms: &GridTransforms,
        depth: u32,
    ) -> Option<(usize, f64)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| tree.get(item.grid).is_some_and(|g| g.depth() == depth))
            .filter_map(|(slot, item)| {
                let transform = transforms.get(item.grid)?;
                let center = transform.to_world(voxel_center(item.index));
                let distance = ray.intersect_sphere(center, self.config.radius * transform.scale)?;
                (distance <= max_distance).then_some((slot, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Remove a collectible by slot and count it.
    pub fn collect(&mut self, slot: usize) -> Option<Collectible> {
        if slot >= self.items.len() {
            return None;
        }
        self.collected += 1;
        Some(self.items.swap_remove(slot))
    }

    pub fn in_grid(&self, grid: GridId) -> impl Iterator<Item = &Collectible> {
        self.items.iter().filter(move |item| item.grid == grid)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total picked up so far
    pub const fn collected(&self) -> usize {
        self.collected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractalis_world::GridTransform;
    use glam::DVec3;

    #[test]
    fn spawns_in_interior_air() {
        let tree = GridTree::with_seed(42);
        let root = tree.get(tree.root()).unwrap();
        let mut collectibles = Collectibles::new(CollectibleConfig::default());
        let placed = collectibles.spawn_for(root);
        assert_eq!(placed, 12);
        for item in collectibles.in_grid(root.id()) {
            let pos = LocalPos::from_index(item.index);
            assert!(!pos.is_shell());
            assert_eq!(root.block_at(pos), BlockType::Air);
        }
    }

    #[test]
    fn placement_is_deterministic() {
        let tree = GridTree::with_seed(42);
        let root = tree.get(tree.root()).unwrap();
        let mut a = Collectibles::new(CollectibleConfig::default());
        let mut b = Collectibles::new(CollectibleConfig::default());
        a.spawn_for(root);
        b.spawn_for(root);
        assert_eq!(a.items, b.items);
    }

    #[test]
    fn pick_and_collect() {
        let tree = GridTree::with_seed(42);
        let root = tree.get(tree.root()).unwrap();
        let transforms = GridTransforms::compute(&tree, root.id(), GridTransform::IDENTITY);
        let mut collectibles = Collectibles::new(CollectibleConfig::default());
        collectibles.spawn_for(root);
        let target = collectibles.items[0];

        let center = voxel_center(target.index);
        let ray = Ray::new(center - DVec3::new(0.0, 0.0, 3.0), DVec3::Z);
        let (slot, distance) = collectibles.pick(&ray, 10.0, &tree, &transforms, 0).unwrap();
        assert!(distance <= 3.0);
        assert!(collectibles.pick(&ray, 10.0, &tree, &transforms, 1).is_none());

        let before = collectibles.len();
        collectibles.collect(slot).unwrap();
        assert_eq!(collectibles.len(), before - 1);
        assert_eq!(collectibles.collected(), 1);

        collectibles.remove_grid(root.id());
        assert!(collectibles.is_empty());
    }
}
