//! Grid inspection helpers.

use std::collections::VecDeque;

use fractalis_core::constants::{GRID_SIZE, GRID_VOLUME};
use fractalis_core::{BlockType, LocalPos, VoxelIndex};
use fractalis_world::{GridContext, GridNode, TerrainGenerator};
use tracing::debug;

use crate::{DensityTestConfig, Result, TestError};

/// One voxel of the 2x2 door on each face of a grid.
pub fn door_cells() -> [LocalPos; 6] {
    let max = (GRID_SIZE - 1) as u8;
    let mid = (GRID_SIZE / 2) as u8;
    [
        LocalPos::new(0, mid, mid),
        LocalPos::new(max, mid, mid),
        LocalPos::new(mid, 0, mid),
        LocalPos::new(mid, max, mid),
        LocalPos::new(mid, mid, 0),
        LocalPos::new(mid, mid, max),
    ]
}

/// Voxels reachable from `start` through face-adjacent non-solid voxels.
pub fn reachable_from(blocks: &[BlockType], start: LocalPos) -> Vec<bool> {
    let mut seen = vec![false; GRID_VOLUME];
    if blocks[start.to_index()].is_solid() {
        return seen;
    }
    let mut queue = VecDeque::from([start]);
    seen[start.to_index()] = true;
    while let Some(pos) = queue.pop_front() {
        for next in pos.neighbors() {
            let index = next.to_index();
            if !seen[index] && !blocks[index].is_solid() {
                seen[index] = true;
                queue.push_back(next);
            }
        }
    }
    seen
}

/// Every door must be open and reachable from every other.
pub fn check_navigable(blocks: &[BlockType]) -> Result<()> {
    let doors = door_cells();
    for door in doors {
        if blocks[door.to_index()].is_solid() {
            return Err(TestError::BlockedDoor(door));
        }
    }
    let reachable = reachable_from(blocks, doors[0]);
    for door in &doors[1..] {
        if !reachable[door.to_index()] {
            return Err(TestError::Unreachable {
                from: doors[0],
                to: *door,
            });
        }
    }
    Ok(())
}

/// Fraction of voxels that block movement.
pub fn solid_fraction(blocks: &[BlockType]) -> f64 {
    blocks.iter().filter(|b| b.is_solid()).count() as f64 / blocks.len() as f64
}

/// Generic-terrain context reached by splitting `pos` repeatedly from the root.
pub fn context_at_depth(seed: u64, depth: u32, pos: LocalPos) -> GridContext {
    (0..depth).fold(GridContext::root(seed), |ctx, _| ctx.child(pos, BlockType::Stone))
}

/// First voxel of a grid that can be split.
pub fn first_splittable(grid: &GridNode) -> Option<VoxelIndex> {
    (0..GRID_VOLUME).find(|i| grid.block(*i).is_some_and(BlockType::splits))
}

/// Average solid fraction per depth, over several generic grids each.
///
/// Fails when any depth drifts from the mean of all depths by more than the
/// tolerance.
pub fn sample_density(generator: &TerrainGenerator, config: &DensityTestConfig) -> Result<Vec<f64>> {
    let seed = generator.seed();
    let interior = (GRID_SIZE - 2) as u8;
    let mut averages = Vec::new();

    for depth in 0..=config.max_depth {
        let total: f64 = (0..config.grids_per_depth)
            .map(|i| {
                let v = (i * 5 % usize::from(interior)) as u8 + 1;
                let pos = LocalPos::new(v, interior - v + 1, (v * 3) % interior + 1);
                solid_fraction(&generator.generate_grid(&context_at_depth(seed, depth, pos)))
            })
            .sum();
        let average = total / config.grids_per_depth as f64;
        debug!(depth, average, "sampled density");
        averages.push(average);
    }

    let expected = averages.iter().sum::<f64>() / averages.len() as f64;
    for (depth, actual) in (0..=config.max_depth).zip(averages.iter().copied()) {
        if (actual - expected).abs() > config.tolerance {
            return Err(TestError::DensityDrift {
                depth,
                actual,
                expected,
                tolerance: config.tolerance,
            });
        }
    }
    Ok(averages)
}
