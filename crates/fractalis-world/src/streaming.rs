//! Distance-driven streaming of grid levels.
//!
//! Each run makes two passes over the tree. The split pass materializes child
//! grids for splittable voxels near the camera in every grid shallower than
//! the active depth; the unsplit pass collapses children that drifted out of
//! range and everything below the active depth. Both passes are capped by a
//! per-run step budget.

use std::collections::VecDeque;

use fractalis_core::constants::{BLOCK_SIZE, GRID_SCALE, GRID_VOLUME};
use fractalis_core::coords::voxel_center;
use fractalis_core::{BlockType, VoxelIndex};
use glam::DVec3;
use tracing::{debug, trace};

use crate::grid::GridId;
use crate::transform::{GridTransform, GridTransforms};
use crate::tree::GridTree;

/// Configuration for streaming behavior.
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// Split distance for grids one level above the active depth, in world units.
    pub base_distance: f64,
    /// Maximum splits, and separately unsplits, per run.
    pub step_budget: usize,
    /// Squared camera travel that triggers a new run.
    pub reevaluate_distance_sq: f64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            base_distance: BLOCK_SIZE * GRID_SCALE * 3.0,
            step_budget: 100,
            reevaluate_distance_sq: BLOCK_SIZE * GRID_SCALE / 8.0,
        }
    }
}

/// Navigation state the scheduler works against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamingView {
    pub active: GridId,
    pub depth: u32,
    /// Exact world transform of the active grid
    pub anchor: GridTransform,
}

/// Work done by one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingReport {
    /// Voxels split by the distance rule
    pub split: usize,
    /// Children collapsed by the distance rule
    pub unsplit: usize,
    /// Children collapsed because their grid is at or below the active depth
    pub collapsed: usize,
    /// A pass stopped early on its step budget
    pub budget_exhausted: bool,
}

/// Decides when to run and drives the split/unsplit passes.
#[derive(Debug)]
pub struct StreamingScheduler {
    config: StreamingConfig,
    last_camera: Option<DVec3>,
    pending: bool,
}

impl StreamingScheduler {
    pub fn new(config: StreamingConfig) -> Self {
        Self {
            config,
            last_camera: None,
            pending: true,
        }
    }

    pub const fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Ask for a run on the next unlocked update
    pub fn request_run(&mut self) {
        self.pending = true;
    }

    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Returns true if a run is requested or the camera moved far enough
    pub fn should_run(&self, camera: DVec3) -> bool {
        self.pending
            || self.last_camera.map_or(true, |last| {
                last.distance_squared(camera) > self.config.reevaluate_distance_sq
            })
    }

    /// Run both passes if needed.
    ///
    /// A run that falls inside the transition lock stays pending and executes
    /// on the first unlocked update.
    pub fn update(&mut self, tree: &mut GridTree, view: StreamingView, camera: DVec3) -> Option<StreamingReport> {
        if !self.should_run(camera) {
            return None;
        }
        self.last_camera = Some(camera);
        if tree.is_locked() {
            self.pending = true;
            return None;
        }
        self.pending = false;
        Some(self.run(tree, view, camera))
    }

    /// Run both passes unconditionally.
    pub fn run(&self, tree: &mut GridTree, view: StreamingView, camera: DVec3) -> StreamingReport {
        let mut transforms = GridTransforms::compute(tree, view.active, view.anchor);
        let mut report = StreamingReport::default();

        self.split_pass(tree, view, camera, &mut transforms, &mut report);
        self.unsplit_pass(tree, view, camera, &transforms, &mut report);

        debug!(
            depth = view.depth,
            split = report.split,
            unsplit = report.unsplit,
            collapsed = report.collapsed,
            exhausted = report.budget_exhausted,
            grids = tree.len(),
            "streaming run"
        );
        report
    }

    /// Distance within which voxels of a grid at `grid_depth` are split.
    ///
    /// Grows by the grid scale factor for every level above the active depth,
    /// so each level covers the same number of its own voxels.
    pub fn split_distance(&self, active_depth: u32, grid_depth: u32) -> f64 {
        let levels = i32::try_from(active_depth.saturating_sub(grid_depth + 1)).unwrap_or(i32::MAX);
        self.config.base_distance * GRID_SCALE.powi(levels)
    }

    fn split_pass(
        &self,
        tree: &mut GridTree,
        view: StreamingView,
        camera: DVec3,
        transforms: &mut GridTransforms,
        report: &mut StreamingReport,
    ) {
        let mut queue: VecDeque<GridId> = tree.ids().into();

        while let Some(id) = queue.pop_front() {
            let Some(node) = tree.get(id) else { continue };
            if !node.is_visible() || node.depth() >= view.depth {
                continue;
            }
            let Some(transform) = transforms.get(id) else {
                continue;
            };
            let limit = self.split_distance(view.depth, node.depth());
            let limit_sq = limit * limit;

            let candidates: Vec<VoxelIndex> = (0..GRID_VOLUME)
                .filter(|&index| !node.is_split(index) && node.block(index).is_some_and(BlockType::splits))
                .filter(|&index| {
                    let world = transform.to_world(voxel_center(index));
                    world != DVec3::ZERO && world.distance_squared(camera) <= limit_sq
                })
                .collect();

            for index in candidates {
                if report.split >= self.config.step_budget {
                    report.budget_exhausted = true;
                    return;
                }
                if let Some(child) = tree.split(id, index) {
                    transforms.insert(child, transform.child_at(index));
                    queue.push_back(child);
                    report.split += 1;
                }
            }
        }
    }

    fn unsplit_pass(
        &self,
        tree: &mut GridTree,
        view: StreamingView,
        camera: DVec3,
        transforms: &GridTransforms,
        report: &mut StreamingReport,
    ) {
        for id in tree.ids() {
            let Some(node) = tree.get(id) else { continue };

            // Nothing may exist below the active depth. Visibility is not
            // consulted here and these collapses are not budgeted.
            if node.depth() >= view.depth {
                let children = node.children();
                for (index, _) in children {
                    if tree.unsplit(id, index) {
                        report.collapsed += 1;
                    }
                }
                continue;
            }

            if !node.is_visible() {
                continue;
            }
            let Some(transform) = transforms.get(id) else {
                continue;
            };
            let limit = self.split_distance(view.depth, node.depth());
            let limit_sq = limit * limit;

            let far: Vec<VoxelIndex> = node
                .children()
                .into_iter()
                .filter(|(_, child)| !tree.is_ancestor_or_self(*child, view.active))
                .filter(|(index, _)| {
                    let world = transform.to_world(voxel_center(*index));
                    world != DVec3::ZERO && world.distance_squared(camera) > limit_sq
                })
                .map(|(index, _)| index)
                .collect();

            for index in far {
                if report.unsplit >= self.config.step_budget {
                    report.budget_exhausted = true;
                    return;
                }
                if tree.unsplit(id, index) {
                    trace!(grid = %id, index, "collapsed distant child");
                    report.unsplit += 1;
                }
            }
        }
    }
}

impl Default for StreamingScheduler {
    fn default() -> Self {
        Self::new(StreamingConfig::default())
    }
}
