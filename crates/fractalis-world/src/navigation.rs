//! Scale navigation: moving the player between grid depths.
//!
//! The player's physical size never changes. Descending into a child grid
//! instead magnifies the whole world by the grid scale factor around the
//! child's center; ascending undoes the most recent magnification. Each
//! descend pushes one [`TransformFrame`], so the stack length always equals
//! the active grid's depth.

use std::time::{Duration, Instant};

use fractalis_core::constants::GRID_SCALE;
use fractalis_core::{Error, LocalPos, Result, VoxelIndex};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::grid::GridId;
use crate::streaming::StreamingView;
use crate::transform::{GridTransform, GridTransforms};
use crate::tree::GridTree;

/// World transform and active-grid anchor saved before a descend.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformFrame {
    pub world_position: DVec3,
    pub world_scale: f64,
    pub anchor: GridTransform,
}

/// Complete navigation state, restorable atomically.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub world_position: DVec3,
    pub world_scale: f64,
    pub camera: DVec3,
    pub depth: u32,
    pub active: GridId,
    /// Voxel path from the root to the active grid
    pub active_path: Vec<VoxelIndex>,
    pub anchor: GridTransform,
    pub stack: Vec<TransformFrame>,
}

/// Result of a successful transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthChange {
    pub depth: u32,
    pub active: GridId,
}

/// Tracks the active grid and the world rescaling around the player.
#[derive(Debug, Clone)]
pub struct ScaleNavigator {
    world: GridTransform,
    active: GridId,
    anchor: GridTransform,
    stack: Vec<TransformFrame>,
    cooldown: Duration,
    transition_deadline: Option<Instant>,
}

impl ScaleNavigator {
    /// Time during which further transitions are refused after a descend.
    pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(200);

    /// Start at the root grid with an identity world transform.
    pub const fn new(root: GridId, cooldown: Duration) -> Self {
        Self {
            world: GridTransform::IDENTITY,
            active: root,
            anchor: GridTransform::IDENTITY,
            stack: Vec::new(),
            cooldown,
            transition_deadline: None,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn depth(&self) -> u32 {
        self.stack.len() as u32
    }

    pub const fn active(&self) -> GridId {
        self.active
    }

    /// Exact world transform of the active grid
    pub const fn anchor(&self) -> GridTransform {
        self.anchor
    }

    /// Transform of the root grid's container
    pub const fn world(&self) -> GridTransform {
        self.world
    }

    pub fn stack(&self) -> &[TransformFrame] {
        &self.stack
    }

    pub fn is_transitioning(&self, now: Instant) -> bool {
        self.transition_deadline.is_some_and(|deadline| now < deadline)
    }

    /// Inputs the streaming scheduler needs
    pub fn view(&self) -> StreamingView {
        StreamingView {
            active: self.active,
            depth: self.depth(),
            anchor: self.anchor,
        }
    }

    /// World transforms of every grid, anchored at the active grid
    pub fn transforms(&self, tree: &GridTree) -> GridTransforms {
        GridTransforms::compute(tree, self.active, self.anchor)
    }

    /// Voxel of the active grid containing a world point
    pub fn active_voxel(&self, point: DVec3) -> Option<LocalPos> {
        LocalPos::from_local_point(self.anchor.to_local(point))
    }

    /// Enter a materialized child of the active grid.
    ///
    /// The world is magnified around the child's center so that the child
    /// takes the size its parent had. Refused while a cooldown is running.
    pub fn descend(
        &mut self,
        tree: &GridTree,
        child: GridId,
        camera: &mut DVec3,
        now: Instant,
    ) -> Option<DepthChange> {
        if self.is_transitioning(now) {
            debug!(%child, "descend refused during cooldown");
            return None;
        }
        let link = tree.get(child)?.parent()?;
        if link.grid != self.active {
            debug!(%child, active = %self.active, "descend target is not a child of the active grid");
            return None;
        }

        let target = self.anchor.child_at(link.index);
        let anchor = GridTransform::new(DVec3::ZERO, target.scale * GRID_SCALE);

        self.stack.push(TransformFrame {
            world_position: self.world.position,
            world_scale: self.world.scale,
            anchor: self.anchor,
        });
        self.world = GridTransform::new(
            (self.world.position - target.position) * GRID_SCALE,
            self.world.scale * GRID_SCALE,
        );
        *camera = anchor.to_world(target.to_local(*camera));
        self.anchor = anchor;
        self.active = child;
        self.transition_deadline = Some(now + self.cooldown);

        info!(depth = self.depth(), active = %child, "descended");
        Some(DepthChange {
            depth: self.depth(),
            active: child,
        })
    }

    /// Return to the parent of the active grid, undoing the last descend.
    pub fn ascend(&mut self, tree: &GridTree, camera: &mut DVec3, now: Instant) -> Option<DepthChange> {
        if self.is_transitioning(now) {
            debug!("ascend refused during cooldown");
            return None;
        }
        let link = tree.get(self.active)?.parent()?;
        let frame = self.stack.pop()?;

        let restored = frame.anchor.child_at(link.index);
        *camera = restored.to_world(self.anchor.to_local(*camera));
        self.world = GridTransform::new(frame.world_position, frame.world_scale);
        self.anchor = frame.anchor;
        self.active = link.grid;

        info!(depth = self.depth(), active = %link.grid, "ascended");
        Some(DepthChange {
            depth: self.depth(),
            active: link.grid,
        })
    }

    /// Move the active pointer to a sibling grid when the camera leaves the
    /// active grid into one. Depth and stack are unchanged.
    pub fn follow(&mut self, tree: &GridTree, camera: DVec3) -> Option<DepthChange> {
        if self.active_voxel(camera).is_some() {
            return None;
        }
        let link = tree.get(self.active)?.parent()?;
        let parent = self.anchor.parent_from(link.index);
        let pos = LocalPos::from_local_point(parent.to_local(camera))?;
        let sibling = tree.get(link.grid)?.child(pos.to_index())?;

        self.anchor = parent.child_at(pos.to_index());
        self.active = sibling;

        debug!(active = %sibling, "re-anchored to sibling grid");
        Some(DepthChange {
            depth: self.depth(),
            active: sibling,
        })
    }

    /// Capture the full navigation state.
    pub fn capture(&self, tree: &GridTree, camera: DVec3) -> Snapshot {
        Snapshot {
            world_position: self.world.position,
            world_scale: self.world.scale,
            camera,
            depth: self.depth(),
            active: self.active,
            active_path: tree.path_to(self.active).unwrap_or_default(),
            anchor: self.anchor,
            stack: self.stack.clone(),
        }
    }

    /// Replace the navigation state with a snapshot.
    ///
    /// A captured grid that has been collapsed since is regenerated from its
    /// path. On error nothing is changed.
    pub fn restore(
        &mut self,
        tree: &mut GridTree,
        snapshot: &Snapshot,
        camera: &mut DVec3,
    ) -> Result<DepthChange> {
        if snapshot.stack.len() != snapshot.active_path.len() {
            return Err(Error::InvalidData(format!(
                "snapshot stack has {} frames for a path of depth {}",
                snapshot.stack.len(),
                snapshot.active_path.len()
            )));
        }

        let active = if tree.contains(snapshot.active) {
            snapshot.active
        } else {
            tree.materialize_path(&snapshot.active_path).ok_or_else(|| {
                Error::NotFound(format!(
                    "{} (path {:?}) could not be regenerated",
                    snapshot.active, snapshot.active_path
                ))
            })?
        };

        self.world = GridTransform::new(snapshot.world_position, snapshot.world_scale);
        self.anchor = snapshot.anchor;
        self.stack.clone_from(&snapshot.stack);
        self.active = active;
        *camera = snapshot.camera;

        info!(depth = self.depth(), %active, "restored snapshot");
        Ok(DepthChange {
            depth: self.depth(),
            active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fractalis_core::constants::GRID_VOLUME;
    use fractalis_core::BlockType;

    fn splittable(tree: &GridTree, grid: GridId) -> VoxelIndex {
        let node = tree.get(grid).unwrap();
        (0..GRID_VOLUME)
            .find(|i| node.block(*i).is_some_and(BlockType::splits))
            .unwrap()
    }

    fn setup() -> (GridTree, ScaleNavigator, GridId, Instant) {
        let mut tree = GridTree::with_seed(42);
        let root = tree.root();
        let child = tree.split(root, splittable(&tree, root)).unwrap();
        let nav = ScaleNavigator::new(root, ScaleNavigator::DEFAULT_COOLDOWN);
        (tree, nav, child, Instant::now())
    }

    #[test]
    fn descend_magnifies_around_child() {
        let (tree, mut nav, child, now) = setup();
        let index = tree.get(child).unwrap().parent().unwrap().index;
        let center = GridTransform::IDENTITY.child_at(index).position;
        let mut camera = center + DVec3::new(0.25, 0.0, -0.5);

        let change = nav.descend(&tree, child, &mut camera, now).unwrap();
        assert_eq!(change, DepthChange { depth: 1, active: child });
        assert_eq!(nav.stack().len(), 1);
        assert_relative_eq!(camera.x, 4.0);
        assert_relative_eq!(camera.z, -8.0);
        assert_relative_eq!(nav.world().scale, 16.0);
        assert_relative_eq!(nav.anchor().scale, 1.0);
        assert_eq!(nav.anchor().position, DVec3::ZERO);
    }

    #[test]
    fn descend_then_ascend_roundtrips() {
        let (tree, mut nav, child, now) = setup();
        let start = DVec3::new(-3.3, 1.7, 6.1);
        let mut camera = start;

        nav.descend(&tree, child, &mut camera, now).unwrap();
        let later = now + Duration::from_millis(250);
        let change = nav.ascend(&tree, &mut camera, later).unwrap();

        assert_eq!(change.depth, 0);
        assert_eq!(nav.active(), tree.root());
        assert!(nav.stack().is_empty());
        assert_relative_eq!(camera.x, start.x, epsilon = 1e-9);
        assert_relative_eq!(camera.y, start.y, epsilon = 1e-9);
        assert_relative_eq!(camera.z, start.z, epsilon = 1e-9);
        assert_eq!(nav.world(), GridTransform::IDENTITY);
        assert_eq!(nav.anchor(), GridTransform::IDENTITY);
    }

    #[test]
    fn cooldown_blocks_transitions() {
        let (tree, mut nav, child, now) = setup();
        let mut camera = DVec3::ZERO;
        nav.descend(&tree, child, &mut camera, now).unwrap();
        assert!(nav.is_transitioning(now + Duration::from_millis(100)));
        assert!(nav.ascend(&tree, &mut camera, now + Duration::from_millis(100)).is_none());
        assert_eq!(nav.depth(), 1);
        assert!(!nav.is_transitioning(now + Duration::from_millis(200)));
    }

    #[test]
    fn ascend_at_root_is_refused() {
        let (tree, mut nav, _, now) = setup();
        let mut camera = DVec3::ONE;
        assert!(nav.ascend(&tree, &mut camera, now).is_none());
        assert_eq!(camera, DVec3::ONE);
    }

    #[test]
    fn descend_requires_child_of_active() {
        let (mut tree, mut nav, child, now) = setup();
        let grandchild = tree.split(child, splittable(&tree, child)).unwrap();
        let mut camera = DVec3::ZERO;
        assert!(nav.descend(&tree, grandchild, &mut camera, now).is_none());
        assert!(nav.descend(&tree, tree.root(), &mut camera, now).is_none());
        assert_eq!(nav.depth(), 0);
    }

    #[test]
    fn follow_switches_to_sibling() {
        let mut tree = GridTree::with_seed(42);
        let root = tree.root();
        let a = LocalPos::new(0, 2, 3).to_index();
        let b = LocalPos::new(0, 3, 3).to_index();
        // Shell voxels away from the doors are always solid
        let first = tree.split(root, a).unwrap();
        let second = tree.split(root, b).unwrap();

        let mut nav = ScaleNavigator::new(root, Duration::ZERO);
        let mut camera = GridTransform::IDENTITY.child_at(a).position;
        let now = Instant::now();
        nav.descend(&tree, first, &mut camera, now).unwrap();

        // One parent voxel is 16 world units wide at depth 1
        camera.y += 16.0;
        let change = nav.follow(&tree, camera).unwrap();
        assert_eq!(change, DepthChange { depth: 1, active: second });
        assert_relative_eq!(nav.anchor().position.y, 16.0);
        assert_relative_eq!(nav.anchor().scale, 1.0);
        assert!(nav.follow(&tree, camera).is_none());

        // Ascending from the sibling maps back through the sibling's center
        nav.ascend(&tree, &mut camera, now).unwrap();
        let expected = GridTransform::IDENTITY.child_at(b).position;
        assert_relative_eq!(camera.x, expected.x, epsilon = 1e-9);
        assert_relative_eq!(camera.y, expected.y, epsilon = 1e-9);
    }

    #[test]
    fn snapshot_restores_after_collapse() {
        let (mut tree, mut nav, child, now) = setup();
        let mut camera = DVec3::new(0.5, 0.5, 0.5);
        nav.descend(&tree, child, &mut camera, now).unwrap();
        let snapshot = nav.capture(&tree, camera);
        assert_eq!(snapshot.depth, 1);
        assert_eq!(snapshot.active_path.len(), 1);

        let later = now + Duration::from_secs(1);
        nav.ascend(&tree, &mut camera, later).unwrap();
        let index = snapshot.active_path[0];
        assert!(tree.unsplit(tree.root(), index));

        let change = nav.restore(&mut tree, &snapshot, &mut camera).unwrap();
        assert_ne!(change.active, child);
        assert_eq!(change.depth, 1);
        assert_eq!(camera, snapshot.camera);
        assert_eq!(nav.stack(), snapshot.stack.as_slice());
        assert_eq!(tree.path_to(change.active).unwrap(), snapshot.active_path);
    }

    #[test]
    fn inconsistent_snapshot_is_rejected() {
        let (mut tree, mut nav, _, _) = setup();
        let mut camera = DVec3::ZERO;
        let mut snapshot = nav.capture(&tree, camera);
        snapshot.active_path.push(0);
        assert!(nav.restore(&mut tree, &snapshot, &mut camera).is_err());
        assert_eq!(nav.depth(), 0);
    }
}
