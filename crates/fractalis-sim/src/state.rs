//! Frame-driven simulation state.

use std::time::Instant;

use fractalis_core::constants::BLOCK_SIZE;
use fractalis_core::math::Ray;
use fractalis_core::{BlockType, Error, Result, VoxelIndex};
use fractalis_physics::{raycast_grid, CollisionQuery};
use fractalis_world::{
    DepthChange, GridId, GridNode, GridTransform, GridTransforms, GridTree, ScaleNavigator,
    Snapshot, StreamingReport, StreamingScheduler, TerrainGenerator, WorldEvent, WorldSeed,
};
use glam::DVec3;
use tracing::{debug, info, warn};

use crate::collectibles::{Collectible, Collectibles};
use crate::config::SimulationConfig;
use crate::events::SimEvent;
use crate::frame::FrameInput;
use crate::player::PlayerState;
use crate::waypoint::Waypoint;

/// Name of the waypoint registered at startup.
pub const SPAWN_WAYPOINT: &str = "Spawn";

/// Outcome of an interaction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Nothing in reach, or a transition is running
    Missed,
    /// A collectible was picked up
    Collected(Collectible),
    /// The targeted voxel was entered
    Descended(DepthChange),
}

/// Everything the engine core mutates, advanced one frame at a time.
#[derive(Debug)]
pub struct SimulationState {
    config: SimulationConfig,
    seed: WorldSeed,
    tree: GridTree,
    navigator: ScaleNavigator,
    scheduler: StreamingScheduler,
    transforms: GridTransforms,
    player: PlayerState,
    collectibles: Collectibles,
    waypoints: Vec<Waypoint>,
    events: Vec<SimEvent>,
    frame: u64,
    last_report: Option<StreamingReport>,
}

impl SimulationState {
    /// Generate the root grid, place the player at the spawn point and run
    /// the first streaming pass.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(|| fastrand::u64(..10_000));
        info!(seed, "Creating world");

        let tree = GridTree::new(TerrainGenerator::new(config.generator.clone(), seed));
        let root = tree.root();
        let navigator = ScaleNavigator::new(root, config.transition_cooldown);
        let transforms = navigator.transforms(&tree);
        // The root sits at the world origin, so its local space is world space
        let spawn = tree.get(root).map_or(DVec3::ZERO, GridNode::spawn_point);
        info!(x = spawn.x, y = spawn.y, z = spawn.z, "Spawn point");

        let mut state = Self {
            scheduler: StreamingScheduler::new(config.streaming.clone()),
            collectibles: Collectibles::new(config.collectibles.clone()),
            config,
            seed,
            tree,
            navigator,
            transforms,
            player: PlayerState::new(spawn),
            waypoints: Vec::new(),
            events: Vec::new(),
            frame: 0,
            last_report: None,
        };

        state.absorb_tree_events();
        state.add_waypoint(SPAWN_WAYPOINT);
        state.run_streaming();
        Ok(state)
    }

    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    pub const fn tree(&self) -> &GridTree {
        &self.tree
    }

    pub const fn navigator(&self) -> &ScaleNavigator {
        &self.navigator
    }

    pub fn depth(&self) -> u32 {
        self.navigator.depth()
    }

    pub const fn active_grid(&self) -> GridId {
        self.navigator.active()
    }

    pub const fn camera(&self) -> DVec3 {
        self.player.camera
    }

    pub const fn player(&self) -> &PlayerState {
        &self.player
    }

    /// Transform of the root grid's container
    pub const fn world_transform(&self) -> GridTransform {
        self.navigator.world()
    }

    /// World transforms of every grid, anchored at the active grid
    pub const fn transforms(&self) -> &GridTransforms {
        &self.transforms
    }

    pub const fn collectibles(&self) -> &Collectibles {
        &self.collectibles
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Report of the most recent streaming run
    pub const fn last_report(&self) -> Option<StreamingReport> {
        self.last_report
    }

    /// Take all pending notifications.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Returns true if the player's collision cube would overlap a solid voxel.
    pub fn is_blocked(&self, center: DVec3) -> bool {
        self.collision_query().is_blocked(center)
    }

    /// Advance one frame.
    ///
    /// While a transition cooldown runs the tree is locked and the player does
    /// not move; streaming requests made meanwhile run once it ends.
    pub fn tick(&mut self, input: &FrameInput, now: Instant) {
        self.frame += 1;

        if !self.sync_lock(now) {
            self.refresh_transforms();
            let query = CollisionQuery::new(&self.tree, &self.transforms, self.navigator.depth())
                .with_extent(self.config.player.half_extent, self.config.player.seam_margin);
            self.player
                .integrate(input.intent, input.view, input.dt, &self.config.player, |p| query.is_blocked(p));

            if let Some(change) = self.navigator.follow(&self.tree, self.player.camera) {
                self.tree.refresh_visibility(change.active);
                self.events.push(SimEvent::DepthChanged {
                    depth: change.depth,
                    active: change.active,
                });
                self.scheduler.request_run();
            }
        }

        self.run_streaming();
    }

    /// Enter the voxel of the active grid that contains the camera, if it can
    /// be split (walkable decorative space).
    pub fn request_descend(&mut self, now: Instant) -> Option<DepthChange> {
        if self.sync_lock(now) {
            debug!("descend request ignored during transition");
            return None;
        }
        let pos = self.navigator.active_voxel(self.player.camera)?;
        self.descend_into(self.navigator.active(), pos.to_index(), now)
    }

    /// Return to the parent grid.
    pub fn request_ascend(&mut self, now: Instant) -> Option<DepthChange> {
        if self.sync_lock(now) {
            debug!("ascend request ignored during transition");
            return None;
        }
        let change = self
            .navigator
            .ascend(&self.tree, &mut self.player.camera, now)?;
        self.after_transition(change, now);
        Some(change)
    }

    /// Act on whatever a ray from the camera points at: pick up the nearest
    /// collectible, or enter the targeted voxel of the active grid.
    pub fn request_interact(&mut self, origin: DVec3, direction: DVec3, now: Instant) -> Interaction {
        if self.sync_lock(now) {
            return Interaction::Missed;
        }
        let ray = Ray::new(origin, direction);
        if !ray.is_valid() {
            return Interaction::Missed;
        }
        self.refresh_transforms();

        let active = self.navigator.active();
        let anchor = self.navigator.anchor();
        let range = self.config.interact_range * BLOCK_SIZE * anchor.scale;

        let voxel = self
            .tree
            .get(active)
            .and_then(|grid| raycast_grid(grid, anchor, &ray, range));
        let orb = self
            .collectibles
            .pick(&ray, range, &self.tree, &self.transforms, self.navigator.depth());

        match (voxel, orb) {
            (hit, Some((slot, distance))) if hit.map_or(true, |h| distance <= h.distance) => {
                let Some(item) = self.collectibles.collect(slot) else {
                    return Interaction::Missed;
                };
                info!(grid = %item.grid, total = self.collectibles.collected(), "Collected");
                self.events.push(SimEvent::CollectiblePicked {
                    grid: item.grid,
                    index: item.index,
                    total: self.collectibles.collected(),
                });
                Interaction::Collected(item)
            }
            (Some(hit), _) if hit.block.splits() || hit.block.is_hitbox() => self
                .descend_into(active, hit.index, now)
                .map_or(Interaction::Missed, Interaction::Descended),
            _ => Interaction::Missed,
        }
    }

    /// Capture the current navigation state.
    pub fn capture_snapshot(&self) -> Snapshot {
        self.navigator.capture(&self.tree, self.player.camera)
    }

    /// Teleport to a captured state.
    ///
    /// Returns `Ok(None)` when suppressed by a running transition.
    pub fn restore_snapshot(&mut self, snapshot: &Snapshot, now: Instant) -> Result<Option<DepthChange>> {
        if self.sync_lock(now) {
            debug!("teleport ignored during transition");
            return Ok(None);
        }
        let change = self
            .navigator
            .restore(&mut self.tree, snapshot, &mut self.player.camera)
            .inspect_err(|err| warn!(%err, "Teleport failed"))?;
        self.absorb_tree_events();
        self.after_transition(change, now);
        Ok(Some(change))
    }

    /// Save the current location under a name.
    ///
    /// The voxel around the camera is marked with a waypoint block if it is
    /// empty. Returns the waypoint's index.
    pub fn add_waypoint(&mut self, name: impl Into<String>) -> usize {
        let name = name.into();
        let active = self.navigator.active();
        if let Some(pos) = self.navigator.active_voxel(self.player.camera) {
            let empty = self
                .tree
                .get(active)
                .is_some_and(|grid| grid.block_at(pos) == BlockType::Air);
            if empty {
                self.tree.set_block(active, pos.to_index(), BlockType::Waypoint);
                self.absorb_tree_events();
            }
        }

        let snapshot = self.capture_snapshot();
        info!(%name, depth = snapshot.depth, "Waypoint saved");
        self.events.push(SimEvent::WaypointAdded {
            name: name.clone(),
            depth: snapshot.depth,
        });
        self.waypoints.push(Waypoint::new(name, snapshot));
        self.waypoints.len() - 1
    }

    /// Teleport to a saved waypoint.
    pub fn teleport_to_waypoint(&mut self, index: usize, now: Instant) -> Result<Option<DepthChange>> {
        let snapshot = self
            .waypoints
            .get(index)
            .map(|waypoint| waypoint.snapshot.clone())
            .ok_or_else(|| Error::NotFound(format!("waypoint {index}")))?;
        self.restore_snapshot(&snapshot, now)
    }

    /// Lock the tree while a transition runs. Returns true if locked.
    fn sync_lock(&mut self, now: Instant) -> bool {
        let transitioning = self.navigator.is_transitioning(now);
        self.tree.set_locked(transitioning);
        transitioning
    }

    fn descend_into(&mut self, grid: GridId, index: VoxelIndex, now: Instant) -> Option<DepthChange> {
        let node = self.tree.get(grid)?;
        let child = match node.child(index) {
            Some(child) => child,
            None if node.block(index)?.splits() => {
                let child = self.tree.split(grid, index)?;
                self.absorb_tree_events();
                child
            }
            None => return None,
        };

        let change = self
            .navigator
            .descend(&self.tree, child, &mut self.player.camera, now)?;
        self.after_transition(change, now);
        Some(change)
    }

    fn after_transition(&mut self, change: DepthChange, now: Instant) {
        self.player.halt();
        self.sync_lock(now);
        self.tree.refresh_visibility(change.active);
        self.events.push(SimEvent::DepthChanged {
            depth: change.depth,
            active: change.active,
        });
        self.scheduler.request_run();
        self.run_streaming();
    }

    fn run_streaming(&mut self) {
        let view = self.navigator.view();
        if let Some(report) = self.scheduler.update(&mut self.tree, view, self.player.camera) {
            self.last_report = Some(report);
        }
        self.absorb_tree_events();
        self.refresh_transforms();
    }

    fn refresh_transforms(&mut self) {
        let (active, anchor) = (self.navigator.active(), self.navigator.anchor());
        if !self.transforms.is_current(&self.tree, active, anchor) {
            self.transforms = self.navigator.transforms(&self.tree);
        }
    }

    fn collision_query(&self) -> CollisionQuery<'_> {
        CollisionQuery::new(&self.tree, &self.transforms, self.navigator.depth())
            .with_extent(self.config.player.half_extent, self.config.player.seam_margin)
    }

    fn absorb_tree_events(&mut self) {
        for event in self.tree.drain_events() {
            match event {
                WorldEvent::GridCreated { grid, .. } => {
                    if let Some(node) = self.tree.get(grid) {
                        self.collectibles.spawn_for(node);
                    }
                }
                WorldEvent::GridDestroyed { grid } => self.collectibles.remove_grid(grid),
                WorldEvent::BlockChanged { .. } => {}
            }
            self.events.push(SimEvent::Grid(event));
        }
    }
}
