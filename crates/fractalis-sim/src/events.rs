//! Notifications for presentation-layer collaborators.

use fractalis_core::VoxelIndex;
use fractalis_world::{GridId, WorldEvent};

/// Something a renderer, audio engine or UI may want to react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimEvent {
    /// Grid created, destroyed or rewritten
    Grid(WorldEvent),
    /// The active grid changed, through a transition, teleport or lateral move
    DepthChanged { depth: u32, active: GridId },
    /// A collectible was picked up
    CollectiblePicked {
        grid: GridId,
        index: VoxelIndex,
        total: usize,
    },
    /// A waypoint was saved
    WaypointAdded { name: String, depth: u32 },
}
