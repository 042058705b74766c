//! Change notifications emitted by the grid tree.

use fractalis_core::{BlockType, VoxelIndex};

use crate::grid::{GridId, ParentLink};

/// A structural or voxel change that collaborators (renderer, gameplay) react to.
///
/// Grid construction is reported once per grid rather than per voxel; readers
/// pull the populated block array from the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorldEvent {
    /// A grid was created and populated
    GridCreated {
        grid: GridId,
        parent: Option<ParentLink>,
        depth: u32,
    },
    /// A grid and its resources were released
    GridDestroyed { grid: GridId },
    /// A single voxel was rewritten after construction
    BlockChanged {
        grid: GridId,
        index: VoxelIndex,
        block: BlockType,
    },
}

impl WorldEvent {
    /// Grid this event concerns
    pub const fn grid(&self) -> GridId {
        match self {
            Self::GridCreated { grid, .. }
            | Self::GridDestroyed { grid }
            | Self::BlockChanged { grid, .. } => *grid,
        }
    }
}
