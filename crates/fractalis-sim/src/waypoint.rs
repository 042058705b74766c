//! Named navigation snapshots.

use fractalis_world::Snapshot;

/// A saved location the player can teleport back to.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub name: String,
    pub snapshot: Snapshot,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, snapshot: Snapshot) -> Self {
        Self {
            name: name.into(),
            snapshot,
        }
    }

    /// Depth the waypoint was saved at
    pub const fn depth(&self) -> u32 {
        self.snapshot.depth
    }
}
