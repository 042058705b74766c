//! Simulation layer for the Fractalis engine.
//!
//! [`SimulationState`] owns the grid tree, the scale navigator and the
//! streaming scheduler, and advances them one frame at a time. Collaborators
//! such as a renderer or audio engine drive it through [`FrameInput`] and the
//! `request_*` methods and react to the drained [`SimEvent`]s.

pub mod collectibles;
pub mod config;
pub mod events;
pub mod frame;
pub mod player;
pub mod state;
pub mod waypoint;

pub use collectibles::{Collectible, Collectibles};
pub use config::{CollectibleConfig, PlayerConfig, SimulationConfig};
pub use events::SimEvent;
pub use frame::FrameInput;
pub use player::{MoveIntent, PlayerState, ViewBasis};
pub use state::{Interaction, SimulationState};
pub use waypoint::Waypoint;
