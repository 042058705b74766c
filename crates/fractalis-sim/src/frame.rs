//! Per-frame input.

use crate::player::{MoveIntent, ViewBasis};

/// Input for one simulation step.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    /// Time since the previous frame in seconds.
    pub dt: f64,
    /// Movement keys held this frame.
    pub intent: MoveIntent,
    /// Camera orientation.
    pub view: ViewBasis,
}

impl FrameInput {
    /// Create an input with no movement.
    pub fn idle(dt: f64) -> Self {
        Self {
            dt,
            ..Default::default()
        }
    }

    /// Set the movement intent.
    #[must_use]
    pub const fn with_intent(mut self, intent: MoveIntent) -> Self {
        self.intent = intent;
        self
    }

    /// Set the camera orientation.
    #[must_use]
    pub const fn with_view(mut self, view: ViewBasis) -> Self {
        self.view = view;
        self
    }
}
