//! Player movement with axis-separated collision.

use glam::DVec3;

use crate::config::PlayerConfig;

/// Movement keys held during a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl MoveIntent {
    /// Hold forward only
    pub fn forward() -> Self {
        Self {
            forward: true,
            ..Default::default()
        }
    }

    /// Normalized (strafe, vertical, forward) direction
    pub fn direction(&self) -> DVec3 {
        let axis = |pos: bool, neg: bool| f64::from(u8::from(pos)) - f64::from(u8::from(neg));
        DVec3::new(
            axis(self.right, self.left),
            axis(self.up, self.down),
            axis(self.forward, self.backward),
        )
        .normalize_or_zero()
    }

    pub const fn is_idle(&self) -> bool {
        !(self.forward || self.backward || self.left || self.right || self.up || self.down)
    }
}

/// Camera orientation used to turn intent into world motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBasis {
    pub forward: DVec3,
    pub right: DVec3,
}

impl ViewBasis {
    /// Basis looking along `forward` with world up as +Y
    pub fn looking(forward: DVec3) -> Self {
        let forward = forward.normalize_or_zero();
        let right = forward.cross(DVec3::Y).normalize_or_zero();
        Self { forward, right }
    }
}

impl Default for ViewBasis {
    fn default() -> Self {
        Self {
            forward: DVec3::NEG_Z,
            right: DVec3::X,
        }
    }
}

/// Camera position and velocity in world space of the current depth.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerState {
    pub camera: DVec3,
    /// Velocity as (strafe, vertical, forward)
    pub velocity: DVec3,
}

impl PlayerState {
    pub const fn new(camera: DVec3) -> Self {
        Self {
            camera,
            velocity: DVec3::ZERO,
        }
    }

    /// Stop all motion, used after depth transitions.
    pub fn halt(&mut self) {
        self.velocity = DVec3::ZERO;
    }

    /// Advance one frame.
    ///
    /// Each world axis is moved and tested separately; a blocked axis is
    /// reverted so the player slides along walls. Hitting something vertically
    /// also cancels vertical velocity.
    pub fn integrate(
        &mut self,
        intent: MoveIntent,
        view: ViewBasis,
        dt: f64,
        config: &PlayerConfig,
        is_blocked: impl Fn(DVec3) -> bool,
    ) {
        let dt = dt.clamp(0.0, config.max_frame_dt);
        if dt == 0.0 {
            return;
        }

        self.velocity -= self.velocity * (config.friction * dt).min(1.0);
        self.velocity += intent.direction() * config.speed * dt;

        let motion = (view.right * self.velocity.x
            + DVec3::Y * self.velocity.y
            + view.forward * self.velocity.z)
            * dt;

        for axis in 0..3 {
            if motion[axis] == 0.0 {
                continue;
            }
            let previous = self.camera[axis];
            self.camera[axis] += motion[axis];
            if is_blocked(self.camera) {
                self.camera[axis] = previous;
                if axis == 1 {
                    self.velocity.y = 0.0;
                }
            }
        }
    }
}
