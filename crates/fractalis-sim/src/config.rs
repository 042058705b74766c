//! Simulation configuration.

use std::time::Duration;

use fractalis_core::{Error, Result};
use fractalis_physics::collision::{PLAYER_HALF_EXTENT, SEAM_MARGIN};
use fractalis_world::{GeneratorConfig, ScaleNavigator, StreamingConfig, WorldSeed};

/// Player movement tuning.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Acceleration applied while a direction is held, in units per second squared.
    pub speed: f64,
    /// Velocity damping per second.
    pub friction: f64,
    /// Frame time is clamped to this many seconds.
    pub max_frame_dt: f64,
    /// Half the edge length of the collision cube.
    pub half_extent: f64,
    /// Shrink of the collision cube for sliding along seams.
    pub seam_margin: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: 60.0,
            friction: 6.0,
            max_frame_dt: 0.05,
            half_extent: PLAYER_HALF_EXTENT,
            seam_margin: SEAM_MARGIN,
        }
    }
}

/// Collectible spawning.
#[derive(Debug, Clone)]
pub struct CollectibleConfig {
    /// Maximum collectibles per grid.
    pub per_grid: usize,
    /// Random placement attempts per grid.
    pub max_attempts: usize,
    /// Pickup radius in voxels of the owning grid.
    pub radius: f64,
}

impl Default for CollectibleConfig {
    fn default() -> Self {
        Self {
            per_grid: 12,
            max_attempts: 2000,
            radius: 0.45,
        }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// World seed, or `None` to pick one at startup.
    pub seed: Option<WorldSeed>,
    pub generator: GeneratorConfig,
    pub streaming: StreamingConfig,
    pub player: PlayerConfig,
    pub collectibles: CollectibleConfig,
    /// Transitions are refused for this long after a descend.
    pub transition_cooldown: Duration,
    /// Reach of interaction rays, in voxels of the active grid.
    pub interact_range: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            generator: GeneratorConfig::default(),
            streaming: StreamingConfig::default(),
            player: PlayerConfig::default(),
            collectibles: CollectibleConfig::default(),
            transition_cooldown: ScaleNavigator::DEFAULT_COOLDOWN,
            interact_range: 6.0,
        }
    }
}

impl SimulationConfig {
    /// Use a fixed world seed.
    #[must_use]
    pub fn with_seed(mut self, seed: WorldSeed) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the streaming step budget.
    #[must_use]
    pub fn with_step_budget(mut self, budget: usize) -> Self {
        self.streaming.step_budget = budget;
        self
    }

    /// Set the transition cooldown.
    #[must_use]
    pub fn with_transition_cooldown(mut self, cooldown: Duration) -> Self {
        self.transition_cooldown = cooldown;
        self
    }

    /// Disable collectible spawning.
    #[must_use]
    pub fn without_collectibles(mut self) -> Self {
        self.collectibles.per_grid = 0;
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("generator.base_frequency", self.generator.base_frequency),
            ("streaming.base_distance", self.streaming.base_distance),
            ("player.max_frame_dt", self.player.max_frame_dt),
            ("interact_range", self.interact_range),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig(format!("{name} must be positive, got {value}")));
            }
        }
        if self.streaming.step_budget == 0 {
            return Err(Error::InvalidConfig("streaming.step_budget must be at least 1".into()));
        }
        if self.player.seam_margin >= self.player.half_extent {
            return Err(Error::InvalidConfig(format!(
                "player.seam_margin ({}) must be smaller than player.half_extent ({})",
                self.player.seam_margin, self.player.half_extent
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let config = SimulationConfig::default().with_step_budget(0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = SimulationConfig::default();
        config.interact_range = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.player.seam_margin = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_sets_fields() {
        let config = SimulationConfig::default()
            .with_seed(42)
            .with_transition_cooldown(Duration::ZERO)
            .without_collectibles();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.transition_cooldown, Duration::ZERO);
        assert_eq!(config.collectibles.per_grid, 0);
    }
}
