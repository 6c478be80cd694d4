//! Collision configuration.

use serde::{Deserialize, Serialize};
use weave_types::{WeaveError, WeaveResult};

/// Per-cloth collision settings.
///
/// These are the only switches the collision pass recognises.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionConfig {
    /// Resolve swept particle paths against moving capsules.
    pub continuous_collision: bool,
    /// Coulomb-style friction coefficient. Zero disables friction.
    pub friction_scale: f32,
    /// Inverse mass is divided by `1 + k·|correction|²`. Zero disables it.
    pub collision_mass_scale: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            continuous_collision: false,
            friction_scale: 0.0,
            collision_mass_scale: 0.0,
        }
    }
}

impl CollisionConfig {
    /// Continuous collision only.
    pub fn continuous() -> Self {
        Self {
            continuous_collision: true,
            ..Default::default()
        }
    }

    /// Continuous collision with friction and mass scaling.
    pub fn high_quality() -> Self {
        Self {
            continuous_collision: true,
            friction_scale: 0.5,
            collision_mass_scale: 0.75,
        }
    }

    pub fn with_friction(mut self, friction_scale: f32) -> Self {
        self.friction_scale = friction_scale;
        self
    }

    pub fn with_mass_scale(mut self, collision_mass_scale: f32) -> Self {
        self.collision_mass_scale = collision_mass_scale;
        self
    }

    #[inline]
    pub fn friction_enabled(&self) -> bool {
        self.friction_scale > 0.0
    }

    #[inline]
    pub fn mass_scale_enabled(&self) -> bool {
        self.collision_mass_scale > 0.0
    }

    /// Whether last substep's capsule shapes must be kept around.
    #[inline]
    pub fn needs_previous_shapes(&self) -> bool {
        self.continuous_collision || self.friction_enabled()
    }

    /// Rejects negative or non-finite scales.
    pub fn validate(&self) -> WeaveResult<()> {
        if !self.friction_scale.is_finite() || self.friction_scale < 0.0 {
            return Err(WeaveError::InvalidConfig(format!(
                "friction_scale must be finite and non-negative, got {}",
                self.friction_scale
            )));
        }
        if !self.collision_mass_scale.is_finite() || self.collision_mass_scale < 0.0 {
            return Err(WeaveError::InvalidConfig(format!(
                "collision_mass_scale must be finite and non-negative, got {}",
                self.collision_mass_scale
            )));
        }
        Ok(())
    }
}
