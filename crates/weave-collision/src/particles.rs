//! Particle buffers shared with the calling simulation.

use glam::Vec4;
use serde::{Deserialize, Serialize};
use weave_math::{particle_bounds, Bounds3};
use weave_types::{WeaveError, WeaveResult};

/// Current and previous particle positions.
///
/// Each entry is `xyz` position plus inverse mass in `w`. A particle with
/// `w <= 0` is pinned: collision never moves it. Both buffers always have
/// the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleBuffers {
    current: Vec<Vec4>,
    previous: Vec<Vec4>,
}

impl ParticleBuffers {
    pub fn new(current: Vec<Vec4>, previous: Vec<Vec4>) -> WeaveResult<Self> {
        if current.len() != previous.len() {
            return Err(WeaveError::InvalidBuffer(format!(
                "current has {} particles but previous has {}",
                current.len(),
                previous.len()
            )));
        }
        Ok(Self { current, previous })
    }

    /// Particles at rest: previous positions equal current ones.
    pub fn at_rest(positions: Vec<Vec4>) -> Self {
        Self {
            previous: positions.clone(),
            current: positions,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    #[inline]
    pub fn current(&self) -> &[Vec4] {
        &self.current
    }

    #[inline]
    pub fn previous(&self) -> &[Vec4] {
        &self.previous
    }

    /// Mutable access to both buffers at once.
    #[inline]
    pub fn split_mut(&mut self) -> (&mut [Vec4], &mut [Vec4]) {
        (&mut self.current, &mut self.previous)
    }

    /// Extents of the current positions, unioned with the previous ones
    /// when `include_previous` is set.
    pub fn bounds(&self, include_previous: bool) -> Bounds3 {
        let bounds = particle_bounds(&self.current);
        if include_previous {
            bounds.union(particle_bounds(&self.previous))
        } else {
            bounds
        }
    }

    /// Restores each movable particle's inverse mass from the previous
    /// buffer, undoing last substep's mass scaling.
    pub fn restore_inverse_mass(&mut self) {
        for (cur, prev) in self.current.iter_mut().zip(&self.previous) {
            if cur.w > 0.0 {
                cur.w = prev.w;
            }
        }
    }

    pub fn into_parts(self) -> (Vec<Vec4>, Vec<Vec4>) {
        (self.current, self.previous)
    }
}
