//! Broad phase: candidate capsule shapes per particle.

use glam::Vec3;

use crate::capsule::CapsuleFrame;
use crate::grid::SpatialGrid;
use crate::mask::ShapeMask;

/// Produces a superset of the spheres and cones a particle may touch.
pub trait BroadPhase: Sync {
    /// Candidates for a particle at `p`.
    fn point_mask(&self, p: Vec3) -> ShapeMask;

    /// Candidates for a particle moving from `prev` to `cur`.
    fn swept_mask(&self, prev: Vec3, cur: Vec3) -> ShapeMask;

    /// Returns the broad phase strategy name.
    fn name(&self) -> &str;
}

impl BroadPhase for SpatialGrid {
    fn point_mask(&self, p: Vec3) -> ShapeMask {
        SpatialGrid::point_mask(self, p)
    }

    fn swept_mask(&self, prev: Vec3, cur: Vec3) -> ShapeMask {
        SpatialGrid::swept_mask(self, prev, cur)
    }

    fn name(&self) -> &str {
        "spatial_grid"
    }
}

/// Broad phase that culls nothing: every live shape is a candidate.
///
/// Reference for validating [`SpatialGrid`] culling.
pub struct ExhaustiveBroadPhase {
    mask: ShapeMask,
}

impl ExhaustiveBroadPhase {
    pub fn new(frame: &CapsuleFrame) -> Self {
        Self {
            mask: frame.live_mask(),
        }
    }
}

impl BroadPhase for ExhaustiveBroadPhase {
    fn point_mask(&self, _p: Vec3) -> ShapeMask {
        self.mask
    }

    fn swept_mask(&self, _prev: Vec3, _cur: Vec3) -> ShapeMask {
        self.mask
    }

    fn name(&self) -> &str {
        "exhaustive"
    }
}
