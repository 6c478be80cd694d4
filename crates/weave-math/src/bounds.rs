//! Axis-aligned extents.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box given by its lower and upper corners.
///
/// An inverted box (any `upper < lower`) is empty. `Bounds3::EMPTY` is the
/// identity for [`Bounds3::union`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds3 {
    pub lower: Vec3,
    pub upper: Vec3,
}

impl Bounds3 {
    /// The empty box: unioning anything with it yields that thing.
    pub const EMPTY: Self = Self {
        lower: Vec3::splat(f32::MAX),
        upper: Vec3::splat(-f32::MAX),
    };

    #[inline]
    pub fn new(lower: Vec3, upper: Vec3) -> Self {
        Self { lower, upper }
    }

    /// Box of a single point.
    #[inline]
    pub fn from_point(p: Vec3) -> Self {
        Self { lower: p, upper: p }
    }

    /// Box of a sphere.
    #[inline]
    pub fn from_sphere(center: Vec3, radius: f32) -> Self {
        Self {
            lower: center - Vec3::splat(radius),
            upper: center + Vec3::splat(radius),
        }
    }

    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    #[inline]
    pub fn intersect(self, other: Self) -> Self {
        Self {
            lower: self.lower.max(other.lower),
            upper: self.upper.min(other.upper),
        }
    }

    /// Per-axis `upper - lower`. Negative components mean the box is empty.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.upper - self.lower
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.extent().min_element() < 0.0
    }

    /// Inflates each corner away from the origin by `factor` of its own magnitude.
    #[inline]
    pub fn inflate_relative(self, factor: f32) -> Self {
        Self {
            lower: self.lower - self.lower.abs() * factor,
            upper: self.upper + self.upper.abs() * factor,
        }
    }

    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.lower).all() && p.cmple(self.upper).all()
    }
}

impl Default for Bounds3 {
    fn default() -> Self {
        Self::EMPTY
    }
}
