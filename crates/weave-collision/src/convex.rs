//! Convex narrow phase.
//!
//! A convex body is the intersection of the half-spaces `n·p + d < 0`
//! of the planes selected by its mask. A particle inside a body is
//! pushed out through the least-violated plane.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::mask::ShapeBits;
use crate::response::ImpulseAccumulator;

/// Plane with unit normal. Points with negative distance are inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    #[inline]
    pub fn new(normal: Vec3, offset: f32) -> Self {
        Self { normal, offset }
    }

    /// `xyz` normal and `w` offset.
    #[inline]
    pub fn from_vec4(v: Vec4) -> Self {
        Self::new(v.truncate(), v.w)
    }

    #[inline]
    pub fn signed_distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.offset
    }
}

/// Collides `pos` with every convex body. Each body contributes at most
/// one contact with zero shape velocity.
pub fn collide_convexes(planes: &[Plane], convexes: &[ShapeBits], pos: Vec3) -> ImpulseAccumulator {
    let mut acc = ImpulseAccumulator::default();

    for &mask in convexes {
        let mut remaining = mask.iter();
        let Some(first) = remaining.next() else {
            continue;
        };
        let Some(plane) = planes.get(first) else {
            continue;
        };

        let mut deepest = plane;
        let mut max_distance = plane.signed_distance(pos);

        // Once any plane is non-negative the particle is outside this body.
        while max_distance < 0.0 {
            let Some(plane) = remaining.next().and_then(|i| planes.get(i)) else {
                break;
            };
            let distance = plane.signed_distance(pos);
            if distance > max_distance {
                max_distance = distance;
                deepest = plane;
            }
        }

        if max_distance < 0.0 {
            acc.record(-deepest.normal * max_distance, Vec3::ZERO);
        }
    }
    acc
}
