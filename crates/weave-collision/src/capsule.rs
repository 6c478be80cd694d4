//! Capsule narrow phase.
//!
//! A capsule chain is a set of spheres plus cones joining sphere pairs.
//! Each cone is the tapered cylinder tangent to its two end spheres.
//! Together they form the swept-sphere hull used for limbs and bones.
//!
//! Particles are tested against the cones first. A particle inside a
//! cone's section cannot also need its end spheres, so those are culled
//! from the candidate set; beyond an end cap the end sphere is still
//! tested.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};
use weave_math::Bounds3;
use weave_types::constants::{EPSILON, SKELETON_WIDTH};
use weave_types::SphereId;

use crate::mask::{ShapeBits, ShapeMask};
use crate::response::ImpulseAccumulator;

/// Collision sphere at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    #[inline]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// `xyz` center and `w` radius.
    #[inline]
    pub fn from_vec4(v: Vec4) -> Self {
        Self::new(v.truncate(), v.w)
    }

    #[inline]
    pub fn bounds(&self) -> Bounds3 {
        Bounds3::from_sphere(self.center, self.radius)
    }
}

/// Tapered cylinder tangent to two spheres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cone {
    /// Midpoint of the two sphere centers.
    pub center: Vec3,
    /// Radius at `center`, perpendicular to the axis.
    pub radius: f32,
    /// Unit axis from the first towards the second sphere.
    pub axis: Vec3,
    /// Radius change per unit of axial distance.
    pub slope: f32,
    /// Squared cosine of the half-angle.
    pub sqr_cosine: f32,
    /// Half the distance between the sphere centers.
    pub half_length: f32,
    pub first: usize,
    pub second: usize,
    pub first_mask: ShapeBits,
    pub both_mask: ShapeBits,
}

impl Cone {
    /// Cone joining `spheres[first]` and `spheres[second]`.
    ///
    /// When one sphere contains the other the cone does not exist and
    /// every derived quantity collapses to zero.
    pub fn between(spheres: &[Sphere], first: usize, second: usize) -> Self {
        let s0 = spheres[first];
        let s1 = spheres[second];

        let half_axis = (s1.center - s0.center) * 0.5;
        let half_dr = (s1.radius - s0.radius) * 0.5;

        let sqr_axis_length = half_axis.length_squared();
        let sqr_cone_length = sqr_axis_length - half_dr * half_dr;

        let (inv_axis_length, inv_cone_length) = if sqr_cone_length > 0.0 {
            (
                sqr_axis_length.sqrt().recip(),
                sqr_cone_length.sqrt().recip(),
            )
        } else {
            (0.0, 0.0)
        };

        let half_length = sqr_axis_length * inv_axis_length;
        let mid_radius = (s0.radius + s1.radius) * 0.5;
        let sine = half_dr * inv_axis_length;
        let first_mask = ShapeBits::bit(first);

        Self {
            center: (s0.center + s1.center) * 0.5,
            radius: mid_radius * inv_cone_length * half_length,
            axis: half_axis * inv_axis_length,
            slope: half_dr * inv_cone_length,
            sqr_cosine: 1.0 - sine * sine,
            half_length,
            first,
            second,
            first_mask,
            both_mask: first_mask | ShapeBits::bit(second),
        }
    }

    #[inline]
    pub fn second_mask(&self) -> ShapeBits {
        self.both_mask ^ self.first_mask
    }

    /// Zero-radius cones never collide and are left out of the grid.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.radius <= 0.0
    }
}

/// Spheres and cones of a capsule chain at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapsuleFrame {
    pub spheres: Vec<Sphere>,
    pub cones: Vec<Cone>,
}

impl CapsuleFrame {
    pub fn new(spheres: Vec<Sphere>, capsules: &[[SphereId; 2]]) -> Self {
        let cones = capsules
            .iter()
            .map(|[a, b]| Cone::between(&spheres, a.index(), b.index()))
            .collect();
        Self { spheres, cones }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    /// Union of all sphere extents. Cones lie inside it.
    pub fn bounds(&self) -> Bounds3 {
        self.spheres
            .iter()
            .fold(Bounds3::EMPTY, |acc, s| acc.union(s.bounds()))
    }

    /// Every live sphere and non-degenerate cone.
    pub fn live_mask(&self) -> ShapeMask {
        ShapeMask::new(
            ShapeBits::low(self.spheres.len()),
            self.cones
                .iter()
                .enumerate()
                .filter(|(_, c)| !c.is_degenerate())
                .map(|(j, _)| j)
                .collect(),
        )
    }
}

/// Earliest entry of a particle path into an interpolated shape.
///
/// Inputs are the dot products of the particle's radial offsets at the
/// previous (`p`) and current (`c`) substep states, each reduced by the
/// product of the matching radii: `pp = |p|² - rp²`, `pc = p·c - rp·rc`,
/// `cc = |c|² - rc²`. The implicit distance along the path is then a
/// quadratic in time whose smallest root is the time of impact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeOfImpact {
    /// Fraction of the substep at which the particle enters the shape.
    /// Zero if it already started inside.
    pub toi: f32,
    sqrt_discriminant: f32,
    minus_a: f32,
}

impl TimeOfImpact {
    pub fn solve(
        dot_prev_prev: f32,
        dot_prev_cur: f32,
        dot_cur_cur: f32,
        prev_radius: f32,
        cur_radius: f32,
    ) -> Option<Self> {
        let discriminant = dot_prev_cur * dot_prev_cur - dot_cur_cur * dot_prev_prev;
        if !(discriminant >= 0.0) {
            return None;
        }
        let sqrt_discriminant = discriminant.sqrt();
        let half_b = dot_prev_cur - dot_prev_prev;
        let minus_a = dot_prev_cur - dot_cur_cur + half_b;

        // One state contains the other; discrete collision handles it.
        if minus_a >= -EPSILON {
            return None;
        }

        let toi = (half_b + sqrt_discriminant).min(0.0) / minus_a;
        if !(toi < 1.0 && half_b < sqrt_discriminant) {
            return None;
        }

        // Paths that only graze the expanding skin are left to the discrete test.
        let min_radius = prev_radius + half_b * minus_a * (cur_radius - prev_radius);
        if !(discriminant > minus_a * min_radius * min_radius * SKELETON_WIDTH) {
            return None;
        }

        Some(Self {
            toi,
            sqrt_discriminant,
            minus_a,
        })
    }

    /// Share of the path from the impact point to the current position
    /// that gets undone. Shrinks below `1 - toi` the longer the path
    /// stays inside the skin.
    #[inline]
    pub fn rewind_fraction(&self) -> f32 {
        let one_minus_toi = 1.0 - self.toi;
        let minus_k = if one_minus_toi > EPSILON {
            self.sqrt_discriminant / (self.minus_a * one_minus_toi)
        } else {
            0.0
        };
        one_minus_toi / (1.0 - minus_k)
    }
}

#[inline]
fn rsqrt_or_zero(x: f32) -> f32 {
    if x > 0.0 {
        x.sqrt().recip()
    } else {
        0.0
    }
}

/// Collides particles with one cloth's capsule chain.
///
/// `previous` holds last substep's shapes. It is required for continuous
/// collision and provides shape velocities for friction.
#[derive(Debug, Clone, Copy)]
pub struct CapsuleCollider<'a> {
    current: &'a CapsuleFrame,
    previous: Option<&'a CapsuleFrame>,
    track_velocity: bool,
}

impl<'a> CapsuleCollider<'a> {
    pub fn new(
        current: &'a CapsuleFrame,
        previous: Option<&'a CapsuleFrame>,
        track_velocity: bool,
    ) -> Self {
        Self {
            current,
            previous,
            track_velocity,
        }
    }

    #[inline]
    pub fn current(&self) -> &CapsuleFrame {
        self.current
    }

    fn sphere_velocity(&self, i: usize) -> Vec3 {
        match self.previous {
            Some(prev) if self.track_velocity => {
                match (self.current.spheres.get(i), prev.spheres.get(i)) {
                    (Some(cur), Some(prev)) => cur.center - prev.center,
                    _ => Vec3::ZERO,
                }
            }
            _ => Vec3::ZERO,
        }
    }

    /// Surface velocity at axial offset `dot` from the cone center.
    fn cone_velocity(&self, cone: &Cone, dot: f32) -> Vec3 {
        if !self.track_velocity || self.previous.is_none() {
            return Vec3::ZERO;
        }
        let v0 = self.sphere_velocity(cone.first);
        let v1 = self.sphere_velocity(cone.second);
        let t = (dot / cone.half_length * 0.5 + 0.5).clamp(0.0, 1.0);
        v0.lerp(v1, t)
    }

    fn collide_sphere(&self, i: usize, radius: f32, offset: Vec3, acc: &mut ImpulseAccumulator) {
        let sqr_distance = EPSILON + offset.length_squared();
        let ratio = radius / sqr_distance.sqrt();
        if ratio > 1.0 {
            acc.record(offset * (ratio - 1.0), self.sphere_velocity(i));
        }
    }

    /// Discrete test of `pos` against the candidate shapes in `mask`.
    pub fn collide(&self, pos: Vec3, mask: ShapeMask) -> ImpulseAccumulator {
        let mut acc = ImpulseAccumulator::default();
        let mut spheres = mask.spheres;

        for j in mask.cones {
            let Some(cone) = self.current.cones.get(j) else {
                break;
            };
            if cone.is_degenerate() {
                continue;
            }

            let offset = pos - cone.center;
            let dot = offset.dot(cone.axis);
            let radius = (dot * cone.slope + cone.radius).max(0.0);
            let sqr_distance = offset.length_squared() - dot * dot;

            if sqr_distance > radius * radius {
                // Outside the infinite cone, so outside both end spheres too.
                spheres &= !cone.both_mask;
                continue;
            }

            let sqr_distance = sqr_distance.max(EPSILON);
            let inv_distance = sqr_distance.sqrt().recip();
            let base = dot + cone.slope * sqr_distance * inv_distance;

            let left = base < -cone.half_length;
            let right = base > cone.half_length;
            if !left {
                spheres &= !cone.first_mask;
            }
            if !right {
                spheres &= !cone.second_mask();
            }
            if left || right {
                continue;
            }

            let scale = radius * inv_distance * cone.sqr_cosine - cone.sqr_cosine;
            acc.record(
                (offset - cone.axis * base) * scale,
                self.cone_velocity(cone, dot),
            );
        }

        for i in spheres {
            let Some(sphere) = self.current.spheres.get(i) else {
                break;
            };
            self.collide_sphere(i, sphere.radius, pos - sphere.center, &mut acc);
        }
        acc
    }

    /// Swept test of the path `prev_pos → cur_pos` against the candidate
    /// shapes in `mask`.
    ///
    /// On an impact `cur_pos` is pulled back along the path before the
    /// discrete test runs at the corrected position. Without previous
    /// shapes this is the discrete test.
    pub fn collide_continuous(
        &self,
        prev_pos: Vec3,
        cur_pos: &mut Vec3,
        mask: ShapeMask,
    ) -> ImpulseAccumulator {
        let Some(previous) = self.previous else {
            return self.collide(*cur_pos, mask);
        };

        let mut acc = ImpulseAccumulator::default();
        let mut spheres = mask.spheres;

        for j in mask.cones {
            let (Some(cur), Some(prev)) = (self.current.cones.get(j), previous.cones.get(j)) else {
                break;
            };
            if cur.is_degenerate() {
                continue;
            }

            let prev_offset = prev_pos - prev.center;
            let prev_cross = prev_offset.cross(prev.axis);
            let prev_dot = prev_offset.dot(prev.axis);
            let prev_radius = (prev_dot * prev.slope + prev.radius).max(0.0);

            let mut cur_offset = *cur_pos - cur.center;
            let cur_cross = cur_offset.cross(cur.axis);
            let mut cur_dot = cur_offset.dot(cur.axis);
            let mut cur_radius = (cur_dot * cur.slope + cur.radius).max(0.0);
            let mut cur_sqr_distance = EPSILON + cur_cross.length_squared();

            let impact = TimeOfImpact::solve(
                prev_cross.length_squared() - prev_radius * prev_radius,
                prev_cross.dot(cur_cross) - prev_radius * cur_radius,
                cur_sqr_distance - cur_radius * cur_radius,
                prev_radius,
                cur_radius,
            );

            if let Some(impact) = impact {
                let toi = impact.toi;
                let path = prev_offset - cur_offset;
                let pos = prev_offset - path * toi;

                // Cone axis and slope at the time of impact.
                let cur_scaled_axis = cur.axis * cur.half_length;
                let delta_scaled_axis = cur_scaled_axis - prev.axis * prev.half_length;
                let one_minus_toi = 1.0 - toi;
                let axis = cur_scaled_axis - delta_scaled_axis * one_minus_toi;
                let slope = prev.slope * one_minus_toi + cur.slope * toi;

                let inv_half_length = rsqrt_or_zero(axis.length_squared());
                let dot = pos.dot(axis) * inv_half_length;
                let sqr_distance = pos.length_squared() - dot * dot;
                let inv_distance = rsqrt_or_zero(sqr_distance);
                let base = dot + slope * sqr_distance * inv_distance;
                let scale = base * inv_half_length;

                // Impact within the cone section rather than on an end sphere.
                if scale.abs() < 1.0 {
                    let path = path + delta_scaled_axis * scale;
                    cur_offset += path * impact.rewind_fraction();

                    cur_dot = cur_offset.dot(cur.axis);
                    cur_radius = (cur_dot * cur.slope + cur.radius).max(0.0);
                    cur_sqr_distance = cur_offset.length_squared() - cur_dot * cur_dot;

                    *cur_pos = cur.center + cur_offset;
                }
            }

            let has_contact = cur_radius * cur_radius > cur_sqr_distance;
            if !has_contact {
                if impact.is_none() {
                    spheres &= !cur.both_mask;
                }
                continue;
            }

            let inv_distance = rsqrt_or_zero(cur_sqr_distance);
            let base = cur_dot + cur.slope * cur_sqr_distance * inv_distance;

            let left = base < -cur.half_length;
            let right = base > cur.half_length;
            if !left {
                spheres &= !cur.first_mask;
            }
            if !right {
                spheres &= !cur.second_mask();
            }
            if left || right {
                continue;
            }

            let scale = cur_radius * inv_distance * cur.sqr_cosine - cur.sqr_cosine;
            acc.record(
                (cur_offset - cur.axis * base) * scale,
                self.cone_velocity(cur, cur_dot),
            );
        }

        for i in spheres {
            let (Some(&cur), Some(&prev)) = (self.current.spheres.get(i), previous.spheres.get(i)) else {
                break;
            };

            let prev_offset = prev_pos - prev.center;
            let mut cur_offset = *cur_pos - cur.center;
            let sqr_distance = EPSILON + cur_offset.length_squared();

            let impact = TimeOfImpact::solve(
                prev_offset.length_squared() - prev.radius * prev.radius,
                prev_offset.dot(cur_offset) - prev.radius * cur.radius,
                sqr_distance - cur.radius * cur.radius,
                prev.radius,
                cur.radius,
            );

            if let Some(impact) = impact {
                cur_offset += (prev_offset - cur_offset) * impact.rewind_fraction();
                *cur_pos = cur.center + cur_offset;
            }

            self.collide_sphere(i, cur.radius, cur_offset, &mut acc);
        }
        acc
    }
}
