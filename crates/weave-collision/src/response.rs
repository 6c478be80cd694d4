//! Contact response: averaging, friction and mass scaling.
//!
//! Narrow-phase tests only accumulate. A particle touching several
//! shapes sums their corrections and shape velocities, then moves by
//! the average. Both sums are commutative, so the response does not
//! depend on shape iteration order.

use std::ops::{Add, AddAssign};

use glam::{Vec3, Vec4};
use weave_types::constants::EPSILON;

use crate::config::CollisionConfig;

/// Summed contacts of one particle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImpulseAccumulator {
    /// Sum of position corrections.
    pub delta: Vec3,
    /// Sum of contacting shapes' displacements over the substep.
    pub velocity: Vec3,
    /// Number of contacts.
    pub count: u32,
}

impl ImpulseAccumulator {
    #[inline]
    pub fn record(&mut self, delta: Vec3, velocity: Vec3) {
        self.delta += delta;
        self.velocity += velocity;
        self.count += 1;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// `1 / count`, or zero without contacts.
    #[inline]
    pub fn scale(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            1.0 / self.count as f32
        }
    }

    /// The averaged position correction.
    #[inline]
    pub fn average(&self) -> Vec3 {
        self.delta * self.scale()
    }
}

impl Add for ImpulseAccumulator {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            delta: self.delta + rhs.delta,
            velocity: self.velocity + rhs.velocity,
            count: self.count + rhs.count,
        }
    }
}

impl AddAssign for ImpulseAccumulator {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Tangential friction impulse to subtract from the previous position.
///
/// The contact normal is rebuilt from the summed correction `delta`. The
/// relative velocity is the particle's motion minus the averaged shape
/// motion. The impulse opposes the tangential part and never exceeds it.
pub fn friction_impulse(
    prev: Vec3,
    cur: Vec3,
    shape_velocity: Vec3,
    scale: f32,
    delta: Vec3,
    friction_scale: f32,
) -> Vec3 {
    let sqr_delta = delta.length_squared();
    let rcp_delta = (sqr_delta + EPSILON).sqrt().recip();
    let normal = delta * rcp_delta;

    let relative = cur - prev - shape_velocity * scale;
    let tangential = relative - normal * relative.dot(normal);
    let rcp_tangential = (tangential.length_squared() + EPSILON).sqrt().recip();

    let magnitude = (-friction_scale * sqr_delta * rcp_delta * scale * rcp_tangential).max(-1.0);
    tangential * magnitude
}

/// Factor the inverse mass is multiplied by for a correction of
/// squared length `sqr_delta`. Always in `(0, 1]`.
///
/// [`ResponseAggregator::apply`] passes the summed correction `|Σδ|²`.
/// Virtual particles pass the averaged `|Σδ / n|²`, the correction the
/// sample actually moves by before it is scattered to its sources.
#[inline]
pub fn inverse_mass_factor(sqr_delta: f32, mass_scale: f32) -> f32 {
    1.0 / (1.0 + mass_scale * sqr_delta)
}

/// Applies accumulated contacts to a particle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResponseAggregator {
    pub friction_scale: f32,
    pub mass_scale: f32,
}

impl ResponseAggregator {
    pub fn new(config: &CollisionConfig) -> Self {
        Self {
            friction_scale: config.friction_scale,
            mass_scale: config.collision_mass_scale,
        }
    }

    /// Same friction, no mass scaling.
    pub fn without_mass_scale(self) -> Self {
        Self {
            mass_scale: 0.0,
            ..self
        }
    }

    /// Moves `cur` by the averaged correction, applies friction to
    /// `prev` and scales the inverse mass. Returns whether any contact
    /// was applied.
    pub fn apply(&self, contacts: &ImpulseAccumulator, cur: &mut Vec4, prev: &mut Vec4) -> bool {
        if contacts.is_empty() {
            return false;
        }
        let scale = contacts.scale();

        if self.friction_scale > 0.0 {
            let impulse = friction_impulse(
                prev.truncate(),
                cur.truncate(),
                contacts.velocity,
                scale,
                contacts.delta,
                self.friction_scale,
            );
            *prev -= impulse.extend(0.0);
        }

        *cur += (contacts.delta * scale).extend(0.0);

        if self.mass_scale > 0.0 {
            cur.w *= inverse_mass_factor(contacts.delta.length_squared(), self.mass_scale);
        }
        true
    }
}
