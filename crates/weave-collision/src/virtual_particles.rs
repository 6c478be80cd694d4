//! Virtual particles.
//!
//! A virtual particle is a weighted combination of three real particles,
//! used to sample the cloth surface more densely than its vertices. It
//! is collided against the capsules like a real particle, and the
//! resulting correction is scattered back to its three sources.
//!
//! Entries are grouped into sets in which no two entries share a real
//! particle. Each set is collided in parallel and its scatter writes are
//! then applied; sets follow one another.

use std::collections::HashSet;
use std::ops::Range;

use glam::{Vec3, Vec4};
use rayon::prelude::*;
use weave_types::constants::EPSILON;
use weave_types::{ParticleId, WeaveError, WeaveResult};

use crate::broad::BroadPhase;
use crate::capsule::CapsuleCollider;
use crate::particles::ParticleBuffers;
use crate::response::{friction_impulse, inverse_mass_factor, ResponseAggregator};

/// Three source particles and a row of the weight table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualParticle {
    pub particles: [ParticleId; 3],
    pub weights: u32,
}

/// Scheduled virtual particles of one cloth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualParticles {
    /// Entries ordered set by set.
    entries: Vec<VirtualParticle>,
    sets: Vec<Range<usize>>,
    /// `(w0, w1, w2, 1 / (w0² + w1² + w2²))` per row.
    weights: Vec<Vec4>,
    /// One past the highest referenced particle index.
    particle_span: usize,
}

/// Scatter writes of one colliding virtual particle.
struct Scatter {
    indices: [usize; 3],
    weights: Vec4,
    correction: Vec3,
    impulse: Vec3,
    inverse_mass_change: f32,
}

impl VirtualParticles {
    /// `entries` are `[p0, p1, p2, weight_row]`; `weights` are the
    /// barycentric rows they refer to.
    pub fn new(entries: &[[u32; 4]], weights: &[Vec3]) -> WeaveResult<Self> {
        let weights = weights
            .iter()
            .enumerate()
            .map(|(row, w)| {
                let sqr = w.length_squared();
                if !(sqr > EPSILON) || !sqr.is_finite() {
                    return Err(WeaveError::InvalidShape(format!(
                        "virtual particle weight row {row} has no usable weight"
                    )));
                }
                Ok(w.extend(sqr.recip()))
            })
            .collect::<WeaveResult<Vec<_>>>()?;

        let mut particle_span = 0;
        let mut sets: Vec<(Vec<VirtualParticle>, HashSet<u32>)> = Vec::new();

        for &[p0, p1, p2, row] in entries {
            if row as usize >= weights.len() {
                return Err(WeaveError::InvalidShape(format!(
                    "virtual particle references weight row {row} of {}",
                    weights.len()
                )));
            }
            particle_span = particle_span.max(p0.max(p1).max(p2) as usize + 1);

            let entry = VirtualParticle {
                particles: [ParticleId(p0), ParticleId(p1), ParticleId(p2)],
                weights: row,
            };

            // First set none of the three particles is used in yet.
            let slot = sets
                .iter()
                .position(|(_, used)| [p0, p1, p2].iter().all(|p| !used.contains(p)));
            let (members, used) = match slot {
                Some(i) => &mut sets[i],
                None => {
                    sets.push((Vec::new(), HashSet::new()));
                    let last = sets.len() - 1;
                    &mut sets[last]
                }
            };
            members.push(entry);
            used.extend([p0, p1, p2]);
        }

        let mut ordered = Vec::with_capacity(entries.len());
        let mut ranges = Vec::with_capacity(sets.len());
        for (members, _) in sets {
            let start = ordered.len();
            ordered.extend(members);
            ranges.push(start..ordered.len());
        }

        Ok(Self {
            entries: ordered,
            sets: ranges,
            weights,
            particle_span,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// Entries of each independent set.
    pub fn sets(&self) -> impl Iterator<Item = &[VirtualParticle]> {
        self.sets.iter().map(|r| &self.entries[r.clone()])
    }

    /// Minimum particle count the buffers must have.
    #[inline]
    pub fn particle_span(&self) -> usize {
        self.particle_span
    }

    /// Collides every virtual particle and scatters the responses.
    /// Returns how many virtual particles were in contact.
    pub fn collide<B: BroadPhase>(
        &self,
        particles: &mut ParticleBuffers,
        collider: &CapsuleCollider<'_>,
        broad: &B,
        response: &ResponseAggregator,
    ) -> WeaveResult<usize> {
        if self.particle_span > particles.len() {
            return Err(WeaveError::InvalidBuffer(format!(
                "virtual particles reference {} particles but the buffer holds {}",
                self.particle_span,
                particles.len()
            )));
        }

        let mut contacts = 0;
        for set in self.sets() {
            let scatters: Vec<Scatter> = {
                let (cur, prev) = (particles.current(), particles.previous());
                set.par_iter()
                    .filter_map(|vp| self.respond(vp, cur, prev, collider, broad, response))
                    .collect()
            };
            contacts += scatters.len();

            let (cur, prev) = particles.split_mut();
            for scatter in scatters {
                for (k, &i) in scatter.indices.iter().enumerate() {
                    if cur[i].w <= 0.0 {
                        continue;
                    }
                    let w = scatter.weights[k];
                    let share = w * scatter.weights.w;
                    cur[i] += (scatter.correction * share).extend(0.0);
                    prev[i] -= (scatter.impulse * share).extend(0.0);
                    cur[i].w *= 1.0 + w * scatter.inverse_mass_change;
                }
            }
        }
        Ok(contacts)
    }

    fn respond<B: BroadPhase>(
        &self,
        vp: &VirtualParticle,
        cur: &[Vec4],
        prev: &[Vec4],
        collider: &CapsuleCollider<'_>,
        broad: &B,
        response: &ResponseAggregator,
    ) -> Option<Scatter> {
        let weights = self.weights[vp.weights as usize];
        let indices = vp.particles.map(ParticleId::index);
        let lerp = |buffer: &[Vec4]| {
            buffer[indices[0]].truncate() * weights.x
                + buffer[indices[1]].truncate() * weights.y
                + buffer[indices[2]].truncate() * weights.z
        };

        let pos = lerp(cur);
        let contacts = collider.collide(pos, broad.point_mask(pos));
        if contacts.is_empty() {
            return None;
        }
        let scale = contacts.scale();

        let impulse = if response.friction_scale > 0.0 {
            friction_impulse(
                lerp(prev),
                pos,
                contacts.velocity,
                scale,
                contacts.delta,
                response.friction_scale,
            )
        } else {
            Vec3::ZERO
        };

        // Mass scaling uses the averaged correction here; the change is
        // split by weight so the sources together scale by the full factor.
        let inverse_mass_change = if response.mass_scale > 0.0 {
            inverse_mass_factor((contacts.delta * scale).length_squared(), response.mass_scale)
                - 1.0
        } else {
            0.0
        };

        Some(Scatter {
            indices,
            weights,
            correction: contacts.delta * scale,
            impulse,
            inverse_mass_change,
        })
    }
}
