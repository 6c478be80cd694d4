//! Substep driver: runs every collision phase for one cloth.
//!
//! [`ClothCollider`] owns a cloth's shapes, settings and shape history.
//! The simulation calls [`ClothCollider::begin_frame`] once per frame and
//! [`ClothCollider::collide`] after each substep's integration, passing
//! the fraction of the frame that has elapsed.

use glam::Vec4;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use weave_types::constants::PARTICLE_CHUNK;
use weave_types::{ClothId, WeaveError, WeaveResult};

use crate::broad::BroadPhase;
use crate::capsule::{CapsuleCollider, CapsuleFrame};
use crate::config::CollisionConfig;
use crate::convex::{collide_convexes, Plane};
use crate::grid::SpatialGrid;
use crate::mask::ShapeBits;
use crate::particles::ParticleBuffers;
use crate::response::ResponseAggregator;
use crate::shapes::CollisionShapes;
use crate::triangle::{collide_triangles, Triangle};
use crate::virtual_particles::VirtualParticles;

/// What one substep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionStats {
    /// Particles corrected by convex bodies.
    pub convex_contacts: usize,
    /// Particles corrected by triangles.
    pub triangle_contacts: usize,
    /// Particles corrected by spheres or cones.
    pub capsule_contacts: usize,
    /// Virtual particles corrected by spheres or cones.
    pub virtual_contacts: usize,
    /// Whether the capsule grid was built. `false` means no particle
    /// could reach a sphere and the capsule passes were skipped.
    pub grid_built: bool,
    /// Non-empty point-query words in the grid.
    pub occupied_words: usize,
}

impl CollisionStats {
    pub fn total_contacts(&self) -> usize {
        self.convex_contacts + self.triangle_contacts + self.capsule_contacts + self.virtual_contacts
    }
}

/// Collision state of one cloth.
#[derive(Debug, Clone)]
pub struct ClothCollider {
    id: ClothId,
    config: CollisionConfig,
    shapes: CollisionShapes,
    virtual_particles: VirtualParticles,
    /// Capsules of the last substep, kept while continuous collision or
    /// friction needs them.
    previous_capsules: Option<CapsuleFrame>,
}

impl ClothCollider {
    pub fn new(
        id: ClothId,
        config: CollisionConfig,
        shapes: CollisionShapes,
    ) -> WeaveResult<Self> {
        config.validate()?;
        Ok(Self {
            id,
            config,
            shapes,
            virtual_particles: VirtualParticles::default(),
            previous_capsules: None,
        })
    }

    pub fn with_virtual_particles(mut self, virtual_particles: VirtualParticles) -> Self {
        self.virtual_particles = virtual_particles;
        self
    }

    #[inline]
    pub fn id(&self) -> ClothId {
        self.id
    }

    #[inline]
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: CollisionConfig) -> WeaveResult<()> {
        config.validate()?;
        self.config = config;
        if !config.needs_previous_shapes() {
            self.previous_capsules = None;
        }
        Ok(())
    }

    #[inline]
    pub fn shapes(&self) -> &CollisionShapes {
        &self.shapes
    }

    /// Shape keyframes, for animating between frames.
    #[inline]
    pub fn shapes_mut(&mut self) -> &mut CollisionShapes {
        &mut self.shapes
    }

    #[inline]
    pub fn virtual_particles(&self) -> &VirtualParticles {
        &self.virtual_particles
    }

    /// Starts a frame. The first substep takes its previous shapes from
    /// the start keyframes.
    pub fn begin_frame(&mut self) {
        self.previous_capsules = None;
    }

    /// Resolves collisions for one substep at frame fraction `alpha`.
    ///
    /// Fails only if the particle buffers are too short for the
    /// virtual-particle topology; the buffers are then left untouched.
    pub fn collide(
        &mut self,
        particles: &mut ParticleBuffers,
        alpha: f32,
    ) -> WeaveResult<CollisionStats> {
        let alpha = alpha.clamp(0.0, 1.0);
        let mut stats = CollisionStats::default();

        let span = self.virtual_particles.particle_span();
        if span > particles.len() {
            return Err(WeaveError::InvalidBuffer(format!(
                "cloth {} has virtual particles over {} particles but the buffer holds {}",
                self.id.0,
                span,
                particles.len()
            )));
        }

        let response = ResponseAggregator::new(&self.config);

        if self.config.mass_scale_enabled() {
            particles.restore_inverse_mass();
        }

        if self.shapes.convex_count() > 0 {
            let planes = self.shapes.planes_at(alpha);
            stats.convex_contacts = collide_convex_pass(
                particles,
                &planes,
                self.shapes.convexes(),
                &response.without_mass_scale(),
            );
        }

        if self.shapes.triangle_count() > 0 {
            let triangles = self.shapes.triangles_at(alpha);
            stats.triangle_contacts = collide_triangle_pass(particles, &triangles);
        }

        if self.shapes.sphere_count() == 0 {
            self.previous_capsules = None;
            trace!(cloth = self.id.0, ?stats, "no capsules");
            return Ok(stats);
        }

        let current = self.shapes.capsules_at(alpha);
        let previous = if self.config.needs_previous_shapes() {
            let kept = self.previous_capsules.take().filter(|prev| {
                prev.spheres.len() == current.spheres.len()
                    && prev.cones.len() == current.cones.len()
            });
            Some(kept.unwrap_or_else(|| self.shapes.capsules_at(0.0)))
        } else {
            None
        };

        let continuous = self.config.continuous_collision;
        let particle_bounds = particles.bounds(continuous);
        let grid = SpatialGrid::build(
            particle_bounds,
            &current,
            previous.as_ref().filter(|_| continuous),
        );

        match &grid {
            Some(grid) => {
                stats.grid_built = true;
                stats.occupied_words = grid.occupied_words();

                let collider = CapsuleCollider::new(
                    &current,
                    previous.as_ref(),
                    self.config.friction_enabled(),
                );
                stats.capsule_contacts =
                    collide_capsule_pass(particles, &collider, grid, &response, continuous);

                if !self.virtual_particles.is_empty() {
                    stats.virtual_contacts =
                        self.virtual_particles
                            .collide(particles, &collider, grid, &response)?;
                }
            }
            None => debug!(cloth = self.id.0, alpha, "capsules out of reach, skipping grid"),
        }

        if previous.is_some() {
            self.previous_capsules = Some(current);
        }

        debug!(
            cloth = self.id.0,
            alpha,
            convex = stats.convex_contacts,
            triangle = stats.triangle_contacts,
            capsule = stats.capsule_contacts,
            virtual_particles = stats.virtual_contacts,
            "substep collided"
        );
        Ok(stats)
    }
}

/// Runs `f` over zipped chunks of both buffers in parallel and sums the
/// number of particles it reports as corrected.
fn for_each_particle<F>(particles: &mut ParticleBuffers, f: F) -> usize
where
    F: Fn(&mut Vec4, &mut Vec4) -> bool + Sync,
{
    let (current, previous) = particles.split_mut();
    current
        .par_chunks_mut(PARTICLE_CHUNK)
        .zip(previous.par_chunks_mut(PARTICLE_CHUNK))
        .map(|(cur, prev)| {
            cur.iter_mut()
                .zip(prev.iter_mut())
                .map(|(c, p)| c.w > 0.0 && f(c, p))
                .filter(|&hit| hit)
                .count()
        })
        .sum()
}

fn collide_convex_pass(
    particles: &mut ParticleBuffers,
    planes: &[Plane],
    convexes: &[ShapeBits],
    response: &ResponseAggregator,
) -> usize {
    for_each_particle(particles, |cur, prev| {
        let contacts = collide_convexes(planes, convexes, cur.truncate());
        response.apply(&contacts, cur, prev)
    })
}

fn collide_triangle_pass(particles: &mut ParticleBuffers, triangles: &[Triangle]) -> usize {
    for_each_particle(particles, |cur, _| match collide_triangles(triangles, cur.truncate()) {
        Some(correction) => {
            *cur += correction.extend(0.0);
            true
        }
        None => false,
    })
}

fn collide_capsule_pass<B: BroadPhase>(
    particles: &mut ParticleBuffers,
    collider: &CapsuleCollider<'_>,
    broad: &B,
    response: &ResponseAggregator,
    continuous: bool,
) -> usize {
    for_each_particle(particles, |cur, prev| {
        let mut pos = cur.truncate();
        let contacts = if continuous {
            let prev_pos = prev.truncate();
            let mask = broad.swept_mask(prev_pos, pos);
            collider.collide_continuous(prev_pos, &mut pos, mask)
        } else {
            collider.collide(pos, broad.point_mask(pos))
        };
        if contacts.is_empty() {
            return false;
        }
        *cur = pos.extend(cur.w);
        response.apply(&contacts, cur, prev)
    })
}

/// Collides several independent cloths in parallel, one task per cloth.
pub fn collide_cloths(
    cloths: &mut [(ClothCollider, ParticleBuffers)],
    alpha: f32,
) -> WeaveResult<Vec<CollisionStats>> {
    cloths
        .par_iter_mut()
        .map(|(collider, particles)| collider.collide(particles, alpha))
        .collect()
}
