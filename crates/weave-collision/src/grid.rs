//! Per-axis bucket grid over the capsule shapes.
//!
//! The overlap of particle and shape extents is mapped onto
//! [`GRID_SIZE`] buckets per axis. For each axis and bucket two masks are
//! painted:
//!
//! - the *lower* mask holds shapes whose minimum lies at or below the bucket,
//! - the *upper* mask holds shapes whose maximum lies at or above it.
//!
//! A point in bucket `b` can only touch shapes in `lower[b] & upper[b]`.
//! A swept segment can only touch shapes in `lower[hi] & upper[lo]`.
//!
//! Every mask word is owned by exactly one painting task, so the grid is
//! built in parallel without locks or atomics.

use glam::Vec3;
use rayon::prelude::*;
use weave_math::Bounds3;
use weave_types::constants::{GRID_EXPAND, GRID_LENGTH, GRID_SIZE};

use crate::capsule::CapsuleFrame;
use crate::mask::{ShapeBits, ShapeMask};

const AXES: usize = 3;
const SIDE_WORDS: usize = AXES * GRID_SIZE;

/// Mask words for both sides: `[lower x, lower y, lower z, upper x, upper y, upper z]`,
/// each `GRID_SIZE` buckets long.
type SideWords = [ShapeBits; 2 * SIDE_WORDS];

/// Mask words of the point query, `[x, y, z]` by bucket.
type OverlapWords = [ShapeBits; SIDE_WORDS];

#[inline]
fn lower_word(axis: usize, bucket: usize) -> usize {
    axis * GRID_SIZE + bucket
}

#[inline]
fn upper_word(axis: usize, bucket: usize) -> usize {
    SIDE_WORDS + axis * GRID_SIZE + bucket
}

/// First bucket a shape's mapped minimum reaches.
#[inline]
fn first_bucket(mapped_min: f32) -> i32 {
    mapped_min.max(0.0).floor() as i32
}

/// Last bucket a shape's mapped maximum reaches.
#[inline]
fn last_bucket(mapped_max: f32) -> i32 {
    mapped_max.min(GRID_LENGTH).floor() as i32
}

/// Bucket containing an already clamped grid coordinate, or `None`
/// outside the grid.
#[inline]
fn bucket(mapped: f32) -> Option<usize> {
    (mapped >= 0.0 && mapped < GRID_SIZE as f32).then(|| mapped as usize)
}

/// Collision grid of one substep.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialGrid {
    scale: Vec3,
    bias: Vec3,
    spheres: SideWords,
    cones: SideWords,
    sphere_overlap: OverlapWords,
    cone_overlap: OverlapWords,
}

impl SpatialGrid {
    /// Builds the grid, or returns `None` when no particle can reach any
    /// sphere this substep.
    ///
    /// `previous` adds last substep's shapes for swept queries; the
    /// caller widens `particle_bounds` accordingly.
    pub fn build(
        particle_bounds: Bounds3,
        current: &CapsuleFrame,
        previous: Option<&CapsuleFrame>,
    ) -> Option<Self> {
        let mut shape_bounds = current.bounds();
        if let Some(prev) = previous {
            shape_bounds = shape_bounds.union(prev.bounds());
        }

        let bounds = particle_bounds.intersect(shape_bounds);
        if bounds.is_empty() {
            return None;
        }

        let bounds = bounds.inflate_relative(GRID_EXPAND);
        let edge = bounds.extent().max(Vec3::splat(f32::EPSILON));
        let scale = Vec3::splat(GRID_LENGTH) / edge;
        let bias = -bounds.lower * scale;

        let frames: Vec<&CapsuleFrame> = std::iter::once(current).chain(previous).collect();
        let spheres = paint_spheres(&frames, scale, bias);
        let cones = paint_cones(current, &spheres);

        let live = current.live_mask();
        let sphere_overlap = merge(&spheres, live.spheres);
        let cone_overlap = merge(&cones, live.cones);

        Some(Self {
            scale,
            bias,
            spheres,
            cones,
            sphere_overlap,
            cone_overlap,
        })
    }

    /// Maps a world position into grid coordinates.
    #[inline]
    pub fn map(&self, p: Vec3) -> Vec3 {
        p * self.scale + self.bias
    }

    /// Candidate shapes for a point.
    pub fn point_mask(&self, p: Vec3) -> ShapeMask {
        let mapped = self.map(p);
        let mut mask = ShapeMask::ALL;
        for axis in 0..AXES {
            let Some(b) = bucket(mapped[axis]) else {
                return ShapeMask::EMPTY;
            };
            let word = lower_word(axis, b);
            mask &= ShapeMask::new(self.sphere_overlap[word], self.cone_overlap[word]);
        }
        mask
    }

    /// Candidate shapes for the segment `prev → cur`.
    pub fn swept_mask(&self, prev: Vec3, cur: Vec3) -> ShapeMask {
        let a = self.map(prev);
        let b = self.map(cur);
        let mut mask = ShapeMask::ALL;
        for axis in 0..AXES {
            let hi = a[axis].max(b[axis]).min(GRID_LENGTH);
            let lo = a[axis].min(b[axis]).max(0.0);
            let (Some(hi), Some(lo)) = (bucket(hi), bucket(lo)) else {
                return ShapeMask::EMPTY;
            };
            let near = upper_word(axis, lo);
            let far = lower_word(axis, hi);
            mask &= ShapeMask::new(
                self.spheres[far] & self.spheres[near],
                self.cones[far] & self.cones[near],
            );
        }
        mask
    }

    /// Number of non-empty point-query words.
    pub fn occupied_words(&self) -> usize {
        self.sphere_overlap
            .iter()
            .chain(&self.cone_overlap)
            .filter(|w| !w.is_empty())
            .count()
    }
}

fn paint_spheres(frames: &[&CapsuleFrame], scale: Vec3, bias: Vec3) -> SideWords {
    let mut words = [ShapeBits::EMPTY; 2 * SIDE_WORDS];
    words.par_iter_mut().enumerate().for_each(|(k, word)| {
        let upper = k >= SIDE_WORDS;
        let axis = (k % SIDE_WORDS) / GRID_SIZE;
        let b = (k % GRID_SIZE) as i32;
        for frame in frames {
            for (i, sphere) in frame.spheres.iter().enumerate() {
                let center = sphere.center[axis] * scale[axis] + bias[axis];
                let radius = sphere.radius * scale[axis];
                let covered = if upper {
                    b <= last_bucket(center + radius)
                } else {
                    first_bucket(center - radius) <= b
                };
                if covered {
                    *word |= ShapeBits::bit(i);
                }
            }
        }
    });
    words
}

/// A cone reaches a bucket whenever either end sphere does.
fn paint_cones(frame: &CapsuleFrame, spheres: &SideWords) -> SideWords {
    let mut words = [ShapeBits::EMPTY; 2 * SIDE_WORDS];
    words.par_iter_mut().enumerate().for_each(|(k, word)| {
        for (j, cone) in frame.cones.iter().enumerate() {
            if !cone.is_degenerate() && !(spheres[k] & cone.both_mask).is_empty() {
                *word |= ShapeBits::bit(j);
            }
        }
    });
    words
}

fn merge(words: &SideWords, live: ShapeBits) -> OverlapWords {
    let mut overlap = [ShapeBits::EMPTY; SIDE_WORDS];
    overlap.par_iter_mut().enumerate().for_each(|(k, word)| {
        *word = words[k] & words[SIDE_WORDS + k] & live;
    });
    overlap
}
