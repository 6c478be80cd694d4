//! Group reductions across parallel lanes.
//!
//! Items are split into groups of [`GROUP_SIZE`] lanes. Each group folds
//! its lanes sequentially, then group results are tree-reduced with rayon.
//! The result is independent of the group size as long as `combine` is
//! associative and commutative with `identity` as its neutral element.

use glam::Vec4;
use rayon::prelude::*;

use crate::bounds::Bounds3;

/// Number of lanes folded by a single task before cross-group reduction.
pub const GROUP_SIZE: usize = 32;

/// Reduces `items` to a single value.
///
/// `map` turns one lane into a partial value, `combine` merges partials.
pub fn group_reduce<T, A, M, C>(items: &[T], identity: A, map: M, combine: C) -> A
where
    T: Sync,
    A: Copy + Send + Sync,
    M: Fn(&T) -> A + Sync,
    C: Fn(A, A) -> A + Sync,
{
    items
        .par_chunks(GROUP_SIZE)
        .map(|group| group.iter().fold(identity, |acc, item| combine(acc, map(item))))
        .reduce(|| identity, &combine)
}

/// Extents of the `xyz` part of a particle buffer. Empty input yields
/// [`Bounds3::EMPTY`].
pub fn particle_bounds(positions: &[Vec4]) -> Bounds3 {
    group_reduce(
        positions,
        Bounds3::EMPTY,
        |p| Bounds3::from_point(p.truncate()),
        Bounds3::union,
    )
}
