//! Fixed-width shape bitsets.
//!
//! Every shape family (spheres, cones, convex planes) is addressed by a
//! 32-bit mask, which caps each family at [`MAX_SHAPES`] entries. All
//! mask arithmetic in the crate assumes this width.

use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, Not};

use serde::{Deserialize, Serialize};
use weave_types::constants::MAX_SHAPES;

/// Set of shape indices in `0..MAX_SHAPES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeBits(pub u32);

impl ShapeBits {
    pub const EMPTY: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);

    /// Singleton set. Indices at or beyond `MAX_SHAPES` yield the empty set.
    #[inline]
    pub fn bit(index: usize) -> Self {
        Self(1u32.checked_shl(index as u32).unwrap_or(0))
    }

    /// The first `count` indices.
    #[inline]
    pub fn low(count: usize) -> Self {
        if count >= MAX_SHAPES {
            Self::ALL
        } else {
            Self((1u32 << count) - 1)
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn contains(self, index: usize) -> bool {
        !(self & Self::bit(index)).is_empty()
    }

    #[inline]
    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates set indices in ascending order.
    #[inline]
    pub fn iter(self) -> ShapeBitsIter {
        ShapeBitsIter(self.0)
    }
}

/// Ascending iterator over the indices of a [`ShapeBits`].
#[derive(Debug, Clone)]
pub struct ShapeBitsIter(u32);

impl Iterator for ShapeBitsIter {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let index = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for ShapeBitsIter {}

impl IntoIterator for ShapeBits {
    type Item = usize;
    type IntoIter = ShapeBitsIter;

    fn into_iter(self) -> ShapeBitsIter {
        self.iter()
    }
}

impl FromIterator<usize> for ShapeBits {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, |acc, i| acc | Self::bit(i))
    }
}

impl BitAnd for ShapeBits {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for ShapeBits {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitXor for ShapeBits {
    type Output = Self;
    #[inline]
    fn bitxor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl Not for ShapeBits {
    type Output = Self;
    #[inline]
    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl BitAndAssign for ShapeBits {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl BitOrAssign for ShapeBits {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Candidate shapes for one particle: spheres and cones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShapeMask {
    pub spheres: ShapeBits,
    pub cones: ShapeBits,
}

impl ShapeMask {
    pub const EMPTY: Self = Self {
        spheres: ShapeBits::EMPTY,
        cones: ShapeBits::EMPTY,
    };

    pub const ALL: Self = Self {
        spheres: ShapeBits::ALL,
        cones: ShapeBits::ALL,
    };

    #[inline]
    pub fn new(spheres: ShapeBits, cones: ShapeBits) -> Self {
        Self { spheres, cones }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty() && self.cones.is_empty()
    }
}

impl BitAnd for ShapeMask {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self {
            spheres: self.spheres & rhs.spheres,
            cones: self.cones & rhs.cones,
        }
    }
}

impl BitAndAssign for ShapeMask {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        *self = *self & rhs;
    }
}
