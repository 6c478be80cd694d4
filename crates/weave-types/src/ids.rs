//! Strongly-typed identifiers for collision entities.
//!
//! Newtype wrappers keep particle indices, sphere indices and cloth
//! handles from being mixed up.

use serde::{Deserialize, Serialize};

/// Index into the particle arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticleId(pub u32);

/// Index into a cloth's collision sphere array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SphereId(pub u32);

/// Handle of a cloth instance, used to tag telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClothId(pub u32);

impl ParticleId {
    /// Returns the raw index as `usize` for array indexing.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl SphereId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for ParticleId {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<u32> for SphereId {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<u32> for ClothId {
    fn from(val: u32) -> Self {
        Self(val)
    }
}
