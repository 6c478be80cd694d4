//! # weave-math
//!
//! Math primitives for the weave collision engine.
//!
//! Provides:
//! - Re-exports of `glam` types (`Vec3`, `Vec4`)
//! - Axis-aligned extents (`Bounds3`) used to size the collision grid
//! - A generic group reduction over particle lanes

pub mod bounds;
pub mod reduction;

pub use bounds::Bounds3;
pub use reduction::{group_reduce, particle_bounds, GROUP_SIZE};

// Re-export glam types as the canonical math types for weave.
pub use glam::{Vec3, Vec4};
