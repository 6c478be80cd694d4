//! # weave-types
//!
//! Shared identifiers, error types and collision constants
//! for the weave cloth-collision engine.
//!
//! This crate has zero domain logic. It defines the vocabulary
//! that all other weave crates share.

pub mod constants;
pub mod error;
pub mod ids;

pub use error::{WeaveError, WeaveResult};
pub use ids::{ClothId, ParticleId, SphereId};
