//! Collision event types.
//!
//! Lightweight value types emitted around each substep and frame.

use serde::{Deserialize, Serialize};
use weave_types::ClothId;

/// An event tagged with the frame it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// Frame number (0-indexed).
    pub frame: u32,
    /// Event payload.
    pub kind: EventKind,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// A cloth substep is about to collide.
    SubstepBegin {
        cloth: ClothId,
        /// Interpolation factor of the substep within the frame.
        alpha: f32,
    },

    /// The acceleration grid was built.
    GridBuilt {
        cloth: ClothId,
        /// Non-empty point-query words.
        occupied_words: u32,
    },

    /// No particle could reach a capsule; the grid and capsule pass were skipped.
    GridSkipped { cloth: ClothId },

    /// Particles corrected during one substep, per shape family.
    ContactsResolved {
        cloth: ClothId,
        convex: u32,
        triangle: u32,
        capsule: u32,
        virtual_particles: u32,
    },

    /// All substeps of a frame are done.
    FrameCompleted {
        /// Wall-clock time of the frame in milliseconds.
        wall_time_ms: f64,
    },

    /// Custom event for extensibility.
    Custom {
        label: String,
        /// JSON-encoded payload.
        payload: String,
    },
}

impl CollisionEvent {
    pub fn new(frame: u32, kind: EventKind) -> Self {
        Self { frame, kind }
    }

    /// Cloth the event refers to, if any.
    pub fn cloth(&self) -> Option<ClothId> {
        match &self.kind {
            EventKind::SubstepBegin { cloth, .. }
            | EventKind::GridBuilt { cloth, .. }
            | EventKind::GridSkipped { cloth }
            | EventKind::ContactsResolved { cloth, .. } => Some(*cloth),
            EventKind::FrameCompleted { .. } | EventKind::Custom { .. } => None,
        }
    }
}
