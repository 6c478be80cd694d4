//! Collision constants and engine-wide limits.

/// Width of every shape bitmask. Spheres, cones and convex planes per
/// cloth are each capped at this count.
pub const MAX_SHAPES: usize = 32;

/// Number of buckets per axis in the collision grid.
pub const GRID_SIZE: usize = 8;

/// Largest mapped grid coordinate. Kept just below `GRID_SIZE` so that
/// `floor` never yields an out-of-range bucket for the upper bound.
pub const GRID_LENGTH: f32 = GRID_SIZE as f32 - 1.0e-3;

/// Relative inflation applied to the grid extents before bucketing.
pub const GRID_EXPAND: f32 = 1.0e-4;

/// Epsilon for floating-point comparisons and floored denominators.
pub const EPSILON: f32 = f32::EPSILON;

/// Fraction of a shape's radius treated as expanding "skin" during
/// continuous collision. Empirically tuned.
pub const SKIN_WIDTH: f32 = 0.2;

/// Discriminant threshold for continuous collision: `(1 - SKIN_WIDTH)² - 1`.
/// Swept paths whose discriminant falls below this fraction of the
/// closest-approach radius only graze the skin and are not clamped.
pub const SKELETON_WIDTH: f32 = (1.0 - SKIN_WIDTH) * (1.0 - SKIN_WIDTH) - 1.0;

/// Squared-distance penalty factor for particles behind a triangle.
pub const BACK_FACE_PENALTY: f32 = 1.0001;

/// Number of particles processed per parallel task.
pub const PARTICLE_CHUNK: usize = 256;
