//! # weave-collision
//!
//! Per-substep collision resolution for cloth particles.
//!
//! One substep runs these phases in order:
//! 1. **Interpolation**: keyframed shapes are blended to the substep time
//! 2. **Convexes and triangles**: resolved directly, without acceleration
//! 3. **Grid build**: spheres and cones are bucketed along each axis
//! 4. **Broad phase**: each particle looks up its candidate shape mask
//! 5. **Capsule narrow phase**: discrete or continuous sphere/cone tests
//! 6. **Response**: averaged correction, friction and mass scaling
//! 7. **Virtual particles**: the capsule pass repeated on weighted samples
//!
//! Particles are processed in parallel chunks with rayon. Independent
//! cloths can be processed concurrently with [`collide_cloths`].

pub mod broad;
pub mod capsule;
pub mod config;
pub mod convex;
pub mod grid;
pub mod interpolate;
pub mod mask;
pub mod particles;
pub mod pipeline;
pub mod response;
pub mod shapes;
pub mod triangle;
pub mod virtual_particles;

pub use broad::{BroadPhase, ExhaustiveBroadPhase};
pub use capsule::{CapsuleCollider, CapsuleFrame, Cone, Sphere, TimeOfImpact};
pub use config::CollisionConfig;
pub use convex::Plane;
pub use grid::SpatialGrid;
pub use mask::{ShapeBits, ShapeMask};
pub use particles::ParticleBuffers;
pub use pipeline::{collide_cloths, ClothCollider, CollisionStats};
pub use response::{ImpulseAccumulator, ResponseAggregator};
pub use shapes::CollisionShapes;
pub use triangle::Triangle;
pub use virtual_particles::{VirtualParticle, VirtualParticles};
