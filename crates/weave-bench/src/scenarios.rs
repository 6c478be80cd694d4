//! Benchmark scenarios: a particle sheet, collision shapes and config per case.
//!
//! Three canonical scenarios, one per shape family:
//! 1. **Capsule sweep**: an arm capsule sweeps through a sheet pinned along its top edge
//! 2. **Convex box**: a sheet falls into an open box built from convex slabs
//! 3. **Triangle floor**: a sheet falls onto a triangle floor around a resting ball,
//!    sampled by virtual particles

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use weave_collision::{CollisionConfig, CollisionShapes, ParticleBuffers, VirtualParticles};
use weave_types::WeaveResult;

/// Which benchmark scenario to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioKind {
    CapsuleSweep,
    ConvexBox,
    TriangleFloor,
}

impl ScenarioKind {
    pub fn all() -> &'static [ScenarioKind] {
        &[
            ScenarioKind::CapsuleSweep,
            ScenarioKind::ConvexBox,
            ScenarioKind::TriangleFloor,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::CapsuleSweep => "capsule_sweep",
            ScenarioKind::ConvexBox => "convex_box",
            ScenarioKind::TriangleFloor => "triangle_floor",
        }
    }

    /// Inverse of [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.name() == name)
    }
}

/// Sphere keyframes moved along a straight line over the run.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereSweep {
    /// Sphere positions and radii at frame 0.
    pub rest: Vec<Vec4>,
    /// Total displacement reached at the last frame.
    pub offset: Vec3,
}

impl SphereSweep {
    /// Sphere targets at the end of `frame` out of `frames`.
    pub fn targets(&self, frame: u32, frames: u32) -> Vec<Vec4> {
        let t = (frame + 1) as f32 / frames.max(1) as f32;
        let shift = (self.offset * t).extend(0.0);
        self.rest.iter().map(|&s| s + shift).collect()
    }
}

/// A fully specified benchmark scenario.
pub struct Scenario {
    pub kind: ScenarioKind,
    /// Initial particle state, at rest.
    pub particles: ParticleBuffers,
    /// Sheet resolution in particles.
    pub columns: usize,
    pub rows: usize,
    pub shapes: CollisionShapes,
    pub virtual_particles: Option<VirtualParticles>,
    /// Animated spheres, if any.
    pub sweep: Option<SphereSweep>,
    pub config: CollisionConfig,
    pub frames: u32,
    pub substeps: u32,
    /// Frame duration (seconds).
    pub dt: f32,
    pub gravity: Vec3,
}

/// Regular sheet of `columns × rows` particles spanning `size` along
/// `u` and `v`, centred on `origin`.
pub fn sheet(columns: usize, rows: usize, size: (f32, f32), origin: Vec3, u: Vec3, v: Vec3) -> Vec<Vec4> {
    let step_u = size.0 / (columns.max(2) - 1) as f32;
    let step_v = size.1 / (rows.max(2) - 1) as f32;
    let corner = origin - u * (size.0 * 0.5) - v * (size.1 * 0.5);
    (0..rows)
        .flat_map(|r| {
            (0..columns).map(move |c| (corner + u * (c as f32 * step_u) + v * (r as f32 * step_v)).extend(1.0))
        })
        .collect()
}

/// The six outward planes of an axis-aligned slab.
pub fn slab(lower: Vec3, upper: Vec3) -> [Vec4; 6] {
    [
        Vec4::new(1.0, 0.0, 0.0, -upper.x),
        Vec4::new(-1.0, 0.0, 0.0, lower.x),
        Vec4::new(0.0, 1.0, 0.0, -upper.y),
        Vec4::new(0.0, -1.0, 0.0, lower.y),
        Vec4::new(0.0, 0.0, 1.0, -upper.z),
        Vec4::new(0.0, 0.0, -1.0, lower.z),
    ]
}

/// Two triangles covering `[-half, half]²` at height `y`, facing up.
pub fn floor(half: f32, y: f32) -> Vec<Vec3> {
    vec![
        Vec3::new(-half, y, -half),
        Vec3::new(-half, y, half),
        Vec3::new(half, y, -half),
        Vec3::new(half, y, half),
        Vec3::new(half, y, -half),
        Vec3::new(-half, y, half),
    ]
}

/// Two centroid samples per grid cell of a `columns × rows` sheet.
pub fn cell_centroids(columns: usize, rows: usize) -> WeaveResult<VirtualParticles> {
    let index = |c: usize, r: usize| (r * columns + c) as u32;
    let mut entries = Vec::new();
    for r in 0..rows.saturating_sub(1) {
        for c in 0..columns.saturating_sub(1) {
            let (a, b) = (index(c, r), index(c + 1, r));
            let (d, e) = (index(c, r + 1), index(c + 1, r + 1));
            entries.push([a, b, e, 0]);
            entries.push([a, e, d, 0]);
        }
    }
    VirtualParticles::new(&entries, &[Vec3::splat(1.0 / 3.0)])
}

impl Scenario {
    /// A 1m × 1m sheet of 24×24 particles in the XY plane, pinned along
    /// its top edge. An arm capsule crosses the sheet and sweeps 2m along
    /// x over 30 frames. No gravity, so only the arm moves particles.
    pub fn capsule_sweep() -> WeaveResult<Self> {
        let (columns, rows) = (24, 24);
        let mut positions = sheet(columns, rows, (1.0, 1.0), Vec3::new(0.0, 1.0, 0.0), Vec3::X, Vec3::NEG_Y);
        for p in positions.iter_mut().take(columns) {
            p.w = 0.0;
        }

        let rest = vec![Vec4::new(-1.0, 0.9, -0.4, 0.12), Vec4::new(-1.0, 0.9, 0.4, 0.08)];
        let shapes = CollisionShapes::new()
            .with_static_spheres(rest.clone())?
            .with_capsules(vec![[0, 1]])?;

        Ok(Self {
            kind: ScenarioKind::CapsuleSweep,
            particles: ParticleBuffers::at_rest(positions),
            columns,
            rows,
            shapes,
            virtual_particles: None,
            sweep: Some(SphereSweep {
                rest,
                offset: Vec3::new(2.0, 0.0, 0.0),
            }),
            config: CollisionConfig::continuous().with_friction(0.5),
            frames: 30,
            substeps: 4,
            dt: 1.0 / 60.0,
            gravity: Vec3::ZERO,
        })
    }

    /// A 1m × 1m sheet of 24×24 particles dropped from 0.5m into an open
    /// box: a floor slab and four wall slabs, 1.6m wide.
    pub fn convex_box() -> WeaveResult<Self> {
        let (columns, rows) = (24, 24);
        let positions = sheet(columns, rows, (1.0, 1.0), Vec3::new(0.0, 0.5, 0.0), Vec3::X, Vec3::Z);

        let slabs = [
            slab(Vec3::new(-0.8, -0.2, -0.8), Vec3::new(0.8, 0.0, 0.8)),
            slab(Vec3::new(-0.9, -0.2, -0.8), Vec3::new(-0.8, 0.4, 0.8)),
            slab(Vec3::new(0.8, -0.2, -0.8), Vec3::new(0.9, 0.4, 0.8)),
            slab(Vec3::new(-0.9, -0.2, -0.9), Vec3::new(0.9, 0.4, -0.8)),
            slab(Vec3::new(-0.9, -0.2, 0.8), Vec3::new(0.9, 0.4, 0.9)),
        ];
        let planes: Vec<Vec4> = slabs.iter().flatten().copied().collect();
        let convexes = (0..slabs.len()).map(|k| 0b11_1111 << (6 * k)).collect();
        let shapes = CollisionShapes::new()
            .with_static_planes(planes)?
            .with_convexes(convexes)?;

        Ok(Self {
            kind: ScenarioKind::ConvexBox,
            particles: ParticleBuffers::at_rest(positions),
            columns,
            rows,
            shapes,
            virtual_particles: None,
            sweep: None,
            config: CollisionConfig::default().with_friction(0.3),
            frames: 60,
            substeps: 4,
            dt: 1.0 / 60.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
        })
    }

    /// A 1.5m × 1.5m sheet of 20×20 particles dropped from 0.8m onto a
    /// triangle floor with a ball of radius 0.2m resting 0.1m above it.
    /// Cell centroids are sampled as virtual particles against the ball.
    pub fn triangle_floor() -> WeaveResult<Self> {
        let (columns, rows) = (20, 20);
        let positions = sheet(columns, rows, (1.5, 1.5), Vec3::new(0.0, 0.8, 0.0), Vec3::X, Vec3::Z);
        let shapes = CollisionShapes::new()
            .with_static_triangles(floor(2.0, 0.0))?
            .with_static_spheres(vec![Vec4::new(0.0, 0.3, 0.0, 0.2)])?;

        Ok(Self {
            kind: ScenarioKind::TriangleFloor,
            particles: ParticleBuffers::at_rest(positions),
            columns,
            rows,
            shapes,
            virtual_particles: Some(cell_centroids(columns, rows)?),
            sweep: None,
            config: CollisionConfig::high_quality(),
            frames: 60,
            substeps: 4,
            dt: 1.0 / 60.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
        })
    }

    pub fn from_kind(kind: ScenarioKind) -> WeaveResult<Self> {
        match kind {
            ScenarioKind::CapsuleSweep => Self::capsule_sweep(),
            ScenarioKind::ConvexBox => Self::convex_box(),
            ScenarioKind::TriangleFloor => Self::triangle_floor(),
        }
    }

    /// Replaces the collision config, e.g. one loaded from a file.
    pub fn with_config(mut self, config: CollisionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }
}
