//! Keyframed collision shapes for one cloth.
//!
//! Shapes are given as start/target keyframes for the current frame and
//! blended per substep by [`crate::interpolate`]. The setters here are
//! the only place shape counts and indices are validated; the substep
//! pass trusts them.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};
use weave_types::constants::MAX_SHAPES;
use weave_types::{SphereId, WeaveError, WeaveResult};

use crate::mask::ShapeBits;

/// Start/target keyframes and topology of a cloth's collision shapes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollisionShapes {
    /// Sphere `xyz` center and `w` radius at frame start.
    start_spheres: Vec<Vec4>,
    target_spheres: Vec<Vec4>,
    /// Sphere pairs joined by a cone.
    capsules: Vec<[SphereId; 2]>,
    /// Plane `xyz` unit normal and `w` offset.
    start_planes: Vec<Vec4>,
    target_planes: Vec<Vec4>,
    /// One plane mask per convex body.
    convexes: Vec<ShapeBits>,
    /// Three vertices per triangle.
    start_triangles: Vec<Vec3>,
    target_triangles: Vec<Vec3>,
}

fn check_capacity(kind: &'static str, count: usize) -> WeaveResult<()> {
    if count > MAX_SHAPES {
        return Err(WeaveError::CapacityExceeded {
            kind,
            count,
            max: MAX_SHAPES,
        });
    }
    Ok(())
}

fn check_keyframes<T>(kind: &str, start: &[T], target: &[T]) -> WeaveResult<()> {
    if start.len() != target.len() {
        return Err(WeaveError::InvalidShape(format!(
            "{kind}: {} start keyframes but {} targets",
            start.len(),
            target.len()
        )));
    }
    Ok(())
}

impl CollisionShapes {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Builders ─────────────────────────────────────────────

    pub fn with_spheres(mut self, start: Vec<Vec4>, target: Vec<Vec4>) -> WeaveResult<Self> {
        self.set_spheres(start, target)?;
        Ok(self)
    }

    /// Static spheres: start and target keyframes are equal.
    pub fn with_static_spheres(self, spheres: Vec<Vec4>) -> WeaveResult<Self> {
        self.with_spheres(spheres.clone(), spheres)
    }

    pub fn with_capsules(mut self, capsules: Vec<[u32; 2]>) -> WeaveResult<Self> {
        self.set_capsules(capsules)?;
        Ok(self)
    }

    pub fn with_planes(mut self, start: Vec<Vec4>, target: Vec<Vec4>) -> WeaveResult<Self> {
        self.set_planes(start, target)?;
        Ok(self)
    }

    pub fn with_static_planes(self, planes: Vec<Vec4>) -> WeaveResult<Self> {
        self.with_planes(planes.clone(), planes)
    }

    pub fn with_convexes(mut self, convexes: Vec<u32>) -> WeaveResult<Self> {
        self.set_convexes(convexes)?;
        Ok(self)
    }

    pub fn with_triangles(mut self, start: Vec<Vec3>, target: Vec<Vec3>) -> WeaveResult<Self> {
        self.set_triangles(start, target)?;
        Ok(self)
    }

    pub fn with_static_triangles(self, vertices: Vec<Vec3>) -> WeaveResult<Self> {
        self.with_triangles(vertices.clone(), vertices)
    }

    // ─── Setters ──────────────────────────────────────────────

    pub fn set_spheres(&mut self, start: Vec<Vec4>, target: Vec<Vec4>) -> WeaveResult<()> {
        check_keyframes("spheres", &start, &target)?;
        check_capacity("spheres", start.len())?;
        if let Some(pair) = self
            .capsules
            .iter()
            .find(|pair| pair.iter().any(|s| s.index() >= start.len()))
        {
            return Err(WeaveError::InvalidShape(format!(
                "capsule {:?} references a sphere beyond the {} given",
                pair,
                start.len()
            )));
        }
        self.start_spheres = start;
        self.target_spheres = target;
        Ok(())
    }

    /// Starts a new frame: the old targets become the start keyframes.
    pub fn advance_spheres(&mut self, target: Vec<Vec4>) -> WeaveResult<()> {
        if target.len() != self.target_spheres.len() {
            return Err(WeaveError::InvalidShape(format!(
                "spheres: advancing {} spheres to {} targets",
                self.target_spheres.len(),
                target.len()
            )));
        }
        self.start_spheres = std::mem::replace(&mut self.target_spheres, target);
        Ok(())
    }

    pub fn set_capsules(&mut self, capsules: Vec<[u32; 2]>) -> WeaveResult<()> {
        check_capacity("capsules", capsules.len())?;
        let sphere_count = self.start_spheres.len();
        for &[first, second] in &capsules {
            if first as usize >= sphere_count || second as usize >= sphere_count {
                return Err(WeaveError::InvalidShape(format!(
                    "capsule [{first}, {second}] references a sphere beyond the {sphere_count} given"
                )));
            }
            if first == second {
                return Err(WeaveError::InvalidShape(format!(
                    "capsule [{first}, {second}] joins a sphere to itself"
                )));
            }
        }
        self.capsules = capsules
            .into_iter()
            .map(|[a, b]| [SphereId(a), SphereId(b)])
            .collect();
        Ok(())
    }

    pub fn set_planes(&mut self, start: Vec<Vec4>, target: Vec<Vec4>) -> WeaveResult<()> {
        check_keyframes("planes", &start, &target)?;
        check_capacity("planes", start.len())?;
        let live = ShapeBits::low(start.len());
        if let Some(mask) = self.convexes.iter().find(|m| !(**m & !live).is_empty()) {
            return Err(WeaveError::InvalidShape(format!(
                "convex mask {:#x} references a plane beyond the {} given",
                mask.0,
                start.len()
            )));
        }
        self.start_planes = start;
        self.target_planes = target;
        Ok(())
    }

    pub fn set_convexes(&mut self, convexes: Vec<u32>) -> WeaveResult<()> {
        let live = ShapeBits::low(self.start_planes.len());
        for &mask in &convexes {
            let mask = ShapeBits(mask);
            if mask.is_empty() {
                return Err(WeaveError::InvalidShape("convex mask is empty".into()));
            }
            if !(mask & !live).is_empty() {
                return Err(WeaveError::InvalidShape(format!(
                    "convex mask {:#x} references a plane beyond the {} given",
                    mask.0,
                    self.start_planes.len()
                )));
            }
        }
        self.convexes = convexes.into_iter().map(ShapeBits).collect();
        Ok(())
    }

    pub fn set_triangles(&mut self, start: Vec<Vec3>, target: Vec<Vec3>) -> WeaveResult<()> {
        check_keyframes("triangles", &start, &target)?;
        if start.len() % 3 != 0 {
            return Err(WeaveError::InvalidShape(format!(
                "triangle vertex count {} is not a multiple of 3",
                start.len()
            )));
        }
        self.start_triangles = start;
        self.target_triangles = target;
        Ok(())
    }

    // ─── Accessors ────────────────────────────────────────────

    #[inline]
    pub fn sphere_count(&self) -> usize {
        self.start_spheres.len()
    }

    #[inline]
    pub fn capsule_count(&self) -> usize {
        self.capsules.len()
    }

    #[inline]
    pub fn plane_count(&self) -> usize {
        self.start_planes.len()
    }

    #[inline]
    pub fn convex_count(&self) -> usize {
        self.convexes.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.start_triangles.len() / 3
    }

    pub fn start_spheres(&self) -> &[Vec4] {
        &self.start_spheres
    }

    pub fn target_spheres(&self) -> &[Vec4] {
        &self.target_spheres
    }

    pub fn capsules(&self) -> &[[SphereId; 2]] {
        &self.capsules
    }

    pub fn start_planes(&self) -> &[Vec4] {
        &self.start_planes
    }

    pub fn target_planes(&self) -> &[Vec4] {
        &self.target_planes
    }

    pub fn convexes(&self) -> &[ShapeBits] {
        &self.convexes
    }

    pub fn start_triangles(&self) -> &[Vec3] {
        &self.start_triangles
    }

    pub fn target_triangles(&self) -> &[Vec3] {
        &self.target_triangles
    }
}
