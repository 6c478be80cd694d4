//! Blending keyframed shapes to a substep time.
//!
//! Every shape is linear in `alpha` between its start and target
//! keyframe. Sphere radii are clamped at zero.

use glam::{Vec3, Vec4};

use crate::capsule::{CapsuleFrame, Sphere};
use crate::convex::Plane;
use crate::shapes::CollisionShapes;
use crate::triangle::Triangle;

pub fn interpolate_spheres(start: &[Vec4], target: &[Vec4], alpha: f32) -> Vec<Sphere> {
    start
        .iter()
        .zip(target)
        .map(|(s, t)| {
            let v = s.lerp(*t, alpha);
            Sphere::new(v.truncate(), v.w.max(0.0))
        })
        .collect()
}

pub fn interpolate_planes(start: &[Vec4], target: &[Vec4], alpha: f32) -> Vec<Plane> {
    start
        .iter()
        .zip(target)
        .map(|(s, t)| Plane::from_vec4(s.lerp(*t, alpha)))
        .collect()
}

pub fn interpolate_triangles(start: &[Vec3], target: &[Vec3], alpha: f32) -> Vec<Triangle> {
    start
        .chunks_exact(3)
        .zip(target.chunks_exact(3))
        .map(|(s, t)| {
            Triangle::new(
                s[0].lerp(t[0], alpha),
                s[1].lerp(t[1], alpha),
                s[2].lerp(t[2], alpha),
            )
        })
        .collect()
}

impl CollisionShapes {
    /// Spheres and cones at `alpha`.
    pub fn capsules_at(&self, alpha: f32) -> CapsuleFrame {
        let spheres = interpolate_spheres(self.start_spheres(), self.target_spheres(), alpha);
        CapsuleFrame::new(spheres, self.capsules())
    }

    pub fn planes_at(&self, alpha: f32) -> Vec<Plane> {
        interpolate_planes(self.start_planes(), self.target_planes(), alpha)
    }

    pub fn triangles_at(&self, alpha: f32) -> Vec<Triangle> {
        interpolate_triangles(self.start_triangles(), self.target_triangles(), alpha)
    }
}
