//! Triangle narrow phase.
//!
//! Triangles are one-sided: a particle behind the nearest triangle is
//! pushed back onto its plane. Only the nearest triangle responds.

use glam::Vec3;
use weave_types::constants::{BACK_FACE_PENALTY, EPSILON};

/// Triangle with precomputed edge basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub base: Vec3,
    pub edge0: Vec3,
    pub edge1: Vec3,
    /// Unit normal of `edge0 × edge1`, zero if the triangle is degenerate.
    pub normal: Vec3,
    edge0_sqr: f32,
    edge1_sqr: f32,
    edge_dot: f32,
    inv_det: f32,
    inv_denom: f32,
    inv_edge0_sqr: f32,
    inv_edge1_sqr: f32,
}

#[inline]
fn recip_or_zero(x: f32) -> f32 {
    if x > EPSILON {
        x.recip()
    } else {
        0.0
    }
}

/// Result of [`Triangle::closest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleDistance {
    /// Squared distance to the closest point, inflated for back-face particles.
    pub sqr_distance: f32,
    /// Signed distance along the normal.
    pub normal_distance: f32,
}

impl Triangle {
    pub fn new(p0: Vec3, p1: Vec3, p2: Vec3) -> Self {
        let edge0 = p1 - p0;
        let edge1 = p2 - p0;
        let edge0_sqr = edge0.length_squared();
        let edge1_sqr = edge1.length_squared();
        let edge_dot = edge0.dot(edge1);

        Self {
            base: p0,
            edge0,
            edge1,
            normal: edge0.cross(edge1).normalize_or_zero(),
            edge0_sqr,
            edge1_sqr,
            edge_dot,
            inv_det: recip_or_zero(edge0_sqr * edge1_sqr - edge_dot * edge_dot),
            inv_denom: recip_or_zero(edge0_sqr + edge1_sqr - 2.0 * edge_dot),
            inv_edge0_sqr: recip_or_zero(edge0_sqr),
            inv_edge1_sqr: recip_or_zero(edge1_sqr),
        }
    }

    /// Distance from `pos` to the closest point on the triangle.
    pub fn closest(&self, pos: Vec3) -> TriangleDistance {
        let d = pos - self.base;
        let dot0 = d.dot(self.edge0);
        let dot1 = d.dot(self.edge1);
        let normal_distance = d.dot(self.normal);

        // Unnormalized barycentrics of the projection onto the plane.
        let s = self.edge1_sqr * dot0 - self.edge_dot * dot1;
        let t = self.edge0_sqr * dot1 - self.edge_dot * dot0;

        // Outside an edge, fall back to the projection onto the other edge.
        let mut u = if t > 0.0 { s * self.inv_det } else { dot0 * self.inv_edge0_sqr };
        let v = if s > 0.0 { t * self.inv_det } else { dot1 * self.inv_edge1_sqr };

        // Beyond the hypotenuse, project onto the third edge.
        if u + v > 1.0 {
            u = (self.edge1_sqr - self.edge_dot + dot0 - dot1) * self.inv_denom;
        }
        let u = u.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0 - u);

        let mut sqr_distance = (d - self.edge0 * u - self.edge1 * v).length_squared();
        if normal_distance < 0.0 {
            sqr_distance *= BACK_FACE_PENALTY;
        }

        TriangleDistance {
            sqr_distance,
            normal_distance,
        }
    }
}

/// Correction pushing `pos` out of the nearest triangle, if it is behind it.
pub fn collide_triangles(triangles: &[Triangle], pos: Vec3) -> Option<Vec3> {
    let (nearest, distance) = triangles
        .iter()
        .map(|tri| (tri, tri.closest(pos)))
        .min_by(|a, b| a.1.sqr_distance.total_cmp(&b.1.sqr_distance))?;

    (distance.normal_distance < 0.0).then(|| -nearest.normal * distance.normal_distance)
}
