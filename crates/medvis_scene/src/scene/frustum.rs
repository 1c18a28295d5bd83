//! View frustum for visibility culling
//!
//! Planes are extracted from a view-projection matrix with the
//! Gribb-Hartmann row-combination method and stored normalized, normals
//! pointing into the frustum.

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::scene::bounds::Bounds;
use crate::scene::error::SceneError;

/// Plane names in extraction order
pub const PLANE_NAMES: [&str; 6] = ["left", "right", "bottom", "top", "near", "far"];

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal, pointing towards the inside half-space
    pub normal: Vec3,
    /// Signed offset: `normal . p + distance = 0` on the plane
    pub distance: f32,
}

impl Plane {
    /// Create a plane from raw coefficients, normalizing by the normal length
    pub fn from_coefficients(coefficients: Vec4) -> Option<Self> {
        let normal = coefficients.xyz();
        let length = normal.norm();
        if !length.is_finite() || length <= f32::EPSILON {
            return None;
        }
        Some(Self {
            normal: normal / length,
            distance: coefficients.w / length,
        })
    }

    /// Plane coefficients `(a, b, c, d)`
    pub fn coefficients(&self) -> Vec4 {
        Vec4::new(self.normal.x, self.normal.y, self.normal.z, self.distance)
    }

    /// Calculate signed distance from plane to point (positive = inside)
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// Frustum for visibility culling
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Six planes: left, right, bottom, top, near, far
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix
    ///
    /// Expects OpenGL-style clip space (`-w <= z <= w`). Fails with
    /// [`SceneError::DegenerateFrustum`] if any plane normal has zero length,
    /// which happens for a singular matrix (e.g. zero aspect or `near == far`).
    pub fn from_matrix(vp: &Mat4) -> Result<Self, SceneError> {
        let row = |r: usize| Vec4::new(vp[(r, 0)], vp[(r, 1)], vp[(r, 2)], vp[(r, 3)]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let raw = [
            r3 + r0, // left
            r3 - r0, // right
            r3 + r1, // bottom
            r3 - r1, // top
            r3 + r2, // near
            r3 - r2, // far
        ];

        let mut planes = [Plane { normal: Vec3::zeros(), distance: 0.0 }; 6];
        for (index, coefficients) in raw.iter().enumerate() {
            planes[index] = Plane::from_coefficients(*coefficients)
                .ok_or(SceneError::DegenerateFrustum { plane: PLANE_NAMES[index] })?;
        }

        Ok(Self { planes })
    }

    /// Check if a point lies inside all six planes
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(point) >= 0.0)
    }

    /// Check if a sphere is inside or intersects the frustum
    ///
    /// The sphere is outside when its center lies farther than `radius`
    /// behind any single plane.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(center) >= -radius)
    }

    /// Check if an AABB is inside or intersects the frustum
    pub fn intersects_aabb(&self, aabb: &Bounds) -> bool {
        let (min, max) = (aabb.min(), aabb.max());
        self.planes.iter().all(|plane| {
            // Corner furthest along the plane normal
            let p = Vec3::new(
                if plane.normal.x >= 0.0 { max.x } else { min.x },
                if plane.normal.y >= 0.0 { max.y } else { min.y },
                if plane.normal.z >= 0.0 { max.z } else { min.z },
            );
            plane.distance_to_point(p) >= 0.0
        })
    }
}
