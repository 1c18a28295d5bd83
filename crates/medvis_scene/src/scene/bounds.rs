//! Axis-aligned bounds with derived sphere data
//!
//! Center, radius and volume are cached alongside min/max and refreshed
//! whenever the corners change. The radius is half the box diagonal: a
//! conservative bounding sphere, not the tightest one.

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};

/// Axis-aligned bounding box for culling and picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    min: Vec3,
    max: Vec3,
    center: Vec3,
    radius: f32,
    volume: f32,
}

impl Default for Bounds {
    /// Unit box centred at the origin
    fn default() -> Self {
        Self::new(Vec3::new(-0.5, -0.5, -0.5), Vec3::new(0.5, 0.5, 0.5))
    }
}

impl Bounds {
    /// Create bounds from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        let mut bounds = Self {
            min,
            max,
            center: Vec3::zeros(),
            radius: 0.0,
            volume: 0.0,
        };
        bounds.refresh_derived();
        bounds
    }

    /// Create bounds centered at a point with given half extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self::new(center - extents, center + extents)
    }

    /// Smallest box containing every point; `None` for an empty iterator
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.inf(&p), max.sup(&p)));
        Some(Self::new(min, max))
    }

    /// Minimum corner
    pub fn min(&self) -> Vec3 {
        self.min
    }

    /// Maximum corner
    pub fn max(&self) -> Vec3 {
        self.max
    }

    /// Midpoint of the box
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Half the diagonal length
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Product of the per-axis extents
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Half-size of the box along each axis
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Replace both corners and refresh derived data
    pub fn set(&mut self, min: Vec3, max: Vec3) {
        self.min = min;
        self.max = max;
        self.refresh_derived();
    }

    fn refresh_derived(&mut self) {
        let size = self.max - self.min;
        self.center = (self.min + self.max) * 0.5;
        self.radius = size.norm() * 0.5;
        self.volume = size.x * size.y * size.z;
    }

    /// The eight corners of the box
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Bounds of this box after transformation by `matrix`
    ///
    /// All eight corners are transformed; transforming only min/max would be
    /// wrong once the matrix contains a rotation.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let corners = self.corners().map(|corner| matrix.transform_point3(&corner));
        Self::from_points(corners).unwrap_or(*self)
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// Check if this box fully contains `other`
    pub fn contains(&self, other: &Self) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// Check if this box contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this box intersects another box
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Test ray intersection using the slab method
    ///
    /// Returns the distance to the entry point if the ray intersects
    /// (0 when the origin is inside), `None` otherwise.
    pub fn intersect_ray(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        let inv = |d: f32| if d == 0.0 { f32::INFINITY } else { 1.0 / d };
        let inv_dir = Vec3::new(inv(ray_dir.x), inv(ray_dir.y), inv(ray_dir.z));

        let t1 = (self.min - ray_origin).component_mul(&inv_dir);
        let t2 = (self.max - ray_origin).component_mul(&inv_dir);

        let tmin = t1.inf(&t2).max();
        let tmax = t1.sup(&t2).min();

        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}
