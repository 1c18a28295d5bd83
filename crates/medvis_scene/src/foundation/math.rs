//! Math utilities and types
//!
//! Provides the fundamental math types used by the scene graph. Everything is
//! `f32` and column-vector convention: a world matrix is `parent * local` and a
//! local matrix is `T * R * S`.

pub use nalgebra::{
    Vector3, Vector4,
    Matrix4,
    Quaternion,
    Unit, UnitQuaternion,
};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type (used for plane coefficients)
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Hermite smoothstep of `t` clamped to `[0, 1]`
    pub fn smoothstep(t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        t * t * (3.0 - 2.0 * t)
    }

    /// Uniform Catmull-Rom spline between `p1` and `p2`
    ///
    /// `p0` and `p3` are the neighbouring control points. The curve passes
    /// through `p1` at `t = 0` and `p2` at `t = 1`.
    pub fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
        let t2 = t * t;
        let t3 = t2 * t;
        0.5 * ((2.0 * p1)
            + (-p0 + p2) * t
            + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
            + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
    }
}

/// Extension trait for Mat4 with camera and transform constructors
pub trait Mat4Ext {
    /// Compose a translate-rotate-scale matrix
    fn from_trs(position: &Vec3, rotation: &Quat, scale: &Vec3) -> Mat4;

    /// Create a right-handed perspective projection (OpenGL clip space, depth in [-1, 1])
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Translation column of an affine matrix
    fn translation_part(&self) -> Vec3;

    /// Transform a point (w = 1) by an affine matrix
    fn transform_point3(&self, point: &Vec3) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn from_trs(position: &Vec3, rotation: &Quat, scale: &Vec3) -> Mat4 {
        Mat4::new_translation(position)
            * rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(scale)
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        // nalgebra's convention: camera looks down -Z, NDC depth in [-1, 1]
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    fn translation_part(&self) -> Vec3 {
        Vec3::new(self.m14, self.m24, self.m34)
    }

    fn transform_point3(&self, point: &Vec3) -> Vec3 {
        self.transform_point(&Point3::from(*point)).coords
    }
}

/// Rotation that turns the local -Z axis towards `direction`
///
/// Returns `None` when `direction` has zero length. When `direction` is
/// parallel to `up` the shortest-arc rotation is used instead.
pub fn rotation_towards(direction: &Vec3, up: &Vec3) -> Option<Quat> {
    if direction.norm_squared() <= f32::EPSILON {
        return None;
    }
    let forward = direction.normalize();
    if forward.cross(up).norm_squared() <= f32::EPSILON {
        let default_forward = Vec3::new(0.0, 0.0, -1.0);
        return Some(
            Quat::rotation_between(&default_forward, &forward)
                .unwrap_or_else(|| Quat::from_axis_angle(&Vec3::y_axis(), constants::PI)),
        );
    }
    // look_at_rh maps `forward` onto -Z; its inverse maps -Z onto `forward`
    Some(Quat::look_at_rh(&forward, up).inverse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_trs_composition_order() {
        let position = Vec3::new(1.0, 2.0, 3.0);
        let rotation = Quat::from_axis_angle(&Vec3::y_axis(), constants::PI / 2.0);
        let scale = Vec3::new(2.0, 2.0, 2.0);
        let matrix = Mat4::from_trs(&position, &rotation, &scale);

        // Scale first, then rotate +X onto -Z, then translate
        let moved = matrix.transform_point3(&Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(moved, Vec3::new(1.0, 2.0, 1.0), epsilon = 1e-5);
        assert_relative_eq!(matrix.translation_part(), position, epsilon = 1e-6);
    }

    #[test]
    fn test_catmull_rom_passes_through_control_points() {
        assert_relative_eq!(utils::catmull_rom(0.0, 1.0, 3.0, 4.0, 0.0), 1.0);
        assert_relative_eq!(utils::catmull_rom(0.0, 1.0, 3.0, 4.0, 1.0), 3.0);
        // Evenly spaced points reduce to a straight line
        assert_relative_eq!(utils::catmull_rom(0.0, 1.0, 2.0, 3.0, 0.5), 1.5, epsilon = 1e-6);
    }

    #[test]
    fn test_smoothstep_endpoints() {
        assert_relative_eq!(utils::smoothstep(0.0), 0.0);
        assert_relative_eq!(utils::smoothstep(0.5), 0.5);
        assert_relative_eq!(utils::smoothstep(1.0), 1.0);
        assert_relative_eq!(utils::smoothstep(2.0), 1.0);
    }

    #[test]
    fn test_rotation_towards_points_negative_z_at_target() {
        let direction = Vec3::new(1.0, 0.0, 0.0);
        let rotation = rotation_towards(&direction, &Vec3::y()).unwrap();
        let forward = rotation * Vec3::new(0.0, 0.0, -1.0);
        assert_relative_eq!(forward, direction, epsilon = 1e-5);

        // Straight up is parallel to the up vector
        let rotation = rotation_towards(&Vec3::y(), &Vec3::y()).unwrap();
        assert_relative_eq!(rotation * Vec3::new(0.0, 0.0, -1.0), Vec3::y(), epsilon = 1e-5);

        assert!(rotation_towards(&Vec3::zeros(), &Vec3::y()).is_none());
    }
}
