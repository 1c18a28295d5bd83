//! Per-node local transform with cached matrices
//!
//! The node-local half of transform propagation. Setters only flag the
//! transform dirty; the scene graph owns the hierarchical half (cascading
//! `world_matrix_dirty` to descendants and composing `parent * local`).

use crate::foundation::math::{rotation_towards, Mat4, Mat4Ext, Quat, Vec3};

/// Local position/rotation/scale plus cached local and world matrices
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position relative to the parent
    pub position: Vec3,

    /// Rotation relative to the parent
    pub rotation: Quat,

    /// Scale factors relative to the parent
    pub scale: Vec3,

    /// Cached `T * R * S`, valid when `transform_dirty` is false
    pub local_matrix: Mat4,

    /// Cached `parent.world * local`, valid when `world_matrix_dirty` is false
    pub world_matrix: Mat4,

    /// Local matrix needs recomputing
    pub transform_dirty: bool,

    /// World matrix needs recomputing
    pub world_matrix_dirty: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            local_matrix: Mat4::identity(),
            world_matrix: Mat4::identity(),
            transform_dirty: false,
            world_matrix_dirty: false,
        }
    }
}

impl Transform {
    /// Create identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Set position and mark dirty
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.mark_dirty();
    }

    /// Set rotation and mark dirty
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.mark_dirty();
    }

    /// Set scale and mark dirty
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.mark_dirty();
    }

    /// Offset position by `offset` in parent space
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
        self.mark_dirty();
    }

    /// Apply `rotation` on top of the current rotation (local axes)
    pub fn rotate(&mut self, rotation: Quat) {
        self.rotation *= rotation;
        self.mark_dirty();
    }

    /// Orient the local -Z axis towards `target` (parent space)
    ///
    /// Returns `false` and leaves the rotation untouched when `target`
    /// coincides with the current position.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) -> bool {
        match rotation_towards(&(target - self.position), &up) {
            Some(rotation) => {
                self.set_rotation(rotation);
                true
            }
            None => false,
        }
    }

    /// Flag the local matrix (and therefore the world matrix) as stale
    pub fn mark_dirty(&mut self) {
        self.transform_dirty = true;
        self.world_matrix_dirty = true;
    }

    /// Recompute the local matrix if dirty
    ///
    /// Returns `true` when a recompute happened, meaning cached bounds that
    /// depend on this transform are stale too.
    pub fn update_local(&mut self) -> bool {
        if !self.transform_dirty {
            return false;
        }
        self.local_matrix = Mat4::from_trs(&self.position, &self.rotation, &self.scale);
        self.transform_dirty = false;
        self.world_matrix_dirty = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::constants::PI;
    use approx::assert_relative_eq;

    #[test]
    fn test_setters_mark_both_flags() {
        let mut transform = Transform::identity();
        assert!(!transform.transform_dirty);

        transform.set_scale(Vec3::new(2.0, 1.0, 1.0));
        assert!(transform.transform_dirty);
        assert!(transform.world_matrix_dirty);
    }

    #[test]
    fn test_update_local_is_noop_when_clean() {
        let mut transform = Transform::identity();
        assert!(!transform.update_local());

        transform.translate(Vec3::new(1.0, 0.0, 0.0));
        transform.translate(Vec3::new(0.0, 2.0, 0.0));
        assert!(transform.update_local());
        assert!(!transform.transform_dirty);
        assert!(transform.world_matrix_dirty);
        assert_relative_eq!(transform.local_matrix.translation_part(), Vec3::new(1.0, 2.0, 0.0));
        assert!(!transform.update_local());
    }

    #[test]
    fn test_rotate_composes_in_local_space() {
        let mut transform = Transform::identity();
        let quarter = Quat::from_axis_angle(&Vec3::y_axis(), PI / 2.0);
        transform.rotate(quarter);
        transform.rotate(quarter);

        let forward = transform.rotation * Vec3::new(0.0, 0.0, -1.0);
        assert_relative_eq!(forward, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_look_at_same_point_is_rejected() {
        let mut transform = Transform::identity();
        transform.set_position(Vec3::new(1.0, 1.0, 1.0));
        transform.update_local();

        assert!(!transform.look_at(Vec3::new(1.0, 1.0, 1.0), Vec3::y()));
        assert!(!transform.transform_dirty);

        assert!(transform.look_at(Vec3::new(1.0, 1.0, -5.0), Vec3::y()));
        let forward = transform.rotation * Vec3::new(0.0, 0.0, -1.0);
        assert_relative_eq!(forward, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
    }
}
