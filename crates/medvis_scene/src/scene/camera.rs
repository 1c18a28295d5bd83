//! # Culling Camera
//!
//! The camera provider fills in position/orientation/projection parameters;
//! [`SceneGraph::cull`](crate::scene::SceneGraph::cull) refreshes the derived
//! matrices and frustum in place every call.
//!
//! ## Coordinate System
//! Right-handed, Y-up world space. The view looks down -Z and the projection
//! uses OpenGL clip space (depth in [-1, 1]), which is what
//! [`Frustum::from_matrix`] expects.

use crate::foundation::math::{Mat4, Mat4Ext, Vec3, utils};
use crate::scene::error::SceneError;
use crate::scene::frustum::Frustum;

/// Perspective camera with cached matrices and frustum
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,

    view: Mat4,
    projection: Mat4,
    view_projection: Mat4,
    frustum: Option<Frustum>,
}

impl Camera {
    /// Create a perspective camera looking at the origin with +Y up
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    ///
    /// # Example
    /// ```rust
    /// use medvis_scene::foundation::math::Vec3;
    /// use medvis_scene::scene::Camera;
    ///
    /// let camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 60.0, 16.0 / 9.0, 0.1, 1000.0);
    /// assert!(camera.frustum().is_none());
    /// ```
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
            view: Mat4::identity(),
            projection: Mat4::identity(),
            view_projection: Mat4::identity(),
            frustum: None,
        }
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Configure camera to look at a specific point with custom up vector
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
        log::trace!("Camera look_at updated - target: {:?}, up: {:?}", target, up);
    }

    /// Update camera aspect ratio for viewport changes
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::debug!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// Recompute view, projection and view-projection, then extract the frustum
    ///
    /// On error the previously cached matrices are kept and the frustum is
    /// cleared.
    pub fn update_matrices(&mut self) -> Result<&Frustum, SceneError> {
        let view = Mat4::look_at(self.position, self.target, self.up);
        let projection = Mat4::perspective(self.fov, self.aspect, self.near, self.far);
        let view_projection = projection * view;

        match Frustum::from_matrix(&view_projection) {
            Ok(frustum) => {
                self.view = view;
                self.projection = projection;
                self.view_projection = view_projection;
                Ok(self.frustum.insert(frustum))
            }
            Err(err) => {
                self.frustum = None;
                Err(err)
            }
        }
    }

    /// View matrix from the last `update_matrices`
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    /// Projection matrix from the last `update_matrices`
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// `projection * view` from the last `update_matrices`
    pub fn view_projection_matrix(&self) -> &Mat4 {
        &self.view_projection
    }

    /// Frustum from the last successful `update_matrices`
    pub fn frustum(&self) -> Option<&Frustum> {
        self.frustum.as_ref()
    }

    /// Distance from the camera to a world-space point
    pub fn distance_to(&self, point: &Vec3) -> f32 {
        (point - self.position).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_update_matrices_builds_frustum() {
        let mut camera = Camera::perspective(Vec3::new(0.0, 0.0, 10.0), 60.0, 1.0, 0.1, 100.0);
        let frustum = camera.update_matrices().unwrap();
        assert!(frustum.contains_point(Vec3::zeros()));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 20.0)));

        let expected = camera.projection_matrix() * camera.view_matrix();
        assert_relative_eq!(*camera.view_projection_matrix(), expected);
    }

    #[test]
    fn test_degenerate_projection_clears_frustum() {
        let mut camera = Camera::perspective(Vec3::new(0.0, 0.0, 10.0), 60.0, 1.0, 0.1, 100.0);
        camera.update_matrices().unwrap();
        assert!(camera.frustum().is_some());

        // Target on top of the eye leaves no view direction
        camera.look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::y());
        assert!(camera.update_matrices().is_err());
        assert!(camera.frustum().is_none());
    }

    #[test]
    fn test_distance_to() {
        let camera = Camera::perspective(Vec3::new(3.0, 4.0, 0.0), 45.0, 1.0, 0.1, 10.0);
        assert_relative_eq!(camera.distance_to(&Vec3::zeros()), 5.0);
    }
}
