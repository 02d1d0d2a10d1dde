//! Perspective camera
//!
//! View space is right-handed and Y-up. The projection keeps Y up as well and
//! maps depth to `[0, 1]`; the flip into Vulkan's Y-down clip space happens
//! once, when the uniform store writes the matrices.

use crate::foundation::math::{Mat4, Point3, Vec3};

/// View and projection pair handed to the uniform store each frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    /// World to view transform
    pub view: Mat4,
    /// View to clip transform, Y-up
    pub projection: Mat4,
}

/// 3D camera with perspective projection
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// Point the camera is looking at in world space
    pub target: Vec3,
    /// Up vector for camera orientation (typically +Y)
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Distance to near clipping plane
    pub near: f32,
    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera looking at the origin
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: fov_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    /// Point the camera along yaw and pitch (radians) from its position
    ///
    /// Yaw 0 looks down -Z; positive pitch looks up.
    pub fn set_yaw_pitch(&mut self, yaw: f32, pitch: f32) {
        let direction = Vec3::new(-yaw.sin() * pitch.cos(), pitch.sin(), -yaw.cos() * pitch.cos());
        self.target = self.position + direction;
    }

    /// Place the camera on a sphere around `center`, looking at it
    pub fn orbit(&mut self, center: Vec3, radius: f32, yaw: f32, pitch: f32) {
        let offset = Vec3::new(yaw.sin() * pitch.cos(), pitch.sin(), yaw.cos() * pitch.cos()) * radius;
        self.position = center + offset;
        self.target = center;
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Update the aspect ratio, e.g. after a resize
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::debug!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// World to view transform
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(
            &Point3::from(self.position),
            &Point3::from(self.target),
            &self.up,
        )
    }

    /// Right-handed perspective projection with Y up and depth in `[0, 1]`
    pub fn projection_matrix(&self) -> Mat4 {
        let f = 1.0 / (self.fov * 0.5).tan();
        let range = self.near - self.far;

        #[rustfmt::skip]
        let projection = Mat4::new(
            f / self.aspect, 0.0, 0.0,                 0.0,
            0.0,             f,   0.0,                 0.0,
            0.0,             0.0, self.far / range,    self.near * self.far / range,
            0.0,             0.0, -1.0,                0.0,
        );
        projection
    }

    /// Both matrices for the current frame
    pub fn matrices(&self) -> CameraMatrices {
        CameraMatrices {
            view: self.view_matrix(),
            projection: self.projection_matrix(),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 0.0, 3.0), 60.0, 800.0 / 600.0, 0.1, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    fn project(camera: &Camera, view_point: Vec3) -> Vec3 {
        let clip = camera.projection_matrix() * Vec4::new(view_point.x, view_point.y, view_point.z, 1.0);
        Vec3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w)
    }

    /// Near and far planes land on depth 0 and 1
    #[test]
    fn test_depth_range() {
        let camera = Camera::perspective(Vec3::zeros(), 90.0, 1.0, 0.5, 50.0);
        assert_relative_eq!(project(&camera, Vec3::new(0.0, 0.0, -0.5)).z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(project(&camera, Vec3::new(0.0, 0.0, -50.0)).z, 1.0, epsilon = 1e-5);
    }

    /// Projection keeps +Y up; only the uniform store flips it
    #[test]
    fn test_projection_is_y_up() {
        let camera = Camera::perspective(Vec3::zeros(), 90.0, 1.0, 0.1, 10.0);
        let ndc = project(&camera, Vec3::new(0.0, 1.0, -2.0));
        assert!(ndc.y > 0.0);
        assert_relative_eq!(ndc.y, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_view_moves_target_to_negative_z() {
        let mut camera = Camera::default();
        camera.orbit(Vec3::zeros(), 4.0, 0.3, 0.2);

        let target_in_view = camera.view_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(target_in_view.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(target_in_view.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(target_in_view.z, -4.0, epsilon = 1e-4);
    }

    #[test]
    fn test_yaw_pitch_direction() {
        let mut camera = Camera::default();
        camera.set_position(Vec3::new(1.0, 2.0, 3.0));
        camera.set_yaw_pitch(0.0, 0.0);
        assert_relative_eq!(camera.target, Vec3::new(1.0, 2.0, 2.0), epsilon = 1e-6);
    }
}
