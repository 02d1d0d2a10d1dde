//! Math utilities and types
//!
//! Thin aliases over nalgebra so renderer code reads in f32 graphics terms.

pub use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Degrees to radians
pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees.to_radians()
}

/// Component-wise minimum of two vectors
pub fn min_vec3(a: &Vec3, b: &Vec3) -> Vec3 {
    a.inf(b)
}

/// Component-wise maximum of two vectors
pub fn max_vec3(a: &Vec3, b: &Vec3) -> Vec3 {
    a.sup(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_component_wise_bounds() {
        let a = Vec3::new(1.0, -2.0, 3.0);
        let b = Vec3::new(-1.0, 2.0, 0.5);

        assert_relative_eq!(min_vec3(&a, &b), Vec3::new(-1.0, -2.0, 0.5));
        assert_relative_eq!(max_vec3(&a, &b), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_deg_to_rad() {
        assert_relative_eq!(deg_to_rad(180.0), std::f32::consts::PI);
    }
}
