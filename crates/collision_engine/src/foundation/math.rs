//! Math utilities and types
//!
//! Provides fundamental math types for 3D collision queries.

pub use nalgebra::{Matrix4, Point3 as NPoint3, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = NPoint3<f32>;

/// Flatten a vector into a plain 3-element array.
pub fn vector_to_array(v: &Vec3) -> [f32; 3] {
    [v.x, v.y, v.z]
}

/// Rebuild a vector from a plain 3-element array.
///
/// Inverse of [`vector_to_array`]; bit-exact round trip for finite inputs.
pub fn vector_from_array(a: [f32; 3]) -> Vec3 {
    Vec3::new(a[0], a[1], a[2])
}

/// Flatten a matrix into a 16-element array, column-major.
pub fn matrix_to_array(m: &Mat4) -> [f32; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(m.as_slice());
    out
}

/// Rebuild a matrix from a 16-element column-major array.
pub fn matrix_from_array(a: &[f32; 16]) -> Mat4 {
    Mat4::from_column_slice(a)
}
