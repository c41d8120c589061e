//! Rigid-body math shared between the physics side and the renderer.
//!
//! Everything is double precision: poses come straight out of the
//! multibody system and are only narrowed to `f32` at GPU upload.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Scalar type used for all physical quantities.
pub type Real = f64;

/// 3D vector - positions, stations, directions.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: Real,
    /// Y component
    pub y: Real,
    /// Z component
    pub z: Real,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: Real, y: Real, z: Real) -> Self {
        Self { x, y, z }
    }

    /// Vector with all three components equal.
    #[must_use]
    pub const fn splat(v: Real) -> Self {
        Self::new(v, v, v)
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Unit X vector
    pub const X: Self = Self::new(1.0, 0.0, 0.0);

    /// Unit Y vector
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Unit Z vector
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [Real; 3] {
        [self.x, self.y, self.z]
    }

    /// Creates from array
    #[must_use]
    pub const fn from_array(arr: [Real; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }

    /// Narrows to single precision for GPU buffers.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn to_f32_array(self) -> [f32; 3] {
        [self.x as f32, self.y as f32, self.z as f32]
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> Real {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> Real {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> Real {
        self.length_squared().sqrt()
    }

    /// Distance to another point
    #[must_use]
    pub fn distance(self, other: Self) -> Real {
        (self - other).length()
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector.
    #[must_use]
    pub fn try_normalize(self) -> Option<Self> {
        let len = self.length();
        if len > Real::EPSILON {
            Some(self / len)
        } else {
            None
        }
    }

    /// Component-wise minimum.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Component-wise product.
    #[must_use]
    pub fn scale(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    /// Smallest component.
    #[must_use]
    pub fn min_element(self) -> Real {
        self.x.min(self.y).min(self.z)
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl std::ops::Mul<Real> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: Real) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::Div<Real> for Vec3 {
    type Output = Self;
    fn div(self, rhs: Real) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

/// Unit quaternion rotation.
///
/// Composition follows the frame convention `R_AC = R_AB * R_BC`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Rotation {
    /// X component
    pub x: Real,
    /// Y component
    pub y: Real,
    /// Z component
    pub z: Real,
    /// W (scalar) component
    pub w: Real,
}

impl Rotation {
    /// Identity rotation
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    /// Rotation of `angle` radians about `axis`. A zero axis yields identity.
    #[must_use]
    pub fn about_axis(angle: Real, axis: Vec3) -> Self {
        let Some(axis) = axis.try_normalize() else {
            return Self::IDENTITY;
        };
        let (s, c) = (angle * 0.5).sin_cos();
        Self { x: axis.x * s, y: axis.y * s, z: axis.z * s, w: c }
    }

    /// Rotation about the X axis.
    #[must_use]
    pub fn about_x(angle: Real) -> Self {
        Self::about_axis(angle, Vec3::X)
    }

    /// Rotation about the Y axis.
    #[must_use]
    pub fn about_y(angle: Real) -> Self {
        Self::about_axis(angle, Vec3::Y)
    }

    /// Rotation about the Z axis.
    #[must_use]
    pub fn about_z(angle: Real) -> Self {
        Self::about_axis(angle, Vec3::Z)
    }

    /// Angle-axis form, angle in `[0, pi]`. Identity returns `(0, Z)`.
    #[must_use]
    pub fn to_angle_axis(self) -> (Real, Vec3) {
        let q = self.canonical();
        let sin_half = Vec3::new(q.x, q.y, q.z).length();
        if sin_half <= Real::EPSILON {
            return (0.0, Vec3::Z);
        }
        let angle = 2.0 * sin_half.atan2(q.w);
        (angle, Vec3::new(q.x, q.y, q.z) / sin_half)
    }

    /// Applies the rotation to a vector.
    #[must_use]
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let u = Vec3::new(self.x, self.y, self.z);
        let t = u.cross(v) * 2.0;
        v + t * self.w + u.cross(t)
    }

    /// Inverse (conjugate) rotation.
    #[must_use]
    pub fn inverse(self) -> Self {
        Self { x: -self.x, y: -self.y, z: -self.z, w: self.w }
    }

    /// Re-normalizes after accumulated arithmetic.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if len <= Real::EPSILON {
            return Self::IDENTITY;
        }
        Self { x: self.x / len, y: self.y / len, z: self.z / len, w: self.w / len }
    }

    /// True if this is exactly the identity rotation.
    #[must_use]
    pub fn is_identity(self) -> bool {
        let q = self.canonical();
        q.x == 0.0 && q.y == 0.0 && q.z == 0.0
    }

    /// Row-major rotation matrix: `m[r][c]` is row `r`, column `c`.
    #[must_use]
    pub fn to_matrix(self) -> [[Real; 3]; 3] {
        let Self { x, y, z, w } = self;
        [
            [1.0 - 2.0 * (y * y + z * z), 2.0 * (x * y - z * w), 2.0 * (x * z + y * w)],
            [2.0 * (x * y + z * w), 1.0 - 2.0 * (x * x + z * z), 2.0 * (y * z - x * w)],
            [2.0 * (x * z - y * w), 2.0 * (y * z + x * w), 1.0 - 2.0 * (x * x + y * y)],
        ]
    }

    /// Same rotation with non-negative scalar part.
    fn canonical(self) -> Self {
        if self.w < 0.0 {
            Self { x: -self.x, y: -self.y, z: -self.z, w: -self.w }
        } else {
            self
        }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::ops::Mul for Rotation {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let (a, b) = (self, rhs);
        Self {
            x: a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
            y: a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
            z: a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
            w: a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
        }
    }
}

/// Rigid transform - rotation followed by translation.
///
/// A body's Pose is the transform `X_GB` taking body-frame coordinates
/// into ground. Composition reads left to right: `X_GC = X_GB * X_BC`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Transform {
    /// Orientation
    pub rotation: Rotation,
    /// Origin position
    pub translation: Vec3,
}

impl Transform {
    /// Creates a new transform
    #[must_use]
    pub const fn new(rotation: Rotation, translation: Vec3) -> Self {
        Self { rotation, translation }
    }

    /// Identity transform
    pub const IDENTITY: Self = Self::new(Rotation::IDENTITY, Vec3::ZERO);

    /// Pure translation.
    #[must_use]
    pub const fn from_translation(translation: Vec3) -> Self {
        Self::new(Rotation::IDENTITY, translation)
    }

    /// Pure rotation.
    #[must_use]
    pub const fn from_rotation(rotation: Rotation) -> Self {
        Self::new(rotation, Vec3::ZERO)
    }

    /// Maps a point expressed in this frame into the parent frame.
    #[must_use]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation.rotate(p) + self.translation
    }

    /// Maps a direction (no translation).
    #[must_use]
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.rotation.rotate(v)
    }

    /// Inverse transform.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let inv = self.rotation.inverse();
        Self::new(inv, -inv.rotate(self.translation))
    }

    /// True if both parts are exact identities.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.rotation.is_identity() && self.translation == Vec3::ZERO
    }

    /// Column-major 4x4 matrix in single precision (GPU layout).
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        let m = self.rotation.to_matrix();
        let t = self.translation;
        [
            [m[0][0] as f32, m[1][0] as f32, m[2][0] as f32, 0.0],
            [m[0][1] as f32, m[1][1] as f32, m[2][1] as f32, 0.0],
            [m[0][2] as f32, m[1][2] as f32, m[2][2] as f32, 0.0],
            [t.x as f32, t.y as f32, t.z as f32, 1.0],
        ]
    }
}

impl std::ops::Mul for Transform {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.rotation * rhs.rotation,
            self.transform_point(rhs.translation),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-12
    }

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        let sum = a + b;
        assert_eq!(sum, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(a.dot(b), 32.0);
        assert_eq!(Vec3::X.cross(Vec3::Y), Vec3::Z);
    }

    #[test]
    fn test_rotation_about_z() {
        let r = Rotation::about_z(FRAC_PI_2);
        assert!(close(r.rotate(Vec3::X), Vec3::Y));
        assert!(close(r.rotate(Vec3::Y), -Vec3::X));
    }

    #[test]
    fn test_angle_axis_recovers_input() {
        let axis = Vec3::new(1.0, 2.0, -2.0).try_normalize().unwrap();
        let (angle, out_axis) = Rotation::about_axis(2.5, axis).to_angle_axis();
        assert!((angle - 2.5).abs() < 1e-12);
        assert!(close(out_axis, axis));

        let (angle, _) = Rotation::IDENTITY.to_angle_axis();
        assert_eq!(angle, 0.0);
    }

    #[test]
    fn test_matrix_matches_rotate() {
        let r = Rotation::about_axis(0.7, Vec3::new(0.3, -1.0, 0.5));
        let m = r.to_matrix();
        let v = Vec3::new(0.2, -0.4, 1.3);
        let mv = Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        );
        assert!(close(mv, r.rotate(v)));
    }

    #[test]
    fn test_transform_composition() {
        let x_gb = Transform::new(Rotation::about_z(FRAC_PI_2), Vec3::new(1.0, 0.0, 0.0));
        let x_bc = Transform::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let x_gc = x_gb * x_bc;

        // Station (0,2,0) in B is rotated onto -X then shifted.
        assert!(close(x_gc.translation, Vec3::new(-1.0, 0.0, 0.0)));
        let p = Vec3::new(0.5, 0.0, 0.0);
        assert!(close(x_gc.transform_point(p), x_gb.transform_point(x_bc.transform_point(p))));
    }

    #[test]
    fn test_transform_inverse() {
        let x = Transform::new(Rotation::about_axis(PI / 3.0, Vec3::new(1.0, 1.0, 0.0)), Vec3::new(1.0, -2.0, 3.0));
        let p = Vec3::new(0.1, 0.2, 0.3);
        assert!(close(x.inverse().transform_point(x.transform_point(p)), p));
        assert!((x * x.inverse()).translation.length() < 1e-12);
    }

    #[test]
    fn test_transform_bytemuck() {
        let t = Transform::IDENTITY;
        let bytes: &[u8] = bytemuck::bytes_of(&t);
        assert_eq!(bytes.len(), 7 * 8);
    }
}
