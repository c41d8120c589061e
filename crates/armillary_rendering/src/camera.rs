//! Perspective camera.
//!
//! Kept in double precision like the rest of the scene; the view and
//! projection matrices are narrowed to `f32` for the GPU.

use crate::mesh::Bounds;
use armillary_shared::{Real, Vec3};

/// Smallest and largest view angle `zoom` may produce, in degrees.
const MIN_VIEW_ANGLE_DEG: Real = 0.01;
const MAX_VIEW_ANGLE_DEG: Real = 179.0;

/// Perspective camera looking from `position` at `focal_point`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    position: Vec3,
    focal_point: Vec3,
    view_up: Vec3,
    near: Real,
    far: Real,
    view_angle_deg: Real,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 1.0),
            focal_point: Vec3::ZERO,
            view_up: Vec3::Y,
            near: 0.01,
            far: 1000.0,
            view_angle_deg: 30.0,
        }
    }
}

impl Camera {
    /// Camera at `position` looking at the origin with +Y up.
    #[must_use]
    pub fn new(position: Vec3) -> Self {
        let mut camera = Self { position, ..Self::default() };
        camera.set_view_up(Vec3::Y);
        camera
    }

    /// Eye position
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Point looked at
    #[must_use]
    pub const fn focal_point(&self) -> Vec3 {
        self.focal_point
    }

    /// Up direction, orthogonal to the view direction
    #[must_use]
    pub const fn view_up(&self) -> Vec3 {
        self.view_up
    }

    /// `(near, far)` clipping distances
    #[must_use]
    pub const fn clipping_range(&self) -> (Real, Real) {
        (self.near, self.far)
    }

    /// Vertical field of view in degrees
    #[must_use]
    pub const fn view_angle_deg(&self) -> Real {
        self.view_angle_deg
    }

    /// Distance from eye to focal point
    #[must_use]
    pub fn distance(&self) -> Real {
        self.position.distance(self.focal_point)
    }

    /// Unit vector from eye toward focal point; -Z if they coincide.
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        (self.focal_point - self.position).try_normalize().unwrap_or(-Vec3::Z)
    }

    /// Moves the eye.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.orthogonalize_view_up();
    }

    /// Moves the point looked at.
    pub fn set_focal_point(&mut self, focal_point: Vec3) {
        self.focal_point = focal_point;
        self.orthogonalize_view_up();
    }

    /// Sets the up direction, projected to be perpendicular to the view.
    pub fn set_view_up(&mut self, up: Vec3) {
        self.view_up = up;
        self.orthogonalize_view_up();
    }

    /// Sets the clipping planes. Values are ordered and kept positive.
    pub fn set_clipping_range(&mut self, near: Real, far: Real) {
        let (near, far) = if near <= far { (near, far) } else { (far, near) };
        self.near = near.max(Real::EPSILON);
        self.far = far.max(self.near * 1.0001);
    }

    /// Narrows (`factor > 1`) or widens the view angle.
    pub fn zoom(&mut self, factor: Real) {
        if factor <= 0.0 || !factor.is_finite() {
            return;
        }
        self.view_angle_deg = (self.view_angle_deg / factor).clamp(MIN_VIEW_ANGLE_DEG, MAX_VIEW_ANGLE_DEG);
    }

    /// Keeps the view direction and backs the eye off until `bounds` fits.
    ///
    /// With no bounds a unit box around the origin is used.
    pub fn reset_to_bounds(&mut self, bounds: Option<Bounds>) {
        let bounds = bounds.unwrap_or(Bounds { min: Vec3::splat(-1.0), max: Vec3::splat(1.0) });
        let center = bounds.center();
        let radius = match bounds.radius() {
            r if r > Real::EPSILON => r,
            _ => 0.5,
        };
        let half_angle = self.view_angle_deg.to_radians() * 0.5;
        let distance = radius / half_angle.sin();
        let direction = self.direction();

        self.focal_point = center;
        self.position = center - direction * distance;
        self.orthogonalize_view_up();

        let far = distance + radius * 1.01;
        let near = (distance - radius * 1.01).max(far * 0.001);
        self.set_clipping_range(near, far);
    }

    /// World-to-view matrix, column major.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn view_matrix(&self) -> [[f32; 4]; 4] {
        let f = self.direction();
        let r = f.cross(self.view_up).try_normalize().unwrap_or(Vec3::X);
        let u = r.cross(f);
        let eye = self.position;
        [
            [r.x as f32, u.x as f32, -f.x as f32, 0.0],
            [r.y as f32, u.y as f32, -f.y as f32, 0.0],
            [r.z as f32, u.z as f32, -f.z as f32, 0.0],
            [-r.dot(eye) as f32, -u.dot(eye) as f32, f.dot(eye) as f32, 1.0],
        ]
    }

    /// Right-handed perspective projection with depth in `[0, 1]`.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn projection_matrix(&self, aspect: Real) -> [[f32; 4]; 4] {
        let f = 1.0 / (self.view_angle_deg.to_radians() * 0.5).tan();
        let (near, far) = (self.near, self.far);
        [
            [(f / aspect) as f32, 0.0, 0.0, 0.0],
            [0.0, f as f32, 0.0, 0.0],
            [0.0, 0.0, (far / (near - far)) as f32, -1.0],
            [0.0, 0.0, ((near * far) / (near - far)) as f32, 0.0],
        ]
    }

    /// `projection * view`, column major.
    #[must_use]
    pub fn view_projection(&self, aspect: Real) -> [[f32; 4]; 4] {
        let (a, b) = (self.projection_matrix(aspect), self.view_matrix());
        let mut result = [[0.0; 4]; 4];
        for (i, col) in result.iter_mut().enumerate() {
            for (j, cell) in col.iter_mut().enumerate() {
                *cell = (0..4).map(|k| a[k][j] * b[i][k]).sum();
            }
        }
        result
    }

    fn orthogonalize_view_up(&mut self) {
        let d = self.direction();
        let up = self.view_up - d * self.view_up.dot(d);
        self.view_up = up.try_normalize().unwrap_or_else(|| {
            // Up parallel to the view: pick any perpendicular.
            let fallback = if d.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
            (fallback - d * fallback.dot(d)).try_normalize().unwrap_or(Vec3::Y)
        });
    }
}
