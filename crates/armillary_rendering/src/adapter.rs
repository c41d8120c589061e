//! Scene Adapter - decorations in, meshes out.
//!
//! The only place that knows how each primitive is tessellated. The
//! result depends on nothing but the decoration itself: the same
//! decoration always yields the same mesh.
//!
//! ```text
//! Decoration ─► Shape::accept(MeshBuilder) ─► local Mesh
//!                                                │ × decoration.transform
//!                                                ▼
//!                          representation ─► Surface | Wireframe | Points
//! ```

use crate::decoration::{Decoration, Representation, ShapeVisitor};
use crate::mesh::{Mesh, Topology};
use armillary_shared::{Color, Real, Vec3};
use std::f64::consts::{PI, TAU};

/// Configuration for tessellation
#[derive(Debug, Clone, Copy)]
pub struct SceneAdapter {
    /// Longitude divisions at resolution 1
    pub base_slices: u32,
    /// Latitude divisions at resolution 1
    pub base_stacks: u32,
}

impl Default for SceneAdapter {
    fn default() -> Self {
        Self { base_slices: 16, base_stacks: 8 }
    }
}

/// Never tessellate coarser than this.
const MIN_SLICES: u32 = 4;
const MIN_STACKS: u32 = 2;

/// Resolutions above this are clamped.
const MAX_RESOLUTION: Real = 16.0;

impl SceneAdapter {
    /// Creates an adapter with the default 16 x 8 tessellation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the mesh for `decoration`, in the frame the decoration's
    /// transform is measured from.
    #[must_use]
    pub fn render(&self, decoration: &Decoration) -> Mesh {
        let (slices, stacks) = self.tessellation(decoration.resolution_or_default());
        let mut builder = MeshBuilder {
            slices,
            stacks,
            colored_axes: decoration.appearance.color.is_none(),
        };
        let local = decoration.shape.accept(&mut builder);
        let placed = if decoration.transform.is_identity() {
            local
        } else {
            local.transformed(&decoration.transform)
        };
        match decoration.appearance.representation.unwrap_or_default() {
            Representation::Surface => placed,
            Representation::Wireframe => placed.to_wireframe(),
            Representation::Points => placed.to_points(),
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn tessellation(&self, resolution: Real) -> (u32, u32) {
        let resolution = if resolution.is_finite() && resolution > 0.0 {
            resolution.min(MAX_RESOLUTION)
        } else {
            1.0
        };
        let slices = (Real::from(self.base_slices) * resolution).round() as u32;
        let stacks = (Real::from(self.base_stacks) * resolution).round() as u32;
        (slices.max(MIN_SLICES), stacks.max(MIN_STACKS))
    }
}

/// Visitor producing a mesh in the shape's own frame.
struct MeshBuilder {
    slices: u32,
    stacks: u32,
    colored_axes: bool,
}

impl MeshBuilder {
    /// UV sphere scaled per axis. Normals follow the ellipsoid gradient.
    fn ellipsoid_mesh(&self, radii: Vec3) -> Mesh {
        let mut mesh = Mesh::new(Topology::Triangles);
        let inv_sq = Vec3::new(
            1.0 / (radii.x * radii.x).max(Real::EPSILON),
            1.0 / (radii.y * radii.y).max(Real::EPSILON),
            1.0 / (radii.z * radii.z).max(Real::EPSILON),
        );

        for stack in 0..=self.stacks {
            let phi = PI * Real::from(stack) / Real::from(self.stacks);
            let (sin_phi, cos_phi) = phi.sin_cos();
            for slice in 0..=self.slices {
                let theta = TAU * Real::from(slice) / Real::from(self.slices);
                let (sin_theta, cos_theta) = theta.sin_cos();
                let unit = Vec3::new(sin_phi * cos_theta, cos_phi, sin_phi * sin_theta);
                let p = unit.scale(radii);
                let n = p.scale(inv_sq).try_normalize().unwrap_or(unit);
                mesh.push_vertex(p, n);
            }
        }

        let ring = self.slices + 1;
        for stack in 0..self.stacks {
            for slice in 0..self.slices {
                let a = stack * ring + slice;
                let b = a + ring;
                if stack != 0 {
                    mesh.indices.extend([a, a + 1, b]);
                }
                if stack != self.stacks - 1 {
                    mesh.indices.extend([a + 1, b + 1, b]);
                }
            }
        }
        mesh
    }
}

/// Outward normal and the four corner sign patterns of each box face.
const BRICK_FACES: [([f64; 3], [[f64; 3]; 4]); 6] = [
    ([1.0, 0.0, 0.0], [[1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0], [1.0, -1.0, 1.0]]),
    ([-1.0, 0.0, 0.0], [[-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0], [-1.0, -1.0, -1.0]]),
    ([0.0, 1.0, 0.0], [[-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0]]),
    ([0.0, -1.0, 0.0], [[-1.0, -1.0, 1.0], [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0]]),
    ([0.0, 0.0, 1.0], [[-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]]),
    ([0.0, 0.0, -1.0], [[1.0, -1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0]]),
];

impl ShapeVisitor for MeshBuilder {
    type Output = Mesh;

    fn visit_brick(&mut self, half_lengths: Vec3) -> Mesh {
        let mut mesh = Mesh::new(Topology::Triangles);
        for (normal, corners) in BRICK_FACES {
            let normal = Vec3::from_array(normal);
            let [base, ..] = corners.map(|c| mesh.push_vertex(Vec3::from_array(c).scale(half_lengths), normal));
            mesh.indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    fn visit_sphere(&mut self, radius: Real) -> Mesh {
        self.ellipsoid_mesh(Vec3::splat(radius))
    }

    fn visit_ellipsoid(&mut self, radii: Vec3) -> Mesh {
        self.ellipsoid_mesh(radii)
    }

    fn visit_line(&mut self, from: Vec3, to: Vec3) -> Mesh {
        Mesh::segment(from, to)
    }

    fn visit_frame(&mut self, axis_length: Real) -> Mesh {
        let axes = [(Vec3::X, Color::RED), (Vec3::Y, Color::GREEN), (Vec3::Z, Color::BLUE)];
        let mut mesh = Mesh::new(Topology::Lines);
        for (axis, color) in axes {
            let tip = axis * axis_length;
            let (a, b) = if self.colored_axes {
                (mesh.push_colored_vertex(Vec3::ZERO, color), mesh.push_colored_vertex(tip, color))
            } else {
                (mesh.push_vertex(Vec3::ZERO, Vec3::ZERO), mesh.push_vertex(tip, Vec3::ZERO))
            };
            mesh.indices.extend([a, b]);
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armillary_shared::Transform;

    #[test]
    fn test_brick_has_24_vertices_and_12_triangles() {
        let mesh = SceneAdapter::new().render(&Decoration::brick(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(mesh.topology, Topology::Triangles);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.indices.len(), 36);
        let b = mesh.bounds().unwrap();
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(b.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_sphere_vertices_on_surface() {
        let mesh = SceneAdapter::new().render(&Decoration::sphere(2.0));
        assert_eq!(mesh.vertex_count(), 17 * 9);
        for p in &mesh.positions {
            assert!((p.length() - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_resolution_scales_tessellation() {
        let adapter = SceneAdapter::new();
        let fine = adapter.render(&Decoration::sphere(1.0).with_resolution(2.0));
        assert_eq!(fine.vertex_count(), 33 * 17);
        let coarse = adapter.render(&Decoration::sphere(1.0).with_resolution(0.01));
        assert_eq!(coarse.vertex_count(), 5 * 3);
    }

    #[test]
    fn test_huge_resolution_is_clamped() {
        let adapter = SceneAdapter::new();
        assert_eq!(adapter.tessellation(1e9), (256, 128));
        let mesh = adapter.render(&Decoration::ellipsoid(Vec3::splat(1.0)).with_resolution(1e9));
        assert_eq!(mesh.vertex_count(), 257 * 129);
    }

    #[test]
    fn test_ellipsoid_extent() {
        let mesh = SceneAdapter::new().render(&Decoration::ellipsoid(Vec3::new(1.0, 0.5, 0.25)));
        let b = mesh.bounds().unwrap();
        assert!((b.max.y - 0.5).abs() < 1e-12);
        assert!((b.min.y + 0.5).abs() < 1e-12);
        assert!(b.max.z <= 0.25 + 1e-12);
    }

    #[test]
    fn test_frame_axes_colored_unless_overridden() {
        let adapter = SceneAdapter::new();
        let mesh = adapter.render(&Decoration::frame(1.0));
        assert_eq!(mesh.topology, Topology::Lines);
        assert_eq!(mesh.indices.len(), 6);
        assert!(mesh.has_vertex_colors());
        assert_eq!(mesh.colors[0], Color::RED);
        assert_eq!(mesh.colors[5], Color::BLUE);

        let plain = adapter.render(&Decoration::frame(1.0).with_color(Color::GRAY));
        assert!(!plain.has_vertex_colors());
    }

    #[test]
    fn test_transform_applied() {
        let d = Decoration::line(Vec3::ZERO, Vec3::X)
            .with_transform(Transform::from_translation(Vec3::new(0.0, 3.0, 0.0)));
        let mesh = SceneAdapter::new().render(&d);
        assert_eq!(mesh.positions, vec![Vec3::new(0.0, 3.0, 0.0), Vec3::new(1.0, 3.0, 0.0)]);
    }

    #[test]
    fn test_representation_changes_topology() {
        let adapter = SceneAdapter::new();
        let wire = adapter.render(&Decoration::brick(Vec3::splat(1.0)).with_representation(Representation::Wireframe));
        assert_eq!(wire.topology, Topology::Lines);
        let points = adapter.render(&Decoration::sphere(0.1).with_representation(Representation::Points));
        assert_eq!(points.topology, Topology::Points);
        assert_eq!(points.indices.len(), points.vertex_count());
    }
}
