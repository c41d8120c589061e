//! Backend-neutral geometry.
//!
//! A [`Mesh`] is what the scene adapter produces and what every scene
//! backend consumes. Positions stay in double precision; backends narrow
//! them at upload time.

use armillary_shared::{Color, Real, Transform, Vec3};
use std::collections::HashSet;

/// Primitive assembly for a mesh's index list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Every 3 indices form a triangle
    Triangles,
    /// Every 2 indices form a segment
    Lines,
    /// Every index is a point
    Points,
}

/// Indexed geometry with optional per-vertex colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Vertex normals (zero for lines and points)
    pub normals: Vec<Vec3>,
    /// Per-vertex colors; empty means "use the actor color"
    pub colors: Vec<Color>,
    /// Index list, interpreted by `topology`
    pub indices: Vec<u32>,
    /// How indices are assembled
    pub topology: Topology,
}

impl Mesh {
    /// Empty mesh with the given topology.
    #[must_use]
    pub const fn new(topology: Topology) -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            colors: Vec::new(),
            indices: Vec::new(),
            topology,
        }
    }

    /// One segment between two points.
    #[must_use]
    pub fn segment(from: Vec3, to: Vec3) -> Self {
        let mut mesh = Self::new(Topology::Lines);
        let a = mesh.push_vertex(from, Vec3::ZERO);
        let b = mesh.push_vertex(to, Vec3::ZERO);
        mesh.indices.extend([a, b]);
        mesh
    }

    /// Appends a vertex and returns its index.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(normal);
        index
    }

    /// Appends a colored vertex. Mixing colored and uncolored vertices in
    /// one mesh is not supported.
    pub fn push_colored_vertex(&mut self, position: Vec3, color: Color) -> u32 {
        self.colors.push(color);
        self.push_vertex(position, Vec3::ZERO)
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// True when there is nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// True when the mesh carries its own colors.
    #[must_use]
    pub fn has_vertex_colors(&self) -> bool {
        !self.colors.is_empty() && self.colors.len() == self.positions.len()
    }

    /// Axis-aligned bounds of the vertices, `None` when empty.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.positions.iter().copied())
    }

    /// Copy with every position and normal mapped through `transform`.
    #[must_use]
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self {
            positions: self.positions.iter().map(|&p| transform.transform_point(p)).collect(),
            normals: self.normals.iter().map(|&n| transform.transform_vector(n)).collect(),
            colors: self.colors.clone(),
            indices: self.indices.clone(),
            topology: self.topology,
        }
    }

    /// Edges of the triangles as a line list. Lines and points pass through.
    #[must_use]
    pub fn to_wireframe(&self) -> Self {
        if self.topology != Topology::Triangles {
            return self.clone();
        }
        let mut seen = HashSet::with_capacity(self.indices.len());
        let mut indices = Vec::with_capacity(self.indices.len() * 2);
        for tri in self.indices.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                if seen.insert((a.min(b), a.max(b))) {
                    indices.extend([a, b]);
                }
            }
        }
        Self { indices, topology: Topology::Lines, ..self.clone() }
    }

    /// Every vertex as a point.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn to_points(&self) -> Self {
        Self {
            indices: (0..self.positions.len() as u32).collect(),
            topology: Topology::Points,
            ..self.clone()
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Bounds {
    /// Box around a point set, `None` when the set is empty.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self { min: first, max: first }, |b, p| Self {
            min: b.min.min(p),
            max: b.max.max(p),
        }))
    }

    /// Smallest box containing both.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Radius of the bounding sphere (half the diagonal).
    #[must_use]
    pub fn radius(&self) -> Real {
        (self.max - self.min).length() * 0.5
    }

    /// Bounds of this box's corners after `transform`.
    #[must_use]
    pub fn transformed(&self, transform: &Transform) -> Self {
        let (lo, hi) = (self.min, self.max);
        let corners = [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ];
        let mut out = Self { min: transform.transform_point(lo), max: transform.transform_point(lo) };
        for c in corners {
            let p = transform.transform_point(c);
            out.min = out.min.min(p);
            out.max = out.max.max(p);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        let mut mesh = Mesh::new(Topology::Triangles);
        for p in [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y] {
            mesh.push_vertex(p, Vec3::Z);
        }
        mesh.indices.extend([0, 1, 2, 0, 2, 3]);
        mesh
    }

    #[test]
    fn test_wireframe_dedups_shared_edges() {
        let wire = quad().to_wireframe();
        assert_eq!(wire.topology, Topology::Lines);
        // 4 outer edges + 1 diagonal
        assert_eq!(wire.indices.len(), 10);
    }

    #[test]
    fn test_points_cover_all_vertices() {
        let points = quad().to_points();
        assert_eq!(points.topology, Topology::Points);
        assert_eq!(points.indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_bounds() {
        let b = quad().bounds().unwrap();
        assert_eq!(b.min, Vec3::ZERO);
        assert_eq!(b.max, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(b.center(), Vec3::new(0.5, 0.5, 0.0));
        assert!(Mesh::new(Topology::Lines).bounds().is_none());
    }

    #[test]
    fn test_transformed_moves_positions() {
        let t = Transform::from_translation(Vec3::new(0.0, 0.0, 5.0));
        let moved = Mesh::segment(Vec3::ZERO, Vec3::X).transformed(&t);
        assert_eq!(moved.positions, vec![Vec3::new(0.0, 0.0, 5.0), Vec3::new(1.0, 0.0, 5.0)]);
    }
}
