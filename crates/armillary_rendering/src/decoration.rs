//! Decorative Geometry - what a body looks like, not what it is.
//!
//! A [`Decoration`] is a plain value: a closed set of primitive
//! [`Shape`]s, a transform relative to the frame it is attached to, and an
//! [`Appearance`] whose fields are optional. Unset fields are resolved by
//! whoever consumes the decoration, never at construction time.
//!
//! ```text
//! Decoration ──attached(X_GD)──► Decoration'   (transform = X_GD * X_DS)
//!      │
//!      └── appearance.resolve(body color) ──► ResolvedAppearance
//! ```

use armillary_shared::{BodyHandle, Color, Real, Transform, Vec3};
use serde::{Deserialize, Serialize};

/// How a surface is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    /// Vertices only
    Points,
    /// Edges only
    Wireframe,
    /// Filled triangles
    #[default]
    Surface,
}

/// Geometric primitive, in its own local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Axis-aligned box centered on the origin
    Brick {
        /// Half-extents along x, y, z
        half_lengths: Vec3,
    },
    /// Sphere centered on the origin
    Sphere {
        /// Radius
        radius: Real,
    },
    /// Axis-aligned ellipsoid centered on the origin
    Ellipsoid {
        /// Semi-axes along x, y, z
        radii: Vec3,
    },
    /// Single segment
    Line {
        /// First endpoint
        from: Vec3,
        /// Second endpoint
        to: Vec3,
    },
    /// Coordinate triad along +x, +y, +z
    Frame {
        /// Length of each axis
        axis_length: Real,
    },
}

/// Per-primitive dispatch.
///
/// Adding a shape means adding a variant and a method here; every
/// implementor then fails to compile until it handles the new kind.
pub trait ShapeVisitor {
    /// Result of visiting a shape
    type Output;

    /// Box with the given half-extents
    fn visit_brick(&mut self, half_lengths: Vec3) -> Self::Output;
    /// Sphere with the given radius
    fn visit_sphere(&mut self, radius: Real) -> Self::Output;
    /// Ellipsoid with the given semi-axes
    fn visit_ellipsoid(&mut self, radii: Vec3) -> Self::Output;
    /// Line segment
    fn visit_line(&mut self, from: Vec3, to: Vec3) -> Self::Output;
    /// Coordinate triad
    fn visit_frame(&mut self, axis_length: Real) -> Self::Output;
}

impl Shape {
    /// Dispatches to the matching visitor method.
    pub fn accept<V: ShapeVisitor>(&self, visitor: &mut V) -> V::Output {
        match *self {
            Self::Brick { half_lengths } => visitor.visit_brick(half_lengths),
            Self::Sphere { radius } => visitor.visit_sphere(radius),
            Self::Ellipsoid { radii } => visitor.visit_ellipsoid(radii),
            Self::Line { from, to } => visitor.visit_line(from, to),
            Self::Frame { axis_length } => visitor.visit_frame(axis_length),
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Brick { .. } => "brick",
            Self::Sphere { .. } => "sphere",
            Self::Ellipsoid { .. } => "ellipsoid",
            Self::Line { .. } => "line",
            Self::Frame { .. } => "frame",
        }
    }
}

/// Visual attributes; `None` means "inherit from whoever draws it".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Appearance {
    /// Color override
    pub color: Option<Color>,
    /// Opacity in `[0, 1]`
    pub opacity: Option<Real>,
    /// Line width in pixels
    pub line_thickness: Option<Real>,
    /// Draw mode
    pub representation: Option<Representation>,
}

/// Appearance with every field filled in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedAppearance {
    /// Color
    pub color: Color,
    /// Opacity
    pub opacity: Real,
    /// Line width
    pub line_thickness: Real,
    /// Draw mode
    pub representation: Representation,
}

impl Appearance {
    /// Fills unset fields: `default_color`, opacity 1, thickness 1, surface.
    #[must_use]
    pub fn resolve(&self, default_color: Color) -> ResolvedAppearance {
        ResolvedAppearance {
            color: self.color.unwrap_or(default_color),
            opacity: self.opacity.unwrap_or(1.0),
            line_thickness: self.line_thickness.unwrap_or(1.0),
            representation: self.representation.unwrap_or_default(),
        }
    }
}

/// A renderable primitive plus how and where to draw it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decoration {
    /// Primitive
    pub shape: Shape,
    /// Placement relative to the frame it is attached to
    pub transform: Transform,
    /// Visual attributes
    pub appearance: Appearance,
    /// Tessellation multiplier, 1 when unset
    pub resolution: Option<Real>,
    /// Body whose frame `transform` is measured in; ground when unset
    pub body: Option<BodyHandle>,
}

impl Decoration {
    /// Wraps a shape with identity placement and default appearance.
    #[must_use]
    pub const fn new(shape: Shape) -> Self {
        Self {
            shape,
            transform: Transform::IDENTITY,
            appearance: Appearance {
                color: None,
                opacity: None,
                line_thickness: None,
                representation: None,
            },
            resolution: None,
            body: None,
        }
    }

    /// Box with the given half-extents.
    #[must_use]
    pub const fn brick(half_lengths: Vec3) -> Self {
        Self::new(Shape::Brick { half_lengths })
    }

    /// Sphere.
    #[must_use]
    pub const fn sphere(radius: Real) -> Self {
        Self::new(Shape::Sphere { radius })
    }

    /// Ellipsoid.
    #[must_use]
    pub const fn ellipsoid(radii: Vec3) -> Self {
        Self::new(Shape::Ellipsoid { radii })
    }

    /// Line segment between two points.
    #[must_use]
    pub const fn line(from: Vec3, to: Vec3) -> Self {
        Self::new(Shape::Line { from, to })
    }

    /// Coordinate triad.
    #[must_use]
    pub const fn frame(axis_length: Real) -> Self {
        Self::new(Shape::Frame { axis_length })
    }

    /// Sets the color.
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.appearance.color = Some(color);
        self
    }

    /// Sets the opacity.
    #[must_use]
    pub fn with_opacity(mut self, opacity: Real) -> Self {
        self.appearance.opacity = Some(opacity);
        self
    }

    /// Sets the line thickness.
    #[must_use]
    pub fn with_line_thickness(mut self, thickness: Real) -> Self {
        self.appearance.line_thickness = Some(thickness);
        self
    }

    /// Sets the draw mode.
    #[must_use]
    pub fn with_representation(mut self, representation: Representation) -> Self {
        self.appearance.representation = Some(representation);
        self
    }

    /// Sets the tessellation multiplier. Values above 16 draw as 16.
    #[must_use]
    pub fn with_resolution(mut self, resolution: Real) -> Self {
        self.resolution = Some(resolution);
        self
    }

    /// Replaces the placement transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Binds to a body.
    #[must_use]
    pub fn with_body(mut self, body: BodyHandle) -> Self {
        self.body = Some(body);
        self
    }

    /// Pre-multiplies the placement: `attach * transform`.
    ///
    /// Repeated calls accumulate; nothing is overwritten.
    #[must_use]
    pub fn attached(mut self, attach: Transform) -> Self {
        self.transform = attach * self.transform;
        self
    }

    /// Resolution multiplier with the default applied.
    #[must_use]
    pub fn resolution_or_default(&self) -> Real {
        self.resolution.unwrap_or(1.0)
    }

    /// Body this decoration is measured in; ground when unbound.
    #[must_use]
    pub fn body_or_ground(&self) -> BodyHandle {
        self.body.unwrap_or(BodyHandle::GROUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armillary_shared::Rotation;

    #[test]
    fn test_unset_fields_resolve_to_defaults() {
        let resolved = Decoration::sphere(1.0).appearance.resolve(Color::RED);
        assert_eq!(resolved.color, Color::RED);
        assert_eq!(resolved.opacity, 1.0);
        assert_eq!(resolved.line_thickness, 1.0);
        assert_eq!(resolved.representation, Representation::Surface);
    }

    #[test]
    fn test_each_set_field_overrides() {
        let d = Decoration::sphere(1.0)
            .with_color(Color::BLUE)
            .with_opacity(0.25)
            .with_line_thickness(3.0)
            .with_representation(Representation::Wireframe);
        let resolved = d.appearance.resolve(Color::RED);
        assert_eq!(resolved.color, Color::BLUE);
        assert_eq!(resolved.opacity, 0.25);
        assert_eq!(resolved.line_thickness, 3.0);
        assert_eq!(resolved.representation, Representation::Wireframe);

        // Partial: only opacity set
        let resolved = Decoration::sphere(1.0).with_opacity(0.5).appearance.resolve(Color::GRAY);
        assert_eq!(resolved.color, Color::GRAY);
        assert_eq!(resolved.opacity, 0.5);
        assert_eq!(resolved.representation, Representation::Surface);
    }

    #[test]
    fn test_attach_accumulates() {
        let a = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let b = Transform::from_rotation(Rotation::about_z(0.5));
        let d = Decoration::brick(Vec3::splat(0.1))
            .with_transform(Transform::from_translation(Vec3::Y))
            .attached(b)
            .attached(a);
        assert_eq!(d.transform, a * (b * Transform::from_translation(Vec3::Y)));
    }

    #[test]
    fn test_builders_return_new_values() {
        let base = Decoration::line(Vec3::ZERO, Vec3::X);
        let colored = base.with_color(Color::ORANGE);
        assert_eq!(base.appearance.color, None);
        assert_eq!(colored.appearance.color, Some(Color::ORANGE));
    }

    struct Namer;

    impl ShapeVisitor for Namer {
        type Output = &'static str;
        fn visit_brick(&mut self, _: Vec3) -> &'static str { "brick" }
        fn visit_sphere(&mut self, _: Real) -> &'static str { "sphere" }
        fn visit_ellipsoid(&mut self, _: Vec3) -> &'static str { "ellipsoid" }
        fn visit_line(&mut self, _: Vec3, _: Vec3) -> &'static str { "line" }
        fn visit_frame(&mut self, _: Real) -> &'static str { "frame" }
    }

    #[test]
    fn test_visitor_dispatch_matches_name() {
        let shapes = [
            Decoration::brick(Vec3::splat(1.0)).shape,
            Decoration::sphere(1.0).shape,
            Decoration::ellipsoid(Vec3::splat(1.0)).shape,
            Decoration::line(Vec3::ZERO, Vec3::X).shape,
            Decoration::frame(1.0).shape,
        ];
        for shape in shapes {
            assert_eq!(shape.accept(&mut Namer), shape.name());
        }
    }
}
