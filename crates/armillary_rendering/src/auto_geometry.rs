//! Geometry generated from the system's own structure.
//!
//! Every body gets its frame triad and a mass-center marker; every
//! joint shows both of its frames, the one on the parent drawn in the
//! child's color so the pair can be matched up on screen.

use crate::decoration::{Decoration, Representation};
use crate::physics::MultibodySystem;
use armillary_shared::{BodyHandle, Color, Real, Transform, Vec3};

/// One generated attachment: `(body, attach transform, decoration)`.
pub(crate) type Attachment = (BodyHandle, Transform, Decoration);

/// Body sizes: `base`, grown to reach each body's joint frames.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn body_scales<P: MultibodySystem>(system: &P, base: Real) -> Vec<Real> {
    let count = system.body_count();
    let mut scales = vec![base; count];
    for index in 1..count {
        let body = BodyHandle::new(index as u32);
        let outboard = system.default_outboard_frame(body).translation.length();
        if outboard > scales[index] {
            scales[index] = outboard;
        }
        if let Some(parent) = system.parent_body(body) {
            let inboard = system.default_inboard_frame(body).translation.length();
            if let Some(s) = scales.get_mut(parent.index()) {
                if inboard > *s {
                    *s = inboard;
                }
            }
        }
    }
    scales
}

/// Frames, joint markers and mass-center markers for every body.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn default_geometry<P: MultibodySystem>(
    system: &P,
    scales: &[Real],
    colors: &[Color],
) -> Vec<Attachment> {
    let mut out = Vec::new();
    for (index, &scale) in scales.iter().enumerate() {
        let body = BodyHandle::new(index as u32);

        out.push((body, Transform::IDENTITY, Decoration::frame(scale * 0.5).with_line_thickness(2.0)));

        if let Some(parent) = system.parent_body(body) {
            let outboard = system.default_outboard_frame(body);
            if !outboard.is_identity() {
                out.push((body, outboard, Decoration::frame(scale * 0.25)));
                if outboard.translation != Vec3::ZERO {
                    out.push((body, Transform::IDENTITY, Decoration::line(Vec3::ZERO, outboard.translation)));
                }
            }

            let pscale = scales.get(parent.index()).copied().unwrap_or(scale);
            let inboard = system.default_inboard_frame(body);
            let mut on_parent = Decoration::frame(pscale * 0.25);
            if let Some(&color) = colors.get(index) {
                on_parent = on_parent.with_color(color);
            }
            out.push((parent, inboard, on_parent));
            if inboard.translation != Vec3::ZERO {
                out.push((parent, Transform::IDENTITY, Decoration::line(Vec3::ZERO, inboard.translation)));
            }
        }

        let com = system.default_mass_center(body);
        out.push((
            body,
            Transform::from_translation(com),
            Decoration::sphere(scale * 0.05)
                .with_color(Color::PURPLE)
                .with_representation(Representation::Points),
        ));
        if com != Vec3::ZERO {
            out.push((body, Transform::IDENTITY, Decoration::line(Vec3::ZERO, com)));
        }
    }
    out
}
