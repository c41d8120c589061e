//! RGB colors for decorations and actors.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Linear RGB color, components in `[0, 1]`.
///
/// Serialized as a `[r, g, b]` array so config files stay short.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Color {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
}

impl Color {
    /// Creates a color from components.
    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Black
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    /// White
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Gray
    pub const GRAY: Self = Self::rgb(0.5, 0.5, 0.5);
    /// Red
    pub const RED: Self = Self::rgb(1.0, 0.0, 0.0);
    /// Green
    pub const GREEN: Self = Self::rgb(0.0, 1.0, 0.0);
    /// Blue
    pub const BLUE: Self = Self::rgb(0.0, 0.0, 1.0);
    /// Yellow
    pub const YELLOW: Self = Self::rgb(1.0, 1.0, 0.0);
    /// Cyan
    pub const CYAN: Self = Self::rgb(0.0, 1.0, 1.0);
    /// Purple (magenta)
    pub const PURPLE: Self = Self::rgb(1.0, 0.0, 1.0);
    /// Orange
    pub const ORANGE: Self = Self::rgb(1.0, 0.5, 0.0);

    /// RGBA with the given opacity.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn with_alpha(self, opacity: f64) -> [f32; 4] {
        [self.r, self.g, self.b, opacity.clamp(0.0, 1.0) as f32]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::GRAY
    }
}

impl From<[f32; 3]> for Color {
    fn from([r, g, b]: [f32; 3]) -> Self {
        Self::rgb(r, g, b)
    }
}

impl From<Color> for [f32; 3] {
    fn from(c: Color) -> Self {
        [c.r, c.g, c.b]
    }
}
