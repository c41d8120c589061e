//! Body identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense index of a rigid body inside a multibody system.
///
/// Handles are handed out by the physics system when its topology is
/// finalized and are never reused. Handle 0 is always ground.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyHandle(u32);

impl BodyHandle {
    /// The immovable reference frame.
    pub const GROUND: Self = Self(0);

    /// Wraps a raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Raw index, usable for slice lookups.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// True for ground.
    #[must_use]
    pub const fn is_ground(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for BodyHandle {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ground() {
            write!(f, "ground")
        } else {
            write!(f, "body#{}", self.0)
        }
    }
}
