//! # Armillary Shared
//!
//! Rigid-body math, body identifiers and colors used by both the
//! multibody side and the renderer.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - `wgpu`
//! - `winit`
//! - Any GPU or window-related crate
//!
//! If you need graphics types, put them in `armillary_rendering`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod body;
pub mod color;
pub mod math;

pub use body::BodyHandle;
pub use color::Color;
pub use math::{Real, Rotation, Transform, Vec3};
