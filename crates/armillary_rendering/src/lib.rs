//! # Armillary Rendering
//!
//! Draws the bodies of a multibody system and keeps them posed as the
//! simulation advances.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     FRAME SYNCHRONIZER                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  MultibodySystem ──poses──► FrameSynchronizer                 │
//! │        │                        │                             │
//! │  decorations              SceneAdapter (Decoration → Mesh)     │
//! │        └──────────────────────► │                             │
//! │                                 ▼                             │
//! │                  Scene<B: SceneBackend>                       │
//! │                 HeadlessScene | WindowScene                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The renderer never computes physics. It reads poses and decorative
//! geometry through [`MultibodySystem`] and nothing else.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

pub mod adapter;
mod auto_geometry;
pub mod camera;
pub mod config;
pub mod decoration;
pub mod error;
pub mod mesh;
pub mod physics;
pub mod scene;
pub mod stats;
pub mod synchronizer;

pub use adapter::SceneAdapter;
pub use camera::Camera;
pub use config::{CameraResetPolicy, SynchronizerConfig, ViewerConfig, WindowConfig};
pub use decoration::{Appearance, Decoration, Representation, ResolvedAppearance, Shape, ShapeVisitor};
pub use error::{ConfigError, RenderError, RenderResult};
pub use mesh::{Bounds, Mesh, Topology};
pub use physics::{MultibodySystem, Stage};
pub use scene::{Actor, ActorId, ActorProperties, HeadlessActor, HeadlessScene, Scene, SceneBackend, WindowStatus};
#[cfg(feature = "window")]
pub use scene::WindowScene;
pub use stats::FrameStats;
pub use synchronizer::FrameSynchronizer;

pub use armillary_shared::{BodyHandle, Color, Real, Rotation, Transform, Vec3};
