//! # Scene Backends
//!
//! Everything the synchronizer draws goes through [`SceneBackend`]. The
//! backend lives behind a [`Scene`] handle, a shared `parking_lot::Mutex`,
//! so every scene mutation is serialized even in a threaded embedding.
//!
//! ```text
//! FrameSynchronizer ──owns──► Actor<B> ──clone of──► Scene<B> ──► Mutex<B: SceneBackend>
//!                              (drop = remove_actor)
//! ```
//!
//! Backends:
//! 1. `HeadlessScene` - in-memory, always available (tests, `--headless`)
//! 2. `WindowScene` - winit + wgpu, behind the `window` feature

mod headless;
#[cfg(feature = "window")]
mod window;

pub use headless::{HeadlessActor, HeadlessScene};
#[cfg(feature = "window")]
pub use window::WindowScene;

use crate::camera::Camera;
use crate::decoration::{Representation, ResolvedAppearance};
use crate::mesh::{Bounds, Mesh};
use armillary_shared::{Color, Real, Transform};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Identifier of one drawable inside a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub u64);

/// Fully resolved drawing properties of an actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorProperties {
    /// Color used when the mesh carries no vertex colors
    pub color: Color,
    /// Opacity in `[0, 1]`
    pub opacity: Real,
    /// Line width in pixels
    pub line_width: Real,
    /// Draw mode the mesh was built for
    pub representation: Representation,
}

impl From<ResolvedAppearance> for ActorProperties {
    fn from(resolved: ResolvedAppearance) -> Self {
        Self {
            color: resolved.color,
            opacity: resolved.opacity,
            line_width: resolved.line_thickness,
            representation: resolved.representation,
        }
    }
}

/// Whether the host window is still around after pumping events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    /// Keep going
    Open,
    /// The user closed the window
    Closed,
}

/// A renderer the synchronizer can drive.
pub trait SceneBackend {
    /// Registers a drawable with identity transform.
    fn add_actor(&mut self, mesh: Mesh, properties: ActorProperties) -> ActorId;

    /// Replaces an actor's geometry.
    fn set_actor_mesh(&mut self, id: ActorId, mesh: Mesh);

    /// Sets an actor's model transform (absolute, not incremental).
    fn set_actor_transform(&mut self, id: ActorId, transform: Transform);

    /// Releases an actor. Unknown ids are ignored.
    fn remove_actor(&mut self, id: ActorId);

    /// Current camera
    fn camera(&self) -> &Camera;

    /// Mutable camera
    fn camera_mut(&mut self) -> &mut Camera;

    /// World-space bounds of everything drawn, `None` if nothing is.
    fn visible_bounds(&self) -> Option<Bounds>;

    /// Fits the camera to the visible geometry.
    fn reset_camera(&mut self) {
        let bounds = self.visible_bounds();
        self.camera_mut().reset_to_bounds(bounds);
    }

    /// Draws one frame. Returns false if the frame was skipped.
    fn render(&mut self) -> bool;

    /// Drains pending host events without blocking.
    fn pump_events(&mut self) -> WindowStatus;
}

/// World-space bounds over `(mesh, transform)` pairs.
pub(crate) fn union_bounds<'a>(items: impl Iterator<Item = (&'a Mesh, &'a Transform)>) -> Option<Bounds> {
    items
        .filter_map(|(mesh, transform)| mesh.bounds().map(|b| b.transformed(transform)))
        .reduce(Bounds::union)
}

/// Shared, lock-protected handle to a backend.
pub struct Scene<B: SceneBackend> {
    inner: Arc<Mutex<B>>,
}

impl<B: SceneBackend> Clone for Scene<B> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<B: SceneBackend> Scene<B> {
    /// Wraps a backend.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { inner: Arc::new(Mutex::new(backend)) }
    }

    /// Exclusive access to the backend.
    ///
    /// Do not hold the guard while dropping an [`Actor`]: its `Drop`
    /// takes the same lock.
    pub fn lock(&self) -> MutexGuard<'_, B> {
        self.inner.lock()
    }

    /// Creates an actor owned by the returned handle.
    #[must_use]
    pub fn spawn_actor(&self, mesh: Mesh, properties: ActorProperties) -> Actor<B> {
        let id = self.lock().add_actor(mesh, properties);
        Actor { id, scene: self.clone() }
    }
}

/// RAII owner of one backend drawable.
pub struct Actor<B: SceneBackend> {
    id: ActorId,
    scene: Scene<B>,
}

impl<B: SceneBackend> Actor<B> {
    /// Backend id
    #[must_use]
    pub const fn id(&self) -> ActorId {
        self.id
    }
}

impl<B: SceneBackend> Drop for Actor<B> {
    fn drop(&mut self) {
        self.scene.lock().remove_actor(self.id);
    }
}

impl<B: SceneBackend> std::fmt::Debug for Actor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor").field("id", &self.id).finish()
    }
}
