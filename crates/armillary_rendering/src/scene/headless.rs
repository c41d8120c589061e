//! In-memory backend.
//!
//! Keeps every actor with its mesh, properties and transform so callers
//! can inspect exactly what would have been drawn.

use super::{union_bounds, ActorId, ActorProperties, SceneBackend, WindowStatus};
use crate::camera::Camera;
use crate::mesh::{Bounds, Mesh};
use armillary_shared::Transform;
use std::collections::BTreeMap;

/// One stored actor.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessActor {
    /// Geometry in model space
    pub mesh: Mesh,
    /// Resolved drawing properties
    pub properties: ActorProperties,
    /// Current model transform
    pub transform: Transform,
}

/// Backend that draws nothing and remembers everything.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    actors: BTreeMap<ActorId, HeadlessActor>,
    next_id: u64,
    camera: Camera,
    render_count: u64,
    camera_resets: u64,
    close_requested: bool,
}

impl HeadlessScene {
    /// Creates an empty scene with the given camera.
    #[must_use]
    pub fn new(camera: Camera) -> Self {
        Self { camera, ..Self::default() }
    }

    /// Looks up an actor.
    #[must_use]
    pub fn actor(&self, id: ActorId) -> Option<&HeadlessActor> {
        self.actors.get(&id)
    }

    /// Iterates all live actors in creation order.
    pub fn actors(&self) -> impl Iterator<Item = (ActorId, &HeadlessActor)> {
        self.actors.iter().map(|(&id, actor)| (id, actor))
    }

    /// Number of live actors.
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Frames drawn so far.
    #[must_use]
    pub const fn render_count(&self) -> u64 {
        self.render_count
    }

    /// Camera fits performed so far.
    #[must_use]
    pub const fn camera_resets(&self) -> u64 {
        self.camera_resets
    }

    /// Simulates the user closing the window; seen on the next event pump.
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }
}

impl SceneBackend for HeadlessScene {
    fn add_actor(&mut self, mesh: Mesh, properties: ActorProperties) -> ActorId {
        let id = ActorId(self.next_id);
        self.next_id += 1;
        self.actors.insert(id, HeadlessActor { mesh, properties, transform: Transform::IDENTITY });
        id
    }

    fn set_actor_mesh(&mut self, id: ActorId, mesh: Mesh) {
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.mesh = mesh;
        }
    }

    fn set_actor_transform(&mut self, id: ActorId, transform: Transform) {
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.transform = transform;
        }
    }

    fn remove_actor(&mut self, id: ActorId) {
        self.actors.remove(&id);
    }

    fn camera(&self) -> &Camera {
        &self.camera
    }

    fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    fn visible_bounds(&self) -> Option<Bounds> {
        union_bounds(self.actors.values().map(|a| (&a.mesh, &a.transform)))
    }

    fn reset_camera(&mut self) {
        let bounds = self.visible_bounds();
        self.camera.reset_to_bounds(bounds);
        self.camera_resets += 1;
    }

    fn render(&mut self) -> bool {
        self.render_count += 1;
        true
    }

    fn pump_events(&mut self) -> WindowStatus {
        if self.close_requested {
            WindowStatus::Closed
        } else {
            WindowStatus::Open
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoration::Representation;
    use armillary_shared::{Color, Vec3};

    fn props() -> ActorProperties {
        ActorProperties {
            color: Color::RED,
            opacity: 1.0,
            line_width: 1.0,
            representation: Representation::Surface,
        }
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut scene = HeadlessScene::default();
        let a = scene.add_actor(Mesh::segment(Vec3::ZERO, Vec3::X), props());
        scene.remove_actor(a);
        let b = scene.add_actor(Mesh::segment(Vec3::ZERO, Vec3::X), props());
        assert_ne!(a, b);
        assert!(scene.actor(a).is_none());
    }

    #[test]
    fn test_reset_camera_counts_and_fits() {
        let mut scene = HeadlessScene::default();
        let id = scene.add_actor(Mesh::segment(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)), props());
        scene.set_actor_transform(id, Transform::from_translation(Vec3::new(0.0, 0.0, -4.0)));
        scene.reset_camera();
        assert_eq!(scene.camera_resets(), 1);
        assert_eq!(scene.camera().focal_point(), Vec3::new(1.0, 0.0, -4.0));
    }

    #[test]
    fn test_close_request_seen_by_pump() {
        let mut scene = HeadlessScene::default();
        assert_eq!(scene.pump_events(), WindowStatus::Open);
        scene.request_close();
        assert_eq!(scene.pump_events(), WindowStatus::Closed);
    }
}
