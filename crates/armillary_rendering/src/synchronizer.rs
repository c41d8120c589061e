//! Frame Synchronizer - keeps the scene in step with a multibody state.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        report(state)                              │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  1. realize(state, Position)                                      │
//! │  2. bodies 1..n   : pose = X_GB, set on every persistent actor     │
//! │  3. dynamic lines : rebuild (X_GA * sA, X_GB * sB)                 │
//! │  4. ephemeral     : drop last frame's actors,                      │
//! │                     system geometry Model..=stage + queue → actors │
//! │  5. camera reset  : if pending                                     │
//! │  6. render                                                        │
//! │  7. pump events   : window closed → release everything             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every actor is owned by exactly one record here. Dropping the record
//! drops the [`Actor`], which removes the drawable from the backend.

use crate::adapter::SceneAdapter;
use crate::auto_geometry::{body_scales, default_geometry};
use crate::camera::Camera;
use crate::config::{CameraResetPolicy, SynchronizerConfig};
use crate::decoration::{Decoration, Shape};
use crate::error::{ConfigError, RenderError, RenderResult};
use crate::physics::{MultibodySystem, Stage};
use crate::scene::{Actor, ActorId, Scene, SceneBackend, WindowStatus};
use crate::stats::FrameStats;
use armillary_shared::{BodyHandle, Color, Real, Transform, Vec3};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Per-body bookkeeping.
struct BodyRecord<B: SceneBackend> {
    default_color: Color,
    scale: Real,
    actors: Vec<(Actor<B>, Decoration)>,
}

/// A line whose endpoints follow two body stations.
struct DynamicLine<B: SceneBackend> {
    actor: Actor<B>,
    template: Decoration,
    body_a: BodyHandle,
    station_a: Vec3,
    body_b: BodyHandle,
    station_b: Vec3,
}

/// Projects states of a [`MultibodySystem`] onto a scene.
///
/// ## Usage
///
/// ```rust,ignore
/// let mut viz = FrameSynchronizer::new(&system, HeadlessScene::default(), SynchronizerConfig::default())?;
/// viz.attach_decoration(body, Transform::IDENTITY, Decoration::brick(Vec3::splat(0.1)));
/// loop {
///     integrator.step_to(t, t_event);
///     viz.report(integrator.state_mut());
/// }
/// ```
pub struct FrameSynchronizer<'a, P: MultibodySystem, B: SceneBackend> {
    /// The system being drawn
    system: &'a P,
    /// Configuration
    config: SynchronizerConfig,
    /// Decoration tessellator
    adapter: SceneAdapter,
    /// Backend; `None` once the window has been closed
    scene: Option<Scene<B>>,
    /// Indexed by body
    bodies: Vec<BodyRecord<B>>,
    /// Rubber-band lines
    lines: Vec<DynamicLine<B>>,
    /// Decorations waiting for the next report
    ephemeral_queue: Vec<Decoration>,
    /// Actors showing last frame's ephemeral geometry
    ephemeral_actors: Vec<Actor<B>>,
    /// Camera fit requested
    camera_reset_pending: bool,
    /// Reports processed
    frame_count: u64,
}

impl<'a, P: MultibodySystem, B: SceneBackend> FrameSynchronizer<'a, P, B> {
    /// Builds a session over `backend` and draws the initial scene.
    ///
    /// # Errors
    ///
    /// `TopologyNotRealized` if the system is not ready, `Config` if the
    /// configuration is out of range. On error the backend is dropped.
    pub fn new(system: &'a P, backend: B, config: SynchronizerConfig) -> RenderResult<Self> {
        if !system.topology_realized() {
            return Err(RenderError::TopologyNotRealized);
        }
        let scale = config.auto_geometry_scale;
        if !scale.is_finite() || scale < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "auto_geometry_scale must be finite and >= 0, got {scale}"
            ))
            .into());
        }

        let camera_scale = if scale == 0.0 { 1.0 } else { scale };
        let scene = Scene::new(backend);
        {
            let mut backend = scene.lock();
            let camera = backend.camera_mut();
            *camera = Camera::new(Vec3::new(0.0, 0.1 * camera_scale, camera_scale));
        }

        let count = system.body_count();
        let scales = body_scales(system, scale);
        let bodies = (0..count)
            .map(|index| BodyRecord {
                default_color: Self::role_color(system, &config, index),
                scale: scales.get(index).copied().unwrap_or(scale),
                actors: Vec::new(),
            })
            .collect();

        let mut sync = Self {
            system,
            config,
            adapter: SceneAdapter::new(),
            scene: Some(scene),
            bodies,
            lines: Vec::new(),
            ephemeral_queue: Vec::new(),
            ephemeral_actors: Vec::new(),
            camera_reset_pending: false,
            frame_count: 0,
        };

        if scale > 0.0 {
            let colors: Vec<Color> = sync.bodies.iter().map(|b| b.default_color).collect();
            for (body, attach, decoration) in default_geometry(system, &scales, &colors) {
                sync.attach_decoration(body, attach, decoration);
            }
        }

        if sync.config.include_system_geometry {
            let mut geometry = Vec::new();
            system.calc_topology_geometry(&mut geometry);
            for decoration in geometry {
                sync.attach_decoration(decoration.body_or_ground(), Transform::IDENTITY, decoration);
            }
        }

        if let Some(scene) = &sync.scene {
            let mut backend = scene.lock();
            backend.reset_camera();
            backend.render();
        }
        sync.camera_reset_pending = false;

        info!(
            bodies = count,
            actors = sync.persistent_actor_count(),
            "Frame synchronizer ready"
        );
        Ok(sync)
    }

    fn role_color(system: &P, config: &SynchronizerConfig, index: usize) -> Color {
        #[allow(clippy::cast_possible_truncation)]
        let body = BodyHandle::new(index as u32);
        if body.is_ground() {
            config.ground_color
        } else if system.parent_body(body) == Some(BodyHandle::GROUND) {
            config.base_body_color
        } else {
            config.body_color
        }
    }

    fn assert_body(&self, body: BodyHandle) {
        assert!(
            body.index() < self.bodies.len(),
            "body handle {} out of range (system has {} bodies)",
            body.index(),
            self.bodies.len()
        );
    }

    fn request_camera_reset(&mut self) {
        if self.config.camera_reset != CameraResetPolicy::Never {
            self.camera_reset_pending = true;
        }
    }

    // =========================================================================
    // ATTACHMENT
    // =========================================================================

    /// Attaches a decoration to `body`, placed at `attach * decoration.transform`.
    ///
    /// # Panics
    ///
    /// If `body` is not a body of the system.
    pub fn attach_decoration(&mut self, body: BodyHandle, attach: Transform, decoration: Decoration) {
        self.assert_body(body);
        let Some(scene) = &self.scene else { return };

        let placed = decoration.attached(attach).with_body(body);
        let record = &mut self.bodies[body.index()];
        let properties = placed.appearance.resolve(record.default_color).into();
        let actor = scene.spawn_actor(self.adapter.render(&placed), properties);
        debug!(%body, shape = placed.shape.name(), actor = actor.id().0, "Attached decoration");
        record.actors.push((actor, placed));
        self.request_camera_reset();
    }

    /// Draws a line from `station_a` on `body_a` to `station_b` on `body_b`,
    /// re-placed on every report. `template` supplies the appearance.
    ///
    /// # Panics
    ///
    /// If either body is not a body of the system.
    pub fn attach_dynamic_line(
        &mut self,
        body_a: BodyHandle,
        station_a: Vec3,
        body_b: BodyHandle,
        station_b: Vec3,
        template: Decoration,
    ) {
        self.assert_body(body_a);
        self.assert_body(body_b);
        let Some(scene) = &self.scene else { return };

        let properties = template.appearance.resolve(self.config.rubber_band_color).into();
        let actor = scene.spawn_actor(crate::mesh::Mesh::new(crate::mesh::Topology::Lines), properties);
        debug!(%body_a, %body_b, actor = actor.id().0, "Attached dynamic line");
        self.lines.push(DynamicLine { actor, template, body_a, station_a, body_b, station_b });
        self.request_camera_reset();
    }

    /// Queues a decoration for the next report only.
    ///
    /// The decoration's own `body` (ground if unset) is the frame its
    /// transform is measured in.
    ///
    /// # Panics
    ///
    /// If that body is not a body of the system.
    pub fn queue_ephemeral_decoration(&mut self, decoration: Decoration) {
        self.assert_body(decoration.body_or_ground());
        self.ephemeral_queue.push(decoration);
    }

    // =========================================================================
    // REPORT
    // =========================================================================

    /// Brings the scene in line with `state` and draws a frame.
    ///
    /// Does nothing once the window has been closed.
    pub fn report(&mut self, state: &mut P::State) -> FrameStats {
        let Some(scene) = self.scene.clone() else {
            return FrameStats::default();
        };
        let start = Instant::now();
        self.frame_count += 1;

        self.system.realize(state, Stage::Position);

        let poses: Vec<Transform> = (0..self.bodies.len())
            .map(|index| {
                #[allow(clippy::cast_possible_truncation)]
                let body = BodyHandle::new(index as u32);
                self.system.body_transform(state, body)
            })
            .collect();

        let mut stats = FrameStats { frame_number: self.frame_count, ..FrameStats::default() };

        // Persistent actors, then lines: lines read the poses just applied.
        {
            let mut backend = scene.lock();
            for (record, pose) in self.bodies.iter().zip(&poses).skip(1) {
                stats.bodies_posed += 1;
                for (actor, _) in &record.actors {
                    backend.set_actor_transform(actor.id(), *pose);
                    stats.actors_posed += 1;
                }
            }
            for line in &self.lines {
                let from = poses[line.body_a.index()].transform_point(line.station_a);
                let to = poses[line.body_b.index()].transform_point(line.station_b);
                let decoration = Decoration {
                    shape: Shape::Line { from, to },
                    transform: Transform::IDENTITY,
                    ..line.template
                };
                backend.set_actor_mesh(line.actor.id(), self.adapter.render(&decoration));
                stats.lines_rebuilt += 1;
            }
        }

        // Ephemeral geometry: system contributions first, then the queue.
        let mut geometry = Vec::new();
        for stage in Stage::range(Stage::Model, self.system.stage(state)) {
            self.system.calc_decorative_geometry_and_append(state, stage, &mut geometry);
        }
        geometry.append(&mut self.ephemeral_queue);

        let released = std::mem::take(&mut self.ephemeral_actors);
        stats.ephemeral_released = u32::try_from(released.len()).unwrap_or(u32::MAX);
        drop(released);

        for decoration in geometry {
            let body = decoration.body_or_ground();
            self.assert_body(body);
            let placed = decoration.attached(poses[body.index()]);
            let properties = placed.appearance.resolve(self.bodies[body.index()].default_color).into();
            self.ephemeral_actors.push(scene.spawn_actor(self.adapter.render(&placed), properties));
        }
        stats.ephemeral_drawn = u32::try_from(self.ephemeral_actors.len()).unwrap_or(u32::MAX);
        if stats.ephemeral_drawn > 0 && self.config.camera_reset == CameraResetPolicy::OnAnyChange {
            self.camera_reset_pending = true;
        }

        let status = {
            let mut backend = scene.lock();
            if self.camera_reset_pending {
                backend.reset_camera();
                self.camera_reset_pending = false;
                stats.camera_reset = true;
                debug!(frame = self.frame_count, "Camera reset");
            }
            stats.rendered = backend.render();
            backend.pump_events()
        };
        drop(scene);

        if status == WindowStatus::Closed {
            warn!(frame = self.frame_count, "Window closed, releasing scene");
            self.release();
        }

        stats.sync_time_us = u32::try_from(start.elapsed().as_micros()).unwrap_or(u32::MAX);
        trace!(?stats, "Frame synchronized");
        stats
    }

    /// Releases every actor, then the scene. Safe to call twice.
    fn release(&mut self) {
        self.ephemeral_actors.clear();
        self.lines.clear();
        for record in &mut self.bodies {
            record.actors.clear();
        }
        self.ephemeral_queue.clear();
        self.scene = None;
    }

    /// Ends the session, releasing every actor and the scene.
    pub fn shutdown(mut self) {
        info!(frames = self.frame_count, "Frame synchronizer shutting down");
        self.release();
    }

    // =========================================================================
    // CAMERA
    // =========================================================================

    /// Requests a camera fit on the next report.
    pub fn reset_camera(&mut self) {
        self.camera_reset_pending = true;
    }

    fn with_camera(&self, f: impl FnOnce(&mut Camera)) {
        if let Some(scene) = &self.scene {
            f(scene.lock().camera_mut());
        }
    }

    /// Moves the eye.
    pub fn set_camera_location(&self, position: Vec3) {
        self.with_camera(|c| c.set_position(position));
    }

    /// Moves the point looked at.
    pub fn set_camera_focal_point(&self, focal_point: Vec3) {
        self.with_camera(|c| c.set_focal_point(focal_point));
    }

    /// Sets the up direction (orthogonalized against the view).
    pub fn set_camera_up_direction(&self, up: Vec3) {
        self.with_camera(|c| c.set_view_up(up));
    }

    /// Sets the clipping planes.
    pub fn set_camera_clipping_range(&self, near: Real, far: Real) {
        self.with_camera(|c| c.set_clipping_range(near, far));
    }

    /// Fits the camera to everything visible, immediately.
    pub fn zoom_camera_to_include_all_geometry(&self) {
        if let Some(scene) = &self.scene {
            scene.lock().reset_camera();
        }
    }

    /// Narrows (`factor > 1`) or widens the view angle.
    pub fn zoom_camera(&self, factor: Real) {
        self.with_camera(|c| c.zoom(factor));
    }

    /// Copy of the current camera, `None` once the window is gone.
    #[must_use]
    pub fn camera(&self) -> Option<Camera> {
        self.scene.as_ref().map(|s| *s.lock().camera())
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Changes the color used for `body`'s later attachments.
    ///
    /// # Panics
    ///
    /// If `body` is not a body of the system.
    pub fn set_default_body_color(&mut self, body: BodyHandle, color: Color) {
        self.assert_body(body);
        self.bodies[body.index()].default_color = color;
    }

    /// Color unset decorations on `body` resolve to.
    ///
    /// # Panics
    ///
    /// If `body` is not a body of the system.
    #[must_use]
    pub fn default_body_color(&self, body: BodyHandle) -> Color {
        self.assert_body(body);
        self.bodies[body.index()].default_color
    }

    /// Overrides `body`'s size used for generated geometry.
    ///
    /// # Panics
    ///
    /// If `body` is not a body of the system.
    pub fn set_body_scale(&mut self, body: BodyHandle, scale: Real) {
        self.assert_body(body);
        self.bodies[body.index()].scale = scale;
    }

    /// Size of `body` for generated geometry.
    ///
    /// # Panics
    ///
    /// If `body` is not a body of the system.
    #[must_use]
    pub fn body_scale(&self, body: BodyHandle) -> Real {
        self.assert_body(body);
        self.bodies[body.index()].scale
    }

    /// Number of bodies, ground included.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// False once the user has closed the window.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.scene.is_some()
    }

    /// Reports processed so far.
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Persistent actors of `body`, in attachment order.
    ///
    /// # Panics
    ///
    /// If `body` is not a body of the system.
    #[must_use]
    pub fn body_actor_ids(&self, body: BodyHandle) -> Vec<ActorId> {
        self.assert_body(body);
        self.bodies[body.index()].actors.iter().map(|(a, _)| a.id()).collect()
    }

    /// Decorations attached to `body`, as placed in the body frame.
    ///
    /// # Panics
    ///
    /// If `body` is not a body of the system.
    #[must_use]
    pub fn body_decorations(&self, body: BodyHandle) -> Vec<Decoration> {
        self.assert_body(body);
        self.bodies[body.index()].actors.iter().map(|(_, d)| *d).collect()
    }

    /// Dynamic-line actors, in attachment order.
    #[must_use]
    pub fn dynamic_line_ids(&self) -> Vec<ActorId> {
        self.lines.iter().map(|l| l.actor.id()).collect()
    }

    /// Actors currently showing ephemeral geometry.
    #[must_use]
    pub fn ephemeral_actor_ids(&self) -> Vec<ActorId> {
        self.ephemeral_actors.iter().map(Actor::id).collect()
    }

    /// Decorations waiting for the next report.
    #[must_use]
    pub fn pending_ephemeral_count(&self) -> usize {
        self.ephemeral_queue.len()
    }

    /// Backend handle, `None` once the window is gone.
    #[must_use]
    pub fn scene(&self) -> Option<&Scene<B>> {
        self.scene.as_ref()
    }

    fn persistent_actor_count(&self) -> usize {
        self.bodies.iter().map(|b| b.actors.len()).sum::<usize>() + self.lines.len()
    }
}

impl<P: MultibodySystem, B: SceneBackend> Drop for FrameSynchronizer<'_, P, B> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::HeadlessScene;
    use armillary_shared::Rotation;

    /// Single pendulum: ground + one body swinging about z.
    struct Swing;

    struct SwingState {
        angle: Real,
        stage: Stage,
    }

    impl MultibodySystem for Swing {
        type State = SwingState;

        fn realize(&self, state: &mut SwingState, stage: Stage) {
            state.stage = state.stage.max(stage);
        }
        fn stage(&self, state: &SwingState) -> Stage {
            state.stage
        }
        fn body_count(&self) -> usize {
            2
        }
        fn topology_realized(&self) -> bool {
            true
        }
        fn body_transform(&self, state: &SwingState, body: BodyHandle) -> Transform {
            assert!(state.stage >= Stage::Position);
            if body.is_ground() {
                Transform::IDENTITY
            } else {
                Transform::new(Rotation::about_z(state.angle), Vec3::new(state.angle.sin(), -state.angle.cos(), 0.0))
            }
        }
        fn parent_body(&self, body: BodyHandle) -> Option<BodyHandle> {
            (!body.is_ground()).then_some(BodyHandle::GROUND)
        }
        fn default_inboard_frame(&self, _: BodyHandle) -> Transform {
            Transform::IDENTITY
        }
        fn default_outboard_frame(&self, body: BodyHandle) -> Transform {
            if body.is_ground() {
                Transform::IDENTITY
            } else {
                Transform::from_translation(Vec3::new(0.0, 1.0, 0.0))
            }
        }
        fn default_mass_center(&self, _: BodyHandle) -> Vec3 {
            Vec3::ZERO
        }
        fn calc_decorative_geometry_and_append(&self, _: &SwingState, _: Stage, _: &mut Vec<Decoration>) {}
    }

    fn state(angle: Real) -> SwingState {
        SwingState { angle, stage: Stage::Time }
    }

    fn bare() -> SynchronizerConfig {
        SynchronizerConfig { auto_geometry_scale: 0.0, ..SynchronizerConfig::default() }
    }

    #[test]
    fn test_role_colors() {
        let sync = FrameSynchronizer::new(&Swing, HeadlessScene::default(), bare()).unwrap();
        assert_eq!(sync.default_body_color(BodyHandle::GROUND), Color::GREEN);
        assert_eq!(sync.default_body_color(BodyHandle::new(1)), Color::RED);
    }

    #[test]
    fn test_auto_geometry_scale_grows_to_joint_frames() {
        let config = SynchronizerConfig { auto_geometry_scale: 0.5, ..SynchronizerConfig::default() };
        let sync = FrameSynchronizer::new(&Swing, HeadlessScene::default(), config).unwrap();
        assert_eq!(sync.body_scale(BodyHandle::new(1)), 1.0);
        assert_eq!(sync.body_scale(BodyHandle::GROUND), 0.5);
        // ground: frame + com; body: frame + outboard frame + line + com; inboard frame on ground
        assert_eq!(sync.body_actor_ids(BodyHandle::GROUND).len(), 3);
        assert_eq!(sync.body_actor_ids(BodyHandle::new(1)).len(), 4);
    }

    #[test]
    fn test_inboard_frame_uses_child_color() {
        let config = SynchronizerConfig { auto_geometry_scale: 1.0, ..SynchronizerConfig::default() };
        let sync = FrameSynchronizer::new(&Swing, HeadlessScene::default(), config).unwrap();
        let on_ground = sync.body_decorations(BodyHandle::GROUND);
        assert!(on_ground.iter().any(|d| d.appearance.color == Some(Color::RED)));
    }

    #[test]
    fn test_report_realizes_and_poses() {
        let mut sync = FrameSynchronizer::new(&Swing, HeadlessScene::default(), bare()).unwrap();
        sync.attach_decoration(BodyHandle::new(1), Transform::IDENTITY, Decoration::sphere(0.1));
        let mut s = state(0.3);
        let stats = sync.report(&mut s);
        assert_eq!(s.stage, Stage::Position);
        assert_eq!(stats.bodies_posed, 1);
        assert_eq!(stats.actors_posed, 1);
        assert!(stats.rendered);

        let id = sync.body_actor_ids(BodyHandle::new(1))[0];
        let scene = sync.scene().unwrap().clone();
        assert_eq!(scene.lock().actor(id).unwrap().transform, Swing.body_transform(&s, BodyHandle::new(1)));
    }

    #[test]
    fn test_camera_reset_policy_never() {
        let config = SynchronizerConfig { camera_reset: CameraResetPolicy::Never, ..bare() };
        let mut sync = FrameSynchronizer::new(&Swing, HeadlessScene::default(), config).unwrap();
        sync.attach_decoration(BodyHandle::new(1), Transform::IDENTITY, Decoration::sphere(0.1));
        assert!(!sync.report(&mut state(0.0)).camera_reset);

        sync.reset_camera();
        assert!(sync.report(&mut state(0.0)).camera_reset);
    }

    #[test]
    fn test_camera_reset_after_attach_only_once() {
        let mut sync = FrameSynchronizer::new(&Swing, HeadlessScene::default(), bare()).unwrap();
        sync.attach_decoration(BodyHandle::new(1), Transform::IDENTITY, Decoration::sphere(0.1));
        assert!(sync.report(&mut state(0.0)).camera_reset);
        assert!(!sync.report(&mut state(0.1)).camera_reset);
    }

    #[test]
    fn test_negative_scale_rejected() {
        let config = SynchronizerConfig { auto_geometry_scale: -1.0, ..SynchronizerConfig::default() };
        let result = FrameSynchronizer::new(&Swing, HeadlessScene::default(), config);
        assert!(matches!(result, Err(RenderError::Config(ConfigError::Invalid(_)))));
    }

    #[test]
    fn test_initial_camera_position() {
        let config = SynchronizerConfig { camera_reset: CameraResetPolicy::Never, ..bare() };
        let sync = FrameSynchronizer::new(&Swing, HeadlessScene::default(), config).unwrap();
        // Construction always fits once; the view direction survives the fit.
        let camera = sync.camera().unwrap();
        let expected = (Vec3::ZERO - Vec3::new(0.0, 0.1, 1.0)).try_normalize().unwrap();
        assert!((camera.direction() - expected).length() < 1e-9);
    }
}
