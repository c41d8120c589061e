//! End-to-end behavior of the frame synchronizer on the headless backend.

mod common;

use armillary_rendering::{
    BodyHandle, CameraResetPolicy, Color, Decoration, FrameSynchronizer, HeadlessScene, Representation,
    Rotation, Scene, Stage, SynchronizerConfig, Topology, Transform, Vec3,
};
use common::Scripted;

fn bare() -> SynchronizerConfig {
    SynchronizerConfig { auto_geometry_scale: 0.0, ..SynchronizerConfig::default() }
}

fn pose(angle: f64, x: f64) -> Transform {
    Transform::new(Rotation::about_z(angle), Vec3::new(x, -0.5, 0.0))
}

fn body(i: u32) -> BodyHandle {
    BodyHandle::new(i)
}

fn scene_of(sync: &FrameSynchronizer<'_, Scripted, HeadlessScene>) -> Scene<HeadlessScene> {
    sync.scene().expect("session open").clone()
}

#[test]
fn test_persistent_actors_take_latest_pose() {
    let system = Scripted::new(3);
    let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), bare()).unwrap();
    sync.attach_decoration(body(1), Transform::IDENTITY, Decoration::brick(Vec3::splat(0.1)));
    sync.attach_decoration(
        body(1),
        Transform::from_translation(Vec3::Y),
        Decoration::sphere(0.2).with_color(Color::BLUE),
    );

    let p1 = pose(0.4, -1.0);
    let p2 = pose(-1.1, -0.7);
    sync.report(&mut system.state(vec![Transform::IDENTITY, p1, Transform::IDENTITY]));
    sync.report(&mut system.state(vec![Transform::IDENTITY, p2, Transform::IDENTITY]));

    let scene = scene_of(&sync);
    let backend = scene.lock();
    let ids = sync.body_actor_ids(body(1));
    assert_eq!(ids.len(), 2);
    for id in ids {
        assert_eq!(backend.actor(id).unwrap().transform, p2);
    }
}

#[test]
fn test_decorations_on_one_body_share_transform_every_frame() {
    let system = Scripted::new(2);
    let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), bare()).unwrap();
    sync.attach_decoration(body(1), Transform::IDENTITY, Decoration::brick(Vec3::splat(0.1)));
    sync.attach_decoration(body(1), Transform::from_translation(Vec3::X), Decoration::frame(0.3));
    let scene = scene_of(&sync);

    for step in 0..5 {
        let p = pose(0.3 * f64::from(step), 0.1 * f64::from(step));
        sync.report(&mut system.state(vec![Transform::IDENTITY, p]));
        let backend = scene.lock();
        let transforms: Vec<_> = sync
            .body_actor_ids(body(1))
            .into_iter()
            .map(|id| backend.actor(id).unwrap().transform)
            .collect();
        assert_eq!(transforms, vec![p, p]);
    }
}

#[test]
fn test_dynamic_line_follows_stations() {
    let system = Scripted::new(3);
    let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), bare()).unwrap();
    let (sa, sb) = (Vec3::new(0.0, 0.2, 0.0), Vec3::new(0.1, 0.0, 0.0));
    sync.attach_dynamic_line(body(1), sa, body(2), sb, Decoration::line(Vec3::ZERO, Vec3::ZERO));
    let line = sync.dynamic_line_ids()[0];
    let scene = scene_of(&sync);

    // Empty until the first report.
    assert!(scene.lock().actor(line).unwrap().mesh.is_empty());

    for (a, b) in [(pose(0.2, -1.0), pose(-0.4, 1.0)), (pose(1.0, -0.9), pose(0.5, 1.2))] {
        sync.report(&mut system.state(vec![Transform::IDENTITY, a, b]));
        let backend = scene.lock();
        let actor = backend.actor(line).unwrap();
        assert_eq!(actor.mesh.topology, Topology::Lines);
        assert_eq!(actor.mesh.positions, vec![a.transform_point(sa), b.transform_point(sb)]);
        assert_eq!(actor.transform, Transform::IDENTITY);
    }
}

#[test]
fn test_dynamic_line_defaults_to_rubber_band_color() {
    let system = Scripted::new(3);
    let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), bare()).unwrap();
    sync.attach_dynamic_line(body(1), Vec3::ZERO, body(2), Vec3::ZERO, Decoration::line(Vec3::ZERO, Vec3::ZERO));
    sync.attach_dynamic_line(
        body(1),
        Vec3::ZERO,
        body(2),
        Vec3::ZERO,
        Decoration::line(Vec3::ZERO, Vec3::ZERO).with_color(Color::ORANGE).with_line_thickness(4.0),
    );
    let scene = scene_of(&sync);
    let backend = scene.lock();
    let ids = sync.dynamic_line_ids();
    assert_eq!(backend.actor(ids[0]).unwrap().properties.color, Color::BLACK);
    let orange = backend.actor(ids[1]).unwrap().properties;
    assert_eq!(orange.color, Color::ORANGE);
    assert_eq!(orange.line_width, 4.0);
}

#[test]
fn test_ephemeral_geometry_lives_one_frame() {
    let system = Scripted::new(2);
    let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), bare()).unwrap();
    let scene = scene_of(&sync);
    let before = scene.lock().actor_count();

    sync.queue_ephemeral_decoration(Decoration::sphere(0.1).with_body(body(1)));
    assert_eq!(sync.pending_ephemeral_count(), 1);
    assert_eq!(scene.lock().actor_count(), before);

    let p = pose(0.7, 0.3);
    let stats = sync.report(&mut system.state(vec![Transform::IDENTITY, p]));
    assert_eq!(stats.ephemeral_drawn, 1);
    assert_eq!(sync.pending_ephemeral_count(), 0);
    let ids = sync.ephemeral_actor_ids();
    assert_eq!(ids.len(), 1);
    {
        let backend = scene.lock();
        let actor = backend.actor(ids[0]).unwrap();
        // Placed with the current pose baked into the mesh.
        let center = actor.mesh.bounds().unwrap().center();
        assert!((center - p.translation).length() < 1e-12);
        assert_eq!(actor.properties.color, Color::RED);
    }

    let stats = sync.report(&mut system.state(vec![Transform::IDENTITY, p]));
    assert_eq!(stats.ephemeral_released, 1);
    assert_eq!(stats.ephemeral_drawn, 0);
    assert!(scene.lock().actor(ids[0]).is_none());
    assert_eq!(scene.lock().actor_count(), before);
}

#[test]
fn test_system_geometry_collected_up_to_state_stage() {
    let mut system = Scripted::new(2);
    system.velocity_geometry.push(Decoration::line(Vec3::ZERO, Vec3::X).with_body(body(1)));
    let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), bare()).unwrap();

    // Realized only to Position: no velocity-stage geometry.
    let stats = sync.report(&mut system.rest_state());
    assert_eq!(stats.ephemeral_drawn, 0);

    let mut state = system.rest_state();
    state.stage = Stage::Velocity;
    let stats = sync.report(&mut state);
    assert_eq!(stats.ephemeral_drawn, 1);
}

#[test]
fn test_appearance_resolution_on_attach() {
    let system = Scripted::new(3);
    let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), bare()).unwrap();
    sync.set_default_body_color(body(2), Color::YELLOW);
    sync.attach_decoration(body(2), Transform::IDENTITY, Decoration::sphere(0.1));
    sync.attach_decoration(
        body(2),
        Transform::IDENTITY,
        Decoration::sphere(0.1).with_opacity(0.5).with_representation(Representation::Wireframe),
    );
    let scene = scene_of(&sync);
    let backend = scene.lock();
    let ids = sync.body_actor_ids(body(2));

    let plain = backend.actor(ids[0]).unwrap();
    assert_eq!(plain.properties.color, Color::YELLOW);
    assert_eq!(plain.properties.opacity, 1.0);
    assert_eq!(plain.properties.line_width, 1.0);
    assert_eq!(plain.properties.representation, Representation::Surface);

    let wire = backend.actor(ids[1]).unwrap();
    assert_eq!(wire.properties.color, Color::YELLOW);
    assert_eq!(wire.properties.opacity, 0.5);
    assert_eq!(wire.mesh.topology, Topology::Lines);
}

#[test]
fn test_attach_composes_transform() {
    let system = Scripted::new(2);
    let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), bare()).unwrap();
    let attach = Transform::from_translation(Vec3::new(0.0, 0.5, 0.0));
    let local = Transform::from_rotation(Rotation::about_x(0.3));
    sync.attach_decoration(body(1), attach, Decoration::brick(Vec3::splat(0.1)).with_transform(local));
    assert_eq!(sync.body_decorations(body(1))[0].transform, attach * local);
}

#[test]
#[should_panic(expected = "out of range")]
fn test_attach_rejects_unknown_body() {
    let system = Scripted::new(2);
    let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), bare()).unwrap();
    sync.attach_decoration(body(2), Transform::IDENTITY, Decoration::sphere(1.0));
}

#[test]
#[should_panic(expected = "out of range")]
fn test_dynamic_line_rejects_unknown_body() {
    let system = Scripted::new(2);
    let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), bare()).unwrap();
    sync.attach_dynamic_line(body(1), Vec3::ZERO, body(7), Vec3::ZERO, Decoration::line(Vec3::ZERO, Vec3::X));
}

#[test]
#[should_panic(expected = "out of range")]
fn test_ephemeral_queue_rejects_unknown_body() {
    let system = Scripted::new(2);
    let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), bare()).unwrap();
    sync.queue_ephemeral_decoration(Decoration::sphere(0.1).with_body(body(9)));
}

#[test]
fn test_rejected_ephemeral_leaves_queue_untouched() {
    let system = Scripted::new(2);
    let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), bare()).unwrap();
    sync.queue_ephemeral_decoration(Decoration::sphere(0.1));
    let queued = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        sync.queue_ephemeral_decoration(Decoration::sphere(0.1).with_body(body(9)));
    }));
    assert!(queued.is_err());
    assert_eq!(sync.pending_ephemeral_count(), 1);
}

#[test]
#[should_panic(expected = "out of range")]
fn test_default_color_query_rejects_unknown_body() {
    let system = Scripted::new(2);
    let sync = FrameSynchronizer::new(&system, HeadlessScene::default(), bare()).unwrap();
    let _ = sync.default_body_color(body(2));
}

#[test]
fn test_unrealized_topology_is_an_error() {
    let mut system = Scripted::new(2);
    system.realized = false;
    let result = FrameSynchronizer::new(&system, HeadlessScene::default(), bare());
    assert!(matches!(result, Err(armillary_rendering::RenderError::TopologyNotRealized)));
}

#[test]
fn test_construction_fits_camera_and_renders_once() {
    let system = Scripted::new(3);
    let sync = FrameSynchronizer::new(&system, HeadlessScene::default(), SynchronizerConfig::default()).unwrap();
    let scene = scene_of(&sync);
    let backend = scene.lock();
    assert_eq!(backend.render_count(), 1);
    assert_eq!(backend.camera_resets(), 1);
    // Auto geometry: every body has at least its frame and mass-center marker.
    assert!(sync.body_actor_ids(BodyHandle::GROUND).len() >= 2);
    assert!(sync.body_actor_ids(body(2)).len() >= 2);
}

#[test]
fn test_on_any_change_resets_for_ephemeral() {
    let system = Scripted::new(2);
    let config = SynchronizerConfig { camera_reset: CameraResetPolicy::OnAnyChange, ..bare() };
    let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), config).unwrap();
    assert!(!sync.report(&mut system.rest_state()).camera_reset);
    sync.queue_ephemeral_decoration(Decoration::sphere(0.1));
    // Reset happens on the frame that draws it.
    assert!(sync.report(&mut system.rest_state()).camera_reset);
}

#[test]
fn test_window_close_releases_everything() {
    let system = Scripted::new(2);
    let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), bare()).unwrap();
    sync.attach_decoration(body(1), Transform::IDENTITY, Decoration::sphere(0.1));
    sync.queue_ephemeral_decoration(Decoration::sphere(0.1));
    let scene = scene_of(&sync);

    scene.lock().request_close();
    let stats = sync.report(&mut system.rest_state());
    assert!(stats.rendered);
    assert!(!sync.is_open());
    assert!(sync.scene().is_none());
    assert_eq!(scene.lock().actor_count(), 0);

    // Later calls are no-ops.
    let renders = scene.lock().render_count();
    let stats = sync.report(&mut system.rest_state());
    assert_eq!(stats.frame_number, 0);
    sync.zoom_camera(2.0);
    sync.zoom_camera_to_include_all_geometry();
    assert!(sync.camera().is_none());
    assert_eq!(scene.lock().render_count(), renders);
}

#[test]
fn test_shutdown_releases_all_actors() {
    let system = Scripted::new(3);
    let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), SynchronizerConfig::default()).unwrap();
    sync.attach_dynamic_line(body(1), Vec3::ZERO, body(2), Vec3::ZERO, Decoration::line(Vec3::ZERO, Vec3::X));
    sync.queue_ephemeral_decoration(Decoration::sphere(0.1));
    sync.report(&mut system.rest_state());
    let scene = scene_of(&sync);
    assert!(scene.lock().actor_count() > 0);

    sync.shutdown();
    assert_eq!(scene.lock().actor_count(), 0);
}

#[test]
fn test_drop_releases_like_shutdown() {
    let system = Scripted::new(2);
    let scene = {
        let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), SynchronizerConfig::default()).unwrap();
        sync.attach_decoration(body(1), Transform::IDENTITY, Decoration::sphere(0.1));
        let scene = scene_of(&sync);
        scene
    };
    assert_eq!(scene.lock().actor_count(), 0);
}

#[test]
fn test_report_realizes_position() {
    let system = Scripted::new(2);
    let mut sync = FrameSynchronizer::new(&system, HeadlessScene::default(), bare()).unwrap();
    let mut state = system.rest_state();
    assert_eq!(state.stage, Stage::Time);
    sync.report(&mut state);
    assert_eq!(state.stage, Stage::Position);
    assert!(system.realize_calls.get() >= 1);
    assert_eq!(sync.frame_count(), 1);
}

#[test]
fn test_camera_pass_throughs() {
    let system = Scripted::new(2);
    let sync = FrameSynchronizer::new(&system, HeadlessScene::default(), bare()).unwrap();
    sync.set_camera_location(Vec3::new(0.0, 0.0, 10.0));
    sync.set_camera_focal_point(Vec3::ZERO);
    sync.set_camera_up_direction(Vec3::new(0.0, 1.0, 1.0));
    sync.set_camera_clipping_range(0.5, 50.0);
    sync.zoom_camera(2.0);

    let camera = sync.camera().unwrap();
    assert_eq!(camera.position(), Vec3::new(0.0, 0.0, 10.0));
    assert!((camera.view_up() - Vec3::Y).length() < 1e-12);
    assert_eq!(camera.clipping_range(), (0.5, 50.0));
    assert!((camera.view_angle_deg() - 15.0).abs() < 1e-12);
}
