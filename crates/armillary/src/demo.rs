//! Scene setup and the report loop of the demonstration.

use armillary_rendering::{Decoration, FrameSynchronizer, SceneBackend};
use armillary_shared::{BodyHandle, Color, Real, Transform, Vec3};
use tracing::info;

use crate::integrator::{Integrator, StepStatus};
use crate::pendulums::{TwoPendulums, HANG_LENGTH, LEFT, RIGHT, RIGHT_PIN};

/// Seconds between reports.
pub const OUTPUT_INTERVAL: Real = 0.02;

/// Times the integrator must stop at exactly. The last one lies past any
/// sensible final time so the schedule never runs dry.
pub const SCHEDULED_EVENTS: [Real; 6] = [1.234, 3.1415, 3.14159, 4.5, 9.090909, 100.0];

/// Radii of the marker drawn around the right pin.
const PIN_MARKER_RADII: Vec3 = Vec3::new(0.25, 1.0 / 6.0, 0.125);

/// Adds the demonstration decorations: a marker at the right pin, a
/// plate following the right pendulum's joint frame, and the coupling's
/// rubber band.
pub fn decorate<B: SceneBackend>(viz: &mut FrameSynchronizer<'_, TwoPendulums, B>, system: &TwoPendulums) {
    viz.attach_decoration(
        BodyHandle::GROUND,
        Transform::from_translation(RIGHT_PIN),
        Decoration::ellipsoid(PIN_MARKER_RADII)
            .with_color(Color::PURPLE)
            .with_opacity(0.5),
    );

    // Plate sits on the joint's xy plane.
    let min_radius = PIN_MARKER_RADII.min_element();
    let half_width = min_radius / 2.0;
    let half_height = min_radius / 20.0;
    viz.attach_decoration(
        RIGHT,
        Transform::from_translation(Vec3::new(0.0, HANG_LENGTH, 0.0)),
        Decoration::brick(Vec3::new(half_width, 2.0 * half_width / 3.0, half_height))
            .with_transform(Transform::from_translation(Vec3::new(0.0, 0.0, half_height)))
            .with_color(Color::GRAY)
            .with_opacity(1.0),
    );

    if let Some(band) = system.coupling().rubber_band() {
        viz.attach_dynamic_line(LEFT, Vec3::ZERO, RIGHT, Vec3::ZERO, band);
    }
}

/// What a run did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    /// States handed to the synchronizer
    pub reports: u64,
    /// Scheduled events stopped at
    pub events: u64,
    /// RK4 steps
    pub steps: u64,
    /// Time of the last state
    pub final_time: Real,
    /// Energy of the first reported state
    pub initial_energy: Real,
    /// Energy of the last reported state
    pub final_energy: Real,
    /// True if the window was closed before the end
    pub window_closed: bool,
}

/// Steps to each report time and scheduled event until the final time,
/// reporting every state reached. Stops early if the window closes.
pub fn run<B: SceneBackend>(
    viz: &mut FrameSynchronizer<'_, TwoPendulums, B>,
    integrator: &mut Integrator<'_>,
    system: &TwoPendulums,
) -> RunSummary {
    let mut summary = RunSummary {
        initial_energy: system.energy(integrator.state()),
        ..RunSummary::default()
    };
    let mut next_report: u32 = 0;
    let mut next_event = 0;

    loop {
        let report_time = Real::from(next_report) * OUTPUT_INTERVAL;
        let event_time = SCHEDULED_EVENTS.get(next_event).copied().unwrap_or(Real::INFINITY);
        let status = integrator.step_to(report_time, event_time);
        if status == StepStatus::EndOfSimulation {
            break;
        }

        let state = integrator.state();
        let time = state.time();
        let energy = system.energy(state);
        info!(
            time,
            left_angle_deg = state.q()[0].to_degrees(),
            energy,
            steps = integrator.steps_taken(),
            step_size = integrator.previous_step_size(),
            status = status.as_str(),
            "Reporting state"
        );

        viz.report(integrator.state_mut());
        summary.reports += 1;
        summary.final_time = time;
        summary.final_energy = energy;

        if time >= report_time {
            next_report += 1;
        }
        if time >= event_time {
            next_event += 1;
            summary.events += 1;
        }
        if !viz.is_open() {
            summary.window_closed = true;
            break;
        }
    }

    summary.steps = integrator.steps_taken();
    info!(
        reports = summary.reports,
        events = summary.events,
        steps = summary.steps,
        "Run finished"
    );
    summary
}
