//! # Two Planar Pendulums
//!
//! A small multibody system with three bodies:
//!
//! ```text
//!        left pin (-1,0)             right pin (+1,0)
//!              o                           o
//!              |  d                        |  d
//!            [ L ] ------ coupling ------ [ R ]
//! ```
//!
//! Each pendulum hinges about Z on ground and hangs `d` below its pin.
//! The two may be left free, tied by a linear spring/damper, or held a
//! fixed distance apart by a rod. The rod is a Lagrange multiplier
//! constraint with Baumgarte stabilization.

use armillary_rendering::{Decoration, MultibodySystem, Stage};
use armillary_shared::{BodyHandle, Color, Real, Rotation, Transform, Vec3};
use std::f64::consts::PI;
use std::str::FromStr;

use crate::error::{DriverError, DriverResult};

/// Gravity along -Y (m/s²).
pub const GRAVITY: Real = 9.8;

/// Distance from pin to body origin.
pub const HANG_LENGTH: Real = 0.5;

/// Mass of each pendulum.
pub const MASS: Real = 1.0;

/// Moment of inertia about the body origin.
pub const CENTRAL_INERTIA: Real = 1.0;

/// Pin positions on ground.
pub const LEFT_PIN: Vec3 = Vec3::new(-1.0, 0.0, 0.0);
/// Right pin position on ground.
pub const RIGHT_PIN: Vec3 = Vec3::new(1.0, 0.0, 0.0);

/// Body handles.
pub const LEFT: BodyHandle = BodyHandle::new(1);
/// Right pendulum.
pub const RIGHT: BodyHandle = BodyHandle::new(2);

const BODY_COUNT: usize = 3;

/// Baumgarte gains: `Φ̈ + 2ζω Φ̇ + ω² Φ = 0` with ω = 20, ζ = 1.
const BAUMGARTE_DAMPING: Real = 40.0;
const BAUMGARTE_STIFFNESS: Real = 400.0;

/// Damping on the multiplier solve. Near a change point of the linkage
/// the constraint gradient vanishes and the reaction is driven to zero.
const SINGULARITY_DAMPING: Real = 1e-4;

const ASSEMBLY_MAX_ITERATIONS: usize = 50;

/// Half extents of the brick drawn on each pendulum.
const BRICK_HALF_LENGTHS: Vec3 = Vec3::new(0.1, 0.0667, 0.05);

/// Velocity arrows are this many seconds of travel long.
const VELOCITY_ARROW_SECONDS: Real = 0.1;

/// What ties the two pendulums together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coupling {
    /// Independent pendulums
    None,
    /// Linear spring and damper between the body origins
    Spring {
        /// N/m
        stiffness: Real,
        /// N·s/m
        damping: Real,
        /// Unstretched length
        natural_length: Real,
    },
    /// Constant distance between the body origins
    Rod {
        /// Distance held
        length: Real,
    },
}

impl Coupling {
    /// Spring used by the demonstration.
    pub const SPRING: Self = Self::Spring { stiffness: 100.0, damping: 10.0, natural_length: 2.0 };

    /// Rod used by the demonstration.
    pub const ROD: Self = Self::Rod { length: 2.0 };

    /// The rubber-band line showing this coupling, if it has one.
    #[must_use]
    pub fn rubber_band(&self) -> Option<Decoration> {
        let color = match self {
            Self::None => return None,
            Self::Spring { .. } => Color::ORANGE,
            Self::Rod { .. } => Color::BLACK,
        };
        Some(Decoration::line(Vec3::ZERO, Vec3::ZERO).with_color(color).with_line_thickness(4.0))
    }
}

impl FromStr for Coupling {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "n" => Ok(Self::None),
            "spring" | "s" => Ok(Self::SPRING),
            "rod" | "constraint" | "c" => Ok(Self::ROD),
            other => Err(DriverError::InvalidArgument(format!(
                "unknown coupling '{other}', expected none, spring or rod"
            ))),
        }
    }
}

/// Time, coordinates and everything computed from them.
#[derive(Debug, Clone)]
pub struct PendulumState {
    time: Real,
    /// Hinge angles, left then right
    q: [Real; 2],
    /// Hinge rates
    u: [Real; 2],
    stage: Stage,
    /// `X_GB` for ground, left, right
    poses: [Transform; BODY_COUNT],
    /// Body origin velocities in ground, left then right
    velocities: [Vec3; 2],
    /// Applied hinge torques (gravity and spring)
    torques: [Real; 2],
    /// Hinge accelerations
    udot: [Real; 2],
}

impl PendulumState {
    fn new(q: [Real; 2], u: [Real; 2]) -> Self {
        Self {
            time: 0.0,
            q,
            u,
            stage: Stage::Time,
            poses: [Transform::IDENTITY; BODY_COUNT],
            velocities: [Vec3::ZERO; 2],
            torques: [0.0; 2],
            udot: [0.0; 2],
        }
    }

    /// Current time
    #[must_use]
    pub const fn time(&self) -> Real {
        self.time
    }

    /// Hinge angles in radians, left then right
    #[must_use]
    pub const fn q(&self) -> [Real; 2] {
        self.q
    }

    /// Hinge rates in rad/s
    #[must_use]
    pub const fn u(&self) -> [Real; 2] {
        self.u
    }

    /// Stage reached
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Hinge accelerations.
    ///
    /// # Panics
    ///
    /// If the state has not been realized to [`Stage::Acceleration`].
    #[must_use]
    pub fn udot(&self) -> [Real; 2] {
        assert!(self.stage >= Stage::Acceleration, "accelerations requested at stage {:?}", self.stage);
        self.udot
    }

    /// Sets the time. Invalidates everything from `Time` on.
    pub fn set_time(&mut self, time: Real) {
        self.time = time;
        self.invalidate(Stage::Instance);
    }

    /// Sets both angles. Invalidates `Position` and later.
    pub fn set_q(&mut self, q: [Real; 2]) {
        self.q = q;
        self.invalidate(Stage::Time);
    }

    /// Sets both rates. Invalidates `Velocity` and later.
    pub fn set_u(&mut self, u: [Real; 2]) {
        self.u = u;
        self.invalidate(Stage::Position);
    }

    fn invalidate(&mut self, keep: Stage) {
        self.stage = self.stage.min(keep);
    }
}

/// The two-pendulum system.
#[derive(Debug, Clone)]
pub struct TwoPendulums {
    coupling: Coupling,
}

impl TwoPendulums {
    /// Builds the system with the given coupling.
    #[must_use]
    pub const fn new(coupling: Coupling) -> Self {
        Self { coupling }
    }

    /// The coupling in use
    #[must_use]
    pub const fn coupling(&self) -> Coupling {
        self.coupling
    }

    /// Both pendulums hanging straight down at rest.
    #[must_use]
    pub fn default_state(&self) -> PendulumState {
        PendulumState::new([0.0; 2], [0.0; 2])
    }

    /// The demonstration's starting point: left at -60°, right at 0°
    /// spinning at 10 rad/s. Not assembled.
    #[must_use]
    pub fn initial_state(&self) -> PendulumState {
        PendulumState::new([-PI / 3.0, 0.0], [0.0, 10.0])
    }

    /// Moment of inertia about the pin
    #[must_use]
    pub fn pin_inertia(&self) -> Real {
        CENTRAL_INERTIA + MASS * HANG_LENGTH * HANG_LENGTH
    }

    /// Kinetic plus gravitational plus spring energy.
    #[must_use]
    pub fn energy(&self, state: &PendulumState) -> Real {
        let inertia = self.pin_inertia();
        let mut energy = 0.0;
        for (i, pin) in [LEFT_PIN, RIGHT_PIN].into_iter().enumerate() {
            let height = body_origin(pin, state.q[i]).y;
            energy += 0.5 * inertia * state.u[i] * state.u[i] + MASS * GRAVITY * height;
        }
        if let Coupling::Spring { stiffness, natural_length, .. } = self.coupling {
            let stretch = separation(state.q).length() - natural_length;
            energy += 0.5 * stiffness * stretch * stretch;
        }
        energy
    }

    /// Distance between the body origins minus the rod length; zero
    /// without a rod.
    #[must_use]
    pub fn constraint_error(&self, state: &PendulumState) -> Real {
        match self.coupling {
            Coupling::Rod { length } => separation(state.q).length() - length,
            _ => 0.0,
        }
    }

    /// Rate of change of the separation along the rod; zero without a rod.
    #[must_use]
    pub fn constraint_rate(&self, state: &PendulumState) -> Real {
        match self.coupling {
            Coupling::Rod { .. } => {
                let g = rod_gradient(state.q);
                g[0] * state.u[0] + g[1] * state.u[1]
            }
            _ => 0.0,
        }
    }

    /// Moves `state` onto the constraint manifold.
    ///
    /// Angles get a minimum-norm Gauss-Newton correction until the rod
    /// residual is below `tolerance`; rates are then projected so the
    /// rod length is not changing. A no-op without a rod.
    ///
    /// # Errors
    ///
    /// `AssemblyFailed` if the iteration does not converge.
    pub fn assemble(&self, state: &mut PendulumState, tolerance: Real) -> DriverResult<()> {
        let Coupling::Rod { length } = self.coupling else {
            return Ok(());
        };

        let mut q = state.q;
        let mut residual = rod_residual(q, length);
        let mut iterations = 0;
        while residual.abs() > tolerance {
            if iterations == ASSEMBLY_MAX_ITERATIONS {
                return Err(DriverError::AssemblyFailed { residual });
            }
            let g = rod_gradient(q);
            let gg = g[0] * g[0] + g[1] * g[1];
            if gg <= Real::EPSILON {
                return Err(DriverError::AssemblyFailed { residual });
            }
            q[0] -= g[0] * residual / gg;
            q[1] -= g[1] * residual / gg;
            residual = rod_residual(q, length);
            iterations += 1;
        }

        let g = rod_gradient(q);
        let gg = g[0] * g[0] + g[1] * g[1];
        let mut u = state.u;
        if gg > Real::EPSILON {
            let rate = (g[0] * u[0] + g[1] * u[1]) / gg;
            u[0] -= g[0] * rate;
            u[1] -= g[1] * rate;
        }

        tracing::debug!(iterations, residual, "Assembled rod constraint");
        state.set_q(q);
        state.set_u(u);
        Ok(())
    }

    /// Gravity plus spring/damper torques on each hinge.
    fn applied_torques(&self, q: [Real; 2], u: [Real; 2]) -> [Real; 2] {
        let mut torques = [
            -MASS * GRAVITY * HANG_LENGTH * q[0].sin(),
            -MASS * GRAVITY * HANG_LENGTH * q[1].sin(),
        ];
        if let Coupling::Spring { stiffness, damping, natural_length } = self.coupling {
            let r = separation(q);
            if let Some(dir) = r.try_normalize() {
                let (jl, jr) = (jacobian(q[0]), jacobian(q[1]));
                let rdot = jr * u[1] - jl * u[0];
                let magnitude = -stiffness * (r.length() - natural_length) - damping * rdot.dot(dir);
                let on_right = dir * magnitude;
                torques[0] -= jl.dot(on_right);
                torques[1] += jr.dot(on_right);
            }
        }
        torques
    }

    /// Hinge accelerations given the applied torques, including the rod
    /// reaction when there is one.
    fn forward_dynamics(&self, q: [Real; 2], u: [Real; 2], torques: [Real; 2]) -> [Real; 2] {
        let inertia = self.pin_inertia();
        let free = [torques[0] / inertia, torques[1] / inertia];
        let Coupling::Rod { length } = self.coupling else {
            return free;
        };

        let (jl, jr) = (jacobian(q[0]), jacobian(q[1]));
        let r = separation(q);
        let rdot = jr * u[1] - jl * u[0];
        let g = rod_gradient(q);
        let phi = rod_residual(q, length);
        let phidot = g[0] * u[0] + g[1] * u[1];
        let bias = centripetal(q[1], u[1]) - centripetal(q[0], u[0]);

        let target = -(rdot.dot(rdot) + r.dot(bias)) - BAUMGARTE_DAMPING * phidot - BAUMGARTE_STIFFNESS * phi;
        let effective = (g[0] * g[0] + g[1] * g[1]) / inertia;
        let shortfall = target - (g[0] * free[0] + g[1] * free[1]);
        let lambda = shortfall * effective / (effective * effective + SINGULARITY_DAMPING * SINGULARITY_DAMPING);
        [free[0] + g[0] * lambda / inertia, free[1] + g[1] * lambda / inertia]
    }

    fn assert_body(body: BodyHandle) {
        assert!(body.index() < BODY_COUNT, "body handle {} out of range (system has {BODY_COUNT} bodies)", body.index());
    }
}

impl MultibodySystem for TwoPendulums {
    type State = PendulumState;

    fn realize(&self, state: &mut PendulumState, stage: Stage) {
        if state.stage >= stage {
            return;
        }
        if stage >= Stage::Position && state.stage < Stage::Position {
            state.poses = [
                Transform::IDENTITY,
                body_pose(LEFT_PIN, state.q[0]),
                body_pose(RIGHT_PIN, state.q[1]),
            ];
        }
        if stage >= Stage::Velocity && state.stage < Stage::Velocity {
            state.velocities = [jacobian(state.q[0]) * state.u[0], jacobian(state.q[1]) * state.u[1]];
        }
        if stage >= Stage::Dynamics && state.stage < Stage::Dynamics {
            state.torques = self.applied_torques(state.q, state.u);
        }
        if stage >= Stage::Acceleration && state.stage < Stage::Acceleration {
            state.udot = self.forward_dynamics(state.q, state.u, state.torques);
        }
        state.stage = stage;
    }

    fn stage(&self, state: &PendulumState) -> Stage {
        state.stage
    }

    fn body_count(&self) -> usize {
        BODY_COUNT
    }

    fn topology_realized(&self) -> bool {
        true
    }

    fn body_transform(&self, state: &PendulumState, body: BodyHandle) -> Transform {
        Self::assert_body(body);
        assert!(
            state.stage >= Stage::Position,
            "body transform requested at stage {:?}",
            state.stage
        );
        state.poses[body.index()]
    }

    fn parent_body(&self, body: BodyHandle) -> Option<BodyHandle> {
        Self::assert_body(body);
        (!body.is_ground()).then_some(BodyHandle::GROUND)
    }

    fn default_inboard_frame(&self, body: BodyHandle) -> Transform {
        Self::assert_body(body);
        match body {
            LEFT => Transform::from_translation(LEFT_PIN),
            RIGHT => Transform::from_translation(RIGHT_PIN),
            _ => Transform::IDENTITY,
        }
    }

    fn default_outboard_frame(&self, body: BodyHandle) -> Transform {
        Self::assert_body(body);
        if body.is_ground() {
            Transform::IDENTITY
        } else {
            Transform::from_translation(Vec3::new(0.0, HANG_LENGTH, 0.0))
        }
    }

    fn default_mass_center(&self, body: BodyHandle) -> Vec3 {
        Self::assert_body(body);
        Vec3::ZERO
    }

    fn calc_topology_geometry(&self, geometry: &mut Vec<Decoration>) {
        for body in [LEFT, RIGHT] {
            geometry.push(Decoration::brick(BRICK_HALF_LENGTHS).with_body(body));
        }
    }

    fn calc_decorative_geometry_and_append(&self, state: &PendulumState, stage: Stage, geometry: &mut Vec<Decoration>) {
        if stage != Stage::Velocity || state.stage < Stage::Velocity {
            return;
        }
        // Arrows live in ground so their direction is the ground-frame velocity.
        for (i, velocity) in state.velocities.into_iter().enumerate() {
            let origin = state.poses[i + 1].translation;
            geometry.push(
                Decoration::line(origin, origin + velocity * VELOCITY_ARROW_SECONDS)
                    .with_color(Color::BLUE)
                    .with_line_thickness(2.0),
            );
        }
    }
}

/// Body origin in ground for hinge angle `theta`.
fn body_origin(pin: Vec3, theta: Real) -> Vec3 {
    pin + Vec3::new(HANG_LENGTH * theta.sin(), -HANG_LENGTH * theta.cos(), 0.0)
}

fn body_pose(pin: Vec3, theta: Real) -> Transform {
    Transform::new(Rotation::about_z(theta), body_origin(pin, theta))
}

/// `∂p/∂θ`
fn jacobian(theta: Real) -> Vec3 {
    Vec3::new(HANG_LENGTH * theta.cos(), HANG_LENGTH * theta.sin(), 0.0)
}

/// Acceleration of the body origin at zero angular acceleration.
fn centripetal(theta: Real, omega: Real) -> Vec3 {
    Vec3::new(-HANG_LENGTH * theta.sin(), HANG_LENGTH * theta.cos(), 0.0) * (omega * omega)
}

/// Right body origin minus left body origin.
fn separation(q: [Real; 2]) -> Vec3 {
    body_origin(RIGHT_PIN, q[1]) - body_origin(LEFT_PIN, q[0])
}

/// `Φ = (r·r - L²) / 2`
fn rod_residual(q: [Real; 2], length: Real) -> Real {
    let r = separation(q);
    0.5 * (r.dot(r) - length * length)
}

/// `∂Φ/∂q`
fn rod_gradient(q: [Real; 2]) -> [Real; 2] {
    let r = separation(q);
    [-r.dot(jacobian(q[0])), r.dot(jacobian(q[1]))]
}
