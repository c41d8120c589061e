//! # Fixed-Step RK4 Integrator
//!
//! Advances a [`PendulumState`] with classic fourth-order Runge-Kutta in
//! equal substeps no longer than the maximum step size. Each
//! [`Integrator::step_to`] call stops exactly at the nearest of the
//! next report time, the next scheduled event and the final time.

use armillary_rendering::{MultibodySystem, Stage};
use armillary_shared::Real;
use tracing::{debug, info};

use crate::error::DriverResult;
use crate::pendulums::{PendulumState, TwoPendulums};

/// Default largest substep (s).
pub const DEFAULT_MAX_STEP: Real = 1e-3;

/// Default tolerance on the rod residual at assembly.
pub const DEFAULT_ASSEMBLY_TOLERANCE: Real = 1e-10;

/// Why `step_to` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Time equals the requested report time
    ReachedReportTime,
    /// Time equals the scheduled event time, which came first
    ReachedScheduledEvent,
    /// Final time reached; nothing more to do
    EndOfSimulation,
}

impl StepStatus {
    /// Short label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReachedReportTime => "ReachedReportTime",
            Self::ReachedScheduledEvent => "ReachedScheduledEvent",
            Self::EndOfSimulation => "EndOfSimulation",
        }
    }
}

/// RK4 time stepper over [`TwoPendulums`].
#[derive(Debug)]
pub struct Integrator<'a> {
    system: &'a TwoPendulums,
    state: PendulumState,
    max_step: Real,
    final_time: Real,
    assembly_tolerance: Real,
    steps_taken: u64,
    previous_step: Real,
}

impl<'a> Integrator<'a> {
    /// Integrator starting from `state`. Call [`Self::initialize`] first.
    #[must_use]
    pub fn new(system: &'a TwoPendulums, state: PendulumState) -> Self {
        Self {
            system,
            state,
            max_step: DEFAULT_MAX_STEP,
            final_time: Real::INFINITY,
            assembly_tolerance: DEFAULT_ASSEMBLY_TOLERANCE,
            steps_taken: 0,
            previous_step: 0.0,
        }
    }

    /// Sets the largest substep. Non-positive values are ignored.
    pub fn set_max_step(&mut self, max_step: Real) {
        if max_step > 0.0 && max_step.is_finite() {
            self.max_step = max_step;
        }
    }

    /// Sets the time at which `step_to` reports the end.
    pub fn set_final_time(&mut self, final_time: Real) {
        self.final_time = final_time;
    }

    /// End of the run
    #[must_use]
    pub const fn final_time(&self) -> Real {
        self.final_time
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &PendulumState {
        &self.state
    }

    /// Current state, mutably (the frame synchronizer realizes it)
    pub fn state_mut(&mut self) -> &mut PendulumState {
        &mut self.state
    }

    /// RK4 steps taken so far
    #[must_use]
    pub const fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Size of the most recent substep; 0 before the first
    #[must_use]
    pub const fn previous_step_size(&self) -> Real {
        self.previous_step
    }

    /// Assembles the state onto the constraint manifold and realizes it.
    ///
    /// # Errors
    ///
    /// `AssemblyFailed` if the constraint cannot be satisfied.
    pub fn initialize(&mut self) -> DriverResult<()> {
        self.system.assemble(&mut self.state, self.assembly_tolerance)?;
        self.system.realize(&mut self.state, Stage::Velocity);
        self.steps_taken = 0;
        info!(
            time = self.state.time(),
            max_step = self.max_step,
            final_time = self.final_time,
            "Integrator initialized"
        );
        Ok(())
    }

    /// Advances to `report_time`, or to `event_time` or the final time if
    /// either comes first.
    ///
    /// Times already passed are treated as "now": the call takes no step
    /// and reports that target as reached.
    pub fn step_to(&mut self, report_time: Real, event_time: Real) -> StepStatus {
        let now = self.state.time();
        if now >= self.final_time {
            return StepStatus::EndOfSimulation;
        }

        let (target, status) = if event_time < report_time && event_time <= self.final_time {
            (event_time, StepStatus::ReachedScheduledEvent)
        } else if report_time <= self.final_time {
            (report_time, StepStatus::ReachedReportTime)
        } else {
            (self.final_time, StepStatus::EndOfSimulation)
        };
        let target = target.max(now);

        self.advance_to(target);
        self.system.realize(&mut self.state, Stage::Velocity);
        if status == StepStatus::ReachedScheduledEvent {
            debug!(time = target, "Scheduled event reached");
        }
        status
    }

    fn advance_to(&mut self, target: Real) {
        let span = target - self.state.time();
        if span <= 0.0 {
            return;
        }
        // Shave roundoff so 0.02 / 0.001 is 20 substeps, not 21.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let substeps = (span / self.max_step * (1.0 - 1e-12)).ceil().max(1.0) as u64;
        #[allow(clippy::cast_precision_loss)]
        let h = span / substeps as Real;
        let start = self.state.time();
        for i in 1..=substeps {
            self.rk4_step(h);
            #[allow(clippy::cast_precision_loss)]
            self.state.set_time(start + h * i as Real);
        }
        // Land exactly on the target rather than on the accumulated sum.
        self.state.set_time(target);
        self.previous_step = h;
    }

    /// One RK4 step of size `h` on `(q, u)`.
    fn rk4_step(&mut self, h: Real) {
        let q0 = self.state.q();
        let u0 = self.state.u();

        // ==================== Stage 1: k1 = f(y) ====================
        let (k1_q, k1_u) = self.derivatives(q0, u0);

        // =============== Stage 2: k2 = f(y + h/2*k1) ===============
        let (k2_q, k2_u) = self.derivatives(offset(q0, k1_q, 0.5 * h), offset(u0, k1_u, 0.5 * h));

        // =============== Stage 3: k3 = f(y + h/2*k2) ===============
        let (k3_q, k3_u) = self.derivatives(offset(q0, k2_q, 0.5 * h), offset(u0, k2_u, 0.5 * h));

        // ================= Stage 4: k4 = f(y + h*k3) =================
        let (k4_q, k4_u) = self.derivatives(offset(q0, k3_q, h), offset(u0, k3_u, h));

        // ========== Combine: y += h/6 * (k1 + 2k2 + 2k3 + k4) ==========
        let mut q = q0;
        let mut u = u0;
        for i in 0..2 {
            q[i] += h / 6.0 * (k1_q[i] + 2.0 * k2_q[i] + 2.0 * k3_q[i] + k4_q[i]);
            u[i] += h / 6.0 * (k1_u[i] + 2.0 * k2_u[i] + 2.0 * k3_u[i] + k4_u[i]);
        }
        self.state.set_q(q);
        self.state.set_u(u);
        self.steps_taken += 1;
    }

    /// `(q̇, u̇)` at `(q, u)`, computed by realizing the state.
    fn derivatives(&mut self, q: [Real; 2], u: [Real; 2]) -> ([Real; 2], [Real; 2]) {
        self.state.set_q(q);
        self.state.set_u(u);
        self.system.realize(&mut self.state, Stage::Acceleration);
        (u, self.state.udot())
    }
}

fn offset(y: [Real; 2], dy: [Real; 2], h: Real) -> [Real; 2] {
    [y[0] + h * dy[0], y[1] + h * dy[1]]
}
