//! # Armillary
//!
//! Two pendulums, optionally coupled, integrated with RK4 and drawn
//! through the frame synchronizer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        TWO PENDULUMS                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  TwoPendulums (MultibodySystem)                               │
//! │        ▲                     ▲                                │
//! │        │ realize             │ poses, decorations             │
//! │  Integrator::step_to   FrameSynchronizer::report              │
//! │        └────── demo::run (report / event schedule) ──────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `pendulums`: the system and its state
//! - `integrator`: fixed-step RK4 with report/event stopping
//! - `demo`: scene decoration and the report loop

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

pub mod demo;
pub mod error;
pub mod integrator;
pub mod pendulums;

pub use demo::{decorate, run, RunSummary, OUTPUT_INTERVAL, SCHEDULED_EVENTS};
pub use error::{DriverError, DriverResult};
pub use integrator::{Integrator, StepStatus};
pub use pendulums::{Coupling, PendulumState, TwoPendulums};
