//! Scripted multibody system: poses are whatever the test puts in the state.

#![allow(dead_code)]

use armillary_rendering::{BodyHandle, Decoration, MultibodySystem, Stage, Transform, Vec3};
use std::cell::Cell;

/// Ground plus `bodies - 1` bodies, each a child of ground.
pub struct Scripted {
    pub bodies: usize,
    pub realized: bool,
    /// Emitted at `Stage::Velocity` for every state reaching it
    pub velocity_geometry: Vec<Decoration>,
    pub realize_calls: Cell<u32>,
}

pub struct ScriptedState {
    pub poses: Vec<Transform>,
    pub stage: Stage,
}

impl Scripted {
    pub fn new(bodies: usize) -> Self {
        Self { bodies, realized: true, velocity_geometry: Vec::new(), realize_calls: Cell::new(0) }
    }

    pub fn state(&self, poses: Vec<Transform>) -> ScriptedState {
        assert_eq!(poses.len(), self.bodies);
        ScriptedState { poses, stage: Stage::Time }
    }

    /// All bodies at identity except ground.
    pub fn rest_state(&self) -> ScriptedState {
        self.state(vec![Transform::IDENTITY; self.bodies])
    }
}

impl MultibodySystem for Scripted {
    type State = ScriptedState;

    fn realize(&self, state: &mut ScriptedState, stage: Stage) {
        self.realize_calls.set(self.realize_calls.get() + 1);
        state.stage = state.stage.max(stage);
    }

    fn stage(&self, state: &ScriptedState) -> Stage {
        state.stage
    }

    fn body_count(&self) -> usize {
        self.bodies
    }

    fn topology_realized(&self) -> bool {
        self.realized
    }

    fn body_transform(&self, state: &ScriptedState, body: BodyHandle) -> Transform {
        assert!(state.stage >= Stage::Position, "poses not realized");
        state.poses[body.index()]
    }

    fn parent_body(&self, body: BodyHandle) -> Option<BodyHandle> {
        (!body.is_ground()).then_some(BodyHandle::GROUND)
    }

    fn default_inboard_frame(&self, _: BodyHandle) -> Transform {
        Transform::IDENTITY
    }

    fn default_outboard_frame(&self, _: BodyHandle) -> Transform {
        Transform::IDENTITY
    }

    fn default_mass_center(&self, _: BodyHandle) -> Vec3 {
        Vec3::ZERO
    }

    fn calc_decorative_geometry_and_append(
        &self,
        _: &ScriptedState,
        stage: Stage,
        geometry: &mut Vec<Decoration>,
    ) {
        if stage == Stage::Velocity {
            geometry.extend(self.velocity_geometry.iter().copied());
        }
    }
}
