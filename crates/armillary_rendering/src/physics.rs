//! The multibody system as seen from the renderer.
//!
//! The renderer never integrates, solves or collides anything. All it
//! needs from the physics side is captured by [`MultibodySystem`]: realize
//! a state far enough to know body poses, read those poses, and ask for
//! any decorative geometry the system wants drawn.

use crate::decoration::Decoration;
use armillary_shared::{BodyHandle, Transform, Vec3};

/// How far a state has been computed. Later stages imply earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Nothing known
    Empty,
    /// Bodies and joints fixed
    Topology,
    /// Model parameters fixed
    Model,
    /// Instance parameters fixed
    Instance,
    /// Time known
    Time,
    /// Body poses known
    Position,
    /// Body velocities known
    Velocity,
    /// Forces known
    Dynamics,
    /// Accelerations known
    Acceleration,
    /// Everything, including report-only quantities
    Report,
}

impl Stage {
    /// All stages in order.
    pub const ALL: [Self; 10] = [
        Self::Empty,
        Self::Topology,
        Self::Model,
        Self::Instance,
        Self::Time,
        Self::Position,
        Self::Velocity,
        Self::Dynamics,
        Self::Acceleration,
        Self::Report,
    ];

    /// Stages from `from` through `to`, inclusive. Empty if `to < from`.
    pub fn range(from: Self, to: Self) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |s| *s >= from && *s <= to)
    }
}

/// Read-only contract the frame synchronizer drives.
///
/// ## Contract
///
/// - `realize` is idempotent: realizing to a stage the state already
///   reached does nothing.
/// - `body_transform` panics if the state has not reached
///   [`Stage::Position`] or the handle is out of range.
pub trait MultibodySystem {
    /// Mutable state (time, coordinates, cached results).
    type State;

    /// Computes everything up to and including `stage`.
    fn realize(&self, state: &mut Self::State, stage: Stage);

    /// Highest stage `state` has reached.
    fn stage(&self, state: &Self::State) -> Stage;

    /// Number of bodies, ground included.
    fn body_count(&self) -> usize;

    /// True once bodies and joints are final.
    fn topology_realized(&self) -> bool;

    /// Pose of `body` in ground.
    fn body_transform(&self, state: &Self::State, body: BodyHandle) -> Transform;

    /// Parent in the tree; `None` for ground.
    fn parent_body(&self, body: BodyHandle) -> Option<BodyHandle>;

    /// Joint frame on the parent, expressed in the parent (`X_PF`).
    fn default_inboard_frame(&self, body: BodyHandle) -> Transform;

    /// Joint frame on the body, expressed in the body (`X_BM`).
    fn default_outboard_frame(&self, body: BodyHandle) -> Transform;

    /// Mass center station in the body frame.
    fn default_mass_center(&self, body: BodyHandle) -> Vec3;

    /// Geometry that exists without a state (attached once).
    fn calc_topology_geometry(&self, geometry: &mut Vec<Decoration>) {
        let _ = geometry;
    }

    /// Geometry for one stage of `state`, appended to `geometry`.
    fn calc_decorative_geometry_and_append(
        &self,
        state: &Self::State,
        stage: Stage,
        geometry: &mut Vec<Decoration>,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_ordering() {
        assert!(Stage::Empty < Stage::Topology);
        assert!(Stage::Position < Stage::Velocity);
        assert!(Stage::Acceleration < Stage::Report);
    }

    #[test]
    fn test_stage_range() {
        let stages: Vec<_> = Stage::range(Stage::Model, Stage::Position).collect();
        assert_eq!(stages, vec![Stage::Model, Stage::Instance, Stage::Time, Stage::Position]);
        assert_eq!(Stage::range(Stage::Model, Stage::Topology).count(), 0);
    }
}
