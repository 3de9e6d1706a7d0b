use crate::errors::Result;
use crate::math::Trs;
use crate::network::{DEFAULT_POSE, SolverHandle};
use crate::scene::SceneGraph;
use crate::session::{Extension, Session};

/// Resets every driven transform to identity in the "default" pose.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroDefaultPose;

impl ZeroDefaultPose {
    pub fn zero<S: SceneGraph + 'static>(session: &mut Session<S>, solver: SolverHandle) -> Result<()> {
        session.go_to_pose(solver, DEFAULT_POSE)?;
        let was_editing = session.is_editing(solver)?;
        if !was_editing {
            session.edit_solver(solver, true)?;
        }
        for driven in session.network().driven_nodes(solver)? {
            if !session.scene_mut().set_trs(&driven, &Trs::IDENTITY) {
                log::warn!("Driven '{driven}' no longer exists");
            }
        }
        session.update_pose(solver, DEFAULT_POSE)?;
        session.edit_solver(solver, was_editing)
    }
}

impl<S: SceneGraph + 'static> Extension<S> for ZeroDefaultPose {
    fn name(&self) -> &'static str {
        "Zero Default Pose"
    }

    fn execute(&mut self, session: &mut Session<S>) -> Result<()> {
        let solver = session.require_current()?;
        Self::zero(session, solver)
    }
}
