use crate::animation::{AnimationClip, ClipBuilder};
use crate::errors::Result;
use crate::network::SolverHandle;
use crate::scene::SceneGraph;
use crate::session::{Extension, Session};

/// Result of baking a solver's poses onto a timeline.
#[derive(Debug, Clone)]
pub struct BakedPoses {
    pub clip: AnimationClip,
    /// Pose names in frame order, starting at `start_frame`.
    pub poses: Vec<String>,
    pub start_frame: i32,
    pub end_frame: i32,
}

/// Keys every driver and driven transform once per pose, on consecutive frames.
#[derive(Debug, Clone, Default)]
pub struct BakePoses {
    last: Option<BakedPoses>,
}

impl BakePoses {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The clip produced by the last [`execute`](Extension::execute).
    #[must_use]
    pub fn last(&self) -> Option<&BakedPoses> {
        self.last.as_ref()
    }

    /// Bakes pose `k` at frame `start_frame + k`.
    ///
    /// Before each pose is applied the frames either side of it are keyed
    /// with the current state, so the pose holds on its own frame.
    pub fn bake<S: SceneGraph + 'static>(
        session: &mut Session<S>,
        solver: SolverHandle,
        start_frame: i32,
    ) -> Result<BakedPoses> {
        let mut transforms = session
            .network()
            .solver(solver)
            .map(|s| s.driver_names())
            .unwrap_or_default();
        transforms.extend(session.network().driven_nodes(solver)?);
        let poses = session.network().pose_names(solver)?;

        let mut builder = ClipBuilder::new();
        let key = |builder: &mut ClipBuilder, session: &Session<S>, frame: i32| {
            for transform in &transforms {
                match session.scene().local_matrix(transform) {
                    Some(matrix) => builder.key(transform, f64::from(frame), &matrix),
                    None => log::warn!("'{transform}' no longer exists, not keyed"),
                }
            }
        };

        let mut frame = start_frame;
        for pose in &poses {
            key(&mut builder, session, frame - 1);
            key(&mut builder, session, frame + 1);
            session.go_to_pose(solver, pose)?;
            key(&mut builder, session, frame);
            frame += 1;
        }

        let name = session
            .network()
            .solver(solver)
            .map_or_else(String::new, |s| s.name().to_owned());
        log::info!("Baked {} poses of '{name}'", poses.len());
        Ok(BakedPoses {
            clip: builder.build(name),
            poses,
            start_frame,
            end_frame: frame - 1,
        })
    }
}

impl<S: SceneGraph + 'static> Extension<S> for BakePoses {
    fn name(&self) -> &'static str {
        "Bake Poses To Timeline"
    }

    fn execute(&mut self, session: &mut Session<S>) -> Result<()> {
        let solver = session.require_current()?;
        let start_frame = session.settings().bake_start_frame;
        self.last = Some(Self::bake(session, solver, start_frame)?);
        Ok(())
    }
}
