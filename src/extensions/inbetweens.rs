use crate::errors::Result;
use crate::extensions::CopyPasteTrs;
use crate::network::SolverHandle;
use crate::scene::SceneGraph;
use crate::session::{Extension, Session};

/// Generates evenly spaced poses between the live pose and the rest pose.
///
/// Needs a registered [`CopyPasteTrs`].
#[derive(Debug, Clone)]
pub struct GenerateInbetweens {
    pub count: usize,
    pub prefix: String,
}

impl Default for GenerateInbetweens {
    fn default() -> Self {
        Self {
            count: 1,
            prefix: "pose".to_owned(),
        }
    }
}

impl GenerateInbetweens {
    #[must_use]
    pub fn new(count: usize, prefix: impl Into<String>) -> Self {
        Self {
            count,
            prefix: prefix.into(),
        }
    }

    /// Records `{prefix}_0` .. `{prefix}_{count-1}`, stepping the copied pose
    /// down towards zero by `1 / (count + 1)` each time.
    pub fn generate<S: SceneGraph + 'static>(
        &self,
        session: &mut Session<S>,
        solver: SolverHandle,
    ) -> Result<Vec<String>> {
        let (count, prefix) = (self.count, self.prefix.as_str());
        session.with_extension::<CopyPasteTrs, _>(|clipboard, session| {
            clipboard.copy_driven(session, solver)?;
            clipboard.copy_driver(session, solver)?;

            let step = 1.0 / (count as f64 + 1.0);
            let mut multiplier = 1.0;
            let mut created = Vec::with_capacity(count);
            for i in 0..count {
                multiplier -= step;
                clipboard.paste_driven(session, multiplier)?;
                clipboard.paste_driver(session, multiplier)?;
                let name = format!("{prefix}_{i}");
                session.create_pose(solver, &name)?;
                created.push(name);
            }
            Ok(created)
        })
    }
}

impl<S: SceneGraph + 'static> Extension<S> for GenerateInbetweens {
    fn name(&self) -> &'static str {
        "Generate Inbetweens"
    }

    fn execute(&mut self, session: &mut Session<S>) -> Result<()> {
        let solver = session.require_current()?;
        let created = self.generate(session, solver)?;
        log::info!("Generated inbetween poses {created:?}");
        Ok(())
    }
}
