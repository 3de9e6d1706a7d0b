//! Edit mode and evaluation.

use crate::errors::{PoseWranglerError, Result};
use crate::network::evaluator::{EvaluationInput, RbfEvaluator};
use crate::network::{PoseNetwork, SolverHandle};
use crate::scene::SceneGraph;

impl PoseNetwork {
    /// Enters or leaves edit mode on a solver.
    ///
    /// Every other solver is sent to its "default" pose first. Entering edit
    /// mode also takes any other solver out of it, so at most one solver is
    /// ever editing.
    pub fn edit_solver(&mut self, handle: SolverHandle, edit: bool, scene: &mut dyn SceneGraph) -> Result<()> {
        self.solver_ref(handle)?;

        if edit
            && let Some(previous) = self.editing_value()
            && previous != handle
        {
            self.set_bindings_edit(previous, false)?;
            log::debug!("Solver {previous:?} left edit mode");
        }
        self.go_to_default_all(scene, Some(handle))?;

        self.set_bindings_edit(handle, edit)?;
        let slot = self.editing_slot();
        if edit {
            *slot = Some(handle);
        } else if *slot == Some(handle) {
            *slot = None;
        }
        log::debug!("Solver {handle:?} edit mode: {edit}");
        Ok(())
    }

    /// Whether the solver is the one in edit mode. Binding flags set outside
    /// [`edit_solver`](Self::edit_solver) do not count.
    pub fn is_editing(&self, handle: SolverHandle) -> Result<bool> {
        self.solver_ref(handle)?;
        Ok(self.editing_value() == Some(handle))
    }

    #[must_use]
    pub fn editing_solver(&self) -> Option<SolverHandle> {
        self.editing_value()
    }

    /// Flips the `edit` flag on every binding of the solver without touching
    /// the edit registry.
    pub(crate) fn set_bindings_edit(&mut self, handle: SolverHandle, edit: bool) -> Result<()> {
        for blender in self.blenders_of(handle)? {
            if let Some(b) = self.blender_mut(blender) {
                b.edit = edit;
            }
        }
        Ok(())
    }

    /// Runs the evaluator on the live inputs and applies its weights.
    ///
    /// Muted poses get zero weight and weights below the solver's threshold
    /// are clamped to zero. The weights are stored on the solver and every
    /// binding that is not in edit mode writes its blended output onto its
    /// driven transform.
    pub fn evaluate(
        &mut self,
        handle: SolverHandle,
        evaluator: &dyn RbfEvaluator,
        scene: &mut dyn SceneGraph,
    ) -> Result<Vec<f64>> {
        let solver = self.solver_ref(handle)?;
        let names: Vec<&str> = if solver.uses_controllers() {
            solver.controllers.iter().map(String::as_str).collect()
        } else {
            solver.drivers.iter().map(|d| d.name.as_str()).collect()
        };
        let inputs = names
            .into_iter()
            .map(|n| scene.require_local_matrix(n))
            .collect::<Result<Vec<_>>>()?;

        let mut weights = evaluator.evaluate(&EvaluationInput {
            config: &solver.config,
            poses: &solver.poses,
            inputs: &inputs,
            uses_controllers: solver.uses_controllers(),
        });
        if weights.len() != solver.num_poses() {
            return Err(PoseWranglerError::EvaluatorShape {
                expected: solver.num_poses(),
                actual: weights.len(),
            });
        }
        let threshold = solver.config.weight_threshold;
        for (weight, pose) in weights.iter_mut().zip(&solver.poses) {
            if !pose.enabled || weight.abs() < threshold {
                *weight = 0.0;
            }
        }

        for blender in solver.blenders.iter().filter_map(|b| self.blender(*b)) {
            if blender.edit {
                continue;
            }
            if !scene.set_local_matrix(&blender.driven, blender.blend(&weights)) {
                log::warn!("Driven '{}' no longer exists, skipping", blender.driven);
            }
        }

        self.solver_entry(handle)?.weights.clone_from(&weights);
        Ok(weights)
    }
}
