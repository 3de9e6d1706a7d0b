//! Blendshape bindings: sculpted meshes layered on top of driven transforms.
//!
//! Each pose can carry one sculpt mesh. Its weight follows the pose's output
//! weight unless one pose is isolated for sculpting, in which case only that
//! pose's mesh is fully on.

use crate::errors::{PoseWranglerError, Result};
use crate::network::pose::PoseRef;
use crate::network::{PoseNetwork, SolverHandle};
use crate::scene::SceneGraph;

/// Associates a pose with a sculpt mesh and the base mesh it was made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlendshapeBinding {
    pub pose: String,
    pub mesh: String,
    pub base_mesh: String,
}

impl PoseNetwork {
    /// Binds an existing sculpt mesh to a pose.
    pub fn add_blendshape(
        &mut self,
        handle: SolverHandle,
        pose: &str,
        mesh: &str,
        base_mesh: &str,
        scene: &dyn SceneGraph,
    ) -> Result<()> {
        self.resolve_pose(handle, PoseRef::Name(pose))?;
        let solver = self.solver_ref(handle)?;
        if solver.blendshape_for_pose(pose).is_some() {
            return Err(PoseWranglerError::blendshape(format!(
                "pose '{pose}' on '{}' already has a blendshape",
                solver.name
            )));
        }
        for name in [mesh, base_mesh] {
            if !scene.exists(name) {
                return Err(PoseWranglerError::transform_not_found(name));
            }
        }
        if let Some((_, owner)) = self
            .solvers()
            .into_iter()
            .find(|(_, s)| s.blendshapes.iter().any(|b| b.mesh == mesh))
        {
            return Err(PoseWranglerError::blendshape(format!(
                "mesh '{mesh}' is already bound to solver '{}'",
                owner.name
            )));
        }

        let solver = self.solver_entry(handle)?;
        solver.blendshapes.push(BlendshapeBinding {
            pose: pose.to_owned(),
            mesh: mesh.to_owned(),
            base_mesh: base_mesh.to_owned(),
        });
        log::debug!("Bound blendshape '{mesh}' to pose '{pose}' on '{}'", solver.name);
        Ok(())
    }

    /// Duplicates `base_mesh` in the pose's shape and binds the copy.
    ///
    /// The solver is sent to the pose first so the copy starts from the posed
    /// state. If binding fails the copy is deleted again.
    pub fn create_blendshape(
        &mut self,
        handle: SolverHandle,
        pose: &str,
        base_mesh: &str,
        name: Option<&str>,
        scene: &mut dyn SceneGraph,
    ) -> Result<String> {
        self.resolve_pose(handle, PoseRef::Name(pose))?;
        if self.solver_ref(handle)?.blendshape_for_pose(pose).is_some() {
            return Err(PoseWranglerError::blendshape(format!("pose '{pose}' already has a blendshape")));
        }
        if !scene.exists(base_mesh) {
            return Err(PoseWranglerError::transform_not_found(base_mesh));
        }

        self.go_to_pose(handle, pose, scene)?;
        let requested = name.map_or_else(|| format!("{pose}_{base_mesh}"), str::to_owned);
        let mesh = scene.duplicate(base_mesh, &requested)?;

        if let Err(err) = self.add_blendshape(handle, pose, &mesh, base_mesh, scene) {
            log::error!("Binding blendshape '{mesh}' failed, deleting it: {err}");
            scene.delete(&mesh);
            return Err(err);
        }
        Ok(mesh)
    }

    /// Unbinds the pose's blendshape, optionally deleting the sculpt mesh.
    ///
    /// Returns `false` if the pose had none.
    pub fn delete_blendshape(
        &mut self,
        handle: SolverHandle,
        pose: &str,
        delete_mesh: bool,
        scene: &mut dyn SceneGraph,
    ) -> Result<bool> {
        self.resolve_pose(handle, PoseRef::Name(pose))?;
        let solver = self.solver_entry(handle)?;
        let Some(index) = solver.blendshapes.iter().position(|b| b.pose == pose) else {
            return Ok(false);
        };
        let binding = solver.blendshapes.remove(index);
        if solver.isolated.as_deref() == Some(pose) {
            solver.isolated = None;
        }
        if delete_mesh && !scene.delete(&binding.mesh) {
            log::warn!("Blendshape mesh '{}' was already gone", binding.mesh);
        }
        Ok(true)
    }

    /// Isolates (or releases) the pose's blendshape for sculpting.
    pub fn isolate_blendshape(&mut self, handle: SolverHandle, pose: &str, isolate: bool) -> Result<()> {
        self.resolve_pose(handle, PoseRef::Name(pose))?;
        let solver = self.solver_entry(handle)?;
        if solver.blendshape_for_pose(pose).is_none() {
            return Err(PoseWranglerError::blendshape(format!("pose '{pose}' has no blendshape")));
        }
        if isolate {
            solver.isolated = Some(pose.to_owned());
        } else if solver.isolated.as_deref() == Some(pose) {
            solver.isolated = None;
        }
        Ok(())
    }

    pub fn blendshape_for_pose(&self, handle: SolverHandle, pose: &str) -> Result<Option<&BlendshapeBinding>> {
        self.resolve_pose(handle, PoseRef::Name(pose))?;
        Ok(self.solver_ref(handle)?.blendshape_for_pose(pose))
    }

    /// Current weight of every sculpt mesh, from the last evaluation.
    pub fn blendshape_weights(&self, handle: SolverHandle) -> Result<Vec<(String, f64)>> {
        let solver = self.solver_ref(handle)?;
        Ok(solver
            .blendshapes
            .iter()
            .map(|binding| {
                let weight = match solver.isolated.as_deref() {
                    Some(isolated) if isolated == binding.pose => 1.0,
                    Some(_) => 0.0,
                    None => solver
                        .pose_index(&binding.pose)
                        .and_then(|i| solver.weights.get(i))
                        .copied()
                        .unwrap_or(0.0),
                };
                (binding.mesh.clone(), weight)
            })
            .collect())
    }
}
