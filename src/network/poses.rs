//! Pose CRUD on [`PoseNetwork`].

use glam::DMat4;
use smallvec::SmallVec;

use crate::errors::{PoseWranglerError, Result};
use crate::network::blendshape::BlendshapeBinding;
use crate::network::pose::{Pose, PoseData, PoseOverrides, PoseRef, PoseSample};
use crate::network::solver::Solver;
use crate::network::{BlenderHandle, DEFAULT_POSE, PoseNetwork, SolverHandle};
use crate::scene::SceneGraph;

fn check_arity(solver: &Solver, sample: &PoseSample) -> Result<()> {
    if sample.driver_matrices.len() != solver.drivers.len() {
        return Err(PoseWranglerError::ArityMismatch {
            solver: solver.name.clone(),
            what: "driver",
            expected: solver.drivers.len(),
            actual: sample.driver_matrices.len(),
        });
    }
    if solver.uses_controllers() && sample.controller_matrices.len() != solver.controllers.len() {
        return Err(PoseWranglerError::ArityMismatch {
            solver: solver.name.clone(),
            what: "controller",
            expected: solver.controllers.len(),
            actual: sample.controller_matrices.len(),
        });
    }
    Ok(())
}

/// Controller matrices are only kept when the solver has controllers.
fn controller_matrices(uses_controllers: bool, matrices: Vec<DMat4>) -> Vec<DMat4> {
    if uses_controllers { matrices } else { Vec::new() }
}

impl PoseNetwork {
    /// Resolves a [`PoseRef`] to a pose index.
    pub fn resolve_pose(&self, handle: SolverHandle, pose: PoseRef<'_>) -> Result<usize> {
        let solver = self.solver_ref(handle)?;
        match pose {
            PoseRef::Name(name) => solver
                .pose_index(name)
                .ok_or_else(|| PoseWranglerError::pose_not_found(&solver.name, name)),
            PoseRef::Index(index) if index < solver.num_poses() => Ok(index),
            PoseRef::Index(index) => Err(PoseWranglerError::PoseIndexInvalid {
                solver: solver.name.clone(),
                reason: format!("index {index} out of range for {} poses", solver.num_poses()),
            }),
        }
    }

    /// Matrix each binding records for a new or updated pose: the supplied
    /// one, else the transform's current local matrix, else the base pose.
    fn driven_targets(
        &self,
        solver: &Solver,
        sample: &PoseSample,
        scene: &dyn SceneGraph,
    ) -> Vec<(BlenderHandle, DMat4)> {
        solver
            .blenders
            .iter()
            .filter_map(|handle| self.blender(*handle).map(|b| (*handle, b)))
            .map(|(handle, blender)| {
                let matrix = sample
                    .driven_matrices
                    .get(&blender.driven)
                    .copied()
                    .or_else(|| scene.local_matrix(&blender.driven))
                    .unwrap_or_else(|| {
                        log::warn!(
                            "Driven '{}' is missing from the scene; recording its base pose",
                            blender.driven
                        );
                        blender.base_pose
                    });
                (handle, matrix)
            })
            .collect()
    }

    fn sample_blendshape(&self, solver: &Solver, pose: &str, sample: &PoseSample, scene: &dyn SceneGraph) -> Option<BlendshapeBinding> {
        let (mesh, base_mesh) = sample.blendshape.as_ref()?;
        if !scene.exists(mesh) {
            log::warn!("Blendshape mesh '{mesh}' for pose '{pose}' is missing, not binding it");
            return None;
        }
        if solver.blendshapes.iter().any(|b| b.mesh == *mesh && b.pose != pose) {
            log::warn!("Blendshape mesh '{mesh}' is already bound to another pose of '{}'", solver.name);
            return None;
        }
        Some(BlendshapeBinding {
            pose: pose.to_owned(),
            mesh: mesh.clone(),
            base_mesh: base_mesh.clone(),
        })
    }

    /// Appends a pose and returns its index.
    ///
    /// Every driven binding records a matrix for the new index: the one in
    /// `sample.driven_matrices`, its transform's current local matrix, or its
    /// base pose when the transform is gone.
    pub fn add_pose(
        &mut self,
        handle: SolverHandle,
        name: &str,
        sample: PoseSample,
        scene: &dyn SceneGraph,
    ) -> Result<usize> {
        let solver = self.solver_ref(handle)?;
        if solver.drivers.is_empty() {
            return Err(PoseWranglerError::NoDriver(solver.name.clone()));
        }
        if solver.has_pose(name) {
            return Err(PoseWranglerError::DuplicatePose {
                solver: solver.name.clone(),
                pose: name.to_owned(),
            });
        }
        check_arity(solver, &sample)?;
        let targets = self.driven_targets(solver, &sample, scene);
        let blendshape = self.sample_blendshape(solver, name, &sample, scene);

        for (blender, matrix) in targets {
            if let Some(b) = self.blender_mut(blender) {
                b.push_pose(matrix);
            }
        }
        let solver = self.solver_entry(handle)?;
        let solver_uses_controllers = solver.uses_controllers();
        let index = solver.poses.len();
        solver.poses.push(Pose {
            name: name.to_owned(),
            driver_matrices: SmallVec::from_vec(sample.driver_matrices),
            controller_matrices: controller_matrices(solver_uses_controllers, sample.controller_matrices),
            enabled: sample.enabled,
            overrides: sample.overrides,
        });
        solver.weights.push(0.0);
        if let Some(binding) = blendshape {
            solver.blendshapes.retain(|b| b.pose != name);
            solver.blendshapes.push(binding);
        }
        log::debug!("Added pose '{name}' at index {index} to solver '{}'", solver.name);
        Ok(index)
    }

    /// Overwrites an existing pose in place; its index does not change.
    ///
    /// Bindings not listed in `sample.driven_matrices` re-capture their
    /// transform's current local matrix.
    pub fn update_pose(
        &mut self,
        handle: SolverHandle,
        name: &str,
        sample: PoseSample,
        scene: &dyn SceneGraph,
    ) -> Result<usize> {
        let solver = self.solver_ref(handle)?;
        let index = solver
            .pose_index(name)
            .ok_or_else(|| PoseWranglerError::pose_not_found(&solver.name, name))?;
        check_arity(solver, &sample)?;
        let targets = self.driven_targets(solver, &sample, scene);
        let blendshape = self.sample_blendshape(solver, name, &sample, scene);

        for (blender, matrix) in targets {
            if let Some(b) = self.blender_mut(blender) {
                b.set_pose(index, matrix);
            }
        }
        let solver = self.solver_entry(handle)?;
        let solver_uses_controllers = solver.uses_controllers();
        let pose = &mut solver.poses[index];
        pose.driver_matrices = SmallVec::from_vec(sample.driver_matrices);
        pose.controller_matrices = controller_matrices(solver_uses_controllers, sample.controller_matrices);
        pose.enabled = sample.enabled;
        pose.overrides = sample.overrides;
        if let Some(binding) = blendshape {
            solver.blendshapes.retain(|b| b.pose != name);
            solver.blendshapes.push(binding);
        }
        log::debug!("Updated pose '{name}' on solver '{}'", solver.name);
        Ok(index)
    }

    /// Reads the live driver and controller matrices into a sample.
    pub fn capture_sample(&self, handle: SolverHandle, scene: &dyn SceneGraph) -> Result<PoseSample> {
        let solver = self.solver_ref(handle)?;
        let drivers = solver
            .drivers
            .iter()
            .map(|d| scene.require_local_matrix(&d.name))
            .collect::<Result<Vec<_>>>()?;
        let controllers = solver
            .controllers
            .iter()
            .map(|c| scene.require_local_matrix(c))
            .collect::<Result<Vec<_>>>()?;
        Ok(PoseSample::new(drivers).with_controllers(controllers))
    }

    /// Records a new pose from the live scene.
    pub fn add_pose_from_current(&mut self, handle: SolverHandle, name: &str, scene: &dyn SceneGraph) -> Result<usize> {
        let sample = self.capture_sample(handle, scene)?;
        self.add_pose(handle, name, sample, scene)
    }

    /// Overwrites a pose from the live scene, keeping its overrides and mute state.
    pub fn update_pose_from_current(&mut self, handle: SolverHandle, name: &str, scene: &dyn SceneGraph) -> Result<usize> {
        let solver = self.solver_ref(handle)?;
        let pose = solver
            .poses
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| PoseWranglerError::pose_not_found(&solver.name, name))?;
        let (overrides, enabled) = (pose.overrides, pose.enabled);
        let sample = self
            .capture_sample(handle, scene)?
            .with_overrides(overrides)
            .with_enabled(enabled);
        self.update_pose(handle, name, sample, scene)
    }

    /// Adds the pose, or updates it if the name exists.
    pub fn upsert_pose(&mut self, handle: SolverHandle, name: &str, sample: PoseSample, scene: &dyn SceneGraph) -> Result<usize> {
        if self.solver_ref(handle)?.has_pose(name) {
            self.update_pose(handle, name, sample, scene)
        } else {
            self.add_pose(handle, name, sample, scene)
        }
    }

    /// [`add_pose_from_current`](Self::add_pose_from_current) or
    /// [`update_pose_from_current`](Self::update_pose_from_current), whichever applies.
    pub fn capture_pose(&mut self, handle: SolverHandle, name: &str, scene: &dyn SceneGraph) -> Result<usize> {
        if self.solver_ref(handle)?.has_pose(name) {
            self.update_pose_from_current(handle, name, scene)
        } else {
            self.add_pose_from_current(handle, name, scene)
        }
    }

    /// Removes a pose. Later poses shift down one index on the solver and on
    /// every binding; a blendshape bound to the pose is unbound first.
    pub fn delete_pose(&mut self, handle: SolverHandle, name: &str) -> Result<()> {
        let index = self.resolve_pose(handle, PoseRef::Name(name))?;
        let blenders = self.blenders_of(handle)?;

        let solver = self.solver_entry(handle)?;
        solver.blendshapes.retain(|b| b.pose != name);
        if solver.isolated.as_deref() == Some(name) {
            solver.isolated = None;
        }
        solver.poses.remove(index);
        if index < solver.weights.len() {
            solver.weights.remove(index);
        }
        log::debug!("Deleted pose '{name}' from solver '{}'", solver.name);

        for blender in blenders {
            if let Some(b) = self.blender_mut(blender) {
                b.remove_pose(index);
            }
        }
        Ok(())
    }

    /// Writes a pose back onto the live transforms without evaluating.
    ///
    /// Driver matrices (controller matrices when the solver has controllers)
    /// go onto the inputs, and each binding's recorded matrix onto its driven
    /// transform. Missing transforms are logged and skipped.
    pub fn go_to_pose(&self, handle: SolverHandle, name: &str, scene: &mut dyn SceneGraph) -> Result<()> {
        let index = self.resolve_pose(handle, PoseRef::Name(name))?;
        let solver = self.solver_ref(handle)?;
        let pose = &solver.poses[index];

        let inputs: Vec<(&str, &DMat4)> = if solver.uses_controllers() {
            solver
                .controllers
                .iter()
                .map(String::as_str)
                .zip(&pose.controller_matrices)
                .collect()
        } else {
            solver
                .drivers
                .iter()
                .map(|d| d.name.as_str())
                .zip(pose.driver_matrices.iter())
                .collect()
        };
        for (transform, matrix) in inputs {
            if !scene.set_local_matrix(transform, *matrix) {
                log::warn!("Input '{transform}' of solver '{}' no longer exists", solver.name);
            }
        }

        for blender in solver.blenders.iter().filter_map(|b| self.blender(*b)) {
            match blender.pose(index) {
                Some(matrix) => {
                    if !scene.set_local_matrix(&blender.driven, *matrix) {
                        log::warn!("Driven '{}' of solver '{}' no longer exists", blender.driven, solver.name);
                    }
                }
                None => log::error!("Driven '{}' has no pose at index {index}", blender.driven),
            }
        }
        Ok(())
    }

    /// Goes to "default" if the solver has one. Returns whether it did.
    pub fn go_to_default(&self, handle: SolverHandle, scene: &mut dyn SceneGraph) -> Result<bool> {
        if self.solver_ref(handle)?.has_pose(DEFAULT_POSE) {
            self.go_to_pose(handle, DEFAULT_POSE, scene)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Sends every solver except `except` to its "default" pose.
    pub fn go_to_default_all(&self, scene: &mut dyn SceneGraph, except: Option<SolverHandle>) -> Result<()> {
        for handle in self.handles() {
            if Some(handle) != except {
                self.go_to_default(handle, scene)?;
            }
        }
        Ok(())
    }

    /// Mutes (`Some(true)`), unmutes (`Some(false)`) or toggles (`None`) a pose.
    ///
    /// Returns the pose's resulting enabled state.
    pub fn mute_pose(&mut self, handle: SolverHandle, pose: PoseRef<'_>, mute: Option<bool>) -> Result<bool> {
        let index = self.resolve_pose(handle, pose)?;
        let solver = self.solver_entry(handle)?;
        let pose = &mut solver.poses[index];
        pose.enabled = match mute {
            Some(mute) => !mute,
            None => !pose.enabled,
        };
        log::debug!(
            "Pose '{}' on solver '{}' is now {}",
            pose.name,
            solver.name,
            if pose.enabled { "enabled" } else { "muted" }
        );
        Ok(pose.enabled)
    }

    pub fn set_pose_overrides(&mut self, handle: SolverHandle, pose: PoseRef<'_>, overrides: PoseOverrides) -> Result<()> {
        let index = self.resolve_pose(handle, pose)?;
        self.solver_entry(handle)?.poses[index].overrides = overrides;
        Ok(())
    }

    pub fn is_pose_muted(&self, handle: SolverHandle, pose: PoseRef<'_>) -> Result<bool> {
        let index = self.resolve_pose(handle, pose)?;
        Ok(!self.solver_ref(handle)?.poses[index].enabled)
    }

    /// Renames a pose in place. Renaming to the current name is a no-op.
    pub fn rename_pose(&mut self, handle: SolverHandle, pose: PoseRef<'_>, new_name: &str) -> Result<()> {
        let index = self.resolve_pose(handle, pose)?;
        let solver = self.solver_entry(handle)?;
        let old_name = solver.poses[index].name.clone();
        if old_name == new_name {
            return Ok(());
        }
        if solver.has_pose(new_name) {
            return Err(PoseWranglerError::DuplicatePose {
                solver: solver.name.clone(),
                pose: new_name.to_owned(),
            });
        }
        solver.poses[index].name = new_name.to_owned();
        for binding in solver.blendshapes.iter_mut().filter(|b| b.pose == old_name) {
            binding.pose = new_name.to_owned();
        }
        if solver.isolated.as_deref() == Some(old_name.as_str()) {
            solver.isolated = Some(new_name.to_owned());
        }
        log::debug!("Renamed pose '{old_name}' to '{new_name}' on solver '{}'", solver.name);
        Ok(())
    }

    /// Full view of one pose, including every binding's recorded matrix.
    pub fn pose(&self, handle: SolverHandle, name: &str) -> Result<PoseData> {
        let index = self.resolve_pose(handle, PoseRef::Name(name))?;
        self.pose_at(handle, index)
    }

    pub fn pose_at(&self, handle: SolverHandle, index: usize) -> Result<PoseData> {
        let index = self.resolve_pose(handle, PoseRef::Index(index))?;
        let solver = self.solver_ref(handle)?;
        let pose = &solver.poses[index];
        let driven = solver
            .blenders
            .iter()
            .filter_map(|b| self.blender(*b))
            .filter_map(|b| b.pose(index).map(|m| (b.driven.clone(), *m)))
            .collect();
        Ok(PoseData {
            name: pose.name.clone(),
            index,
            driver_matrices: pose.driver_matrices.to_vec(),
            controller_matrices: pose.controller_matrices.clone(),
            driven,
            overrides: pose.overrides,
            enabled: pose.enabled,
            blendshape: solver.blendshape_for_pose(&pose.name).cloned(),
        })
    }

    /// Every pose in index order.
    pub fn poses(&self, handle: SolverHandle) -> Result<Vec<PoseData>> {
        let count = self.solver_ref(handle)?.num_poses();
        (0..count).map(|i| self.pose_at(handle, i)).collect()
    }

    pub fn num_poses(&self, handle: SolverHandle) -> Result<usize> {
        Ok(self.solver_ref(handle)?.num_poses())
    }

    pub fn has_pose(&self, handle: SolverHandle, name: &str) -> Result<bool> {
        Ok(self.solver_ref(handle)?.has_pose(name))
    }

    pub fn pose_names(&self, handle: SolverHandle) -> Result<Vec<String>> {
        Ok(self.solver_ref(handle)?.pose_names())
    }
}
