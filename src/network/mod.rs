//! Pose network model
//!
//! The authoritative store of solvers, poses and driven bindings.
//!
//! # Structure
//!
//! - [`Solver`]: drivers, controllers, ordered poses, hyperparameters
//! - [`Pose`]: one calibration sample, index-aligned with the solver inputs
//! - [`PoseBlender`]: driven binding, one recorded matrix per pose
//! - [`BlendshapeBinding`]: sculpt mesh attached to a pose
//!
//! # Invariants
//!
//! - Every pose has one driver matrix per driver, and one controller matrix per
//!   controller when controllers exist.
//! - Drivers can only be added while the solver has at most one pose.
//! - Pose names are unique within a solver.
//! - Every binding records exactly one matrix per solver pose; pose add and
//!   delete fan out to all bindings.
//! - At most one solver is in edit mode at a time.
//!
//! Operations validate fully before they mutate. Transforms are referred to by
//! name and read through a [`SceneGraph`].

pub mod blender;
pub mod blendshape;
pub mod config;
pub mod edit;
pub mod evaluator;
pub mod pose;
pub mod poses;
pub mod solver;

pub use blender::PoseBlender;
pub use blendshape::BlendshapeBinding;
pub use config::{
    DistanceMethod, FunctionType, InputMode, NormalizeMethod, SolverConfig, SolverMode, TwistAxis,
};
pub use evaluator::{EvaluationInput, RbfEvaluator};
pub use pose::{Pose, PoseData, PoseOverrides, PoseRef, PoseSample};
pub use solver::{Driver, Solver};

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use crate::errors::{PoseWranglerError, Result};
use crate::scene::SceneGraph;

new_key_type! {
    /// Handle to a [`Solver`].
    pub struct SolverHandle;
    /// Handle to a [`PoseBlender`].
    pub struct BlenderHandle;
}

/// Name of the rest pose every solver captures first.
pub const DEFAULT_POSE: &str = "default";

/// Registry of all solvers and their driven bindings.
///
/// Driven transforms and bindings are linked both ways: the binding stores its
/// transform name, and `driven_index` maps the name back to the binding.
#[derive(Debug, Default)]
pub struct PoseNetwork {
    solvers: SlotMap<SolverHandle, Solver>,
    solver_names: FxHashMap<String, SolverHandle>,
    blenders: SlotMap<BlenderHandle, PoseBlender>,
    driven_index: FxHashMap<String, BlenderHandle>,
    editing: Option<SolverHandle>,
}

impl PoseNetwork {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Solver lifecycle
    // ========================================================================

    pub fn create_solver(&mut self, name: &str) -> Result<SolverHandle> {
        if self.solver_names.contains_key(name) {
            return Err(PoseWranglerError::DuplicateSolver(name.to_owned()));
        }
        let handle = self.solvers.insert(Solver::new(name));
        self.solver_names.insert(name.to_owned(), handle);
        log::debug!("Created solver '{name}'");
        Ok(handle)
    }

    /// Removes a solver with its bindings. Driven transforms keep their current matrices.
    pub fn delete_solver(&mut self, handle: SolverHandle) -> Result<Solver> {
        let solver = self
            .solvers
            .remove(handle)
            .ok_or_else(|| PoseWranglerError::solver_not_found(format!("{handle:?}")))?;
        self.solver_names.remove(&solver.name);
        for blender in &solver.blenders {
            if let Some(removed) = self.blenders.remove(*blender) {
                self.driven_index.remove(&removed.driven);
            }
        }
        if self.editing == Some(handle) {
            self.editing = None;
        }
        log::debug!("Deleted solver '{}'", solver.name);
        Ok(solver)
    }

    #[must_use]
    pub fn find_solver(&self, name: &str) -> Option<SolverHandle> {
        self.solver_names.get(name).copied()
    }

    /// Case-insensitive lookup; an exact match wins.
    #[must_use]
    pub fn find_solver_ignore_case(&self, name: &str) -> Option<SolverHandle> {
        self.find_solver(name).or_else(|| {
            self.solver_names
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, h)| *h)
        })
    }

    #[inline]
    #[must_use]
    pub fn solver(&self, handle: SolverHandle) -> Option<&Solver> {
        self.solvers.get(handle)
    }

    /// Mutable access for hyperparameter edits.
    #[inline]
    pub fn solver_mut(&mut self, handle: SolverHandle) -> Option<&mut Solver> {
        self.solvers.get_mut(handle)
    }

    /// All solvers, sorted by name.
    #[must_use]
    pub fn solvers(&self) -> Vec<(SolverHandle, &Solver)> {
        let mut all: Vec<_> = self.solvers.iter().collect();
        all.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        all
    }

    /// All solver names, sorted.
    #[must_use]
    pub fn solver_names(&self) -> Vec<String> {
        self.solvers().into_iter().map(|(_, s)| s.name.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.solvers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.solvers.is_empty()
    }

    pub(crate) fn solver_ref(&self, handle: SolverHandle) -> Result<&Solver> {
        self.solvers
            .get(handle)
            .ok_or_else(|| PoseWranglerError::solver_not_found(format!("{handle:?}")))
    }

    pub(crate) fn solver_entry(&mut self, handle: SolverHandle) -> Result<&mut Solver> {
        self.solvers
            .get_mut(handle)
            .ok_or_else(|| PoseWranglerError::solver_not_found(format!("{handle:?}")))
    }

    // ========================================================================
    // Drivers & controllers
    // ========================================================================

    /// Appends a driver, recording its current local matrix as the rest matrix.
    ///
    /// A solver with exactly one pose gets that pose extended with the
    /// driver's current matrix.
    pub fn add_driver(&mut self, handle: SolverHandle, transform: &str, scene: &dyn SceneGraph) -> Result<()> {
        let solver = self.solver_ref(handle)?;
        if solver.num_poses() > 1 {
            return Err(PoseWranglerError::DriverLimitExceeded {
                solver: solver.name.clone(),
                num_poses: solver.num_poses(),
            });
        }
        if solver.has_driver(transform) {
            return Err(PoseWranglerError::DuplicateDriver {
                solver: solver.name.clone(),
                driver: transform.to_owned(),
            });
        }
        let rest_matrix = scene
            .local_matrix(transform)
            .ok_or_else(|| PoseWranglerError::transform_not_found(transform))?;

        let solver = self.solver_entry(handle)?;
        for pose in &mut solver.poses {
            pose.driver_matrices.push(rest_matrix);
        }
        solver.drivers.push(Driver {
            name: transform.to_owned(),
            rest_matrix,
        });
        log::debug!("Added driver '{transform}' to solver '{}'", solver.name);
        Ok(())
    }

    /// Removes drivers and rebuilds the pose list from scratch.
    ///
    /// Pose matrices are driver-index-aligned, so every pose is dropped. When
    /// drivers remain, a fresh "default" pose is captured from the scene.
    pub fn remove_drivers(&mut self, handle: SolverHandle, transforms: &[&str], scene: &dyn SceneGraph) -> Result<()> {
        let solver = self.solver_ref(handle)?;
        if transforms.is_empty() {
            return Ok(());
        }
        if let Some(missing) = transforms.iter().find(|t| !solver.has_driver(t)) {
            return Err(PoseWranglerError::DriverNotFound {
                solver: solver.name.clone(),
                driver: (*missing).to_owned(),
            });
        }

        let blenders = solver.blenders.clone();
        let solver = self.solver_entry(handle)?;
        if solver.num_poses() > 1 {
            log::warn!(
                "Removing drivers from '{}' discards {} recorded poses",
                solver.name,
                solver.num_poses()
            );
        }
        solver.drivers.retain(|d| !transforms.contains(&d.name.as_str()));
        solver.poses.clear();
        solver.weights.clear();
        solver.blendshapes.clear();
        solver.isolated = None;
        for driver in &mut solver.drivers {
            match scene.local_matrix(&driver.name) {
                Some(m) => driver.rest_matrix = m,
                None => log::warn!("Driver '{}' is missing from the scene; keeping its old rest matrix", driver.name),
            }
        }
        let has_drivers = !solver.drivers.is_empty();

        for blender in blenders {
            if let Some(b) = self.blenders.get_mut(blender) {
                b.clear_poses();
            }
        }

        if has_drivers {
            self.add_pose_from_current(handle, DEFAULT_POSE, scene)?;
        }
        Ok(())
    }

    /// Adds a controller. Only allowed before any pose exists.
    pub fn add_controller(&mut self, handle: SolverHandle, transform: &str, scene: &dyn SceneGraph) -> Result<()> {
        let solver = self.solver_ref(handle)?;
        if solver.num_poses() > 0 {
            return Err(PoseWranglerError::ControllerLimitExceeded {
                solver: solver.name.clone(),
                num_poses: solver.num_poses(),
            });
        }
        if solver.has_controller(transform) {
            return Err(PoseWranglerError::DuplicateController {
                solver: solver.name.clone(),
                controller: transform.to_owned(),
            });
        }
        if !scene.exists(transform) {
            return Err(PoseWranglerError::transform_not_found(transform));
        }
        let solver = self.solver_entry(handle)?;
        solver.controllers.push(transform.to_owned());
        log::debug!("Added controller '{transform}' to solver '{}'", solver.name);
        Ok(())
    }

    // ========================================================================
    // Driven bindings
    // ========================================================================

    /// Binds driven transforms to the solver.
    ///
    /// Transforms already driven by any solver are skipped with an error log.
    /// Each new binding records the transform's current local matrix as its
    /// base pose and as its value for every existing pose.
    pub fn add_driven_transforms(
        &mut self,
        handle: SolverHandle,
        transforms: &[&str],
        edit: bool,
        scene: &dyn SceneGraph,
    ) -> Result<Vec<BlenderHandle>> {
        let num_poses = self.solver_ref(handle)?.num_poses();
        let mut captured = Vec::with_capacity(transforms.len());
        for transform in transforms {
            let matrix = scene
                .local_matrix(transform)
                .ok_or_else(|| PoseWranglerError::transform_not_found(*transform))?;
            captured.push((*transform, matrix));
        }

        let mut added = Vec::new();
        for (transform, matrix) in captured {
            if let Some(existing) = self.driven_index.get(transform).and_then(|b| self.blenders.get(*b)) {
                let owner = self.solvers.get(existing.solver).map_or("<unknown>", |s| s.name.as_str());
                log::error!("'{transform}' is already driven by solver '{owner}', skipping");
                continue;
            }
            let mut blender = PoseBlender::new(handle, transform, matrix, edit);
            for _ in 0..num_poses {
                blender.push_pose(matrix);
            }
            let blender_handle = self.blenders.insert(blender);
            self.driven_index.insert(transform.to_owned(), blender_handle);
            self.solver_entry(handle)?.blenders.push(blender_handle);
            added.push(blender_handle);
        }
        Ok(added)
    }

    /// Unbinds driven transforms, or blendshape meshes, from the solver.
    pub fn remove_driven_transforms(&mut self, handle: SolverHandle, transforms: &[&str]) -> Result<()> {
        let solver = self.solver_ref(handle)?;
        for transform in transforms {
            let is_blendshape = solver.blendshapes.iter().any(|b| b.mesh == *transform);
            let is_driven = self
                .driven_index
                .get(*transform)
                .and_then(|b| self.blenders.get(*b))
                .is_some_and(|b| b.solver == handle);
            if !is_blendshape && !is_driven {
                return Err(PoseWranglerError::DrivenNotFound {
                    solver: solver.name.clone(),
                    driven: (*transform).to_owned(),
                });
            }
        }

        for transform in transforms {
            if let Some(blender) = self.driven_index.get(*transform).copied()
                && self.blenders.get(blender).is_some_and(|b| b.solver == handle)
            {
                self.blenders.remove(blender);
                self.driven_index.remove(*transform);
                self.solver_entry(handle)?.blenders.retain(|b| *b != blender);
            }
            let solver = self.solver_entry(handle)?;
            if let Some(binding) = solver.blendshapes.iter().position(|b| b.mesh == *transform) {
                let removed = solver.blendshapes.remove(binding);
                if solver.isolated.as_deref() == Some(removed.pose.as_str()) {
                    solver.isolated = None;
                }
            }
            log::debug!("Removed driven '{transform}'");
        }
        Ok(())
    }

    /// Names of the driven transforms, in binding order.
    pub fn driven_nodes(&self, handle: SolverHandle) -> Result<Vec<String>> {
        let solver = self.solver_ref(handle)?;
        Ok(solver
            .blenders
            .iter()
            .filter_map(|b| self.blenders.get(*b))
            .map(|b| b.driven.clone())
            .collect())
    }

    #[inline]
    #[must_use]
    pub fn blender(&self, handle: BlenderHandle) -> Option<&PoseBlender> {
        self.blenders.get(handle)
    }

    /// The binding that drives `transform`, if any.
    #[must_use]
    pub fn blender_for(&self, transform: &str) -> Option<(BlenderHandle, &PoseBlender)> {
        let handle = *self.driven_index.get(transform)?;
        self.blenders.get(handle).map(|b| (handle, b))
    }

    pub(crate) fn blenders_of(&self, handle: SolverHandle) -> Result<Vec<BlenderHandle>> {
        Ok(self.solver_ref(handle)?.blenders.clone())
    }

    pub(crate) fn blender_mut(&mut self, handle: BlenderHandle) -> Option<&mut PoseBlender> {
        self.blenders.get_mut(handle)
    }

    pub(crate) fn editing_slot(&mut self) -> &mut Option<SolverHandle> {
        &mut self.editing
    }

    pub(crate) fn editing_value(&self) -> Option<SolverHandle> {
        self.editing
    }

    pub(crate) fn handles(&self) -> Vec<SolverHandle> {
        self.solvers.keys().collect()
    }
}
