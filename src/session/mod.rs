//! Session facade
//!
//! [`Session`] owns the scene, the [`PoseNetwork`], the active mirror mapping
//! and the settings, and tracks which solver is current. Every mutation
//! re-broadcasts a [`Context`] to subscribed observers and registered
//! [`Extension`]s. Business rules live in the network; this layer only
//! sequences calls.

pub mod context;
pub mod extension;
pub mod settings;

pub use context::Context;
pub use extension::Extension;
pub use settings::{Settings, SolverDefaults};

use std::any::{Any, type_name};
use std::path::Path;

use slotmap::{SlotMap, new_key_type};

use crate::errors::{PoseWranglerError, Result};
use crate::mirror::{self, MirrorMapping};
use crate::network::{DEFAULT_POSE, PoseData, PoseNetwork, PoseRef, RbfEvaluator, SolverHandle};
use crate::scene::SceneGraph;
use crate::serialization::{self, Document};

new_key_type! {
    /// Handle returned by [`Session::subscribe`].
    pub struct ObserverHandle;
}

type Observer = Box<dyn FnMut(&Context)>;

pub struct Session<S: SceneGraph + 'static> {
    scene: S,
    network: PoseNetwork,
    mapping: MirrorMapping,
    settings: Settings,
    current: Option<SolverHandle>,
    observers: SlotMap<ObserverHandle, Observer>,
    /// `None` while the extension is running.
    extensions: Vec<Option<Box<dyn Extension<S>>>>,
}

impl<S: SceneGraph + 'static> Session<S> {
    /// Session with default settings and the MetaHuman mirror mapping.
    pub fn new(scene: S) -> Result<Self> {
        Self::with_settings(scene, Settings::default())
    }

    pub fn with_settings(scene: S, settings: Settings) -> Result<Self> {
        let mapping = match &settings.mirror_mapping_file {
            Some(path) => MirrorMapping::from_file(path)?,
            None => MirrorMapping::metahuman()?,
        };
        Ok(Self {
            scene,
            network: PoseNetwork::new(),
            mapping,
            settings,
            current: None,
            observers: SlotMap::with_key(),
            extensions: Vec::new(),
        })
    }

    #[inline]
    #[must_use]
    pub fn scene(&self) -> &S {
        &self.scene
    }

    #[inline]
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    #[inline]
    #[must_use]
    pub fn network(&self) -> &PoseNetwork {
        &self.network
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[inline]
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    #[inline]
    #[must_use]
    pub fn mirror_mapping(&self) -> &MirrorMapping {
        &self.mapping
    }

    #[inline]
    pub fn mirror_mapping_mut(&mut self) -> &mut MirrorMapping {
        &mut self.mapping
    }

    /// Loads a mirror mapping document and makes it the active mapping.
    pub fn set_mirror_mapping(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PoseWranglerError::invalid_mirror_mapping(format!(
                "mirror mapping file '{}' does not exist",
                path.display()
            )));
        }
        self.mapping = MirrorMapping::from_file(path)?;
        self.settings.mirror_mapping_file = Some(path.to_path_buf());
        Ok(())
    }

    // ========================================================================
    // Context & observers
    // ========================================================================

    #[must_use]
    pub fn get_context(&self) -> Context {
        Context {
            current_solver: self.current,
            solvers: self.network.solvers().into_iter().map(|(h, _)| h).collect(),
            editing: self.network.editing_solver(),
        }
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&Context) + 'static) -> ObserverHandle {
        self.observers.insert(Box::new(observer))
    }

    pub fn unsubscribe(&mut self, handle: ObserverHandle) -> bool {
        self.observers.remove(handle).is_some()
    }

    fn notify(&mut self) {
        let context = self.get_context();
        for observer in self.observers.values_mut() {
            observer(&context);
        }
        for extension in self.extensions.iter_mut().flatten() {
            extension.on_context_changed(&context);
        }
    }

    #[inline]
    #[must_use]
    pub fn current_solver(&self) -> Option<SolverHandle> {
        self.current
    }

    /// The current solver, or `NoCurrentSolver`.
    pub fn require_current(&self) -> Result<SolverHandle> {
        self.current.ok_or(PoseWranglerError::NoCurrentSolver)
    }

    pub fn set_current_solver(&mut self, solver: Option<SolverHandle>) -> Result<()> {
        if let Some(handle) = solver {
            self.network.solver_ref(handle)?;
        }
        self.current = solver;
        self.notify();
        Ok(())
    }

    /// Looks a solver up by name and makes it current.
    pub fn select_solver(&mut self, name: &str) -> Result<SolverHandle> {
        let handle = self
            .network
            .find_solver(name)
            .ok_or_else(|| PoseWranglerError::solver_not_found(name))?;
        self.set_current_solver(Some(handle))?;
        Ok(handle)
    }

    // ========================================================================
    // Extensions
    // ========================================================================

    /// Registers an extension built by `factory` from the current context.
    pub fn register_extension<E, F>(&mut self, factory: F)
    where
        E: Extension<S>,
        F: FnOnce(&Context) -> E,
    {
        let mut extension = factory(&self.get_context());
        extension.on_context_changed(&self.get_context());
        log::debug!("Registered extension '{}'", extension.name());
        self.extensions.push(Some(Box::new(extension)));
    }

    #[must_use]
    pub fn extension<T: Extension<S>>(&self) -> Option<&T> {
        self.extensions.iter().flatten().find_map(|e| {
            let any: &dyn Any = &**e;
            any.downcast_ref::<T>()
        })
    }

    /// Names of the registered extensions, in registration order.
    #[must_use]
    pub fn extension_names(&self) -> Vec<&'static str> {
        self.extensions.iter().flatten().map(|e| e.name()).collect()
    }

    /// Runs `f` with the extension detached from the session.
    pub fn with_extension<T, R>(&mut self, f: impl FnOnce(&mut T, &mut Self) -> Result<R>) -> Result<R>
    where
        T: Extension<S>,
    {
        let index = self
            .extensions
            .iter()
            .position(|slot| {
                slot.as_deref().is_some_and(|e| {
                    let any: &dyn Any = e;
                    any.is::<T>()
                })
            })
            .ok_or(PoseWranglerError::ExtensionNotFound(type_name::<T>()))?;
        let Some(mut extension) = self.extensions[index].take() else {
            return Err(PoseWranglerError::ExtensionNotFound(type_name::<T>()));
        };

        let any: &mut dyn Any = &mut *extension;
        let result = match any.downcast_mut::<T>() {
            Some(ext) => f(ext, self),
            None => Err(PoseWranglerError::ExtensionNotFound(type_name::<T>())),
        };
        self.extensions[index] = Some(extension);
        result
    }

    /// Runs the extension's [`execute`](Extension::execute).
    pub fn execute_extension<T: Extension<S>>(&mut self) -> Result<()> {
        self.with_extension::<T, _>(|extension, session| extension.execute(session))
    }

    // ========================================================================
    // Solvers
    // ========================================================================

    /// Creates a solver with the given drivers and a "default" pose captured
    /// from the scene, makes it current and puts it in edit mode.
    ///
    /// A solver left half-built by a failure is deleted again.
    pub fn create_solver(&mut self, name: &str, drivers: &[&str]) -> Result<SolverHandle> {
        let handle = self.network.create_solver(name)?;
        if let Err(err) = self.populate_solver(handle, drivers) {
            log::error!("Creating solver '{name}' failed: {err}");
            self.network.delete_solver(handle)?;
            return Err(err);
        }
        self.current = Some(handle);
        self.network.edit_solver(handle, true, &mut self.scene)?;
        log::info!("Created solver '{name}'");
        self.notify();
        Ok(handle)
    }

    fn populate_solver(&mut self, handle: SolverHandle, drivers: &[&str]) -> Result<()> {
        self.settings.default_solver.apply(self.network.solver_entry(handle)?.config_mut());
        for driver in drivers {
            self.network.add_driver(handle, driver, &self.scene)?;
        }
        if !drivers.is_empty() {
            self.network.add_pose_from_current(handle, DEFAULT_POSE, &self.scene)?;
        }
        Ok(())
    }

    pub fn delete_solver(&mut self, solver: SolverHandle) -> Result<()> {
        self.network.delete_solver(solver)?;
        if self.current == Some(solver) {
            self.current = None;
        }
        self.notify();
        Ok(())
    }

    pub fn edit_solver(&mut self, solver: SolverHandle, edit: bool) -> Result<()> {
        self.network.edit_solver(solver, edit, &mut self.scene)?;
        self.notify();
        Ok(())
    }

    pub fn is_editing(&self, solver: SolverHandle) -> Result<bool> {
        self.network.is_editing(solver)
    }

    /// Adds drivers and recaptures "default" from the scene.
    pub fn add_drivers(&mut self, solver: SolverHandle, transforms: &[&str]) -> Result<()> {
        let current = self.network.solver_ref(solver)?;
        if current.num_poses() > 1 {
            return Err(PoseWranglerError::PoseIndexInvalid {
                solver: current.name().to_owned(),
                reason: format!(
                    "drivers can only be added with at most one pose, found {}",
                    current.num_poses()
                ),
            });
        }
        // Nothing is touched until every transform is known to be addable.
        for (i, transform) in transforms.iter().enumerate() {
            if current.has_driver(transform) || transforms[..i].contains(transform) {
                return Err(PoseWranglerError::DuplicateDriver {
                    solver: current.name().to_owned(),
                    driver: (*transform).to_owned(),
                });
            }
            if !self.scene.exists(transform) {
                return Err(PoseWranglerError::transform_not_found(*transform));
            }
        }
        if current.has_pose(DEFAULT_POSE) {
            self.network.delete_pose(solver, DEFAULT_POSE)?;
        }
        for transform in transforms {
            self.network.add_driver(solver, transform, &self.scene)?;
        }
        self.network.capture_pose(solver, DEFAULT_POSE, &self.scene)?;
        self.notify();
        Ok(())
    }

    pub fn remove_drivers(&mut self, solver: SolverHandle, transforms: &[&str]) -> Result<()> {
        self.network.remove_drivers(solver, transforms, &self.scene)?;
        self.notify();
        Ok(())
    }

    /// Binds driven transforms. Bindings start in edit mode when the solver is
    /// being edited.
    pub fn add_driven(&mut self, solver: SolverHandle, transforms: &[&str]) -> Result<()> {
        let edit = self.network.is_editing(solver)?;
        self.network.add_driven_transforms(solver, transforms, edit, &self.scene)?;
        self.notify();
        Ok(())
    }

    pub fn remove_driven(&mut self, solver: SolverHandle, transforms: &[&str]) -> Result<()> {
        self.network.remove_driven_transforms(solver, transforms)?;
        self.notify();
        Ok(())
    }

    // ========================================================================
    // Poses
    // ========================================================================

    /// Records a new pose from the scene.
    pub fn create_pose(&mut self, solver: SolverHandle, name: &str) -> Result<usize> {
        let index = self.network.add_pose_from_current(solver, name, &self.scene)?;
        self.notify();
        Ok(index)
    }

    /// Re-records an existing pose from the scene.
    pub fn update_pose(&mut self, solver: SolverHandle, name: &str) -> Result<usize> {
        let index = self.network.update_pose_from_current(solver, name, &self.scene)?;
        self.notify();
        Ok(index)
    }

    pub fn delete_pose(&mut self, solver: SolverHandle, name: &str) -> Result<()> {
        self.network.delete_pose(solver, name)?;
        self.notify();
        Ok(())
    }

    pub fn go_to_pose(&mut self, solver: SolverHandle, name: &str) -> Result<()> {
        self.network.go_to_pose(solver, name, &mut self.scene)
    }

    pub fn mute_pose(&mut self, solver: SolverHandle, pose: PoseRef<'_>, mute: Option<bool>) -> Result<bool> {
        let enabled = self.network.mute_pose(solver, pose, mute)?;
        self.notify();
        Ok(enabled)
    }

    pub fn rename_pose(&mut self, solver: SolverHandle, pose: PoseRef<'_>, new_name: &str) -> Result<()> {
        self.network.rename_pose(solver, pose, new_name)?;
        self.notify();
        Ok(())
    }

    pub fn pose(&self, solver: SolverHandle, name: &str) -> Result<PoseData> {
        self.network.pose(solver, name)
    }

    /// Runs the evaluator and writes the blended result onto the driven transforms.
    pub fn evaluate(&mut self, solver: SolverHandle, evaluator: &dyn RbfEvaluator) -> Result<Vec<f64>> {
        self.network.evaluate(solver, evaluator, &mut self.scene)
    }

    // ========================================================================
    // Mirroring
    // ========================================================================

    pub fn mirror_solver(&mut self, solver: SolverHandle, mirror_poses: bool) -> Result<SolverHandle> {
        let target = mirror::mirror_solver(&mut self.network, &mut self.scene, solver, &mut self.mapping, mirror_poses)?;
        if self.current.is_some_and(|c| self.network.solver(c).is_none()) {
            self.current = None;
        }
        self.notify();
        Ok(target)
    }

    pub fn mirror_pose(&mut self, solver: SolverHandle, pose: &str) -> Result<SolverHandle> {
        let target = mirror::mirror_pose(&mut self.network, &mut self.scene, solver, pose, &mut self.mapping)?;
        self.notify();
        Ok(target)
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Serializes the given solvers, or every solver when `solvers` is empty.
    pub fn serialize(&self, solvers: &[SolverHandle]) -> Result<Document> {
        if solvers.is_empty() {
            serialization::serialize_all(&self.network)
        } else {
            serialization::serialize(&self.network, solvers)
        }
    }

    pub fn deserialize(&mut self, document: &Document, filter: Option<&[&str]>) -> Result<Vec<SolverHandle>> {
        let loaded = serialization::deserialize(&mut self.network, &self.scene, document, filter)?;
        self.notify();
        Ok(loaded)
    }

    pub fn serialize_to_file(&self, solvers: &[SolverHandle], path: impl AsRef<Path>) -> Result<()> {
        serialization::write_document(path, &self.serialize(solvers)?)
    }

    pub fn deserialize_from_file(
        &mut self,
        path: impl AsRef<Path>,
        filter: Option<&[&str]>,
    ) -> Result<Vec<SolverHandle>> {
        let document = serialization::read_document(path)?;
        self.deserialize(&document, filter)
    }
}
