//! Copy transforms of a solver and paste them back scaled.

use glam::DVec3;

use crate::errors::{PoseWranglerError, Result};
use crate::math::Trs;
use crate::network::SolverHandle;
use crate::scene::SceneGraph;
use crate::session::{Context, Extension, Session};

#[derive(Debug, Clone, PartialEq)]
struct Copied {
    transform: String,
    /// `None` for drivers, which only carry rotation and scale.
    translation: Option<DVec3>,
    rotation: DVec3,
    scale: DVec3,
}

impl Copied {
    fn read(scene: &dyn SceneGraph, transform: &str, with_translation: bool) -> Result<Self> {
        let trs = scene
            .trs(transform)
            .ok_or_else(|| PoseWranglerError::StaleReference(transform.to_owned()))?;
        Ok(Self {
            transform: transform.to_owned(),
            translation: with_translation.then_some(trs.translation),
            rotation: trs.rotation,
            scale: trs.scale,
        })
    }

    /// Translation and rotation are multiplied through; scale moves from 1
    /// towards the copied value.
    fn paste(&self, scene: &mut dyn SceneGraph, multiplier: f64) {
        let Some(current) = scene.trs(&self.transform) else {
            log::warn!("Cannot paste onto '{}', it no longer exists", self.transform);
            return;
        };
        let pasted = Trs {
            translation: self.translation.map_or(current.translation, |t| t * multiplier),
            rotation: self.rotation * multiplier,
            scale: (self.scale - DVec3::ONE) * multiplier + DVec3::ONE,
        };
        scene.set_trs(&self.transform, &pasted);
    }
}

/// Clipboard for driver rotations and driven transforms.
#[derive(Debug, Clone, Default)]
pub struct CopyPasteTrs {
    drivers: Vec<Copied>,
    driven: Vec<Copied>,
    /// Solver the driven values were copied from.
    driven_solver: Option<SolverHandle>,
}

impl CopyPasteTrs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_driver_data(&self) -> bool {
        !self.drivers.is_empty()
    }

    #[must_use]
    pub fn has_driven_data(&self) -> bool {
        !self.driven.is_empty()
    }

    /// Copies rotation and scale of every driver.
    pub fn copy_driver<S: SceneGraph + 'static>(&mut self, session: &Session<S>, solver: SolverHandle) -> Result<()> {
        let names = session
            .network()
            .solver(solver)
            .ok_or_else(|| PoseWranglerError::solver_not_found(format!("{solver:?}")))?
            .driver_names();
        self.drivers = names
            .iter()
            .map(|name| Copied::read(session.scene(), name, false))
            .collect::<Result<_>>()?;
        log::info!("Copied TRS for drivers {names:?}");
        Ok(())
    }

    /// Copies translation, rotation and scale of every driven transform.
    pub fn copy_driven<S: SceneGraph + 'static>(&mut self, session: &Session<S>, solver: SolverHandle) -> Result<()> {
        let names = session.network().driven_nodes(solver)?;
        self.driven = names
            .iter()
            .map(|name| Copied::read(session.scene(), name, true))
            .collect::<Result<_>>()?;
        self.driven_solver = Some(solver);
        log::info!("Copied TRS for driven {names:?}");
        Ok(())
    }

    pub fn paste_driver<S: SceneGraph + 'static>(&self, session: &mut Session<S>, multiplier: f64) -> Result<()> {
        if self.drivers.is_empty() {
            return Err(PoseWranglerError::NothingCopied);
        }
        for copied in &self.drivers {
            copied.paste(session.scene_mut(), multiplier);
        }
        log::info!("Pasted driver TRS with multiplier {multiplier}");
        Ok(())
    }

    /// Pastes the driven values. The solver they came from is put in edit
    /// mode first so the pasted values are not overwritten.
    pub fn paste_driven<S: SceneGraph + 'static>(&self, session: &mut Session<S>, multiplier: f64) -> Result<()> {
        if self.driven.is_empty() {
            return Err(PoseWranglerError::NothingCopied);
        }
        if let Some(solver) = self.driven_solver
            && session.network().solver(solver).is_some()
            && !session.is_editing(solver)?
        {
            session.edit_solver(solver, true)?;
        }
        for copied in &self.driven {
            copied.paste(session.scene_mut(), multiplier);
        }
        log::info!("Pasted driven TRS with multiplier {multiplier}");
        Ok(())
    }
}

impl<S: SceneGraph + 'static> Extension<S> for CopyPasteTrs {
    fn name(&self) -> &'static str {
        "Copy/Paste TRS"
    }

    fn on_context_changed(&mut self, context: &Context) {
        if self
            .driven_solver
            .is_some_and(|solver| !context.solvers.contains(&solver))
        {
            self.driven_solver = None;
        }
    }

    /// Copies driver and driven values of the current solver.
    fn execute(&mut self, session: &mut Session<S>) -> Result<()> {
        let solver = session.require_current()?;
        self.copy_driver(session, solver)?;
        self.copy_driven(session, solver)
    }
}
