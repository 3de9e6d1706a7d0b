use glam::DMat4;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::network::blendshape::BlendshapeBinding;
use crate::network::config::{DistanceMethod, FunctionType};

/// Per-pose hyperparameter overrides, passed through to the evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseOverrides {
    pub function_type: FunctionType,
    pub distance_method: DistanceMethod,
    pub scale_factor: f64,
}

impl Default for PoseOverrides {
    fn default() -> Self {
        Self {
            function_type: FunctionType::DefaultFunctionType,
            distance_method: DistanceMethod::DefaultMethod,
            scale_factor: 1.0,
        }
    }
}

/// One calibration sample stored on a solver.
///
/// Driver matrices are index-aligned with the solver's drivers, controller
/// matrices with its controllers. Driven matrices live on the bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub(crate) name: String,
    pub(crate) driver_matrices: SmallVec<[DMat4; 4]>,
    pub(crate) controller_matrices: Vec<DMat4>,
    pub(crate) enabled: bool,
    pub(crate) overrides: PoseOverrides,
}

impl Pose {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn driver_matrices(&self) -> &[DMat4] {
        &self.driver_matrices
    }

    #[inline]
    #[must_use]
    pub fn controller_matrices(&self) -> &[DMat4] {
        &self.controller_matrices
    }

    /// `false` when muted. Muted poses stay stored but get zero weight.
    #[inline]
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    #[must_use]
    pub fn overrides(&self) -> &PoseOverrides {
        &self.overrides
    }
}

/// Input for adding or updating a pose.
///
/// Driven transforms missing from `driven_matrices` are captured from the
/// scene at the time of the call.
#[derive(Debug, Clone)]
pub struct PoseSample {
    pub driver_matrices: Vec<DMat4>,
    pub controller_matrices: Vec<DMat4>,
    pub driven_matrices: FxHashMap<String, DMat4>,
    pub overrides: PoseOverrides,
    pub enabled: bool,
    /// Sculpt mesh and base mesh to bind to the pose.
    pub blendshape: Option<(String, String)>,
}

impl PoseSample {
    #[must_use]
    pub fn new(driver_matrices: Vec<DMat4>) -> Self {
        Self {
            driver_matrices,
            controller_matrices: Vec::new(),
            driven_matrices: FxHashMap::default(),
            overrides: PoseOverrides::default(),
            enabled: true,
            blendshape: None,
        }
    }

    #[must_use]
    pub fn with_controllers(mut self, matrices: Vec<DMat4>) -> Self {
        self.controller_matrices = matrices;
        self
    }

    #[must_use]
    pub fn with_driven(mut self, transform: impl Into<String>, matrix: DMat4) -> Self {
        self.driven_matrices.insert(transform.into(), matrix);
        self
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: PoseOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Full view of a pose: its inputs plus the matrix every driven binding
/// recorded for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseData {
    pub name: String,
    pub index: usize,
    pub driver_matrices: Vec<DMat4>,
    pub controller_matrices: Vec<DMat4>,
    /// `(driven transform, recorded local matrix)` in binding order.
    pub driven: Vec<(String, DMat4)>,
    pub overrides: PoseOverrides,
    pub enabled: bool,
    pub blendshape: Option<BlendshapeBinding>,
}

impl PoseData {
    #[must_use]
    pub fn driven_matrix(&self, transform: &str) -> Option<&DMat4> {
        self.driven
            .iter()
            .find(|(name, _)| name == transform)
            .map(|(_, m)| m)
    }
}

/// Selects a pose by name or by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseRef<'a> {
    Name(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for PoseRef<'a> {
    fn from(name: &'a str) -> Self {
        PoseRef::Name(name)
    }
}

impl<'a> From<&'a String> for PoseRef<'a> {
    fn from(name: &'a String) -> Self {
        PoseRef::Name(name)
    }
}

impl From<usize> for PoseRef<'_> {
    fn from(index: usize) -> Self {
        PoseRef::Index(index)
    }
}
