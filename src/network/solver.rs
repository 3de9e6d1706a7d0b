use glam::DMat4;

use crate::network::BlenderHandle;
use crate::network::blendshape::BlendshapeBinding;
use crate::network::config::SolverConfig;
use crate::network::pose::Pose;

/// A driver input and the local matrix it had when it was added.
#[derive(Debug, Clone, PartialEq)]
pub struct Driver {
    pub(crate) name: String,
    pub(crate) rest_matrix: DMat4,
}

impl Driver {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn rest_matrix(&self) -> &DMat4 {
        &self.rest_matrix
    }
}

/// The aggregate RBF node: inputs, poses, hyperparameters and the handles of
/// its driven bindings.
///
/// Structure is only mutable through [`PoseNetwork`](super::PoseNetwork), which
/// keeps poses and bindings in lockstep. Hyperparameters are freely editable
/// through [`config_mut`](Self::config_mut).
#[derive(Debug, Clone)]
pub struct Solver {
    pub(crate) name: String,
    pub(crate) drivers: Vec<Driver>,
    pub(crate) controllers: Vec<String>,
    pub(crate) poses: Vec<Pose>,
    pub(crate) config: SolverConfig,
    pub(crate) blenders: Vec<BlenderHandle>,
    pub(crate) blendshapes: Vec<BlendshapeBinding>,
    /// Pose whose blendshape is isolated for sculpting.
    pub(crate) isolated: Option<String>,
    /// Last evaluated output, one weight per pose.
    pub(crate) weights: Vec<f64>,
}

impl Solver {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            drivers: Vec::new(),
            controllers: Vec::new(),
            poses: Vec::new(),
            config: SolverConfig::default(),
            blenders: Vec::new(),
            blendshapes: Vec::new(),
            isolated: None,
            weights: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    #[must_use]
    pub fn driver_names(&self) -> Vec<String> {
        self.drivers.iter().map(|d| d.name.clone()).collect()
    }

    #[must_use]
    pub fn has_driver(&self, name: &str) -> bool {
        self.drivers.iter().any(|d| d.name == name)
    }

    #[inline]
    #[must_use]
    pub fn controllers(&self) -> &[String] {
        &self.controllers
    }

    #[must_use]
    pub fn has_controller(&self, name: &str) -> bool {
        self.controllers.iter().any(|c| c == name)
    }

    /// Pose matching reads controllers instead of drivers when any exist.
    #[inline]
    #[must_use]
    pub fn uses_controllers(&self) -> bool {
        !self.controllers.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    #[inline]
    #[must_use]
    pub fn num_poses(&self) -> usize {
        self.poses.len()
    }

    #[must_use]
    pub fn pose_index(&self, name: &str) -> Option<usize> {
        self.poses.iter().position(|p| p.name == name)
    }

    #[must_use]
    pub fn has_pose(&self, name: &str) -> bool {
        self.pose_index(name).is_some()
    }

    #[must_use]
    pub fn pose_names(&self) -> Vec<String> {
        self.poses.iter().map(|p| p.name.clone()).collect()
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    #[inline]
    pub fn config_mut(&mut self) -> &mut SolverConfig {
        &mut self.config
    }

    #[inline]
    #[must_use]
    pub fn blenders(&self) -> &[BlenderHandle] {
        &self.blenders
    }

    #[inline]
    #[must_use]
    pub fn blendshapes(&self) -> &[BlendshapeBinding] {
        &self.blendshapes
    }

    #[must_use]
    pub fn blendshape_for_pose(&self, pose: &str) -> Option<&BlendshapeBinding> {
        self.blendshapes.iter().find(|b| b.pose == pose)
    }

    #[inline]
    #[must_use]
    pub fn isolated_blendshape(&self) -> Option<&str> {
        self.isolated.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}
