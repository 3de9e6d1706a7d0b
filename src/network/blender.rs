use glam::{DMat4, DQuat};

use crate::network::SolverHandle;

/// Weights below this are treated as zero while blending.
const BLEND_EPSILON: f64 = 1e-9;

/// Driven binding: ties one driven transform to a solver's output weights.
///
/// Holds the transform's rest matrix and one recorded local matrix per solver
/// pose, index-aligned with the solver's pose list. While `edit` is set the
/// blended output is not written back, so the transform can be posed by hand.
#[derive(Debug, Clone)]
pub struct PoseBlender {
    pub(crate) solver: SolverHandle,
    pub(crate) driven: String,
    pub(crate) base_pose: DMat4,
    pub(crate) poses: Vec<DMat4>,
    /// Solver output index feeding each recorded pose.
    pub(crate) weight_sources: Vec<usize>,
    pub(crate) edit: bool,
}

impl PoseBlender {
    pub(crate) fn new(solver: SolverHandle, driven: impl Into<String>, base_pose: DMat4, edit: bool) -> Self {
        Self {
            solver,
            driven: driven.into(),
            base_pose,
            poses: Vec::new(),
            weight_sources: Vec::new(),
            edit,
        }
    }

    #[inline]
    #[must_use]
    pub fn solver(&self) -> SolverHandle {
        self.solver
    }

    #[inline]
    #[must_use]
    pub fn driven(&self) -> &str {
        &self.driven
    }

    #[inline]
    #[must_use]
    pub fn base_pose(&self) -> &DMat4 {
        &self.base_pose
    }

    #[inline]
    #[must_use]
    pub fn poses(&self) -> &[DMat4] {
        &self.poses
    }

    #[inline]
    #[must_use]
    pub fn pose(&self, index: usize) -> Option<&DMat4> {
        self.poses.get(index)
    }

    #[inline]
    #[must_use]
    pub fn num_poses(&self) -> usize {
        self.poses.len()
    }

    #[inline]
    #[must_use]
    pub fn edit(&self) -> bool {
        self.edit
    }

    #[inline]
    #[must_use]
    pub fn weight_sources(&self) -> &[usize] {
        &self.weight_sources
    }

    pub(crate) fn push_pose(&mut self, matrix: DMat4) {
        self.weight_sources.push(self.poses.len());
        self.poses.push(matrix);
    }

    pub(crate) fn set_pose(&mut self, index: usize, matrix: DMat4) -> bool {
        match self.poses.get_mut(index) {
            Some(slot) => {
                *slot = matrix;
                true
            }
            None => false,
        }
    }

    /// Erases one recorded pose and rewires the weight sources densely.
    pub(crate) fn remove_pose(&mut self, index: usize) {
        if index < self.poses.len() {
            self.poses.remove(index);
            self.weight_sources = (0..self.poses.len()).collect();
        }
    }

    pub(crate) fn clear_poses(&mut self) {
        self.poses.clear();
        self.weight_sources.clear();
    }

    /// Blends the recorded poses with solver output `weights`.
    ///
    /// Each pose contributes its offset from the base pose scaled by its
    /// weight: translation and scale linearly, rotation as a slerp of the
    /// local delta from identity.
    #[must_use]
    pub fn blend(&self, weights: &[f64]) -> DMat4 {
        let (base_scale, base_rotation, base_translation) = self.base_pose.to_scale_rotation_translation();
        let base_inverse = base_rotation.inverse();

        let mut translation = base_translation;
        let mut scale = base_scale;
        let mut rotation = base_rotation;

        for (pose, &source) in self.poses.iter().zip(&self.weight_sources) {
            let weight = weights.get(source).copied().unwrap_or(0.0);
            if weight.abs() < BLEND_EPSILON {
                continue;
            }
            let (s, r, t) = pose.to_scale_rotation_translation();
            translation += (t - base_translation) * weight;
            scale += (s - base_scale) * weight;
            rotation *= DQuat::IDENTITY.slerp(base_inverse * r, weight);
        }

        DMat4::from_scale_rotation_translation(scale, rotation.normalize(), translation)
    }
}
