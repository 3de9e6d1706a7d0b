use glam::DMat4;

use crate::network::config::SolverConfig;
use crate::network::pose::Pose;

/// Everything an RBF kernel needs for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub config: &'a SolverConfig,
    pub poses: &'a [Pose],
    /// Live driver matrices, or controller matrices when the solver has controllers.
    pub inputs: &'a [DMat4],
    pub uses_controllers: bool,
}

/// External weight evaluator.
///
/// Must return exactly one weight per pose, index-aligned with
/// `input.poses`. The kernel itself (distance metric, falloff, normalization)
/// is the implementor's business.
pub trait RbfEvaluator {
    fn evaluate(&self, input: &EvaluationInput<'_>) -> Vec<f64>;
}

impl<F> RbfEvaluator for F
where
    F: Fn(&EvaluationInput<'_>) -> Vec<f64>,
{
    fn evaluate(&self, input: &EvaluationInput<'_>) -> Vec<f64> {
        self(input)
    }
}
