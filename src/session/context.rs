use crate::network::SolverHandle;

/// Snapshot broadcast to observers and extensions after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Context {
    pub current_solver: Option<SolverHandle>,
    /// Every solver, sorted by name.
    pub solvers: Vec<SolverHandle>,
    pub editing: Option<SolverHandle>,
}
