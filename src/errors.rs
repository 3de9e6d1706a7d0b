//! Error Types
//!
//! This module defines the error type shared by every layer of the crate.
//!
//! # Overview
//!
//! [`PoseWranglerError`] groups failures by kind:
//! - Configuration errors (mirror mappings, settings)
//! - Invariant violations raised by the pose network before any mutation
//! - Lookups of solvers, poses and transforms that do not exist
//! - Collaborator state that went stale behind the model's back
//! - File I/O and document decoding
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, PoseWranglerError>`.
//!
//! ```rust,ignore
//! use pose_wrangler::errors::{PoseWranglerError, Result};
//!
//! fn lookup(network: &PoseNetwork, name: &str) -> Result<SolverHandle> {
//!     network.find_solver(name).ok_or_else(|| PoseWranglerError::solver_not_found(name))
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for pose network operations.
#[derive(Error, Debug)]
pub enum PoseWranglerError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A name does not follow the mirror mapping, or the mapping itself is unusable.
    #[error("Invalid mirror mapping: {0}")]
    InvalidMirrorMapping(String),

    /// A mirror side other than `left` or `right` was requested.
    #[error("Invalid side '{0}', options are: left, right")]
    InvalidSide(String),

    /// A naming expression failed to compile.
    #[error("Invalid expression '{expression}': {source}")]
    InvalidRegex {
        /// The offending expression
        expression: String,
        /// Underlying compile error
        #[source]
        source: regex::Error,
    },

    /// A symbolic enum value was not recognised.
    #[error("Unknown {kind} value: {value}")]
    UnknownEnumValue {
        /// Enum being decoded (e.g. "distanceMethod")
        kind: &'static str,
        /// The rejected value
        value: String,
    },

    // ========================================================================
    // Invariant Violations
    // ========================================================================
    /// A pose with the same name already exists on the solver.
    #[error("Pose '{pose}' already exists on solver '{solver}'")]
    DuplicatePose {
        /// Solver name
        solver: String,
        /// Pose name
        pose: String,
    },

    /// The transform is already a driver of the solver.
    #[error("Driver '{driver}' already exists on solver '{solver}'")]
    DuplicateDriver {
        /// Solver name
        solver: String,
        /// Driver transform name
        driver: String,
    },

    /// The transform is already a controller of the solver.
    #[error("Controller '{controller}' already exists on solver '{solver}'")]
    DuplicateController {
        /// Solver name
        solver: String,
        /// Controller transform name
        controller: String,
    },

    /// A solver with this name already exists.
    #[error("Solver '{0}' already exists")]
    DuplicateSolver(String),

    /// The number of supplied matrices does not match the number of inputs.
    #[error("Solver '{solver}' expects {expected} {what} matrices, got {actual}")]
    ArityMismatch {
        /// Solver name
        solver: String,
        /// "driver" or "controller"
        what: &'static str,
        /// Number of inputs on the solver
        expected: usize,
        /// Number of matrices supplied
        actual: usize,
    },

    /// Drivers cannot be added once more than one pose exists.
    #[error("Cannot add driver to solver '{solver}': it already has {num_poses} poses")]
    DriverLimitExceeded {
        /// Solver name
        solver: String,
        /// Current pose count
        num_poses: usize,
    },

    /// Controllers cannot be added once any pose exists.
    #[error("Cannot add controller to solver '{solver}': it already has {num_poses} poses")]
    ControllerLimitExceeded {
        /// Solver name
        solver: String,
        /// Current pose count
        num_poses: usize,
    },

    /// A pose needs at least one driver.
    #[error("Solver '{0}' has no drivers")]
    NoDriver(String),

    /// The named pose does not exist.
    #[error("Pose '{pose}' not found on solver '{solver}'")]
    PoseNotFound {
        /// Solver name
        solver: String,
        /// Pose name
        pose: String,
    },

    /// A pose index is out of range, or no pose was selected at all.
    #[error("Invalid pose index on solver '{solver}': {reason}")]
    PoseIndexInvalid {
        /// Solver name
        solver: String,
        /// What was wrong with the index
        reason: String,
    },

    /// The transform is not a driver of the solver.
    #[error("Driver '{driver}' not found on solver '{solver}'")]
    DriverNotFound {
        /// Solver name
        solver: String,
        /// Driver transform name
        driver: String,
    },

    /// The transform is not driven by the solver.
    #[error("Driven transform '{driven}' not found on solver '{solver}'")]
    DrivenNotFound {
        /// Solver name
        solver: String,
        /// Driven transform name
        driven: String,
    },

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// No solver with this name or handle exists.
    #[error("Solver not found: {0}")]
    SolverNotFound(String),

    /// The scene has no transform with this name.
    #[error("Transform not found: {0}")]
    TransformNotFound(String),

    /// An operation needed the session's current solver but none is set.
    #[error("No current solver is set")]
    NoCurrentSolver,

    // ========================================================================
    // Collaborator Errors
    // ========================================================================
    /// A referenced transform disappeared from the scene.
    #[error("Stale reference to '{0}': it no longer exists in the scene")]
    StaleReference(String),

    /// Blendshape binding failure.
    #[error("Blendshape error: {0}")]
    Blendshape(String),

    /// The RBF evaluator returned the wrong number of weights.
    #[error("Evaluator returned {actual} weights for {expected} poses")]
    EvaluatorShape {
        /// Pose count
        expected: usize,
        /// Weights returned
        actual: usize,
    },

    // ========================================================================
    // Extension Errors
    // ========================================================================
    /// Paste was requested before anything was copied.
    #[error("Nothing has been copied yet")]
    NothingCopied,

    /// No extension of the requested type is registered.
    #[error("Extension not registered: {0}")]
    ExtensionNotFound(&'static str),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error with the failing path.
    #[error("IO error at '{}': {source}", path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PoseWranglerError {
    /// Creates an [`InvalidMirrorMapping`](Self::InvalidMirrorMapping) error.
    #[must_use]
    pub fn invalid_mirror_mapping(reason: impl Into<String>) -> Self {
        Self::InvalidMirrorMapping(reason.into())
    }

    /// Creates a [`SolverNotFound`](Self::SolverNotFound) error.
    #[must_use]
    pub fn solver_not_found(name: impl Into<String>) -> Self {
        Self::SolverNotFound(name.into())
    }

    /// Creates a [`TransformNotFound`](Self::TransformNotFound) error.
    #[must_use]
    pub fn transform_not_found(name: impl Into<String>) -> Self {
        Self::TransformNotFound(name.into())
    }

    /// Creates a [`Blendshape`](Self::Blendshape) error.
    #[must_use]
    pub fn blendshape(reason: impl Into<String>) -> Self {
        Self::Blendshape(reason.into())
    }

    /// Creates a [`PoseNotFound`](Self::PoseNotFound) error.
    #[must_use]
    pub fn pose_not_found(solver: impl Into<String>, pose: impl Into<String>) -> Self {
        Self::PoseNotFound {
            solver: solver.into(),
            pose: pose.into(),
        }
    }

    /// Wraps an I/O error with the path that caused it.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Alias for `Result<T, PoseWranglerError>`.
pub type Result<T> = std::result::Result<T, PoseWranglerError>;
