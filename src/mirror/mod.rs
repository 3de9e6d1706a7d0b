//! Left/right mirroring of solvers.
//!
//! [`MirrorMapping`] derives counterpart names from naming conventions; the
//! orchestrator functions use it together with the reflection math in
//! [`crate::math`] to build the opposite-side solver.

pub mod mapping;
pub mod orchestrator;

pub use mapping::{MirrorMapping, MirrorMappingDocument, Side, SideSyntax};
pub use orchestrator::{mirror_pose, mirror_solver};
