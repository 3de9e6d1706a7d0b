//! Scene graph collaborator
//!
//! The pose network never owns transforms. It refers to them by name and
//! reads or writes their matrices through [`SceneGraph`]:
//! - [`SceneGraph`]: the boundary trait a host implements
//! - [`MemoryScene`]: an in-memory hierarchical implementation
//! - [`Node`] / [`Transform`]: the building blocks of [`MemoryScene`]

pub mod memory;
pub mod node;
pub mod transform;

pub use memory::MemoryScene;
pub use node::Node;
pub use transform::Transform;

use glam::DMat4;
use slotmap::new_key_type;

use crate::errors::{PoseWranglerError, Result};
use crate::math::Trs;

new_key_type! {
    /// Handle to a node of a [`MemoryScene`].
    pub struct TransformHandle;
}

/// Operations the pose network needs from the host scene.
///
/// Matrix getters return `None` for names that do not exist. Matrices are
/// column-major with column vectors, so `world = parent_world * local`.
pub trait SceneGraph {
    fn exists(&self, name: &str) -> bool;

    fn local_matrix(&self, name: &str) -> Option<DMat4>;

    fn world_matrix(&self, name: &str) -> Option<DMat4>;

    /// World matrix of the parent; identity for roots.
    fn parent_matrix(&self, name: &str) -> Option<DMat4>;

    /// Returns `false` if the transform does not exist.
    fn set_local_matrix(&mut self, name: &str, matrix: DMat4) -> bool;

    /// Creates a transform and returns the name it was given.
    fn create_transform(&mut self, name: &str, parent: Option<&str>) -> Result<String>;

    /// Copies a node (used for sculpt meshes) and returns the copy's name.
    fn duplicate(&mut self, source: &str, name: &str) -> Result<String>;

    /// Returns `false` if nothing was deleted.
    fn delete(&mut self, name: &str) -> bool;

    // ========================================================================
    // Provided helpers
    // ========================================================================

    /// Like [`local_matrix`](Self::local_matrix), failing with `StaleReference`.
    fn require_local_matrix(&self, name: &str) -> Result<DMat4> {
        self.local_matrix(name)
            .ok_or_else(|| PoseWranglerError::StaleReference(name.to_owned()))
    }

    /// Like [`parent_matrix`](Self::parent_matrix), failing with `StaleReference`.
    fn require_parent_matrix(&self, name: &str) -> Result<DMat4> {
        self.parent_matrix(name)
            .ok_or_else(|| PoseWranglerError::StaleReference(name.to_owned()))
    }

    fn trs(&self, name: &str) -> Option<Trs> {
        self.local_matrix(name).map(|m| Trs::from_matrix(&m))
    }

    fn set_trs(&mut self, name: &str, trs: &Trs) -> bool {
        self.set_local_matrix(name, trs.to_matrix())
    }
}
