use glam::DMat4;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::errors::{PoseWranglerError, Result};
use crate::scene::node::Node;
use crate::scene::transform::Transform;
use crate::scene::{SceneGraph, TransformHandle};

/// In-memory hierarchical scene.
///
/// Nodes live in a [`SlotMap`] and are indexed by unique name. World matrices
/// are composed on demand by walking up the parent chain.
#[derive(Debug, Default)]
pub struct MemoryScene {
    nodes: SlotMap<TransformHandle, Node>,
    names: FxHashMap<String, TransformHandle>,
}

impl MemoryScene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node under `parent` (or at the root). Name clashes get a numeric suffix.
    pub fn add(&mut self, name: &str, parent: Option<TransformHandle>) -> Result<TransformHandle> {
        if let Some(p) = parent
            && !self.nodes.contains_key(p)
        {
            return Err(PoseWranglerError::transform_not_found(format!("{p:?}")));
        }

        let unique = self.unique_name(name);
        let mut node = Node::new(unique.clone());
        node.parent = parent;
        let handle = self.nodes.insert(node);
        if let Some(p) = parent
            && let Some(parent_node) = self.nodes.get_mut(p)
        {
            parent_node.children.push(handle);
        }
        self.names.insert(unique, handle);
        Ok(handle)
    }

    /// Removes a node and its whole subtree.
    pub fn remove(&mut self, handle: TransformHandle) {
        let Some(node) = self.nodes.get(handle) else {
            return;
        };
        if let Some(parent) = node.parent
            && let Some(parent_node) = self.nodes.get_mut(parent)
        {
            parent_node.children.retain(|&c| c != handle);
        }

        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            if let Some(removed) = self.nodes.remove(current) {
                self.names.remove(&removed.name);
                stack.extend(removed.children);
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn handle(&self, name: &str) -> Option<TransformHandle> {
        self.names.get(name).copied()
    }

    #[inline]
    #[must_use]
    pub fn node(&self, handle: TransformHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn node_mut(&mut self, handle: TransformHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    /// Mutable access to a node's transform by name.
    pub fn transform_mut(&mut self, name: &str) -> Option<&mut Transform> {
        let handle = self.handle(name)?;
        self.nodes.get_mut(handle).map(|n| &mut n.transform)
    }

    #[must_use]
    pub fn transform(&self, name: &str) -> Option<&Transform> {
        let handle = self.handle(name)?;
        self.nodes.get(handle).map(|n| &n.transform)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn world_of(&self, handle: TransformHandle) -> Option<DMat4> {
        let mut node = self.nodes.get(handle)?;
        let mut world = *node.transform.local_matrix();
        while let Some(parent) = node.parent {
            node = self.nodes.get(parent)?;
            world = *node.transform.local_matrix() * world;
        }
        Some(world)
    }

    fn unique_name(&self, name: &str) -> String {
        if !self.names.contains_key(name) {
            return name.to_owned();
        }
        let mut i = 1;
        loop {
            let candidate = format!("{name}{i}");
            if !self.names.contains_key(&candidate) {
                return candidate;
            }
            i += 1;
        }
    }
}

impl SceneGraph for MemoryScene {
    fn exists(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    fn local_matrix(&self, name: &str) -> Option<DMat4> {
        self.transform(name).map(|t| *t.local_matrix())
    }

    fn world_matrix(&self, name: &str) -> Option<DMat4> {
        self.world_of(self.handle(name)?)
    }

    fn parent_matrix(&self, name: &str) -> Option<DMat4> {
        let node = self.nodes.get(self.handle(name)?)?;
        match node.parent {
            Some(parent) => self.world_of(parent),
            None => Some(DMat4::IDENTITY),
        }
    }

    fn set_local_matrix(&mut self, name: &str, matrix: DMat4) -> bool {
        match self.transform_mut(name) {
            Some(transform) => {
                transform.apply_local_matrix(matrix);
                true
            }
            None => false,
        }
    }

    fn create_transform(&mut self, name: &str, parent: Option<&str>) -> Result<String> {
        let parent = match parent {
            Some(p) => Some(
                self.handle(p)
                    .ok_or_else(|| PoseWranglerError::transform_not_found(p))?,
            ),
            None => None,
        };
        let handle = self.add(name, parent)?;
        Ok(self.nodes[handle].name.clone())
    }

    fn duplicate(&mut self, source: &str, name: &str) -> Result<String> {
        let handle = self
            .handle(source)
            .ok_or_else(|| PoseWranglerError::transform_not_found(source))?;
        let (parent, transform) = {
            let node = &self.nodes[handle];
            (node.parent, node.transform.clone())
        };
        let copy = self.add(name, parent)?;
        self.nodes[copy].transform = transform;
        Ok(self.nodes[copy].name.clone())
    }

    fn delete(&mut self, name: &str) -> bool {
        match self.handle(name) {
            Some(handle) => {
                self.remove(handle);
                true
            }
            None => false,
        }
    }
}
