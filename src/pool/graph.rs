//! Scene graph boundary
//!
//! The pooling core never owns scene nodes directly. Everything it needs from
//! the engine's node hierarchy goes through [`SceneGraph`], which the engine
//! (or the reference [`crate::ecs::World`]) implements.

use std::fmt;
use std::hash::Hash;

use glam::{Quat, Vec3};
use thiserror::Error;

/// How a transform passed to the scene graph should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Space {
    /// Position and rotation are world-space coordinates
    #[default]
    World,
    /// Position and rotation are relative to the node's parent
    Local,
}

/// Errors raised by a scene graph implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The node does not exist (never created, or already destroyed)
    #[error("no such scene node: {0}")]
    NoSuchNode(String),
    /// The node cannot be cloned
    #[error("node {0} is not a prototype")]
    NotAPrototype(String),
    /// Reattaching would put a node under itself or one of its descendants
    #[error("cannot attach {node} under {parent}")]
    InvalidParent { node: String, parent: String },
}

impl GraphError {
    /// Build a `NoSuchNode` error from any debuggable node id
    pub fn no_such_node(node: impl fmt::Debug) -> Self {
        Self::NoSuchNode(format!("{node:?}"))
    }
}

/// Operations the pooling core consumes from the scene graph.
///
/// All calls are synchronous and run to completion within one frame.
pub trait SceneGraph {
    /// Opaque node identifier
    type Node: Copy + Eq + Hash + fmt::Debug;

    /// Create an empty container node at the root of the graph.
    fn spawn_container(&mut self, name: &str) -> Self::Node;

    /// Clone `prototype` under `parent` at the given world placement.
    ///
    /// The new node starts active; callers deactivate it as needed.
    fn instantiate(
        &mut self,
        prototype: Self::Node,
        position: Vec3,
        rotation: Quat,
        parent: Self::Node,
    ) -> Result<Self::Node, GraphError>;

    /// Enable or disable simulation and visibility of a node.
    fn set_active(&mut self, node: Self::Node, active: bool) -> Result<(), GraphError>;

    /// Move a node, interpreting the transform in `space`.
    fn set_transform(
        &mut self,
        node: Self::Node,
        position: Vec3,
        rotation: Quat,
        space: Space,
    ) -> Result<(), GraphError>;

    /// Move `node` under `parent`.
    ///
    /// With `preserve_world_transform` the node keeps its world placement,
    /// otherwise it keeps its local transform values.
    fn reattach(
        &mut self,
        node: Self::Node,
        parent: Self::Node,
        preserve_world_transform: bool,
    ) -> Result<(), GraphError>;

    /// Destroy a node and everything below it.
    fn destroy(&mut self, node: Self::Node) -> Result<(), GraphError>;

    /// Mark a root node as surviving scene unloads.
    fn keep_alive(&mut self, node: Self::Node) -> Result<(), GraphError>;

    /// Destroy everything that was not marked with [`SceneGraph::keep_alive`].
    fn unload_scene(&mut self);

    /// Check whether a node still exists.
    fn contains(&self, node: Self::Node) -> bool;

    /// Display name of a node, if it has one.
    fn name(&self, node: Self::Node) -> Option<String>;

    /// Gameplay tag of a node, if it has one.
    fn tag(&self, node: Self::Node) -> Option<String>;

    /// Nodes attached directly under `node`. Empty if it has none or is gone.
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;
}
