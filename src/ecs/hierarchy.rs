//! Scene hierarchy
//!
//! `Parent` and `Children` link entities into a tree: pool containers own
//! their free instances, gameplay nodes (platforms, walls) temporarily own
//! acquired ones. Both sides are kept in sync by [`super::World`]; never
//! insert them by hand.

use glam::{Mat4, Quat, Vec3};
use hecs::Entity;
use smallvec::SmallVec;

/// Link from a node to the node it is attached under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub Entity);

impl Parent {
    #[must_use]
    pub const fn new(entity: Entity) -> Self {
        Self(entity)
    }

    #[must_use]
    pub const fn entity(&self) -> Entity {
        self.0
    }
}

/// Nodes attached under an entity, in attach order.
///
/// Pool containers can hold hundreds of instances, so the inline capacity
/// only covers ordinary gameplay nodes.
#[derive(Debug, Clone, Default)]
pub struct Children(SmallVec<[Entity; 8]>);

impl Children {
    /// A list holding one child
    #[must_use]
    pub fn single(child: Entity) -> Self {
        Self(smallvec::smallvec![child])
    }

    /// Append a child; attaching the same node twice is a no-op
    pub fn add(&mut self, child: Entity) {
        if !self.contains(child) {
            self.0.push(child);
        }
    }

    /// Detach a child, keeping the order of the rest.
    ///
    /// Returns `false` if it was not attached here.
    pub fn remove(&mut self, child: Entity) -> bool {
        match self.0.iter().position(|&e| e == child) {
            Some(index) => {
                self.0.remove(index);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn contains(&self, child: Entity) -> bool {
        self.0.contains(&child)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.0.iter()
    }
}

/// World-space placement of a node, resolved through its parent chain.
///
/// Computed on demand by [`super::World::global_transform`]; it is not
/// stored on entities.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlobalTransform {
    /// Local-to-world matrix
    pub matrix: Mat4,
}

impl GlobalTransform {
    #[must_use]
    pub const fn new(matrix: Mat4) -> Self {
        Self { matrix }
    }

    /// World position
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.matrix.w_axis.truncate()
    }

    /// World rotation, with scale factored out
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.matrix.to_scale_rotation_translation().1
    }

    /// Re-express a world matrix as a local matrix for a child of this node.
    ///
    /// This is what keeps a node in place when it is reattached.
    #[must_use]
    pub fn to_local(&self, world: Mat4) -> Mat4 {
        self.matrix.inverse() * world
    }

    /// Map a point from this node's space into world space
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.matrix.transform_point3(point)
    }
}
