//! World wrapper around hecs
//!
//! Besides plain entity storage, the world keeps a parent/child hierarchy and
//! implements [`SceneGraph`] so pools can clone prefabs into it.

use glam::{Mat4, Quat, Vec3};
use hecs::Entity;

use super::components::{Active, Name, Persistent, Prefab, Tag, Transform, Velocity};
use super::hierarchy::{Children, GlobalTransform, Parent};
use crate::pool::{GraphError, SceneGraph, Space};

/// Game world containing all entities and components
pub struct World {
    /// The underlying hecs world
    pub inner: hecs::World,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
        }
    }

    /// Spawn an entity with the given components
    pub fn spawn(&mut self, components: impl hecs::DynamicBundle) -> Entity {
        self.inner.spawn(components)
    }

    /// Spawn a named, active node at the given transform
    pub fn spawn_node(&mut self, name: impl Into<String>, transform: Transform) -> Entity {
        self.inner.spawn((Name::new(name), transform, Active(true)))
    }

    /// Spawn an inactive prefab that pools can clone
    pub fn spawn_prefab(&mut self, name: impl Into<String>, transform: Transform) -> Entity {
        self.inner
            .spawn((Name::new(name), transform, Active(false), Prefab))
    }

    /// Despawn an entity
    pub fn despawn(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        self.inner.despawn(entity)
    }

    /// Get a reference to a component
    pub fn get<T: hecs::Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::Ref<'_, T>, hecs::ComponentError> {
        self.inner.get::<&T>(entity)
    }

    /// Get a mutable reference to a component
    pub fn get_mut<T: hecs::Component>(
        &mut self,
        entity: Entity,
    ) -> Result<hecs::RefMut<'_, T>, hecs::ComponentError> {
        self.inner.get::<&mut T>(entity)
    }

    /// Check if an entity exists
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    /// Get the number of entities
    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    /// Check if the world is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Clear all entities from the world
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Get the parent of an entity, if any
    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        self.inner.get::<&Parent>(entity).ok().map(|p| p.entity())
    }

    /// Get the direct children of an entity
    pub fn children_of(&self, entity: Entity) -> Vec<Entity> {
        self.inner
            .get::<&Children>(entity)
            .map(|children| children.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Check whether an entity is active
    pub fn is_active(&self, entity: Entity) -> bool {
        self.inner
            .get::<&Active>(entity)
            .map(|active| active.0)
            .unwrap_or(false)
    }

    /// Local transform of an entity
    pub fn local_transform(&self, entity: Entity) -> Option<Transform> {
        self.inner.get::<&Transform>(entity).ok().map(|t| *t)
    }

    /// World-space transform, accumulated through the parent chain
    pub fn global_transform(&self, entity: Entity) -> GlobalTransform {
        let mut matrix = self.local_matrix(entity);
        let mut current = self.parent_of(entity);
        while let Some(parent) = current {
            matrix = self.local_matrix(parent) * matrix;
            current = self.parent_of(parent);
        }
        GlobalTransform::new(matrix)
    }

    /// World-space position of an entity
    pub fn world_position(&self, entity: Entity) -> Vec3 {
        self.global_transform(entity).position()
    }

    fn local_matrix(&self, entity: Entity) -> Mat4 {
        self.inner
            .get::<&Transform>(entity)
            .map(|t| t.matrix())
            .unwrap_or(Mat4::IDENTITY)
    }

    fn parent_global(&self, entity: Entity) -> GlobalTransform {
        self.parent_of(entity)
            .map(|parent| self.global_transform(parent))
            .unwrap_or_default()
    }

    fn scale_of(&self, entity: Entity) -> Vec3 {
        self.inner
            .get::<&Transform>(entity)
            .map(|t| t.scale)
            .unwrap_or(Vec3::ONE)
    }

    /// `true` if `ancestor` is `entity` or one of its parents
    fn is_ancestor_or_self(&self, ancestor: Entity, entity: Entity) -> bool {
        let mut current = Some(entity);
        while let Some(e) = current {
            if e == ancestor {
                return true;
            }
            current = self.parent_of(e);
        }
        false
    }

    fn root_of(&self, entity: Entity) -> Entity {
        let mut root = entity;
        while let Some(parent) = self.parent_of(root) {
            root = parent;
        }
        root
    }

    fn has<T: hecs::Component>(&self, entity: Entity) -> bool {
        self.inner.get::<&T>(entity).is_ok()
    }

    fn unlink(&mut self, child: Entity) {
        if let Ok(parent) = self.inner.remove_one::<Parent>(child) {
            if let Ok(mut children) = self.inner.get::<&mut Children>(parent.entity()) {
                children.remove(child);
            }
        }
    }

    fn link(&mut self, child: Entity, parent: Entity) -> Result<(), GraphError> {
        self.inner
            .insert_one(child, Parent::new(parent))
            .map_err(|_| GraphError::no_such_node(child))?;

        let added = self
            .inner
            .get::<&mut Children>(parent)
            .map(|mut children| children.add(child))
            .is_ok();
        if !added {
            self.inner
                .insert_one(parent, Children::single(child))
                .map_err(|_| GraphError::no_such_node(parent))?;
        }
        Ok(())
    }

    fn write_local(&mut self, entity: Entity, transform: Transform) -> Result<(), GraphError> {
        self.inner
            .insert_one(entity, transform)
            .map_err(|_| GraphError::no_such_node(entity))
    }

    fn subtree(&self, entity: Entity) -> Vec<Entity> {
        let mut stack = vec![entity];
        let mut out = Vec::new();
        while let Some(e) = stack.pop() {
            out.push(e);
            stack.extend(self.children_of(e));
        }
        out
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph for World {
    type Node = Entity;

    fn spawn_container(&mut self, name: &str) -> Entity {
        self.spawn_node(name, Transform::default())
    }

    fn instantiate(
        &mut self,
        prototype: Entity,
        position: Vec3,
        rotation: Quat,
        parent: Entity,
    ) -> Result<Entity, GraphError> {
        if !self.contains(prototype) {
            return Err(GraphError::no_such_node(prototype));
        }
        if !self.has::<Prefab>(prototype) {
            return Err(GraphError::NotAPrototype(format!("{prototype:?}")));
        }
        if !self.contains(parent) {
            return Err(GraphError::no_such_node(parent));
        }

        let name = self.inner.get::<&Name>(prototype).ok().map(|n| (*n).clone());
        let tag = self.inner.get::<&Tag>(prototype).ok().map(|t| (*t).clone());
        let velocity = self.inner.get::<&Velocity>(prototype).ok().map(|v| *v);
        let scale = self.scale_of(prototype);

        let mut builder = hecs::EntityBuilder::new();
        builder.add(Active(true));
        if let Some(name) = name {
            builder.add(name);
        }
        if let Some(tag) = tag {
            builder.add(tag);
        }
        if let Some(velocity) = velocity {
            builder.add(velocity);
        }
        let entity = self.inner.spawn(builder.build());

        let world = Mat4::from_scale_rotation_translation(scale, rotation, position);
        let local = self.global_transform(parent).to_local(world);
        self.write_local(entity, Transform::from_matrix(local))?;
        self.link(entity, parent)?;
        Ok(entity)
    }

    fn set_active(&mut self, node: Entity, active: bool) -> Result<(), GraphError> {
        self.inner
            .insert_one(node, Active(active))
            .map_err(|_| GraphError::no_such_node(node))
    }

    fn set_transform(
        &mut self,
        node: Entity,
        position: Vec3,
        rotation: Quat,
        space: Space,
    ) -> Result<(), GraphError> {
        if !self.contains(node) {
            return Err(GraphError::no_such_node(node));
        }
        let scale = self.scale_of(node);
        let local = match space {
            Space::Local => Transform {
                position,
                rotation,
                scale,
            },
            Space::World => {
                let world = Mat4::from_scale_rotation_translation(scale, rotation, position);
                Transform::from_matrix(self.parent_global(node).to_local(world))
            }
        };
        self.write_local(node, local)
    }

    fn reattach(
        &mut self,
        node: Entity,
        parent: Entity,
        preserve_world_transform: bool,
    ) -> Result<(), GraphError> {
        if !self.contains(node) {
            return Err(GraphError::no_such_node(node));
        }
        if !self.contains(parent) {
            return Err(GraphError::no_such_node(parent));
        }
        if self.is_ancestor_or_self(node, parent) {
            return Err(GraphError::InvalidParent {
                node: format!("{node:?}"),
                parent: format!("{parent:?}"),
            });
        }

        let world = self.global_transform(node).matrix;
        self.unlink(node);
        self.link(node, parent)?;

        if preserve_world_transform {
            let local = self.global_transform(parent).to_local(world);
            self.write_local(node, Transform::from_matrix(local))?;
        }
        Ok(())
    }

    fn destroy(&mut self, node: Entity) -> Result<(), GraphError> {
        if !self.contains(node) {
            return Err(GraphError::no_such_node(node));
        }
        let doomed = self.subtree(node);
        self.unlink(node);
        for entity in doomed {
            // Children listed by a despawned parent are already gone
            let _ = self.inner.despawn(entity);
        }
        Ok(())
    }

    fn keep_alive(&mut self, node: Entity) -> Result<(), GraphError> {
        self.inner
            .insert_one(node, Persistent)
            .map_err(|_| GraphError::no_such_node(node))
    }

    fn unload_scene(&mut self) {
        let entities: Vec<Entity> = self.inner.iter().map(|e| e.entity()).collect();
        let doomed: Vec<Entity> = entities
            .into_iter()
            .filter(|&e| {
                let root = self.root_of(e);
                !(self.has::<Prefab>(root) || self.has::<Persistent>(root))
            })
            .collect();

        log::debug!("Unloading scene: {} entities despawned", doomed.len());
        for entity in doomed {
            let _ = self.inner.despawn(entity);
        }
    }

    fn contains(&self, node: Entity) -> bool {
        self.inner.contains(node)
    }

    fn name(&self, node: Entity) -> Option<String> {
        self.inner.get::<&Name>(node).ok().map(|n| n.0.clone())
    }

    fn tag(&self, node: Entity) -> Option<String> {
        self.inner.get::<&Tag>(node).ok().map(|t| t.0.clone())
    }

    fn children(&self, node: Entity) -> Vec<Entity> {
        self.children_of(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instantiate_copies_prefab() {
        let mut world = World::new();
        let prefab = world.spawn_prefab("Bullet", Transform::default());
        world.inner.insert_one(prefab, Tag::new("Projectile")).unwrap();
        let container = world.spawn_container("Container");

        let clone = world
            .instantiate(prefab, Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY, container)
            .unwrap();

        assert_eq!(world.name(clone).as_deref(), Some("Bullet"));
        assert_eq!(world.get::<Tag>(clone).unwrap().0, "Projectile");
        assert_eq!(world.parent_of(clone), Some(container));
        assert!(world.is_active(clone));
        assert!(world.world_position(clone).abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-5));
    }

    #[test]
    fn test_instantiate_requires_prefab() {
        let mut world = World::new();
        let plain = world.spawn_node("Plain", Transform::default());
        let container = world.spawn_container("Container");

        let result = world.instantiate(plain, Vec3::ZERO, Quat::IDENTITY, container);
        assert!(matches!(result, Err(GraphError::NotAPrototype(_))));
    }

    #[test]
    fn test_reattach_preserves_world_position() {
        let mut world = World::new();
        let platform = world.spawn_node("Platform", Transform::from_position(Vec3::new(10.0, 0.0, 0.0)));
        let node = world.spawn_node("Crate", Transform::from_position(Vec3::new(12.0, 1.0, 0.0)));

        world.reattach(node, platform, true).unwrap();
        assert!(world.world_position(node).abs_diff_eq(Vec3::new(12.0, 1.0, 0.0), 1e-5));
        assert!(
            world
                .local_transform(node)
                .unwrap()
                .position
                .abs_diff_eq(Vec3::new(2.0, 1.0, 0.0), 1e-5)
        );

        // Moving the platform carries the child along
        world.get_mut::<Transform>(platform).unwrap().translate(Vec3::Y);
        assert!(world.world_position(node).abs_diff_eq(Vec3::new(12.0, 2.0, 0.0), 1e-5));
    }

    #[test]
    fn test_reattach_keeps_local_values() {
        let mut world = World::new();
        let platform = world.spawn_node("Platform", Transform::from_position(Vec3::new(10.0, 0.0, 0.0)));
        let node = world.spawn_node("Crate", Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));

        world.reattach(node, platform, false).unwrap();
        assert!(world.world_position(node).abs_diff_eq(Vec3::new(11.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_reattach_rejects_cycles() {
        let mut world = World::new();
        let parent = world.spawn_node("Parent", Transform::default());
        let child = world.spawn_node("Child", Transform::default());
        world.reattach(child, parent, true).unwrap();

        let result = world.reattach(parent, child, true);
        assert!(matches!(result, Err(GraphError::InvalidParent { .. })));
    }

    #[test]
    fn test_reattach_moves_between_children_lists() {
        let mut world = World::new();
        let a = world.spawn_node("A", Transform::default());
        let b = world.spawn_node("B", Transform::default());
        let node = world.spawn_node("Node", Transform::default());

        world.reattach(node, a, true).unwrap();
        world.reattach(node, b, true).unwrap();

        assert!(world.children_of(a).is_empty());
        assert_eq!(world.children_of(b), vec![node]);
    }

    #[test]
    fn test_set_transform_world_space_under_parent() {
        let mut world = World::new();
        let parent = world.spawn_node("Parent", Transform::from_position(Vec3::new(5.0, 0.0, 0.0)));
        let node = world.spawn_node("Node", Transform::default());
        world.reattach(node, parent, false).unwrap();

        world
            .set_transform(node, Vec3::new(6.0, 0.0, 0.0), Quat::IDENTITY, Space::World)
            .unwrap();
        assert!(world.world_position(node).abs_diff_eq(Vec3::new(6.0, 0.0, 0.0), 1e-5));

        world
            .set_transform(node, Vec3::new(6.0, 0.0, 0.0), Quat::IDENTITY, Space::Local)
            .unwrap();
        assert!(world.world_position(node).abs_diff_eq(Vec3::new(11.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_destroy_removes_subtree() {
        let mut world = World::new();
        let root = world.spawn_node("Root", Transform::default());
        let parent = world.spawn_node("Parent", Transform::default());
        let child = world.spawn_node("Child", Transform::default());
        world.reattach(parent, root, true).unwrap();
        world.reattach(child, parent, true).unwrap();

        world.destroy(parent).unwrap();
        assert!(!world.contains(parent));
        assert!(!world.contains(child));
        assert!(world.children_of(root).is_empty());
        assert!(world.destroy(parent).is_err());
    }

    #[test]
    fn test_unload_scene_keeps_prefabs_and_persistent_roots() {
        let mut world = World::new();
        let prefab = world.spawn_prefab("Prefab", Transform::default());
        let keep = world.spawn_container("Keep");
        world.keep_alive(keep).unwrap();
        let kept_child = world.spawn_node("KeptChild", Transform::default());
        world.reattach(kept_child, keep, true).unwrap();
        let scene_node = world.spawn_node("SceneNode", Transform::default());

        world.unload_scene();

        assert!(world.contains(prefab));
        assert!(world.contains(keep));
        assert!(world.contains(kept_child));
        assert!(!world.contains(scene_node));
    }
}
