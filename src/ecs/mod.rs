//! Entity Component System module
//!
//! Built on top of the hecs ECS library. The [`World`] doubles as the
//! reference scene graph that pools clone prefabs into.

mod components;
mod hierarchy;
mod world;

pub use components::{Active, Name, Persistent, Prefab, Tag, Transform, Velocity};
pub use hierarchy::{Children, GlobalTransform, Parent};
pub use world::World;
