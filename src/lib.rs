//! Object pooling for real-time simulations
//!
//! This crate provides:
//! - Per-prototype pools that pre-clone instances and grow on demand
//! - A reparent ledger so released instances always return home
//! - Release triggers driven by engine signals and a frame timer
//! - Scene transitions that regather persistent pools before unloading
//! - Spawners built on top of the pools
//! - A hecs-backed reference scene graph

pub mod core;
pub mod ecs;
pub mod pool;
pub mod spawning;
pub mod triggers;

// Re-exports for convenience
pub use glam;
pub use hecs;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::core::{LoadMode, SceneCatalog, SceneRequest, Time};
    pub use crate::ecs::{Name, Tag, Transform, Velocity, World};
    pub use crate::pool::{
        InstanceHandle, Placement, PoolConfig, PoolError, PoolManifest, PoolStats, PoolSystem,
        PrototypeId, SceneGraph, Space,
    };
    pub use crate::spawning::{CollisionSpawnConfig, CollisionSpawner, SpawnLocation, Spawner, SpawnerConfig};
    pub use crate::triggers::{ReleaseTrigger, Signal};
    pub use glam::{Quat, Vec2, Vec3};
}
