//! Spawning helpers built on the pooling system
//!
//! - [`Spawner`]: timed spawns over random locations
//! - [`CollisionSpawner`]: spawns at contact points when its owner is hit

mod collision;
mod location;
mod spawner;

pub use collision::{CollisionSpawnConfig, CollisionSpawner, look_rotation};
pub use location::SpawnLocation;
pub use spawner::{RATE_LIMITS, Spawner, SpawnerConfig};
