//! Object pooling
//!
//! Pools pre-clone prototypes into inactive instances, hand them out on
//! demand, and take them back without destroying anything. Everything a pool
//! does to the scene goes through the [`SceneGraph`] trait, so the same code
//! drives the hecs-backed [`crate::ecs::World`] and test doubles alike.
//!
//! # Components
//!
//! | Type               | Role                                              |
//! |--------------------|---------------------------------------------------|
//! | [`PoolSystem`]     | Context object owning everything below            |
//! | [`PoolDirectory`]  | One pool per prototype                            |
//! | [`Pool`]           | Instances of one prototype, free and in use       |
//! | [`ReparentLedger`] | Where each instance goes back to when released    |
//! | [`PoolManifest`]   | Pool configs authored in RON or JSON              |

mod config;
mod directory;
mod error;
mod graph;
mod handle;
mod ledger;
#[allow(clippy::module_inception)]
mod pool;
mod system;

pub use config::{ConfigError, DEFAULT_POOL_SIZE, PoolConfig, PoolManifest};
pub use directory::PoolDirectory;
pub use error::PoolError;
pub use graph::{GraphError, SceneGraph, Space};
pub use handle::{InstanceHandle, PrototypeId};
pub use ledger::{LedgerEntry, ReparentLedger};
pub use pool::{Placement, Pool, PoolStats};
pub use system::{PendingRelease, PoolSystem};
