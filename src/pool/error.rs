//! Pooling errors

use thiserror::Error;

use super::graph::GraphError;
use super::handle::PrototypeId;
use crate::core::SceneError;

/// Errors surfaced by the pooling system.
///
/// Lookups of unknown pools or untracked instances are programmer errors
/// (an init or acquire step was skipped) and are always reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// No pool is registered under this id
    #[error("no pool registered for {0}")]
    PrototypeNotFound(PrototypeId),
    /// The instance was never handed out by a pool
    #[error("instance {0} was not obtained from a pool")]
    InstanceNotFound(String),
    /// The scene graph rejected an operation
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// A scene load request could not be resolved
    #[error(transparent)]
    Scene(#[from] SceneError),
}

impl PoolError {
    /// Build an `InstanceNotFound` error from any debuggable node id
    pub fn instance_not_found(node: impl std::fmt::Debug) -> Self {
        Self::InstanceNotFound(format!("{node:?}"))
    }

    /// Whether this is one of the not-found errors
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PrototypeNotFound(_) | Self::InstanceNotFound(_))
    }
}
