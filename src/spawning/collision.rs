//! Spawn on collision
//!
//! Drops a pooled instance (an impact decal, sparks, a stuck arrow) at the
//! contact point whenever its owner is hit hard enough.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::pool::{
    InstanceHandle, Placement, PoolConfig, PoolError, PoolSystem, PrototypeId, SceneGraph, Space,
};
use crate::triggers::Signal;

/// Collision spawner settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionSpawnConfig {
    /// Pool backing the spawner
    pub pool: PoolConfig,
    /// Only react to bodies carrying this tag
    pub filter_tag: Option<String>,
    /// Ignore hits with a lower relative speed
    pub speed_threshold: f32,
    /// Attach spawned instances to the owner
    pub sticky: bool,
}

/// Rotation whose +Z axis points along `forward` and whose +Y axis is as
/// close to `up` as possible.
///
/// Falls back to an arbitrary up axis when the two are parallel.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let Some(z) = forward.try_normalize() else {
        return Quat::IDENTITY;
    };
    let x = up
        .cross(z)
        .try_normalize()
        .unwrap_or_else(|| z.any_orthonormal_vector());
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize()
}

/// Spawns an instance wherever its owner gets hit.
#[derive(Debug)]
pub struct CollisionSpawner<N> {
    owner: N,
    pool: PrototypeId,
    config: CollisionSpawnConfig,
}

impl<N> CollisionSpawner<N>
where
    N: Copy + Eq + std::hash::Hash + std::fmt::Debug,
{
    /// Create a spawner for `owner`, making sure `prototype` has a pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created
    pub fn new<G>(
        graph: &mut G,
        pools: &mut PoolSystem<G>,
        owner: N,
        prototype: N,
        config: CollisionSpawnConfig,
    ) -> Result<Self, PoolError>
    where
        G: SceneGraph<Node = N>,
    {
        let pool = pools.init_pool_with(graph, prototype, config.pool.clone())?;
        Ok(Self {
            owner,
            pool,
            config,
        })
    }

    /// React to an engine signal.
    ///
    /// Only collisions involving the owner count. The instance is placed at
    /// the contact point, facing -Z with its up axis pointing into the
    /// body that hit the owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool rejects the acquire
    pub fn on_signal<G>(
        &self,
        graph: &mut G,
        pools: &mut PoolSystem<G>,
        signal: &Signal<N>,
    ) -> Result<Option<InstanceHandle<N>>, PoolError>
    where
        G: SceneGraph<Node = N>,
    {
        let Signal::Collision {
            a,
            b,
            contact_point,
            normal,
            relative_speed,
        } = *signal
        else {
            return Ok(None);
        };

        // Normal as seen from the owner: pointing out of the other body
        let (other, normal) = if a == self.owner {
            (b, -normal)
        } else if b == self.owner {
            (a, normal)
        } else {
            return Ok(None);
        };

        if let Some(filter) = &self.config.filter_tag {
            if graph.tag(other).as_deref() != Some(filter.as_str()) {
                return Ok(None);
            }
        }
        if relative_speed < self.config.speed_threshold {
            return Ok(None);
        }

        let mut placement = Placement::new(contact_point, look_rotation(Vec3::NEG_Z, -normal));
        if self.config.sticky {
            placement = placement.with_parent(self.owner, Space::World);
        }

        let handle = pools.acquire(graph, self.pool, placement)?;
        log::trace!("{:?} hit by {:?}, spawned {:?}", self.owner, other, handle.node());
        Ok(Some(handle))
    }

    /// Node whose collisions are watched
    pub fn owner(&self) -> N {
        self.owner
    }

    /// Pool the spawner draws from
    pub fn pool(&self) -> PrototypeId {
        self.pool
    }
}
