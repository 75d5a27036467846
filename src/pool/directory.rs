//! Pool directory
//!
//! Maps prototypes to their pools and guarantees there is never more than
//! one pool per prototype.

use rustc_hash::FxHashMap;

use super::config::PoolConfig;
use super::error::PoolError;
use super::graph::SceneGraph;
use super::handle::PrototypeId;
use super::ledger::ReparentLedger;
use super::pool::Pool;

/// Registry of every live pool.
#[derive(Debug)]
pub struct PoolDirectory<N> {
    /// Prototype node → pool id
    by_prototype: FxHashMap<N, PrototypeId>,
    /// Pools by id
    pools: FxHashMap<PrototypeId, Pool<N>>,
    /// Next id to issue
    next_id: u64,
}

impl<N> PoolDirectory<N>
where
    N: Copy + Eq + std::hash::Hash + std::fmt::Debug,
{
    /// Create an empty directory
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_prototype: FxHashMap::default(),
            pools: FxHashMap::default(),
            next_id: 1,
        }
    }

    /// Register a pool for `prototype`, or return the existing one's id.
    ///
    /// When a pool already exists nothing changes: `config` is ignored and
    /// the second value of the result is `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the prototype cannot be cloned
    pub fn init_pool<G>(
        &mut self,
        graph: &mut G,
        ledger: &mut ReparentLedger<N>,
        prototype: N,
        config: PoolConfig,
    ) -> Result<(PrototypeId, bool), PoolError>
    where
        G: SceneGraph<Node = N>,
    {
        if let Some(&id) = self.by_prototype.get(&prototype) {
            log::trace!("Pool for {:?} already initialized as {}", prototype, id);
            return Ok((id, false));
        }

        let id = PrototypeId::new(self.next_id);
        let pool = Pool::create(graph, ledger, id, prototype, config)?;
        self.next_id += 1;
        self.by_prototype.insert(prototype, id);
        self.pools.insert(id, pool);
        Ok((id, true))
    }

    /// Id of the pool for a prototype, if one exists
    #[must_use]
    pub fn lookup(&self, prototype: N) -> Option<PrototypeId> {
        self.by_prototype.get(&prototype).copied()
    }

    /// Get a pool
    ///
    /// # Errors
    ///
    /// `PrototypeNotFound` if no pool has this id
    pub fn get(&self, id: PrototypeId) -> Result<&Pool<N>, PoolError> {
        self.pools.get(&id).ok_or(PoolError::PrototypeNotFound(id))
    }

    /// Get a pool mutably
    ///
    /// # Errors
    ///
    /// `PrototypeNotFound` if no pool has this id
    pub fn get_mut(&mut self, id: PrototypeId) -> Result<&mut Pool<N>, PoolError> {
        self.pools
            .get_mut(&id)
            .ok_or(PoolError::PrototypeNotFound(id))
    }

    /// Unregister a pool and hand it back to the caller
    ///
    /// # Errors
    ///
    /// `PrototypeNotFound` if no pool has this id
    pub fn remove(&mut self, id: PrototypeId) -> Result<Pool<N>, PoolError> {
        let pool = self
            .pools
            .remove(&id)
            .ok_or(PoolError::PrototypeNotFound(id))?;
        self.by_prototype.remove(&pool.prototype());
        Ok(pool)
    }

    /// Check if a pool is registered under `id`
    #[must_use]
    pub fn contains(&self, id: PrototypeId) -> bool {
        self.pools.contains_key(&id)
    }

    /// Ids of every registered pool, in registration order
    #[must_use]
    pub fn ids(&self) -> Vec<PrototypeId> {
        let mut ids: Vec<_> = self.pools.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over every pool (unordered)
    pub fn iter(&self) -> impl Iterator<Item = &Pool<N>> {
        self.pools.values()
    }

    /// Number of registered pools
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Check if no pools are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

impl<N> Default for PoolDirectory<N>
where
    N: Copy + Eq + std::hash::Hash + std::fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
