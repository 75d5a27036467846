//! Reparent ledger
//!
//! Remembers, for every pooled instance, which container it belongs under
//! when it is not in use, and which pool slot owns it. The ledger only holds
//! node ids; it never creates or destroys nodes.

use rustc_hash::FxHashMap;

use super::error::PoolError;
use super::graph::SceneGraph;
use super::handle::PrototypeId;

/// Where an instance lives when free, and who owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry<N> {
    /// Container the instance is reattached to on release
    pub home: N,
    /// Pool that owns the instance
    pub prototype: PrototypeId,
    /// Slot of the instance in its pool
    pub slot: usize,
}

/// Instance → home mapping shared by every pool of a pooling system.
#[derive(Debug)]
pub struct ReparentLedger<N> {
    entries: FxHashMap<N, LedgerEntry<N>>,
}

impl<N> ReparentLedger<N>
where
    N: Copy + Eq + std::hash::Hash + std::fmt::Debug,
{
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// Record an instance's home, replacing any previous record.
    ///
    /// Returns the entry that was replaced, if any.
    pub fn record(&mut self, node: N, entry: LedgerEntry<N>) -> Option<LedgerEntry<N>> {
        self.entries.insert(node, entry)
    }

    /// Look up an instance's entry
    ///
    /// # Errors
    ///
    /// `InstanceNotFound` if the instance was never recorded
    pub fn get(&self, node: N) -> Result<&LedgerEntry<N>, PoolError> {
        self.entries
            .get(&node)
            .ok_or_else(|| PoolError::instance_not_found(node))
    }

    /// Look up an instance's entry without treating a miss as an error
    #[must_use]
    pub fn entry(&self, node: N) -> Option<&LedgerEntry<N>> {
        self.entries.get(&node)
    }

    /// Reattach an instance to its home and deactivate it.
    ///
    /// The world placement is kept, so a released instance does not jump.
    ///
    /// # Errors
    ///
    /// `InstanceNotFound` if the instance was never recorded, or a graph
    /// error if the node no longer exists
    pub fn restore<G>(&mut self, graph: &mut G, node: N) -> Result<LedgerEntry<N>, PoolError>
    where
        G: SceneGraph<Node = N>,
    {
        let entry = *self.get(node)?;
        graph.reattach(node, entry.home, true)?;
        graph.set_active(node, false)?;
        self.record(node, entry);
        Ok(entry)
    }

    /// Remove an instance's entry
    pub fn forget(&mut self, node: N) -> Option<LedgerEntry<N>> {
        self.entries.remove(&node)
    }

    /// Check whether an instance is tracked
    #[must_use]
    pub fn contains(&self, node: N) -> bool {
        self.entries.contains_key(&node)
    }

    /// Number of tracked instances
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no instances are tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N> Default for ReparentLedger<N>
where
    N: Copy + Eq + std::hash::Hash + std::fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
