//! Prototype Pool
//!
//! A pool owns every instance cloned from one prototype. Free instances sit
//! deactivated under the pool's container node; acquired instances are
//! activated, placed, and optionally attached elsewhere in the scene.
//!
//! # Design Principles
//!
//! - **Never fails on exhaustion**: when every instance is in use the pool
//!   clones one more. The configured size is only the warm count.
//! - **Deterministic reuse**: acquire always hands out the free instance
//!   that was created first.
//! - **Cycle tracking**: every acquire bumps the instance's generation, so
//!   stale handles and delayed releases can be recognised.
//!
//! # Example
//!
//! ```ignore
//! let mut ledger = ReparentLedger::new();
//! let mut pool = Pool::create(&mut world, &mut ledger, id, bullet, PoolConfig::new(16, false))?;
//!
//! let handle = pool.acquire(&mut world, &mut ledger, Placement::at(muzzle))?;
//! // ... later
//! ledger.restore(&mut world, handle.node())?;
//! pool.mark_free(handle.slot());
//! ```

use std::collections::BTreeSet;

use glam::{Quat, Vec3};
use smallvec::SmallVec;

use super::config::PoolConfig;
use super::error::PoolError;
use super::graph::{GraphError, SceneGraph, Space};
use super::handle::{InstanceHandle, PrototypeId};
use super::ledger::{LedgerEntry, ReparentLedger};
use crate::core::SubscriptionId;

// ============================================================================
// Placement
// ============================================================================

/// Where an acquired instance should go.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement<N> {
    /// Target position
    pub position: Vec3,
    /// Target rotation
    pub rotation: Quat,
    /// Node to attach the instance under, if any
    pub parent: Option<N>,
    /// How position and rotation relate to `parent`
    pub space: Space,
}

impl<N> Placement<N> {
    /// Place at a world position with no rotation
    pub fn at(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Place at a world position and rotation
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            parent: None,
            space: Space::World,
        }
    }

    /// Set the rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Attach under `parent`.
    ///
    /// With [`Space::World`] the instance keeps the world placement it was
    /// given; with [`Space::Local`] position and rotation are taken relative
    /// to `parent`.
    pub fn with_parent(mut self, parent: N, space: Space) -> Self {
        self.parent = Some(parent);
        self.space = space;
        self
    }
}

impl<N> Default for Placement<N> {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

// ============================================================================
// Pool Stats
// ============================================================================

/// Snapshot of a pool's occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Instances owned by the pool
    pub total: usize,
    /// Instances currently handed out
    pub in_use: usize,
    /// Instances ready to hand out
    pub free: usize,
    /// Most instances ever in use at once
    pub high_water: usize,
}

// ============================================================================
// Slots
// ============================================================================

#[derive(Debug)]
struct Slot<N> {
    node: N,
    in_use: bool,
    generation: u32,
    /// Which triggers already fired during the current activation cycle
    fired: SmallVec<[bool; 4]>,
}

// ============================================================================
// Pool
// ============================================================================

/// All instances cloned from one prototype.
///
/// # Performance Characteristics
///
/// | Operation   | Time Complexity |
/// |-------------|-----------------|
/// | `acquire`   | O(log n)        |
/// | `mark_free` | O(log n)        |
/// | `regather`  | O(n)            |
///
/// Free slots are kept in an ordered set, so acquire finds the
/// first-created free instance without scanning.
#[derive(Debug)]
pub struct Pool<N> {
    id: PrototypeId,
    prototype: N,
    container: N,
    config: PoolConfig,
    slots: Vec<Slot<N>>,
    free: BTreeSet<usize>,
    high_water: usize,
    subscription: Option<SubscriptionId>,
}

impl<N> Pool<N>
where
    N: Copy + Eq + std::hash::Hash + std::fmt::Debug,
{
    /// Create a pool for `prototype` and warm it with `config.initial_size`
    /// instances.
    ///
    /// The pool gets its own container node, named after the prototype.
    /// Persistent pools mark their container to survive scene unloads.
    ///
    /// # Errors
    ///
    /// Returns a graph error if the prototype does not exist or cannot be
    /// cloned
    pub fn create<G>(
        graph: &mut G,
        ledger: &mut ReparentLedger<N>,
        id: PrototypeId,
        prototype: N,
        config: PoolConfig,
    ) -> Result<Self, PoolError>
    where
        G: SceneGraph<Node = N>,
    {
        if !graph.contains(prototype) {
            return Err(GraphError::no_such_node(prototype).into());
        }

        let name = graph.name(prototype).unwrap_or_else(|| format!("{prototype:?}"));
        let container = graph.spawn_container(&format!("ObjectPool: {name}"));
        if config.persistent {
            graph.keep_alive(container)?;
        }

        let initial_size = config.initial_size;
        let mut pool = Self {
            id,
            prototype,
            container,
            config,
            slots: Vec::with_capacity(initial_size),
            free: BTreeSet::new(),
            high_water: 0,
            subscription: None,
        };

        if let Err(e) = pool.prefill(graph, ledger, initial_size) {
            // Leave nothing behind for a pool that never got registered
            pool.destroy(graph, ledger)?;
            return Err(e);
        }

        log::debug!(
            "Created {} for '{}' with {} instances{}",
            id,
            name,
            initial_size,
            if pool.config.persistent { " (persistent)" } else { "" }
        );
        Ok(pool)
    }

    /// Clone the prototype `count` more times.
    ///
    /// New instances are inactive, free, and recorded in the ledger with the
    /// pool container as their home.
    pub fn prefill<G>(
        &mut self,
        graph: &mut G,
        ledger: &mut ReparentLedger<N>,
        count: usize,
    ) -> Result<(), PoolError>
    where
        G: SceneGraph<Node = N>,
    {
        for _ in 0..count {
            self.clone_instance(graph, ledger)?;
        }
        Ok(())
    }

    fn clone_instance<G>(
        &mut self,
        graph: &mut G,
        ledger: &mut ReparentLedger<N>,
    ) -> Result<usize, PoolError>
    where
        G: SceneGraph<Node = N>,
    {
        let node = graph.instantiate(self.prototype, Vec3::ZERO, Quat::IDENTITY, self.container)?;
        graph.set_active(node, false)?;

        let index = self.slots.len();
        self.slots.push(Slot {
            node,
            in_use: false,
            generation: 0,
            fired: SmallVec::from_elem(false, self.config.triggers.len()),
        });
        self.free.insert(index);
        ledger.record(
            node,
            LedgerEntry {
                home: self.container,
                prototype: self.id,
                slot: index,
            },
        );
        Ok(index)
    }

    /// Hand out the first free instance, cloning a new one if none is free.
    ///
    /// The instance is placed, attached per `placement`, and activated.
    ///
    /// # Errors
    ///
    /// Only scene graph failures are reported; exhaustion never is.
    pub fn acquire<G>(
        &mut self,
        graph: &mut G,
        ledger: &mut ReparentLedger<N>,
        placement: Placement<N>,
    ) -> Result<InstanceHandle<N>, PoolError>
    where
        G: SceneGraph<Node = N>,
    {
        let index = match self.free.first() {
            Some(&index) => index,
            None => {
                let index = self.clone_instance(graph, ledger)?;
                log::debug!("{} exhausted, grew to {} instances", self.id, self.slots.len());
                index
            }
        };

        let node = self.slots[index].node;
        Self::place(graph, node, &placement)?;
        graph.set_active(node, true)?;

        self.free.remove(&index);
        let slot = &mut self.slots[index];
        slot.in_use = true;
        slot.generation = slot.generation.wrapping_add(1);
        slot.fired.iter_mut().for_each(|fired| *fired = false);
        let handle = InstanceHandle::new(node, self.id, index, slot.generation);

        self.high_water = self.high_water.max(self.in_use_count());
        log::trace!("{} handed out slot {}", self.id, index);
        Ok(handle)
    }

    fn place<G>(graph: &mut G, node: N, placement: &Placement<N>) -> Result<(), GraphError>
    where
        G: SceneGraph<Node = N>,
    {
        let Placement {
            position,
            rotation,
            parent,
            space,
        } = *placement;

        match (parent, space) {
            (None, _) => graph.set_transform(node, position, rotation, Space::World),
            (Some(parent), Space::World) => {
                graph.set_transform(node, position, rotation, Space::World)?;
                graph.reattach(node, parent, true)
            }
            (Some(parent), Space::Local) => {
                graph.reattach(node, parent, false)?;
                graph.set_transform(node, position, rotation, Space::Local)
            }
        }
    }

    /// Mark a slot free. Returns `false` if it already was.
    ///
    /// This only updates bookkeeping; restoring the node is the ledger's job.
    pub fn mark_free(&mut self, slot: usize) -> bool {
        match self.slots.get_mut(slot) {
            Some(s) if s.in_use => {
                s.in_use = false;
                self.free.insert(slot);
                true
            }
            _ => false,
        }
    }

    /// Return every in-use instance to the container and deactivate it.
    ///
    /// Returns how many instances were reclaimed. Calling it again right
    /// away reclaims nothing.
    pub fn regather<G>(
        &mut self,
        graph: &mut G,
        ledger: &mut ReparentLedger<N>,
    ) -> Result<usize, PoolError>
    where
        G: SceneGraph<Node = N>,
    {
        let in_use: Vec<usize> = (0..self.slots.len())
            .filter(|&i| self.slots[i].in_use)
            .collect();

        for &index in &in_use {
            ledger.restore(graph, self.slots[index].node)?;
            self.mark_free(index);
        }

        if !in_use.is_empty() {
            log::debug!("{} regathered {} instances", self.id, in_use.len());
        }
        Ok(in_use.len())
    }

    /// Destroy every instance and the container, and drop their ledger
    /// entries.
    ///
    /// Nodes that are already gone are skipped.
    pub fn destroy<G>(self, graph: &mut G, ledger: &mut ReparentLedger<N>) -> Result<(), PoolError>
    where
        G: SceneGraph<Node = N>,
    {
        for slot in &self.slots {
            ledger.forget(slot.node);
            if graph.contains(slot.node) {
                graph.destroy(slot.node)?;
            }
        }
        if graph.contains(self.container) {
            graph.destroy(self.container)?;
        }
        log::debug!("{} destroyed ({} instances)", self.id, self.slots.len());
        Ok(())
    }

    /// Drop the ledger entries of a pool whose nodes were destroyed by
    /// someone else (a scene unload)
    pub fn forget(self, ledger: &mut ReparentLedger<N>) {
        for slot in &self.slots {
            ledger.forget(slot.node);
        }
    }

    /// Record that trigger `trigger` fired for `slot` this cycle.
    ///
    /// Returns `false` if it had already fired, or the slot is free.
    pub fn try_fire(&mut self, slot: usize, trigger: usize) -> bool {
        let Some(s) = self.slots.get_mut(slot) else {
            return false;
        };
        if !s.in_use {
            return false;
        }
        match s.fired.get_mut(trigger) {
            Some(fired) if !*fired => {
                *fired = true;
                true
            }
            _ => false,
        }
    }

    /// Whether `slot` is in use in activation cycle `generation`
    pub fn is_current(&self, slot: usize, generation: u32) -> bool {
        self.slots
            .get(slot)
            .is_some_and(|s| s.in_use && s.generation == generation)
    }

    /// Handle for a slot's current activation cycle, if it is in use
    pub fn handle(&self, slot: usize) -> Option<InstanceHandle<N>> {
        self.slots
            .get(slot)
            .filter(|s| s.in_use)
            .map(|s| InstanceHandle::new(s.node, self.id, slot, s.generation))
    }

    /// Check if a slot is handed out
    #[must_use]
    pub fn is_in_use(&self, slot: usize) -> bool {
        self.slots.get(slot).is_some_and(|s| s.in_use)
    }

    /// Pool identity
    pub fn id(&self) -> PrototypeId {
        self.id
    }

    /// Prototype node the pool clones
    pub fn prototype(&self) -> N {
        self.prototype
    }

    /// Container node free instances live under
    pub fn container(&self) -> N {
        self.container
    }

    /// The pool's configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Whether the pool survives scene transitions
    pub fn is_persistent(&self) -> bool {
        self.config.persistent
    }

    /// Instances in creation order
    pub fn instances(&self) -> impl Iterator<Item = N> + '_ {
        self.slots.iter().map(|s| s.node)
    }

    /// Number of instances owned
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the pool owns no instances
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of instances handed out
    #[must_use]
    pub fn in_use_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Number of instances ready to hand out
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Occupancy snapshot
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total: self.len(),
            in_use: self.in_use_count(),
            free: self.free_count(),
            high_water: self.high_water,
        }
    }

    pub(crate) fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription
    }

    pub(crate) fn set_subscription(&mut self, subscription: SubscriptionId) {
        self.subscription = Some(subscription);
    }
}

// ============================================================================
// Tests
// ============================================================================
