//! Pooling system
//!
//! [`PoolSystem`] is the one object gameplay code talks to. It owns the pool
//! directory, the reparent ledger, the release timer, the signal queue and
//! the scene catalog, and works against whatever [`SceneGraph`] is passed in.
//! Independent systems share nothing, so tests can build as many as they
//! like.
//!
//! # Frame flow
//!
//! ```ignore
//! let mut pools = PoolSystem::<World>::new();
//! let bullets = pools.init_pool(&mut world, bullet_prefab, 64, false)?;
//!
//! // Every frame
//! let shot = pools.acquire(&mut world, bullets, Placement::at(muzzle))?;
//! pools.push_signal(Signal::BecameInvisible { node: shot.node() });
//! pools.tick(&mut world, dt)?;
//! ```

use std::time::Duration;

use rustc_hash::FxHashSet;

use super::config::PoolConfig;
use super::directory::PoolDirectory;
use super::error::PoolError;
use super::graph::SceneGraph;
use super::handle::{InstanceHandle, PrototypeId};
use super::ledger::ReparentLedger;
use super::pool::{Placement, Pool, PoolStats};
use crate::core::{
    EventQueue, SceneCatalog, SceneChange, SceneRequest, Time, Timer, TimerHandle, TransitionHub,
    seconds,
};
use crate::triggers::{ReleaseAction, Signal};

/// A release waiting on the frame clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRelease<N> {
    /// Instance to release
    pub node: N,
    /// Activation cycle the release belongs to
    pub generation: u32,
}

/// The pooling subsystem.
pub struct PoolSystem<G: SceneGraph> {
    directory: PoolDirectory<G::Node>,
    ledger: ReparentLedger<G::Node>,
    transitions: TransitionHub<PrototypeId>,
    timer: Timer<PendingRelease<G::Node>>,
    signals: EventQueue<Signal<G::Node>>,
    scenes: SceneCatalog,
    time: Time,
}

impl<G: SceneGraph> PoolSystem<G> {
    /// Create a system with no pools and an empty scene catalog
    pub fn new() -> Self {
        Self::with_scenes(SceneCatalog::default())
    }

    /// Create a system that loads scenes from `scenes`
    pub fn with_scenes(scenes: SceneCatalog) -> Self {
        Self {
            directory: PoolDirectory::new(),
            ledger: ReparentLedger::new(),
            transitions: TransitionHub::new(),
            timer: Timer::new(),
            signals: EventQueue::new(),
            scenes,
            time: Time::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Pool lifecycle
    // ------------------------------------------------------------------------

    /// Create a pool of `size` instances for `prototype`.
    ///
    /// If the prototype already has a pool, its id is returned and neither
    /// size nor persistence change.
    ///
    /// # Errors
    ///
    /// Returns a graph error if the prototype cannot be cloned
    pub fn init_pool(
        &mut self,
        graph: &mut G,
        prototype: G::Node,
        size: usize,
        persistent: bool,
    ) -> Result<PrototypeId, PoolError> {
        self.init_pool_with(graph, prototype, PoolConfig::new(size, persistent))
    }

    /// Create a pool for `prototype` from a full config.
    ///
    /// Same idempotence rules as [`PoolSystem::init_pool`].
    ///
    /// # Errors
    ///
    /// Returns a graph error if the prototype cannot be cloned
    pub fn init_pool_with(
        &mut self,
        graph: &mut G,
        prototype: G::Node,
        config: PoolConfig,
    ) -> Result<PrototypeId, PoolError> {
        let (id, created) =
            self.directory
                .init_pool(graph, &mut self.ledger, prototype, config)?;

        if created {
            let pool = self.directory.get_mut(id)?;
            if pool.is_persistent() {
                pool.set_subscription(self.transitions.subscribe(id));
            }
            log::info!(
                "Initialized {} for {:?} ({} instances)",
                id,
                prototype,
                pool.len()
            );
        }
        Ok(id)
    }

    /// Warm pool `id` with `count` more free instances.
    ///
    /// # Errors
    ///
    /// `PrototypeNotFound` if no pool has this id, or a graph error if the
    /// prototype cannot be cloned
    pub fn prefill(
        &mut self,
        graph: &mut G,
        id: PrototypeId,
        count: usize,
    ) -> Result<(), PoolError> {
        self.directory
            .get_mut(id)?
            .prefill(graph, &mut self.ledger, count)
    }

    /// Destroy a pool, every instance it owns, and their ledger entries.
    ///
    /// # Errors
    ///
    /// `PrototypeNotFound` if no pool has this id
    pub fn teardown(&mut self, graph: &mut G, id: PrototypeId) -> Result<(), PoolError> {
        let pool = self.directory.get(id)?;
        let roots: Vec<G::Node> = std::iter::once(pool.container())
            .chain(pool.instances())
            .collect();
        let rescued = self.release_foreign_descendants(graph, id, &roots)?;

        let pool = self.directory.remove(id)?;
        self.unsubscribe(&pool);
        pool.destroy(graph, &mut self.ledger)?;
        log::info!("Tore down {} ({} foreign instances sent home)", id, rescued);
        Ok(())
    }

    /// Release every instance of another pool attached somewhere below
    /// `roots`, so destroying the roots does not take it along.
    ///
    /// The walk stops at each released instance; whatever is attached to it
    /// travels home with it.
    fn release_foreign_descendants(
        &mut self,
        graph: &mut G,
        owner: PrototypeId,
        roots: &[G::Node],
    ) -> Result<usize, PoolError> {
        let mut stack: Vec<G::Node> = roots
            .iter()
            .filter(|&&root| graph.contains(root))
            .flat_map(|&root| graph.children(root))
            .collect();
        let mut visited = FxHashSet::default();
        let mut released = 0;

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            match self.ledger.entry(node).copied() {
                Some(entry) if entry.prototype != owner => {
                    self.release(graph, node)?;
                    released += 1;
                }
                _ => stack.extend(graph.children(node)),
            }
        }
        Ok(released)
    }

    /// Forget a pool whose nodes were destroyed outside the system.
    ///
    /// Mirrors [`PoolSystem::teardown`] without touching the scene graph.
    ///
    /// # Errors
    ///
    /// `PrototypeNotFound` if no pool has this id
    pub fn on_pool_destroyed(&mut self, id: PrototypeId) -> Result<(), PoolError> {
        let pool = self.directory.remove(id)?;
        self.unsubscribe(&pool);
        pool.forget(&mut self.ledger);
        log::debug!("Forgot {} after its container was destroyed", id);
        Ok(())
    }

    fn unsubscribe(&mut self, pool: &Pool<G::Node>) {
        if let Some(subscription) = pool.subscription() {
            self.transitions.unsubscribe(subscription);
        }
    }

    // ------------------------------------------------------------------------
    // Acquire / release
    // ------------------------------------------------------------------------

    /// Hand out an instance from the pool `id`.
    ///
    /// # Errors
    ///
    /// `PrototypeNotFound` if no pool has this id
    pub fn acquire(
        &mut self,
        graph: &mut G,
        id: PrototypeId,
        placement: Placement<G::Node>,
    ) -> Result<InstanceHandle<G::Node>, PoolError> {
        let pool = self.directory.get_mut(id)?;
        let handle = pool.acquire(graph, &mut self.ledger, placement)?;

        let triggers = pool.config().triggers.clone();
        for (index, trigger) in triggers.iter().enumerate() {
            if let Some(ReleaseAction::After(delay)) = trigger.on_activate() {
                self.timer.schedule_once(
                    delay,
                    PendingRelease {
                        node: handle.node(),
                        generation: handle.generation(),
                    },
                );
                pool.try_fire(handle.slot(), index);
            }
        }
        Ok(handle)
    }

    /// Hand out an instance of `prototype`, creating a default-sized pool
    /// first if it has none.
    ///
    /// # Errors
    ///
    /// Returns a graph error if the prototype cannot be cloned
    pub fn acquire_from(
        &mut self,
        graph: &mut G,
        prototype: G::Node,
        placement: Placement<G::Node>,
    ) -> Result<InstanceHandle<G::Node>, PoolError> {
        let id = self.init_pool_with(graph, prototype, PoolConfig::default())?;
        self.acquire(graph, id, placement)
    }

    /// Return an instance to its pool, whichever pool that is.
    ///
    /// The instance is reattached to its home container and deactivated.
    /// Releasing an instance that is already free is harmless.
    ///
    /// # Errors
    ///
    /// `InstanceNotFound` if the node never came from a pool
    pub fn release(&mut self, graph: &mut G, node: G::Node) -> Result<(), PoolError> {
        let entry = self.ledger.restore(graph, node)?;
        let pool = self.directory.get_mut(entry.prototype)?;
        if pool.mark_free(entry.slot) {
            log::trace!("{} took back slot {}", entry.prototype, entry.slot);
        }
        Ok(())
    }

    /// Release through a handle.
    ///
    /// Returns `false`, doing nothing, when the handle's activation cycle is
    /// over (the instance was released, and maybe handed out again).
    ///
    /// # Errors
    ///
    /// `PrototypeNotFound` if the handle's pool was torn down
    pub fn release_handle(
        &mut self,
        graph: &mut G,
        handle: InstanceHandle<G::Node>,
    ) -> Result<bool, PoolError> {
        let pool = self.directory.get(handle.prototype())?;
        if !pool.is_current(handle.slot(), handle.generation()) {
            return Ok(false);
        }
        self.release(graph, handle.node())?;
        Ok(true)
    }

    /// Release an instance `delay` seconds from now.
    ///
    /// The release only applies to the instance's current activation cycle.
    /// Non-positive delays still wait for the next tick.
    ///
    /// # Errors
    ///
    /// `InstanceNotFound` if the node never came from a pool
    pub fn release_after(&mut self, node: G::Node, delay: f32) -> Result<TimerHandle, PoolError> {
        let entry = *self.ledger.get(node)?;
        let generation = self
            .directory
            .get(entry.prototype)?
            .handle(entry.slot)
            .map_or(0, |handle| handle.generation());

        Ok(self
            .timer
            .schedule_once(seconds(delay), PendingRelease { node, generation }))
    }

    /// Cancel a release scheduled with [`PoolSystem::release_after`]
    pub fn cancel_release(&mut self, handle: TimerHandle) -> bool {
        self.timer.cancel(handle)
    }

    /// Return every in-use instance of pool `id` to its container.
    ///
    /// # Errors
    ///
    /// `PrototypeNotFound` if no pool has this id
    pub fn regather(&mut self, graph: &mut G, id: PrototypeId) -> Result<usize, PoolError> {
        self.directory
            .get_mut(id)?
            .regather(graph, &mut self.ledger)
    }

    // ------------------------------------------------------------------------
    // Signals and time
    // ------------------------------------------------------------------------

    /// Queue an engine signal for the next [`PoolSystem::tick`]
    pub fn push_signal(&mut self, signal: Signal<G::Node>) {
        self.signals.push(signal);
    }

    /// Run the release triggers of every pooled instance a signal is about.
    ///
    /// Nodes that are not pooled, or not in use, are ignored. Returns how
    /// many releases happened or were scheduled.
    ///
    /// # Errors
    ///
    /// Propagates release failures
    pub fn handle_signal(
        &mut self,
        graph: &mut G,
        signal: &Signal<G::Node>,
    ) -> Result<usize, PoolError> {
        let kind = signal.kind();
        let mut fired = 0;

        for node in signal.nodes() {
            let Some(entry) = self.ledger.entry(node).copied() else {
                continue;
            };
            let pool = self.directory.get_mut(entry.prototype)?;
            let Some(handle) = pool.handle(entry.slot) else {
                continue;
            };

            let triggers = pool.config().triggers.clone();
            let mut action = None;
            for (index, trigger) in triggers.iter().enumerate() {
                if let Some(a) = trigger.on_signal(kind) {
                    if pool.try_fire(entry.slot, index) {
                        action = Some(a);
                        break;
                    }
                }
            }

            match action {
                Some(ReleaseAction::Now) => {
                    self.release(graph, node)?;
                    fired += 1;
                }
                Some(ReleaseAction::After(delay)) => {
                    self.timer.schedule_once(
                        delay,
                        PendingRelease {
                            node,
                            generation: handle.generation(),
                        },
                    );
                    fired += 1;
                }
                None => {}
            }
        }
        Ok(fired)
    }

    /// Step the frame: process last frame's signals, then every delayed
    /// release that came due.
    ///
    /// Every due item is processed even if one fails; the first failure is
    /// returned.
    ///
    /// # Errors
    ///
    /// Propagates release failures
    pub fn tick(&mut self, graph: &mut G, delta: Duration) -> Result<(), PoolError> {
        self.time.advance(delta);
        let mut result = Ok(());

        self.signals.swap();
        let signals: Vec<_> = self.signals.drain().collect();
        for signal in &signals {
            if let Err(e) = self.handle_signal(graph, signal) {
                log::error!("Signal {:?} failed: {}", signal.kind(), e);
                result = result.and(Err(e));
            }
        }

        for pending in self.timer.advance(delta) {
            if let Err(e) = self.fire_pending(graph, pending) {
                log::error!("Delayed release of {:?} failed: {}", pending.node, e);
                result = result.and(Err(e));
            }
        }
        result
    }

    fn fire_pending(
        &mut self,
        graph: &mut G,
        pending: PendingRelease<G::Node>,
    ) -> Result<(), PoolError> {
        let Some(entry) = self.ledger.entry(pending.node).copied() else {
            log::debug!("Delayed release of destroyed instance {:?} skipped", pending.node);
            return Ok(());
        };
        if !graph.contains(pending.node) {
            log::warn!(
                "Delayed release of {:?} skipped, the node was destroyed while in use",
                pending.node
            );
            return Ok(());
        }
        if !self
            .directory
            .get(entry.prototype)?
            .is_current(entry.slot, pending.generation)
        {
            log::trace!("Stale delayed release of {:?} skipped", pending.node);
            return Ok(());
        }
        self.release(graph, pending.node)
    }

    // ------------------------------------------------------------------------
    // Scene transitions
    // ------------------------------------------------------------------------

    /// Fire the pre-unload signal: every persistent pool regathers.
    ///
    /// Returns how many instances were reclaimed.
    ///
    /// # Errors
    ///
    /// Propagates regather failures
    pub fn prepare_transition(&mut self, graph: &mut G) -> Result<usize, PoolError> {
        let mut reclaimed = 0;
        for id in self.transitions.broadcast() {
            reclaimed += self.regather(graph, id)?;
        }
        Ok(reclaimed)
    }

    /// Load a scene.
    ///
    /// Single loads fire the pre-unload signal, unload the scene graph, and
    /// forget every pool whose container went with it. Additive loads only
    /// update the catalog. `Next` past the last scene returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Unknown scenes, or regather failures
    pub fn load_scene(
        &mut self,
        graph: &mut G,
        request: &SceneRequest,
    ) -> Result<Option<SceneChange>, PoolError> {
        let Some(change) = self.scenes.resolve(request)? else {
            log::warn!("No scene after {:?}, staying put", self.scenes.active());
            return Ok(None);
        };

        if change.unloads_current() {
            let reclaimed = self.prepare_transition(graph)?;
            self.signals.clear();
            graph.unload_scene();

            for id in self.directory.ids() {
                let container = self.directory.get(id)?.container();
                if !graph.contains(container) {
                    self.on_pool_destroyed(id)?;
                }
            }
            log::info!(
                "Scene transition to '{}': {} instances regathered, {} pools kept",
                change.name,
                reclaimed,
                self.directory.len()
            );
        }

        self.scenes.apply(&change);
        Ok(Some(change))
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Get a pool
    ///
    /// # Errors
    ///
    /// `PrototypeNotFound` if no pool has this id
    pub fn pool(&self, id: PrototypeId) -> Result<&Pool<G::Node>, PoolError> {
        self.directory.get(id)
    }

    /// Occupancy of a pool
    ///
    /// # Errors
    ///
    /// `PrototypeNotFound` if no pool has this id
    pub fn stats(&self, id: PrototypeId) -> Result<PoolStats, PoolError> {
        Ok(self.directory.get(id)?.stats())
    }

    /// Pool id of a prototype, if it has a pool
    pub fn lookup(&self, prototype: G::Node) -> Option<PrototypeId> {
        self.directory.lookup(prototype)
    }

    /// Whether a pooled instance is currently handed out
    ///
    /// # Errors
    ///
    /// `InstanceNotFound` if the node never came from a pool
    pub fn is_in_use(&self, node: G::Node) -> Result<bool, PoolError> {
        let entry = self.ledger.get(node)?;
        Ok(self.directory.get(entry.prototype)?.is_in_use(entry.slot))
    }

    /// The pool directory
    pub fn directory(&self) -> &PoolDirectory<G::Node> {
        &self.directory
    }

    /// The reparent ledger
    pub fn ledger(&self) -> &ReparentLedger<G::Node> {
        &self.ledger
    }

    /// The scene catalog
    pub fn scenes(&self) -> &SceneCatalog {
        &self.scenes
    }

    /// Simulated time
    pub fn time(&self) -> &Time {
        &self.time
    }

    /// Number of delayed releases waiting on the clock
    pub fn pending_releases(&self) -> usize {
        self.timer.pending()
    }

    /// Number of pools subscribed to the pre-unload signal
    pub fn persistent_pools(&self) -> usize {
        self.transitions.len()
    }
}

impl<G: SceneGraph> Default for PoolSystem<G> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use super::*;
    use crate::core::LoadMode;
    use crate::ecs::{Transform, World};
    use crate::pool::graph::Space;
    use crate::triggers::ReleaseTrigger;

    fn frame() -> Duration {
        Duration::from_millis(100)
    }

    fn setup() -> (World, PoolSystem<World>, hecs::Entity) {
        let mut world = World::new();
        let prefab = world.spawn_prefab("Bullet", Transform::default());
        (world, PoolSystem::new(), prefab)
    }

    #[test]
    fn test_init_pool_twice_keeps_identity_and_config() {
        let (mut world, mut pools, prefab) = setup();

        let id = pools.init_pool(&mut world, prefab, 4, false).unwrap();
        let again = pools.init_pool(&mut world, prefab, 9, true).unwrap();

        assert_eq!(id, again);
        assert_eq!(pools.pool(id).unwrap().len(), 4);
        assert!(!pools.pool(id).unwrap().is_persistent());
        assert_eq!(pools.persistent_pools(), 0);
    }

    #[test]
    fn test_prefill_adds_free_instances_home() {
        let (mut world, mut pools, prefab) = setup();
        let id = pools.init_pool(&mut world, prefab, 2, false).unwrap();

        pools.prefill(&mut world, id, 3).unwrap();

        let pool = pools.pool(id).unwrap();
        assert_eq!(pool.stats().total, 5);
        assert_eq!(pool.stats().free, 5);
        for node in pool.instances() {
            assert_eq!(world.parent_of(node), Some(pool.container()));
            assert!(!world.is_active(node));
        }
        assert_eq!(pools.ledger().len(), 5);
    }

    #[test]
    fn test_acquire_sixth_bullet_grows_pool() {
        let (mut world, mut pools, prefab) = setup();
        let id = pools.init_pool(&mut world, prefab, 5, false).unwrap();
        let originals: Vec<_> = pools.pool(id).unwrap().instances().collect();

        let first_five: Vec<_> = (0..5)
            .map(|_| pools.acquire(&mut world, id, Placement::default()).unwrap())
            .collect();
        assert_eq!(pools.stats(id).unwrap().total, 5);
        assert_eq!(pools.stats(id).unwrap().in_use, 5);
        assert_eq!(
            first_five.iter().map(|h| h.node()).collect::<Vec<_>>(),
            originals
        );

        let sixth = pools.acquire(&mut world, id, Placement::default()).unwrap();
        assert_eq!(pools.stats(id).unwrap().total, 6);
        assert!(!originals.contains(&sixth.node()));
        assert!(pools.is_in_use(sixth.node()).unwrap());
    }

    #[test]
    fn test_acquire_2n_plus_1_times() {
        let (mut world, mut pools, prefab) = setup();
        let n = 3;
        let id = pools.init_pool(&mut world, prefab, n, false).unwrap();
        let originals: Vec<_> = pools.pool(id).unwrap().instances().collect();

        let handed: Vec<_> = (0..2 * n + 1)
            .map(|_| pools.acquire(&mut world, id, Placement::default()).unwrap().node())
            .collect();

        let unique: std::collections::HashSet<_> = handed.iter().copied().collect();
        assert_eq!(unique.len(), 2 * n + 1);
        assert_eq!(&handed[..n], &originals[..]);
        assert_eq!(pools.stats(id).unwrap().total, 2 * n + 1);
    }

    #[test]
    fn test_round_trip_never_grows_past_high_water() {
        let (mut world, mut pools, prefab) = setup();
        let id = pools.init_pool(&mut world, prefab, 1, false).unwrap();
        let container = pools.pool(id).unwrap().container();

        for i in 0..50 {
            let position = Vec3::new(i as f32, 0.0, 0.0);
            let a = pools.acquire(&mut world, id, Placement::at(position)).unwrap();
            let b = pools
                .acquire(&mut world, id, Placement::new(position, Quat::from_rotation_y(0.5)))
                .unwrap();
            pools.release(&mut world, a.node()).unwrap();
            pools.release(&mut world, b.node()).unwrap();

            assert_eq!(world.parent_of(a.node()), Some(container));
            assert!(!world.is_active(a.node()));
        }

        let stats = pools.stats(id).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.high_water, 2);
        assert_eq!(stats.free, 2);
    }

    #[test]
    fn test_release_from_moving_platform() {
        let (mut world, mut pools, prefab) = setup();
        let id = pools.init_pool(&mut world, prefab, 2, false).unwrap();
        let home = pools.pool(id).unwrap().container();
        let platform = world.spawn_node("Platform", Transform::from_position(Vec3::new(0.0, 2.0, 0.0)));

        let handle = pools
            .acquire(
                &mut world,
                id,
                Placement::at(Vec3::new(1.0, 3.0, 0.0)).with_parent(platform, Space::World),
            )
            .unwrap();
        assert_eq!(world.parent_of(handle.node()), Some(platform));
        assert!(world.world_position(handle.node()).abs_diff_eq(Vec3::new(1.0, 3.0, 0.0), 1e-5));

        // The platform moves, carrying the instance
        world
            .set_transform(platform, Vec3::new(5.0, 2.0, 0.0), Quat::IDENTITY, Space::World)
            .unwrap();

        pools.release(&mut world, handle.node()).unwrap();

        assert_eq!(world.parent_of(handle.node()), Some(home));
        assert!(!world.is_active(handle.node()));
        assert!(world.children_of(platform).is_empty());
        assert!(!pools.is_in_use(handle.node()).unwrap());
    }

    #[test]
    fn test_release_twice_is_harmless() {
        let (mut world, mut pools, prefab) = setup();
        let id = pools.init_pool(&mut world, prefab, 1, false).unwrap();
        let handle = pools.acquire(&mut world, id, Placement::default()).unwrap();

        pools.release(&mut world, handle.node()).unwrap();
        pools.release(&mut world, handle.node()).unwrap();
        assert_eq!(pools.stats(id).unwrap().free, 1);
    }

    #[test]
    fn test_release_handle_ignores_old_cycles() {
        let (mut world, mut pools, prefab) = setup();
        let id = pools.init_pool(&mut world, prefab, 1, false).unwrap();

        let old = pools.acquire(&mut world, id, Placement::default()).unwrap();
        assert!(pools.release_handle(&mut world, old).unwrap());
        let current = pools.acquire(&mut world, id, Placement::default()).unwrap();

        assert!(!pools.release_handle(&mut world, old).unwrap());
        assert!(pools.is_in_use(current.node()).unwrap());
    }

    #[test]
    fn test_not_found_errors() {
        let (mut world, mut pools, _) = setup();
        let stranger = world.spawn_node("Stranger", Transform::default());

        let err = pools.release(&mut world, stranger).unwrap_err();
        assert!(matches!(err, PoolError::InstanceNotFound(_)));
        assert!(err.is_not_found());

        let missing = PrototypeId::new(77);
        assert_eq!(
            pools.acquire(&mut world, missing, Placement::default()).unwrap_err(),
            PoolError::PrototypeNotFound(missing)
        );
        assert!(pools.release_after(stranger, 1.0).is_err());
        assert!(pools.regather(&mut world, missing).is_err());
    }

    #[test]
    fn test_acquire_from_creates_default_pool() {
        let (mut world, mut pools, prefab) = setup();

        let handle = pools
            .acquire_from(&mut world, prefab, Placement::default())
            .unwrap();
        let id = pools.lookup(prefab).unwrap();

        assert_eq!(handle.prototype(), id);
        assert_eq!(pools.stats(id).unwrap().total, crate::pool::DEFAULT_POOL_SIZE);

        pools.acquire_from(&mut world, prefab, Placement::default()).unwrap();
        assert_eq!(pools.directory().len(), 1);
    }

    #[test]
    fn test_regather_twice_same_state() {
        let (mut world, mut pools, prefab) = setup();
        let id = pools.init_pool(&mut world, prefab, 3, false).unwrap();
        for _ in 0..3 {
            pools.acquire(&mut world, id, Placement::default()).unwrap();
        }

        assert_eq!(pools.regather(&mut world, id).unwrap(), 3);
        let once = pools.stats(id).unwrap();
        assert_eq!(pools.regather(&mut world, id).unwrap(), 0);
        assert_eq!(pools.stats(id).unwrap(), once);
        assert_eq!(once.free, 3);
    }

    #[test]
    fn test_persistent_pool_regathers_before_unload() {
        let mut world = World::new();
        let prefab = world.spawn_prefab("Spark", Transform::default());
        let mut pools = PoolSystem::with_scenes(SceneCatalog::new(["Level1", "Level2"]));
        let id = pools.init_pool(&mut world, prefab, 3, true).unwrap();
        let container = pools.pool(id).unwrap().container();
        let platform = world.spawn_node("Platform", Transform::default());

        let handles: Vec<_> = (0..3)
            .map(|_| {
                pools
                    .acquire(
                        &mut world,
                        id,
                        Placement::default().with_parent(platform, Space::Local),
                    )
                    .unwrap()
            })
            .collect();

        let change = pools
            .load_scene(&mut world, &SceneRequest::named("Level2"))
            .unwrap()
            .unwrap();
        assert_eq!(change.name, "Level2");

        assert!(!world.contains(platform));
        assert_eq!(pools.stats(id).unwrap().free, 3);
        for handle in handles {
            assert!(world.contains(handle.node()), "Persistent instances survive");
            assert_eq!(world.parent_of(handle.node()), Some(container));
            assert!(!world.is_active(handle.node()));
        }
        assert_eq!(pools.scenes().active(), Some("Level2"));
    }

    #[test]
    fn test_scene_unload_forgets_transient_pools() {
        let mut world = World::new();
        let prefab = world.spawn_prefab("Bullet", Transform::default());
        let mut pools = PoolSystem::with_scenes(SceneCatalog::new(["A", "B"]));
        let id = pools.init_pool(&mut world, prefab, 2, false).unwrap();
        let handle = pools.acquire(&mut world, id, Placement::default()).unwrap();

        pools.load_scene(&mut world, &SceneRequest::named("B")).unwrap();

        assert!(pools.pool(id).is_err());
        assert!(!world.contains(handle.node()));
        assert!(pools.ledger().is_empty());

        // The prototype survived, so a new pool can be made for it
        let fresh = pools.init_pool(&mut world, prefab, 1, false).unwrap();
        assert_ne!(fresh, id);
    }

    #[test]
    fn test_additive_load_does_not_regather() {
        let mut world = World::new();
        let prefab = world.spawn_prefab("Spark", Transform::default());
        let mut pools = PoolSystem::with_scenes(SceneCatalog::new(["Base", "Overlay"]));
        let id = pools.init_pool(&mut world, prefab, 1, true).unwrap();
        pools.load_scene(&mut world, &SceneRequest::index(0)).unwrap();
        let handle = pools.acquire(&mut world, id, Placement::default()).unwrap();

        pools
            .load_scene(&mut world, &SceneRequest::ByName("Overlay".into(), LoadMode::Additive))
            .unwrap();

        assert!(pools.is_in_use(handle.node()).unwrap());
        assert_eq!(pools.scenes().loaded(), &[0, 1]);
    }

    #[test]
    fn test_next_scene_past_end_is_noop() {
        let mut world = World::new();
        let mut pools: PoolSystem<World> = PoolSystem::with_scenes(SceneCatalog::new(["Only"]));

        assert!(pools.load_scene(&mut world, &SceneRequest::Next).unwrap().is_some());
        assert_eq!(pools.load_scene(&mut world, &SceneRequest::Next).unwrap(), None);
        assert!(matches!(
            pools.load_scene(&mut world, &SceneRequest::named("Missing")),
            Err(PoolError::Scene(_))
        ));
    }

    #[test]
    fn test_teardown_unsubscribes() {
        let (mut world, mut pools, prefab) = setup();
        let id = pools.init_pool(&mut world, prefab, 2, true).unwrap();
        let container = pools.pool(id).unwrap().container();
        assert_eq!(pools.persistent_pools(), 1);

        pools.teardown(&mut world, id).unwrap();

        assert_eq!(pools.persistent_pools(), 0);
        assert!(!world.contains(container));
        assert!(pools.ledger().is_empty());
        assert_eq!(pools.prepare_transition(&mut world).unwrap(), 0);
        assert!(pools.teardown(&mut world, id).is_err());
    }

    #[test]
    fn test_teardown_sends_attached_instances_of_other_pools_home() {
        let (mut world, mut pools, enemy_prefab) = setup();
        let arrow_prefab = world.spawn_prefab("Arrow", Transform::default());
        let enemies = pools.init_pool(&mut world, enemy_prefab, 1, false).unwrap();
        let arrows = pools
            .init_pool_with(
                &mut world,
                arrow_prefab,
                PoolConfig::new(1, false).with_trigger(ReleaseTrigger::AfterDelay { delay: 0.1 }),
            )
            .unwrap();
        let quiver = pools.pool(arrows).unwrap().container();

        let enemy = pools.acquire(&mut world, enemies, Placement::at(Vec3::X)).unwrap();
        let arrow = pools
            .acquire(
                &mut world,
                arrows,
                Placement::at(Vec3::new(1.0, 0.5, 0.0)).with_parent(enemy.node(), Space::World),
            )
            .unwrap();
        assert_eq!(world.parent_of(arrow.node()), Some(enemy.node()));

        pools.teardown(&mut world, enemies).unwrap();

        assert!(!world.contains(enemy.node()));
        assert!(world.contains(arrow.node()));
        assert_eq!(world.parent_of(arrow.node()), Some(quiver));
        assert!(!world.is_active(arrow.node()));
        assert_eq!(pools.stats(arrows).unwrap().free, 1);

        pools.tick(&mut world, frame()).unwrap();
        pools.tick(&mut world, frame()).unwrap();

        let again = pools.acquire(&mut world, arrows, Placement::default()).unwrap();
        assert_eq!(again.node(), arrow.node());
        assert_eq!(pools.stats(arrows).unwrap().total, 1);
    }

    #[test]
    fn test_delayed_release_of_node_destroyed_in_use_is_noop() {
        let (mut world, mut pools, prefab) = setup();
        let id = pools.init_pool(&mut world, prefab, 1, false).unwrap();
        let handle = pools.acquire(&mut world, id, Placement::default()).unwrap();
        pools.release_after(handle.node(), 0.1).unwrap();

        world.destroy(handle.node()).unwrap();

        pools.tick(&mut world, frame()).unwrap();
        pools.tick(&mut world, frame()).unwrap();
        assert_eq!(pools.pending_releases(), 0);
    }

    #[test]
    fn test_release_after_huge_delay_never_fires() {
        let (mut world, mut pools, prefab) = setup();
        let id = pools.init_pool(&mut world, prefab, 1, false).unwrap();
        let handle = pools.acquire(&mut world, id, Placement::default()).unwrap();

        pools.release_after(handle.node(), 1e30).unwrap();
        pools.release_after(handle.node(), f32::MAX).unwrap();
        pools.tick(&mut world, Duration::from_secs(3600)).unwrap();

        assert!(pools.is_in_use(handle.node()).unwrap());
        assert_eq!(pools.pending_releases(), 2);
    }

    #[test]
    fn test_after_delay_trigger_releases() {
        let mut world = World::new();
        let prefab = world.spawn_prefab("Bullet", Transform::default());
        let mut pools = PoolSystem::new();
        let config = PoolConfig::new(1, false).with_trigger(ReleaseTrigger::AfterDelay { delay: 0.25 });
        let id = pools.init_pool_with(&mut world, prefab, config).unwrap();

        let handle = pools.acquire(&mut world, id, Placement::default()).unwrap();
        assert_eq!(pools.pending_releases(), 1);

        pools.tick(&mut world, frame()).unwrap();
        pools.tick(&mut world, frame()).unwrap();
        assert!(pools.is_in_use(handle.node()).unwrap());

        pools.tick(&mut world, frame()).unwrap();
        assert!(!pools.is_in_use(handle.node()).unwrap());
        assert_eq!(pools.pending_releases(), 0);
    }

    #[test]
    fn test_stale_delayed_release_is_noop() {
        let (mut world, mut pools, prefab) = setup();
        let id = pools.init_pool(&mut world, prefab, 1, false).unwrap();

        let first = pools.acquire(&mut world, id, Placement::default()).unwrap();
        pools.release_after(first.node(), 0.5).unwrap();
        pools.release(&mut world, first.node()).unwrap();

        // Same instance, new activation cycle
        let second = pools.acquire(&mut world, id, Placement::default()).unwrap();
        assert_eq!(first.node(), second.node());

        for _ in 0..10 {
            pools.tick(&mut world, frame()).unwrap();
        }
        assert!(pools.is_in_use(second.node()).unwrap());
    }

    #[test]
    fn test_delayed_release_of_destroyed_instance_is_noop() {
        let (mut world, mut pools, prefab) = setup();
        let id = pools.init_pool(&mut world, prefab, 1, false).unwrap();
        let handle = pools.acquire(&mut world, id, Placement::default()).unwrap();

        pools.release_after(handle.node(), 0.1).unwrap();
        pools.teardown(&mut world, id).unwrap();

        pools.tick(&mut world, frame()).unwrap();
        assert_eq!(pools.pending_releases(), 0);
    }

    #[test]
    fn test_cancel_release() {
        let (mut world, mut pools, prefab) = setup();
        let id = pools.init_pool(&mut world, prefab, 1, false).unwrap();
        let handle = pools.acquire(&mut world, id, Placement::default()).unwrap();

        let timer = pools.release_after(handle.node(), 0.1).unwrap();
        assert!(pools.cancel_release(timer));
        pools.tick(&mut world, frame()).unwrap();
        assert!(pools.is_in_use(handle.node()).unwrap());
    }

    #[test]
    fn test_collision_trigger_fires_once_per_cycle() {
        let mut world = World::new();
        let prefab = world.spawn_prefab("Debris", Transform::default());
        let mut pools = PoolSystem::new();
        let config = PoolConfig::new(2, false).with_trigger(ReleaseTrigger::OnCollision { delay: 0.15 });
        let id = pools.init_pool_with(&mut world, prefab, config).unwrap();
        let wall = world.spawn_node("Wall", Transform::default());
        let handle = pools.acquire(&mut world, id, Placement::default()).unwrap();

        let hit = Signal::Collision {
            a: handle.node(),
            b: wall,
            contact_point: Vec3::ZERO,
            normal: Vec3::Y,
            relative_speed: 4.0,
        };
        assert_eq!(pools.handle_signal(&mut world, &hit).unwrap(), 1);
        assert_eq!(pools.handle_signal(&mut world, &hit).unwrap(), 0);
        assert_eq!(pools.pending_releases(), 1);

        pools.tick(&mut world, frame()).unwrap();
        assert!(pools.is_in_use(handle.node()).unwrap());
        pools.tick(&mut world, frame()).unwrap();
        assert!(!pools.is_in_use(handle.node()).unwrap());
    }

    #[test]
    fn test_visibility_signal_releases_on_tick() {
        let mut world = World::new();
        let prefab = world.spawn_prefab("Bullet", Transform::default());
        let mut pools = PoolSystem::new();
        let config = PoolConfig::new(1, false).with_trigger(ReleaseTrigger::WhenNotVisible);
        let id = pools.init_pool_with(&mut world, prefab, config).unwrap();
        let handle = pools.acquire(&mut world, id, Placement::default()).unwrap();
        let bystander = world.spawn_node("Rock", Transform::default());

        pools.push_signal(Signal::BecameInvisible { node: bystander });
        pools.push_signal(Signal::BecameInvisible { node: handle.node() });
        assert!(pools.is_in_use(handle.node()).unwrap());

        pools.tick(&mut world, frame()).unwrap();
        assert!(!pools.is_in_use(handle.node()).unwrap());
        assert_eq!(pools.time().frame(), 1);
    }

    #[test]
    fn test_sleep_signal_without_matching_trigger() {
        let mut world = World::new();
        let prefab = world.spawn_prefab("Crate", Transform::default());
        let mut pools = PoolSystem::new();
        let config = PoolConfig::new(1, false).with_trigger(ReleaseTrigger::WhenNotVisible);
        let id = pools.init_pool_with(&mut world, prefab, config).unwrap();
        let handle = pools.acquire(&mut world, id, Placement::default()).unwrap();

        let fired = pools
            .handle_signal(&mut world, &Signal::BodySleeping { node: handle.node() })
            .unwrap();
        assert_eq!(fired, 0);
        assert!(pools.is_in_use(handle.node()).unwrap());
    }
}
