//! Timed spawner
//!
//! Pulls instances out of a pool at a randomized rate and scatters them over
//! a set of spawn locations, optionally keeping clear of the player.
//!
//! # Example
//!
//! ```ignore
//! let config = SpawnerConfig {
//!     count: 10,
//!     min_rate: 2.0,
//!     max_rate: 4.0,
//!     locations: vec![SpawnLocation::new(Vec3::new(0.0, 0.0, -20.0)).with_radius(5.0)],
//!     ..Default::default()
//! };
//! let mut spawner = Spawner::new(&mut world, &mut pools, asteroid, config, Vec3::ZERO, Quat::IDENTITY)?;
//!
//! // Every frame
//! spawner.update(&mut world, &mut pools, dt, Some(player_position))?;
//! ```

use std::f32::consts::{PI, TAU};
use std::time::Duration;

use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::location::SpawnLocation;
use crate::pool::{
    InstanceHandle, Placement, PoolConfig, PoolError, PoolSystem, PrototypeId, SceneGraph,
};

/// Slowest and fastest allowed spawn rates, in spawns per second
pub const RATE_LIMITS: (f32, f32) = (0.001, 100.0);

/// Spawner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Pool backing the spawner
    pub pool: PoolConfig,
    /// Lower bound of the spawn rate (spawns per second)
    pub min_rate: f32,
    /// Upper bound of the spawn rate (spawns per second)
    pub max_rate: f32,
    /// Keep spawning forever, ignoring `count`
    pub infinite: bool,
    /// Number of instances to spawn
    pub count: u32,
    /// Spawn in the XY plane
    pub planar: bool,
    /// Candidate locations; empty means the spawner's own position
    pub locations: Vec<SpawnLocation>,
    /// Spawns closer than this to the player are pushed out
    pub min_distance_from_player: f32,
    /// Random rotation per spawn instead of the spawner's rotation
    pub random_orientations: bool,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            min_rate: 1.0,
            max_rate: 1.0,
            infinite: false,
            count: 5,
            planar: false,
            locations: Vec::new(),
            min_distance_from_player: 0.0,
            random_orientations: false,
        }
    }
}

impl SpawnerConfig {
    /// Rate bounds clamped to [`RATE_LIMITS`], lowest first.
    ///
    /// Non-finite rates count as the slowest allowed rate.
    pub fn rate_range(&self) -> (f32, f32) {
        let (lo, hi) = RATE_LIMITS;
        let limit = |rate: f32| if rate.is_finite() { rate.clamp(lo, hi) } else { lo };
        let (a, b) = (limit(self.min_rate), limit(self.max_rate));
        (a.min(b), a.max(b))
    }
}

/// Spawns pooled instances over time.
pub struct Spawner<N> {
    config: SpawnerConfig,
    pool: PrototypeId,
    position: Vec3,
    rotation: Quat,
    locations: Vec<SpawnLocation>,
    remaining: u32,
    spawned: u64,
    /// Seconds until the next spawn
    cooldown: f32,
    rng: StdRng,
    _node: std::marker::PhantomData<N>,
}

impl<N> Spawner<N>
where
    N: Copy + Eq + std::hash::Hash + std::fmt::Debug,
{
    /// Create a spawner at `position`, making sure `prototype` has a pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created
    pub fn new<G>(
        graph: &mut G,
        pools: &mut PoolSystem<G>,
        prototype: N,
        config: SpawnerConfig,
        position: Vec3,
        rotation: Quat,
    ) -> Result<Self, PoolError>
    where
        G: SceneGraph<Node = N>,
    {
        let pool = pools.init_pool_with(graph, prototype, config.pool.clone())?;

        let locations = if config.locations.is_empty() {
            vec![SpawnLocation::new(position)]
        } else {
            config.locations.clone()
        };

        Ok(Self {
            remaining: config.count,
            config,
            pool,
            position,
            rotation,
            locations,
            spawned: 0,
            cooldown: 0.0,
            rng: StdRng::from_entropy(),
            _node: std::marker::PhantomData,
        })
    }

    /// Reseed the random source, for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Advance the spawner by one frame.
    ///
    /// The first spawn happens on the first update; after each spawn the
    /// spawner waits `1 / rate` seconds with the rate drawn from the
    /// configured range. Returns the instances spawned this frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool rejects an acquire
    pub fn update<G>(
        &mut self,
        graph: &mut G,
        pools: &mut PoolSystem<G>,
        delta: Duration,
        player: Option<Vec3>,
    ) -> Result<Vec<InstanceHandle<N>>, PoolError>
    where
        G: SceneGraph<Node = N>,
    {
        let mut spawned = Vec::new();
        if self.is_finished() {
            return Ok(spawned);
        }

        self.cooldown -= delta.as_secs_f32();
        while self.cooldown <= 0.0 && !self.is_finished() {
            spawned.push(self.spawn(graph, pools, player)?);
            self.cooldown += self.next_interval();
        }

        if self.is_finished() {
            log::info!("Spawner for {} finished after {} spawns", self.pool, self.spawned);
        }
        Ok(spawned)
    }

    fn spawn<G>(
        &mut self,
        graph: &mut G,
        pools: &mut PoolSystem<G>,
        player: Option<Vec3>,
    ) -> Result<InstanceHandle<N>, PoolError>
    where
        G: SceneGraph<Node = N>,
    {
        let position = self.pick_position(player);
        let rotation = if self.config.random_orientations {
            self.random_rotation()
        } else {
            self.rotation
        };

        let handle = pools.acquire(graph, self.pool, Placement::new(position, rotation))?;
        self.spawned += 1;
        if !self.config.infinite {
            self.remaining = self.remaining.saturating_sub(1);
        }
        log::trace!("Spawned {:?} at {}", handle.node(), position);
        Ok(handle)
    }

    fn pick_position(&mut self, player: Option<Vec3>) -> Vec3 {
        let index = self.rng.gen_range(0..self.locations.len());
        let position = self.locations[index].sample(&mut self.rng, self.config.planar);

        let min_distance = self.config.min_distance_from_player;
        match player {
            Some(player) if min_distance > 0.0 && position.distance(player) < min_distance => {
                let away = (position - player).try_normalize().unwrap_or(Vec3::X);
                player + away * min_distance
            }
            _ => position,
        }
    }

    fn random_rotation(&mut self) -> Quat {
        if self.config.planar {
            return Quat::from_rotation_z(self.rng.gen_range(-PI..=PI));
        }

        // Uniform over SO(3)
        let u1: f32 = self.rng.gen_range(0.0..1.0);
        let u2: f32 = self.rng.gen_range(0.0..1.0);
        let u3: f32 = self.rng.gen_range(0.0..1.0);
        let (a, b) = ((1.0 - u1).sqrt(), u1.sqrt());
        Quat::from_xyzw(
            a * (TAU * u2).sin(),
            a * (TAU * u2).cos(),
            b * (TAU * u3).sin(),
            b * (TAU * u3).cos(),
        )
        .normalize()
    }

    fn next_interval(&mut self) -> f32 {
        let (lo, hi) = self.config.rate_range();
        1.0 / self.rng.gen_range(lo..=hi)
    }

    /// Whether every configured spawn has happened
    pub fn is_finished(&self) -> bool {
        !self.config.infinite && self.remaining == 0
    }

    /// Spawns left (always `None` for infinite spawners)
    pub fn remaining(&self) -> Option<u32> {
        (!self.config.infinite).then_some(self.remaining)
    }

    /// Total spawns so far
    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Pool the spawner draws from
    pub fn pool(&self) -> PrototypeId {
        self.pool
    }

    /// Locations the spawner picks from
    pub fn locations(&self) -> &[SpawnLocation] {
        &self.locations
    }

    /// Move the spawner.
    ///
    /// Without configured locations the spawner spawns around itself, so
    /// its default location moves along.
    pub fn set_transform(&mut self, position: Vec3, rotation: Quat) {
        self.position = position;
        self.rotation = rotation;
        if self.config.locations.is_empty() {
            for location in &mut self.locations {
                location.position = position;
            }
        }
    }

    /// Spawner position
    pub fn position(&self) -> Vec3 {
        self.position
    }
}
