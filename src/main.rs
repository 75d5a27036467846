//! Headless demo: a turret fires pooled bullets at a wall, impacts leave
//! pooled sparks, and the arena is swapped for the next scene halfway
//! through.
//!
//! Run with `RUST_LOG=debug` to watch pools grow, release and regather.

use std::time::Duration;

use pooling::prelude::*;

const MANIFEST: &str = r#"(
    pools: {
        "Bullet": (
            initial_size: 16,
            triggers: [AfterDelay(delay: 3.0), OnCollision(delay: 0.0)],
        ),
        "Spark": (
            initial_size: 8,
            persistent: true,
            triggers: [AfterDelay(delay: 0.5)],
        ),
    },
)"#;

const FRAMES: u32 = 300;
const TRANSITION_FRAME: u32 = 200;
const WALL_Z: f32 = -30.0;
const BULLET_SPEED: f32 = 25.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    log::info!("Starting pooling demo");

    let manifest = PoolManifest::from_ron_str(MANIFEST)?;
    let mut world = World::new();
    let mut pools = PoolSystem::with_scenes(SceneCatalog::new(["Arena", "Boss"]));

    let bullet = world.spawn_prefab("Bullet", Transform::default());
    world.inner.insert_one(bullet, Tag::new("Projectile"))?;
    world.inner.insert_one(
        bullet,
        Velocity {
            linear: Vec3::new(0.0, 0.0, -BULLET_SPEED),
            angular: Vec3::ZERO,
        },
    )?;
    let spark = world.spawn_prefab("Spark", Transform::default());

    pools.load_scene(&mut world, &SceneRequest::named("Arena"))?;
    let wall = world.spawn_node("Wall", Transform::from_position(Vec3::new(0.0, 0.0, WALL_Z)));

    let mut turret = Spawner::new(
        &mut world,
        &mut pools,
        bullet,
        SpawnerConfig {
            pool: manifest.config_for("Bullet"),
            min_rate: 15.0,
            max_rate: 25.0,
            count: 40,
            locations: vec![SpawnLocation::new(Vec3::new(0.0, 1.0, -2.0)).with_radius(0.5)],
            min_distance_from_player: 1.5,
            ..Default::default()
        },
        Vec3::ZERO,
        Quat::IDENTITY,
    )?
    .with_seed(2019);

    let impacts = CollisionSpawner::new(
        &mut world,
        &mut pools,
        wall,
        spark,
        CollisionSpawnConfig {
            pool: manifest.config_for("Spark"),
            filter_tag: Some("Projectile".into()),
            speed_threshold: 5.0,
            sticky: true,
        },
    )?;

    let dt = Duration::from_secs_f32(1.0 / 30.0);
    let player = Vec3::ZERO;
    let mut in_flight: Vec<InstanceHandle<hecs::Entity>> = Vec::new();

    for frame in 0..FRAMES {
        if frame < TRANSITION_FRAME {
            in_flight.extend(turret.update(&mut world, &mut pools, dt, Some(player))?);

            // Move bullets and report the ones that reached the wall
            in_flight.retain(|handle| {
                pools
                    .pool(handle.prototype())
                    .is_ok_and(|pool| pool.is_current(handle.slot(), handle.generation()))
            });
            for handle in &in_flight {
                let node = handle.node();
                let velocity = world.get::<Velocity>(node).map(|v| v.linear)?;
                let mut transform = world.get_mut::<Transform>(node)?;
                transform.translate(velocity * dt.as_secs_f32());
                let position = transform.position;
                drop(transform);

                if position.z <= WALL_Z {
                    let hit = Signal::Collision {
                        a: node,
                        b: wall,
                        contact_point: Vec3::new(position.x, position.y, WALL_Z),
                        normal: Vec3::NEG_Z,
                        relative_speed: velocity.length(),
                    };
                    impacts.on_signal(&mut world, &mut pools, &hit)?;
                    pools.push_signal(hit);
                }
            }
        }

        if frame == TRANSITION_FRAME {
            log_stats(&pools, bullet, spark);
            in_flight.clear();
            if let Some(change) = pools.load_scene(&mut world, &SceneRequest::Next)? {
                log::info!("Now playing '{}'", change.name);
            }
        }

        pools.tick(&mut world, dt)?;
    }

    log_stats(&pools, bullet, spark);
    log::info!(
        "Finished after {} frames ({:.1}s simulated, {} spawns)",
        pools.time().frame(),
        pools.time().elapsed_seconds(),
        turret.spawned()
    );
    Ok(())
}

fn log_stats(pools: &PoolSystem<World>, bullet: hecs::Entity, spark: hecs::Entity) {
    for (name, prototype) in [("Bullet", bullet), ("Spark", spark)] {
        match pools.lookup(prototype).map(|id| pools.stats(id)) {
            Some(Ok(stats)) => log::info!(
                "{}: {} instances, {} in use, {} free, high water {}",
                name,
                stats.total,
                stats.in_use,
                stats.free,
                stats.high_water
            ),
            _ => log::info!("{}: no pool", name),
        }
    }
}
