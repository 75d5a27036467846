//! Spawn locations

use glam::{Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

fn default_radius() -> f32 {
    1.0
}

/// A sphere (or disc, in planar mode) that spawned instances appear in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnLocation {
    /// Center in world space
    pub position: Vec3,
    /// Radius of the spawn volume
    #[serde(default = "default_radius")]
    pub radius: f32,
}

impl Default for SpawnLocation {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl SpawnLocation {
    /// Location at `position` with a radius of 1
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            radius: default_radius(),
        }
    }

    /// Set the radius
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius.max(0.0);
        self
    }

    /// Pick a uniformly random point inside the location.
    ///
    /// In planar mode the point lies in the XY plane through the center.
    pub fn sample<R: Rng>(&self, rng: &mut R, planar: bool) -> Vec3 {
        let offset = if planar {
            random_in_unit_disc(rng).extend(0.0)
        } else {
            random_in_unit_sphere(rng)
        };
        self.position + offset * self.radius
    }
}

fn random_in_unit_sphere<R: Rng>(rng: &mut R) -> Vec3 {
    loop {
        let p = Vec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        if p.length_squared() <= 1.0 {
            return p;
        }
    }
}

fn random_in_unit_disc<R: Rng>(rng: &mut R) -> Vec2 {
    loop {
        let p = Vec2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0));
        if p.length_squared() <= 1.0 {
            return p;
        }
    }
}
