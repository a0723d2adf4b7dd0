//! Cheap random walk around the spawn point for agents out of range.

use std::time::Duration;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::follower::Step;

/// Tuning for [`IdleWander`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WanderConfig {
    /// Maximum offset from the spawn point on each axis.
    pub range: f32,
    /// Travel speed in world units per second.
    pub speed: f32,
    /// Time after which a new point is picked even if the old one was not reached.
    pub interval: Duration,
    /// Distance at which the current point counts as reached.
    pub arrival_threshold: f32,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            range: 3.0,
            speed: 2.0,
            interval: Duration::from_secs(2),
            arrival_threshold: 0.1,
        }
    }
}

/// Per-agent wander state with its own random stream.
#[derive(Clone, Debug)]
pub struct IdleWander {
    config: WanderConfig,
    rng: ChaCha8Rng,
    point: Option<Vec2>,
    elapsed: Duration,
}

impl IdleWander {
    /// Creates a wander state seeded with `seed`.
    #[must_use]
    pub fn new(config: WanderConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            point: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Point currently wandered toward.
    #[must_use]
    pub fn point(&self) -> Option<Vec2> {
        self.point
    }

    /// Steps toward the wander point, re-picking it on arrival or timeout.
    ///
    /// `bounds` clamps freshly picked points into the arena.
    pub fn step(
        &mut self,
        dt: Duration,
        position: Vec2,
        spawn_point: Vec2,
        bounds: impl Fn(Vec2) -> Vec2,
    ) -> Option<Step> {
        self.elapsed = self.elapsed.saturating_add(dt);

        let needs_point = match self.point {
            None => true,
            Some(point) => {
                position.distance(point) < self.config.arrival_threshold
                    || self.elapsed >= self.config.interval
            }
        };
        if needs_point {
            let offset = Vec2::new(self.sample_axis(), self.sample_axis());
            self.point = Some(bounds(spawn_point + offset));
            self.elapsed = Duration::ZERO;
        }

        let point = self.point?;
        let step = Step::towards(position, point, self.config.speed * dt.as_secs_f32());
        (step.delta != Vec2::ZERO).then_some(step)
    }

    fn sample_axis(&mut self) -> f32 {
        if self.config.range > 0.0 {
            self.rng.gen_range(-self.config.range..=self.config.range)
        } else {
            0.0
        }
    }
}
