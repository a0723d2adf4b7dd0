#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for emitting enemy spawn commands.

use std::{f32::consts::TAU, time::Duration};

use glam::Vec2;
use prophecy_core::{AgentKind, Command, Event};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const SPAWN_KINDS: [AgentKind; 2] = [AgentKind::Melee, AgentKind::Ranged];

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    spawn_interval: Duration,
    rng_seed: u64,
    spawn_distance: f32,
    amount_per_spawn: u32,
    active_for: Option<Duration>,
}

impl Config {
    /// Creates a new configuration using the provided spawn cadence and seed.
    ///
    /// Enemies appear 12 units from the spawner, one per interval, for 60
    /// seconds.
    #[must_use]
    pub const fn new(spawn_interval: Duration, rng_seed: u64) -> Self {
        Self {
            spawn_interval,
            rng_seed,
            spawn_distance: 12.0,
            amount_per_spawn: 1,
            active_for: Some(Duration::from_secs(60)),
        }
    }

    /// Sets the time between two spawn attempts, keeping the seed.
    #[must_use]
    pub fn with_spawn_interval(mut self, spawn_interval: Duration) -> Self {
        self.spawn_interval = spawn_interval;
        self
    }

    /// Sets how far from the spawner enemies appear.
    #[must_use]
    pub fn with_spawn_distance(mut self, spawn_distance: f32) -> Self {
        self.spawn_distance = spawn_distance;
        self
    }

    /// Sets how many enemies appear per interval.
    #[must_use]
    pub fn with_amount_per_spawn(mut self, amount_per_spawn: u32) -> Self {
        self.amount_per_spawn = amount_per_spawn;
        self
    }

    /// Sets how long spawners stay active; `None` keeps them active forever.
    #[must_use]
    pub fn with_active_for(mut self, active_for: Option<Duration>) -> Self {
        self.active_for = active_for;
        self
    }
}

/// Pure system that deterministically emits spawn commands as time advances.
#[derive(Debug)]
pub struct Spawning {
    config: Config,
    accumulator: Duration,
    elapsed: Duration,
    rng: ChaCha8Rng,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            accumulator: Duration::ZERO,
            elapsed: Duration::ZERO,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
        }
    }

    /// Reports whether spawners are still producing enemies.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.config
            .active_for
            .map_or(true, |active_for| self.elapsed < active_for)
    }

    /// Consumes time events and emits spawn commands around the spawners.
    pub fn handle(&mut self, events: &[Event], spawners: &[Vec2], out: &mut Vec<Command>) {
        if self.config.spawn_interval.is_zero() || spawners.is_empty() {
            return;
        }

        let mut accumulated = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                accumulated = accumulated.saturating_add(*dt);
            }
        }

        if accumulated.is_zero() {
            return;
        }

        let usable = match self.config.active_for {
            Some(active_for) => accumulated.min(active_for.saturating_sub(self.elapsed)),
            None => accumulated,
        };
        self.elapsed = self.elapsed.saturating_add(accumulated);
        self.accumulator = self.accumulator.saturating_add(usable);
        let spawn_attempts = self.resolve_spawn_attempts();

        for _ in 0..spawn_attempts {
            let spawner = self.select_spawner(spawners);
            let kind = SPAWN_KINDS[self.rng.gen_range(0..SPAWN_KINDS.len())];
            for _ in 0..self.config.amount_per_spawn {
                let direction = Vec2::from_angle(self.rng.gen_range(0.0..TAU));
                let position = spawner + direction * self.config.spawn_distance;
                tracing::trace!(x = position.x, y = position.y, ?kind, "spawn requested");
                out.push(Command::SpawnAgent { position, kind });
            }
        }
    }

    fn resolve_spawn_attempts(&mut self) -> usize {
        if self.config.spawn_interval.is_zero() {
            return 0;
        }

        let mut attempts = 0;
        while self.accumulator >= self.config.spawn_interval {
            self.accumulator -= self.config.spawn_interval;
            attempts += 1;
        }
        attempts
    }

    fn select_spawner(&mut self, spawners: &[Vec2]) -> Vec2 {
        debug_assert!(!spawners.is_empty(), "select_spawner requires spawners");
        spawners[self.rng.gen_range(0..spawners.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_spawn_attempts_without_interval() {
        let mut spawning = Spawning::new(Config::new(Duration::ZERO, 1));
        spawning.accumulator = Duration::from_secs(10);
        assert_eq!(spawning.resolve_spawn_attempts(), 0);
    }

    #[test]
    fn active_window_limits_usable_time() {
        let config =
            Config::new(Duration::from_secs(1), 5).with_active_for(Some(Duration::from_secs(3)));
        let mut spawning = Spawning::new(config);
        let mut out = Vec::new();

        spawning.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_millis(2_500),
            }],
            &[Vec2::ZERO],
            &mut out,
        );
        assert_eq!(out.len(), 2);
        assert!(spawning.is_active());

        spawning.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_secs(10),
            }],
            &[Vec2::ZERO],
            &mut out,
        );
        assert_eq!(out.len(), 3);
        assert!(!spawning.is_active());
    }
}
