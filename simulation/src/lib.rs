#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Owning simulation loop that wires the world to every gameplay system.
//!
//! A frame runs one variable-rate [`Simulation::update`] followed by as many
//! fixed-rate [`Simulation::fixed_update`] steps as the accumulated time
//! allows. Systems only read world queries and emit commands; the simulation
//! applies those commands in a fixed order so identical inputs replay
//! identically.

pub mod level;

use std::time::Duration;

use glam::Vec2;
use prophecy_core::{Command, Event};
use prophecy_system_combat::{Combat, Config as CombatConfig};
use prophecy_system_movement::{Config as MovementConfig, ConfigError, Movement};
use prophecy_system_spawning::{Config as SpawningConfig, Spawning};
use prophecy_system_steering::{Config as SteeringConfig, Steering, SteeringMode};
use prophecy_system_targeting::{AimSolution, Config as TargetingConfig, Targeting};
use prophecy_world::{
    self as world,
    query::{self, Outcome},
    World, WorldConfig, WorldError,
};
use thiserror::Error;

pub use level::{Level, LevelError};

const MAX_FIXED_STEPS_PER_FRAME: u32 = 8;

/// Tuning for every system the simulation owns.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Duration of a single fixed-rate step.
    pub fixed_step: Duration,
    /// Unit, projectile and reward tuning.
    pub world: WorldConfig,
    /// Enemy navigation tuning.
    pub movement: MovementConfig,
    /// Auto-aim tuning for the player and ranged enemies.
    pub targeting: TargetingConfig,
    /// Cooldowns and projectile speeds.
    pub combat: CombatConfig,
    /// Spawner cadence.
    pub spawning: SpawningConfig,
    /// Player steering strategy.
    pub steering_mode: SteeringMode,
    /// Player steering tuning.
    pub steering: SteeringConfig,
}

impl SimulationConfig {
    /// Default tuning with every random stream derived from `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        let world = WorldConfig {
            rng_seed: seed,
            ..WorldConfig::default()
        };
        let movement = MovementConfig {
            seed: seed.rotate_left(17) ^ 0x6d6f_7665,
            ..MovementConfig::default()
        };
        Self {
            fixed_step: Duration::from_millis(20),
            world,
            movement,
            targeting: TargetingConfig::default(),
            combat: CombatConfig::default(),
            spawning: SpawningConfig::new(
                Duration::from_secs(1),
                seed.rotate_left(41) ^ 0x7370_6177,
            ),
            steering_mode: SteeringMode::default(),
            steering: SteeringConfig::default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::seeded(0)
    }
}

/// Reasons a simulation could not start a level.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The fixed step duration was zero.
    #[error("fixed step must be longer than zero")]
    ZeroFixedStep,
    /// The world rejected the level or its tuning.
    #[error(transparent)]
    World(#[from] WorldError),
    /// The movement tuning was invalid.
    #[error(transparent)]
    Movement(#[from] ConfigError),
}

/// Single-threaded owner of the world and all gameplay systems.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    level: Level,
    world: World,
    movement: Movement,
    targeting: Targeting,
    combat: Combat,
    spawning: Spawning,
    steering: Steering,
    accumulator: Duration,
    input: Vec2,
    outcome: Outcome,
    commands: Vec<Command>,
    solutions: Vec<AimSolution>,
    tick_events: Vec<Event>,
}

impl Simulation {
    /// Builds the world for `level` and fresh systems from `config`.
    pub fn new(level: Level, config: SimulationConfig) -> Result<Self, SimulationError> {
        if config.fixed_step.is_zero() {
            return Err(SimulationError::ZeroFixedStep);
        }

        let world = build_world(&level, &config)?;
        let movement = Movement::new(config.movement)?;
        tracing::info!(
            spawners = level.spawners().len(),
            mode = ?config.steering_mode,
            "level started"
        );

        Ok(Self {
            world,
            movement,
            targeting: Targeting::new(config.targeting),
            combat: Combat::new(config.combat),
            spawning: Spawning::new(config.spawning),
            steering: Steering::new(config.steering_mode, config.steering),
            accumulator: Duration::ZERO,
            input: Vec2::ZERO,
            outcome: Outcome::InProgress,
            commands: Vec::new(),
            solutions: Vec::new(),
            tick_events: Vec::new(),
            level,
            config,
        })
    }

    /// Discards the current level state and starts over with a new world and
    /// new systems.
    pub fn reset(&mut self) -> Result<(), SimulationError> {
        let fresh = Self::new(self.level.clone(), self.config.clone())?;
        *self = fresh;
        Ok(())
    }

    /// Authoritative world state.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Level the simulation was built from.
    #[must_use]
    pub fn level(&self) -> &Level {
        &self.level
    }

    /// Tuning the simulation was built from.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Movement system, exposed for inspection of agent controllers.
    #[must_use]
    pub fn movement(&self) -> &Movement {
        &self.movement
    }

    /// Outcome observed after the most recent fixed step.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Sets the steering stick input used by subsequent fixed steps.
    pub fn set_input(&mut self, input: Vec2) {
        self.input = input;
    }

    /// Hides the player from enemies or reveals them again.
    pub fn set_player_invisible(&mut self, invisible: bool, out_events: &mut Vec<Event>) {
        world::apply(
            &mut self.world,
            Command::SetPlayerInvisible { invisible },
            out_events,
        );
    }

    /// Runs one rendered frame: a variable-rate update and the fixed steps
    /// that fit in the accumulated time.
    pub fn frame(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.update(dt, out_events);

        let step = self.config.fixed_step;
        self.accumulator = self.accumulator.saturating_add(dt);
        let mut steps = 0;
        while self.accumulator >= step {
            if steps == MAX_FIXED_STEPS_PER_FRAME {
                tracing::debug!(
                    dropped_ms = self.accumulator.as_millis() as u64,
                    "frame exceeded fixed step budget"
                );
                self.accumulator = Duration::ZERO;
                break;
            }
            self.accumulator -= step;
            self.fixed_update(step, out_events);
            steps += 1;
        }
    }

    /// Variable-rate phase: gate checks, re-plan timers, avoidance and
    /// cooldowns.
    pub fn update(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.commands.clear();
        let agents = query::agent_view(&self.world);
        {
            let arena = query::arena(&self.world);
            self.movement.update(dt, &agents, &arena, &mut self.commands);
        }
        self.combat.update(dt, &agents);
        self.flush_commands(out_events);
    }

    /// Fixed-rate phase: steering, waypoint advance, firing, the world tick
    /// and spawning, applied in that order.
    pub fn fixed_update(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.commands.clear();
        let player = query::player(&self.world);
        self.steering
            .fixed_update(dt, self.input, &player, &mut self.commands);
        self.flush_commands(out_events);

        let agents = query::agent_view(&self.world);
        {
            let arena = query::arena(&self.world);
            self.movement
                .fixed_update(dt, &agents, &arena, &mut self.commands);
        }
        self.flush_commands(out_events);

        let agents = query::agent_view(&self.world);
        let player = query::player(&self.world);
        self.targeting.handle(&player, &agents, &mut self.solutions);
        self.combat
            .fixed_update(&player, &agents, &self.solutions, &mut self.commands);
        self.flush_commands(out_events);

        self.tick_events.clear();
        world::apply(&mut self.world, Command::Tick { dt }, &mut self.tick_events);
        self.spawning
            .handle(&self.tick_events, self.level.spawners(), &mut self.commands);
        out_events.append(&mut self.tick_events);
        self.flush_commands(out_events);

        self.observe_outcome();
    }

    fn flush_commands(&mut self, out_events: &mut Vec<Event>) {
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, out_events);
        }
    }

    fn observe_outcome(&mut self) {
        let outcome = query::outcome(&self.world);
        if outcome == self.outcome {
            return;
        }

        let stats = query::stats(&self.world);
        tracing::info!(
            ?outcome,
            kills = stats.kills(),
            coins = stats.coins(),
            level = query::experience(&self.world).level(),
            elapsed_ms = query::elapsed(&self.world).as_millis() as u64,
            "level outcome changed"
        );
        self.outcome = outcome;
    }
}

fn build_world(level: &Level, config: &SimulationConfig) -> Result<World, WorldError> {
    World::builder()
        .grid(level.grid().clone())
        .player_spawn(level.player_spawn())
        .config(config.world.clone())
        .build()
}
