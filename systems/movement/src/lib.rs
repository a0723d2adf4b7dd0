#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Movement system that chases the player along grid paths or wanders idly.
//!
//! Each enemy agent owns a [`PathFollower`] and an [`IdleWander`]. Every
//! variable-rate update the [`RangeGate`] decides which of the two drives the
//! agent; the re-plan timers advance in the same phase. Fixed-rate updates
//! translate the active behaviour into [`Command::MoveAgent`] requests.

pub mod avoidance;
pub mod follower;
pub mod gate;
pub mod target;
pub mod wander;

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use prophecy_core::{AgentId, AgentView, Command};
use prophecy_system_pathfinding::{PathFinder, PathPlanner};
use prophecy_world::query::ArenaView;
use thiserror::Error;

pub use avoidance::AvoidanceConfig;
pub use follower::{FollowMode, FollowerConfig, PathFollower, Step};
pub use gate::RangeGate;
pub use target::choose_destination;
pub use wander::{IdleWander, WanderConfig};

/// Configuration for the movement system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Path following tuning shared by every agent.
    pub follower: FollowerConfig,
    /// Idle wander tuning shared by every agent.
    pub wander: WanderConfig,
    /// Separation between nearby chasing agents; disabled when `None`.
    pub avoidance: Option<AvoidanceConfig>,
    /// Seed mixed with each agent's identifier for its wander stream.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            follower: FollowerConfig::default(),
            wander: WanderConfig::default(),
            avoidance: None,
            seed: 0x6d6f_7665,
        }
    }
}

/// Rejected movement tuning.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A speed or distance was zero, negative or not finite.
    #[error("{name} must be a positive finite number, got {value}")]
    NotPositive {
        /// Name of the offending field.
        name: &'static str,
        /// Value that was supplied.
        value: f32,
    },
    /// A range was negative or not finite.
    #[error("{name} must be a non-negative finite number, got {value}")]
    Negative {
        /// Name of the offending field.
        name: &'static str,
        /// Value that was supplied.
        value: f32,
    },
    /// An interval was zero.
    #[error("{name} must be longer than zero")]
    ZeroInterval {
        /// Name of the offending field.
        name: &'static str,
    },
}

impl Config {
    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("follower.move_speed", self.follower.move_speed)?;
        positive("follower.arrival_threshold", self.follower.arrival_threshold)?;
        non_zero("follower.replan_interval", self.follower.replan_interval)?;
        non_negative("wander.range", self.wander.range)?;
        positive("wander.speed", self.wander.speed)?;
        positive("wander.arrival_threshold", self.wander.arrival_threshold)?;
        non_zero("wander.interval", self.wander.interval)?;
        if let Some(avoidance) = &self.avoidance {
            positive("avoidance.min_distance", avoidance.min_distance)?;
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

fn non_zero(name: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        Err(ConfigError::ZeroInterval { name })
    } else {
        Ok(())
    }
}

/// Pure system that owns per-agent controllers and emits movement commands.
#[derive(Debug)]
pub struct Movement<P = PathFinder> {
    config: Config,
    planner: P,
    controllers: BTreeMap<AgentId, Controller>,
    avoidance_scratch: Vec<(AgentId, Vec2)>,
    obstacle_scratch: Vec<(AgentId, Vec2)>,
    mover_scratch: Vec<(AgentId, Vec2)>,
}

#[derive(Clone, Debug)]
struct Controller {
    follower: PathFollower,
    wander: IdleWander,
    chasing: Option<bool>,
}

impl Movement {
    /// Creates the movement system with the default path finder.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        Self::with_planner(config, PathFinder::new())
    }
}

impl<P: PathPlanner> Movement<P> {
    /// Creates the movement system around a custom path planner.
    pub fn with_planner(config: Config, planner: P) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            planner,
            controllers: BTreeMap::new(),
            avoidance_scratch: Vec::new(),
            obstacle_scratch: Vec::new(),
            mover_scratch: Vec::new(),
        })
    }

    /// Path planner used for every agent.
    #[must_use]
    pub fn planner(&self) -> &P {
        &self.planner
    }

    /// Path follower owned by `agent`, if the agent has been seen.
    #[must_use]
    pub fn follower(&self, agent: AgentId) -> Option<&PathFollower> {
        self.controllers
            .get(&agent)
            .map(|controller| &controller.follower)
    }

    /// Reports whether `agent` chased the player during the last update.
    #[must_use]
    pub fn is_chasing(&self, agent: AgentId) -> bool {
        self.controllers
            .get(&agent)
            .and_then(|controller| controller.chasing)
            .unwrap_or(false)
    }

    /// Variable-rate phase: gate evaluation, re-plan timers and avoidance.
    pub fn update(
        &mut self,
        dt: Duration,
        agents: &AgentView,
        arena: &ArenaView<'_>,
        out: &mut Vec<Command>,
    ) {
        self.sync_controllers(agents);

        let gate = RangeGate::new(arena.room_radius);
        let destination =
            choose_destination(arena.primary_anchor, arena.fallback_anchor, arena.grid);

        for agent in agents.iter() {
            let Some(controller) = self.controllers.get_mut(&agent.id) else {
                continue;
            };

            let chasing = gate.is_active(agent.position, arena.target, arena.target_invisible);
            if controller.chasing != Some(chasing) {
                tracing::debug!(agent = agent.id.get(), chasing, "agent gate changed");
                controller.chasing = Some(chasing);
                if chasing {
                    let _ = controller.follower.activate(
                        &self.planner,
                        arena.grid,
                        agent.position,
                        destination,
                    );
                } else {
                    controller.follower.deactivate();
                }
            }

            if chasing {
                let _ = controller.follower.update(
                    dt,
                    &self.planner,
                    arena.grid,
                    agent.position,
                    destination,
                );
            }
        }

        if let Some(avoidance) = self.config.avoidance {
            self.emit_separation(&avoidance, dt, agents, out);
        }
    }

    /// Fixed-rate phase: waypoint advance for chasers, wander for idlers.
    pub fn fixed_update(
        &mut self,
        dt: Duration,
        agents: &AgentView,
        arena: &ArenaView<'_>,
        out: &mut Vec<Command>,
    ) {
        for agent in agents.iter() {
            let Some(controller) = self.controllers.get_mut(&agent.id) else {
                continue;
            };

            let step = if controller.chasing == Some(true) {
                controller
                    .follower
                    .fixed_update(dt, agent.position, arena.grid)
            } else {
                controller
                    .wander
                    .step(dt, agent.position, agent.spawn_point, |point| {
                        arena.grid.clamp_position(point)
                    })
            };

            if let Some(step) = step {
                out.push(Command::MoveAgent {
                    agent: agent.id,
                    delta: step.delta,
                    facing: step.facing,
                });
            }
        }
    }

    fn sync_controllers(&mut self, agents: &AgentView) {
        self.controllers.retain(|id, _| agents.get(*id).is_some());

        for agent in agents.iter() {
            if self.controllers.contains_key(&agent.id) {
                continue;
            }
            let seed = self.config.seed
                ^ u64::from(agent.id.get()).wrapping_mul(0x9e37_79b9_7f4a_7c15);
            let _ = self.controllers.insert(
                agent.id,
                Controller {
                    follower: PathFollower::new(self.config.follower),
                    wander: IdleWander::new(self.config.wander, seed),
                    chasing: None,
                },
            );
        }
    }

    fn emit_separation(
        &mut self,
        config: &AvoidanceConfig,
        dt: Duration,
        agents: &AgentView,
        out: &mut Vec<Command>,
    ) {
        self.obstacle_scratch.clear();
        self.obstacle_scratch
            .extend(agents.iter().map(|agent| (agent.id, agent.position)));
        let controllers = &self.controllers;
        self.mover_scratch.clear();
        self.mover_scratch.extend(self.obstacle_scratch.iter().copied().filter(|(id, _)| {
            controllers
                .get(id)
                .and_then(|controller| controller.chasing)
                .unwrap_or(false)
        }));

        self.avoidance_scratch.clear();
        avoidance::separation(
            config,
            &self.mover_scratch,
            &self.obstacle_scratch,
            self.config.follower.move_speed * dt.as_secs_f32(),
            &mut self.avoidance_scratch,
        );

        for &(agent, delta) in &self.avoidance_scratch {
            out.push(Command::MoveAgent {
                agent,
                delta,
                facing: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn zero_speed_is_rejected() {
        let mut config = Config::default();
        config.follower.move_speed = 0.0;
        assert_eq!(
            Movement::new(config).unwrap_err(),
            ConfigError::NotPositive {
                name: "follower.move_speed",
                value: 0.0,
            }
        );
    }

    #[test]
    fn zero_replan_interval_is_rejected() {
        let mut config = Config::default();
        config.follower.replan_interval = Duration::ZERO;
        assert!(matches!(
            Movement::new(config),
            Err(ConfigError::ZeroInterval { .. })
        ));
    }

    #[test]
    fn negative_wander_range_is_rejected() {
        let mut config = Config::default();
        config.wander.range = -1.0;
        assert!(matches!(
            Movement::new(config),
            Err(ConfigError::Negative { .. })
        ));
    }
}
