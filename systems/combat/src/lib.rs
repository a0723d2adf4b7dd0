#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns aim solutions and melee contact into attack commands.

use std::{collections::BTreeMap, time::Duration};

use prophecy_core::{AgentId, AgentKind, AgentView, Command, PlayerSnapshot, Shooter};
use prophecy_system_targeting::AimSolution;

/// Configuration for the combat system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Time the player must wait between shots.
    pub player_fire_cooldown: Duration,
    /// Time a ranged enemy must wait between shots.
    pub enemy_fire_cooldown: Duration,
    /// Speed of projectiles fired by the player.
    pub player_projectile_speed: f32,
    /// Speed of projectiles fired by enemies.
    pub enemy_projectile_speed: f32,
    /// Minimum time between two strikes of one melee enemy.
    pub melee_delay: Duration,
    /// Centre distance at which a melee enemy touches the player.
    pub contact_distance: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player_fire_cooldown: Duration::from_millis(100),
            enemy_fire_cooldown: Duration::from_millis(500),
            player_projectile_speed: 15.0,
            enemy_projectile_speed: 10.0,
            melee_delay: Duration::from_millis(500),
            contact_distance: 1.0,
        }
    }
}

/// Gate that blocks firing for a fixed duration after each shot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FireCooldown {
    duration: Duration,
    elapsed: Duration,
    cooling: bool,
}

impl FireCooldown {
    /// Creates a cooldown that starts ready to fire.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self {
            duration,
            elapsed: Duration::ZERO,
            cooling: false,
        }
    }

    /// Reports whether a shot may be fired now.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        !self.cooling
    }

    /// Starts the cooldown after a shot.
    pub fn trigger(&mut self) {
        self.cooling = true;
        self.elapsed = Duration::ZERO;
    }

    /// Advances the cooldown clock.
    pub fn advance(&mut self, dt: Duration) {
        if !self.cooling {
            return;
        }
        self.elapsed = self.elapsed.saturating_add(dt);
        if self.elapsed >= self.duration {
            self.elapsed = Duration::ZERO;
            self.cooling = false;
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct AgentTimers {
    fire: FireCooldown,
    since_strike: Duration,
}

/// Combat system holding per-shooter cooldowns and melee timers.
#[derive(Debug)]
pub struct Combat {
    config: Config,
    player: FireCooldown,
    agents: BTreeMap<AgentId, AgentTimers>,
    scratch: Vec<Command>,
}

impl Combat {
    /// Creates a combat system with every shooter ready.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            player: FireCooldown::new(config.player_fire_cooldown),
            agents: BTreeMap::new(),
            scratch: Vec::new(),
            config,
        }
    }

    /// Player's fire cooldown.
    #[must_use]
    pub fn player_cooldown(&self) -> &FireCooldown {
        &self.player
    }

    /// Variable-rate phase: advances cooldowns and melee timers.
    pub fn update(&mut self, dt: Duration, agents: &AgentView) {
        self.sync_agents(agents);
        self.player.advance(dt);
        for timers in self.agents.values_mut() {
            timers.fire.advance(dt);
            timers.since_strike = timers.since_strike.saturating_add(dt);
        }
    }

    /// Fixed-rate phase: emits fire requests for ready shooters and melee
    /// strikes for enemies touching the player.
    pub fn fixed_update(
        &mut self,
        player: &PlayerSnapshot,
        agents: &AgentView,
        solutions: &[AimSolution],
        out: &mut Vec<Command>,
    ) {
        self.scratch.clear();

        for solution in solutions {
            let (cooldown, speed) = match solution.shooter {
                Shooter::Player => (&mut self.player, self.config.player_projectile_speed),
                Shooter::Agent(agent) => match self.agents.get_mut(&agent) {
                    Some(timers) => (&mut timers.fire, self.config.enemy_projectile_speed),
                    None => continue,
                },
            };
            if !cooldown.is_ready() {
                continue;
            }
            cooldown.trigger();
            self.scratch.push(Command::FireProjectile {
                shooter: solution.shooter,
                direction: solution.direction,
                speed,
            });
        }

        if player.is_alive() {
            for agent in agents.iter().filter(|agent| agent.kind == AgentKind::Melee) {
                if agent.position.distance(player.position) > self.config.contact_distance {
                    continue;
                }
                let Some(timers) = self.agents.get_mut(&agent.id) else {
                    continue;
                };
                if timers.since_strike < self.config.melee_delay {
                    continue;
                }
                timers.since_strike = Duration::ZERO;
                self.scratch.push(Command::MeleeStrike { agent: agent.id });
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }

    fn sync_agents(&mut self, agents: &AgentView) {
        self.agents.retain(|id, _| agents.get(*id).is_some());
        for agent in agents.iter() {
            let _ = self.agents.entry(agent.id).or_insert(AgentTimers {
                fire: FireCooldown::new(self.config.enemy_fire_cooldown),
                since_strike: Duration::ZERO,
            });
        }
    }
}

impl Default for Combat {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
