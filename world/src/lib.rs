#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for the Prophecy arena.
//!
//! The [`World`] is the simulation context for a single level: it owns the
//! walkability grid, the player, the enemy agents, the projectile pool, the
//! loot lying on the floor and the run statistics. Level reset means building
//! a new world and discarding the old one.

mod agents;
/// Immutable walkability grid and node lookup.
pub mod navigation;
/// Slot-based object pool used for projectiles.
pub mod pool;
/// Loot tables and experience levels awarded for kills.
pub mod rewards;
mod stats;

use std::{collections::BTreeMap, f32::consts::FRAC_PI_2, time::Duration};

use glam::Vec2;
use prophecy_core::{
    AgentId, AgentKind, Command, Event, Faction, ItemKind, LootItem, PickupId, ProjectileId,
    Shooter, Victim, Vitals, WELCOME_BANNER,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use agents::AgentRegistry;
pub use navigation::{GridError, Node, NodeKind, WalkabilityGrid};
pub use pool::ObjectPool;
pub use rewards::{Experience, LootCategory, LootTable, RewardError};
pub use stats::RunStats;

/// Tuning values that govern units and projectiles inside the world.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldConfig {
    /// Player health at level start.
    pub player_max_health: u32,
    /// Player shield at level start.
    pub player_max_shield: u32,
    /// Enemy health at spawn.
    pub agent_max_health: u32,
    /// Collision radius of the player.
    pub player_radius: f32,
    /// Collision radius of every agent.
    pub agent_radius: f32,
    /// Collision radius of every projectile.
    pub projectile_radius: f32,
    /// Damage dealt by a single projectile.
    pub projectile_damage: u32,
    /// Time a projectile flies before returning to the pool.
    pub projectile_lifetime: Duration,
    /// Number of projectiles pre-allocated at level start.
    pub projectile_pool_size: usize,
    /// Damage dealt by a single melee strike.
    pub melee_damage: u32,
    /// Horizontal distance from the player to each target anchor.
    pub anchor_offset: f32,
    /// Radius within which agents chase the player.
    pub room_radius: f32,
    /// Inclusive lower bound of coins dropped per kill.
    pub coin_drop_min: u32,
    /// Exclusive upper bound of coins dropped per kill.
    pub coin_drop_max: u32,
    /// Inclusive lower bound of experience awarded per kill.
    pub xp_drop_min: u32,
    /// Inclusive upper bound of experience awarded per kill.
    pub xp_drop_max: u32,
    /// Total experience needed for each successive level.
    pub level_thresholds: Vec<u32>,
    /// Tables rolled for items when an agent dies.
    pub loot: LootTable,
    /// Collision radius of a dropped item.
    pub pickup_radius: f32,
    /// Distance within which dropped items drift toward the player.
    pub attraction_radius: f32,
    /// Drift speed in world units per second.
    pub attraction_speed: f32,
    /// Time a dropped item rests before it starts drifting.
    pub attraction_delay: Duration,
    /// Seed for coin, experience and loot rolls.
    pub rng_seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            player_max_health: 100,
            player_max_shield: 50,
            agent_max_health: 5,
            player_radius: 0.5,
            agent_radius: 0.5,
            projectile_radius: 0.1,
            projectile_damage: 1,
            projectile_lifetime: Duration::from_secs(3),
            projectile_pool_size: 50,
            melee_damage: 1,
            anchor_offset: 0.5,
            room_radius: 9.0,
            coin_drop_min: 0,
            coin_drop_max: 5,
            xp_drop_min: 1,
            xp_drop_max: 100,
            level_thresholds: vec![100, 300, 600, 1_000, 1_500, 2_100],
            loot: LootTable::default(),
            pickup_radius: 0.25,
            attraction_radius: 5.0,
            attraction_speed: 5.0,
            attraction_delay: Duration::from_millis(500),
            rng_seed: 0x5eed_0f_70_7e_c1_a5,
        }
    }
}

/// Reasons a world could not be assembled.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum WorldError {
    /// No walkability grid was supplied by the level generator.
    #[error("world requires a walkability grid; the level generator supplied none")]
    MissingGrid,
    /// No player spawn position was supplied.
    #[error("world requires a player spawn position")]
    MissingPlayerSpawn,
    /// The player spawn position lies outside the grid or on a blocked node.
    #[error("player spawn {0} is outside the arena or on a blocked node")]
    PlayerSpawnBlocked(Vec2),
    /// The room radius is negative or not finite.
    #[error("room radius must be a non-negative finite number, got {0}")]
    InvalidRoomRadius(f32),
    /// The loot table or level thresholds cannot be used.
    #[error(transparent)]
    InvalidRewards(#[from] RewardError),
}

/// Collects the collaborators a world needs before it can run.
#[derive(Debug, Default)]
pub struct WorldBuilder {
    grid: Option<WalkabilityGrid>,
    player_spawn: Option<Vec2>,
    config: WorldConfig,
}

impl WorldBuilder {
    /// Supplies the walkability grid produced by the level generator.
    #[must_use]
    pub fn grid(mut self, grid: WalkabilityGrid) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Supplies the player's starting position.
    #[must_use]
    pub fn player_spawn(mut self, position: Vec2) -> Self {
        self.player_spawn = Some(position);
        self
    }

    /// Replaces the default tuning.
    #[must_use]
    pub fn config(mut self, config: WorldConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the collaborators and assembles the world.
    pub fn build(self) -> Result<World, WorldError> {
        let grid = self.grid.ok_or(WorldError::MissingGrid)?;
        let spawn = self.player_spawn.ok_or(WorldError::MissingPlayerSpawn)?;
        if !grid.contains(spawn) || !grid.node_at(spawn).walkable() {
            return Err(WorldError::PlayerSpawnBlocked(spawn));
        }
        let config = self.config;
        if !config.room_radius.is_finite() || config.room_radius < 0.0 {
            return Err(WorldError::InvalidRoomRadius(config.room_radius));
        }
        config.loot.validate()?;
        let experience = Experience::new(config.level_thresholds.clone())?;

        let mut projectiles = ObjectPool::new();
        projectiles.fill(config.projectile_pool_size, Projectile::pooled);

        tracing::info!(
            columns = grid.columns(),
            rows = grid.rows(),
            walkable = grid.walkable_count(),
            "world assembled"
        );

        Ok(World {
            banner: WELCOME_BANNER,
            player: Player {
                position: spawn,
                velocity: Vec2::ZERO,
                heading: FRAC_PI_2,
                vitals: Vitals::full(config.player_max_health, config.player_max_shield),
                invisible: false,
            },
            agents: AgentRegistry::new(),
            projectiles,
            stats: RunStats::default(),
            experience,
            pickups: BTreeMap::new(),
            next_pickup: 0,
            inventory: Vec::new(),
            expired: Vec::new(),
            in_flight: Vec::new(),
            collected: Vec::new(),
            drops: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            tick_index: 0,
            elapsed: Duration::ZERO,
            grid,
            config,
        })
    }
}

/// Represents the authoritative state of a single arena level.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    config: WorldConfig,
    grid: WalkabilityGrid,
    player: Player,
    agents: AgentRegistry,
    projectiles: ObjectPool<Projectile>,
    stats: RunStats,
    experience: Experience,
    pickups: BTreeMap<PickupId, Pickup>,
    next_pickup: u32,
    inventory: Vec<LootItem>,
    expired: Vec<usize>,
    in_flight: Vec<usize>,
    collected: Vec<PickupId>,
    drops: Vec<LootItem>,
    rng: ChaCha8Rng,
    tick_index: u64,
    elapsed: Duration,
}

impl World {
    /// Starts assembling a new world.
    #[must_use]
    pub fn builder() -> WorldBuilder {
        WorldBuilder::default()
    }

    fn damage_player(&mut self, damage: u32, out_events: &mut Vec<Event>) {
        if !self.player.vitals.is_alive() {
            return;
        }

        self.player.vitals.take_damage(damage);
        out_events.push(Event::PlayerDamaged {
            vitals: self.player.vitals,
        });

        if !self.player.vitals.is_alive() {
            self.player.velocity = Vec2::ZERO;
            tracing::info!(tick = self.tick_index, "player died");
            out_events.push(Event::PlayerDied);
        }
    }

    fn damage_agent(&mut self, agent: AgentId, damage: u32, out_events: &mut Vec<Event>) {
        let Some(state) = self.agents.get_mut(agent) else {
            return;
        };

        state.vitals.take_damage(damage);
        out_events.push(Event::AgentDamaged {
            agent,
            vitals: state.vitals,
        });

        if state.vitals.is_alive() {
            return;
        }

        let position = state.position;
        let _ = self.agents.remove(agent);
        out_events.push(Event::AgentDied { agent });

        let mut drops = std::mem::take(&mut self.drops);
        drops.clear();
        self.config.loot.roll(&mut self.rng, &mut drops);
        for &item in &drops {
            let pickup = PickupId::new(self.next_pickup);
            self.next_pickup = self.next_pickup.wrapping_add(1);
            let _ = self.pickups.insert(
                pickup,
                Pickup {
                    item,
                    position,
                    age: Duration::ZERO,
                },
            );
            out_events.push(Event::LootDropped {
                pickup,
                item,
                position,
            });
        }
        let items = drops.len();
        self.drops = drops;

        let (min, max) = (self.config.xp_drop_min, self.config.xp_drop_max);
        let xp = if max > min {
            self.rng.gen_range(min..=max)
        } else {
            min
        };
        self.earn_experience(xp, out_events);

        let coins = if self.config.coin_drop_max > self.config.coin_drop_min {
            self.rng
                .gen_range(self.config.coin_drop_min..self.config.coin_drop_max)
        } else {
            self.config.coin_drop_min
        };
        self.stats.record_kill(coins);
        tracing::debug!(
            agent = agent.get(),
            coins,
            xp,
            items,
            "agent died"
        );
    }

    fn earn_experience(&mut self, amount: u32, out_events: &mut Vec<Event>) {
        if amount == 0 {
            return;
        }

        let gained = self.experience.earn(amount);
        out_events.push(Event::ExperienceEarned {
            amount,
            total: self.experience.total(),
        });
        let level = self.experience.level();
        for reached in (level - gained + 1)..=level {
            tracing::info!(level = reached, xp = self.experience.total(), "player leveled up");
            out_events.push(Event::PlayerLeveledUp { level: reached });
        }
    }

    fn advance_pickups(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if !self.player.vitals.is_alive() {
            return;
        }

        let seconds = dt.as_secs_f32();
        let target = self.player.position;
        let reach = self.config.player_radius + self.config.pickup_radius;
        let mut collected = std::mem::take(&mut self.collected);
        collected.clear();

        for (&id, pickup) in &mut self.pickups {
            pickup.age = pickup.age.saturating_add(dt);
            let distance = pickup.position.distance(target);
            if distance > reach
                && pickup.age >= self.config.attraction_delay
                && distance <= self.config.attraction_radius
            {
                let step = (self.config.attraction_speed * seconds).min(distance);
                let next = pickup.position + (target - pickup.position) / distance * step;
                pickup.position = self.grid.slide(pickup.position, next);
            }
            if pickup.position.distance(target) <= reach {
                collected.push(id);
            }
        }

        for &pickup in &collected {
            self.collect(pickup, out_events);
        }
        self.collected = collected;
    }

    fn collect(&mut self, pickup: PickupId, out_events: &mut Vec<Event>) {
        let Some(Pickup { item, .. }) = self.pickups.remove(&pickup) else {
            return;
        };

        self.inventory.push(item);
        out_events.push(Event::LootCollected { pickup, item });
        match item.kind {
            ItemKind::Health => self.player.vitals.heal(item.value),
            ItemKind::Shield => self.player.vitals.recharge(item.value),
            ItemKind::Experience => self.earn_experience(item.value, out_events),
            ItemKind::Credits => self.stats.add_coins(item.value),
            ItemKind::Blaster | ItemKind::Thruster => {}
        }
    }

    fn shooter_position(&self, shooter: Shooter) -> Option<Vec2> {
        match shooter {
            Shooter::Player => self
                .player
                .vitals
                .is_alive()
                .then_some(self.player.position),
            Shooter::Agent(agent) => self.agents.get(agent).map(|state| state.position),
        }
    }

    fn advance_projectiles(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let seconds = dt.as_secs_f32();
        let mut expired = std::mem::take(&mut self.expired);
        let mut in_flight = std::mem::take(&mut self.in_flight);
        expired.clear();
        in_flight.clear();

        for (index, projectile) in self.projectiles.iter_active_mut() {
            projectile.remaining = projectile.remaining.saturating_sub(dt);
            if projectile.remaining.is_zero() {
                expired.push(index);
                continue;
            }
            projectile.position += projectile.velocity * seconds;
            in_flight.push(index);
        }

        for &index in &expired {
            if self.projectiles.release(index) {
                out_events.push(Event::ProjectileExpired {
                    projectile: projectile_id(index),
                });
            }
        }

        for &index in &in_flight {
            let Some(projectile) = self.projectiles.get(index).copied() else {
                continue;
            };
            let Some(victim) = self.find_victim(&projectile) else {
                continue;
            };

            let _ = self.projectiles.release(index);
            out_events.push(Event::ProjectileHit {
                projectile: projectile_id(index),
                victim,
            });
            match victim {
                Victim::Player => self.damage_player(projectile.damage, out_events),
                Victim::Agent(agent) => self.damage_agent(agent, projectile.damage, out_events),
            }
        }

        self.expired = expired;
        self.in_flight = in_flight;
    }

    fn find_victim(&self, projectile: &Projectile) -> Option<Victim> {
        match projectile.owner.opponent() {
            Faction::Player => {
                let reach = self.config.player_radius + self.config.projectile_radius;
                (self.player.vitals.is_alive()
                    && self.player.position.distance_squared(projectile.position) <= reach * reach)
                    .then_some(Victim::Player)
            }
            Faction::Enemy => {
                let reach = self.config.agent_radius + self.config.projectile_radius;
                self.agents
                    .iter()
                    .find(|agent| agent.position.distance_squared(projectile.position) <= reach * reach)
                    .map(|agent| Victim::Agent(agent.id))
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Player {
    position: Vec2,
    velocity: Vec2,
    heading: f32,
    vitals: Vitals,
    invisible: bool,
}

#[derive(Clone, Copy, Debug)]
struct Projectile {
    owner: Faction,
    position: Vec2,
    velocity: Vec2,
    damage: u32,
    remaining: Duration,
}

#[derive(Clone, Copy, Debug)]
struct Pickup {
    item: LootItem,
    position: Vec2,
    age: Duration,
}

impl Projectile {
    fn pooled() -> Self {
        Self {
            owner: Faction::Player,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            damage: 0,
            remaining: Duration::ZERO,
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            world.elapsed = world.elapsed.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });

            if world.player.vitals.is_alive() {
                let next = world.player.position + world.player.velocity * dt.as_secs_f32();
                world.player.position = world.grid.slide(world.player.position, next);
            }

            world.advance_projectiles(dt, out_events);
            world.advance_pickups(dt, out_events);
        }
        Command::MoveAgent {
            agent,
            delta,
            facing,
        } => {
            if !delta.is_finite() {
                return;
            }
            let grid = &world.grid;
            if let Some(state) = world.agents.get_mut(agent) {
                state.position = grid.slide(state.position, state.position + delta);
                if let Some(facing) = facing {
                    state.facing = facing;
                }
            }
        }
        Command::SteerPlayer { velocity, heading } => {
            if world.player.vitals.is_alive() && velocity.is_finite() && heading.is_finite() {
                world.player.velocity = velocity;
                world.player.heading = heading;
            }
        }
        Command::SetPlayerInvisible { invisible } => {
            if world.player.invisible != invisible {
                world.player.invisible = invisible;
                out_events.push(Event::VisibilityChanged { invisible });
            }
        }
        Command::SpawnAgent { position, kind } => {
            if !world.grid.contains(position) || !world.grid.node_at(position).walkable() {
                tracing::warn!(x = position.x, y = position.y, ?kind, "spawn rejected");
                out_events.push(Event::SpawnRejected { position, kind });
                return;
            }

            let vitals = Vitals::full(world.config.agent_max_health, 0);
            let agent = world.agents.insert(kind, position, vitals);
            out_events.push(Event::AgentSpawned {
                agent,
                kind,
                position,
            });
        }
        Command::FireProjectile {
            shooter,
            direction,
            speed,
        } => {
            let Some(origin) = world.shooter_position(shooter) else {
                return;
            };
            let direction = direction.normalize_or_zero();
            if direction == Vec2::ZERO || !speed.is_finite() || speed <= 0.0 {
                return;
            }

            let projectile = Projectile {
                owner: shooter.faction(),
                position: origin,
                velocity: direction * speed,
                damage: world.config.projectile_damage,
                remaining: world.config.projectile_lifetime,
            };
            let (index, slot) = world.projectiles.acquire(Projectile::pooled);
            *slot = projectile;
            out_events.push(Event::ProjectileFired {
                projectile: projectile_id(index),
                shooter,
            });
        }
        Command::MeleeStrike { agent } => {
            let Some(attacker) = world.agents.get(agent) else {
                return;
            };
            if attacker.kind != AgentKind::Melee {
                return;
            }
            let reach = world.config.agent_radius + world.config.player_radius;
            if attacker.position.distance_squared(world.player.position) > reach * reach {
                return;
            }
            let damage = world.config.melee_damage;
            world.damage_player(damage, out_events);
        }
    }
}

fn projectile_id(index: usize) -> ProjectileId {
    ProjectileId::new(u32::try_from(index).unwrap_or(u32::MAX))
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use glam::Vec2;
    use prophecy_core::{AgentView, Faction, LootItem, PickupId, PlayerSnapshot, ProjectileId};

    use super::{Experience, RunStats, WalkabilityGrid, World, WorldConfig};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Provides read-only access to the level's walkability grid.
    #[must_use]
    pub fn grid(world: &World) -> &WalkabilityGrid {
        &world.grid
    }

    /// Provides read-only access to the world's tuning.
    #[must_use]
    pub fn config(world: &World) -> &WorldConfig {
        &world.config
    }

    /// Captures the player's current state.
    #[must_use]
    pub fn player(world: &World) -> PlayerSnapshot {
        PlayerSnapshot {
            position: world.player.position,
            velocity: world.player.velocity,
            heading: world.player.heading,
            vitals: world.player.vitals,
            invisible: world.player.invisible,
        }
    }

    /// Captures a read-only view of the agents inhabiting the arena.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        AgentView::from_snapshots(world.agents.iter().map(|agent| agent.snapshot()).collect())
    }

    /// Captures everything agents need to navigate toward the player.
    #[must_use]
    pub fn arena(world: &World) -> ArenaView<'_> {
        let offset = Vec2::new(world.config.anchor_offset, 0.0);
        ArenaView {
            grid: &world.grid,
            target: world.player.position,
            primary_anchor: world.player.position - offset,
            fallback_anchor: world.player.position + offset,
            target_invisible: world.player.invisible || !world.player.vitals.is_alive(),
            room_radius: world.config.room_radius,
        }
    }

    /// Captures the projectiles currently in flight, ordered by pool slot.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .projectiles
            .iter_active()
            .map(|(index, projectile)| ProjectileSnapshot {
                id: super::projectile_id(index),
                owner: projectile.owner,
                position: projectile.position,
                velocity: projectile.velocity,
            })
            .collect()
    }

    /// Total number of projectile slots, pooled or in flight.
    #[must_use]
    pub fn projectile_capacity(world: &World) -> usize {
        world.projectiles.capacity()
    }

    /// Kill and coin tallies for the current level.
    #[must_use]
    pub fn stats(world: &World) -> RunStats {
        world.stats
    }

    /// Experience and level reached during the current level.
    #[must_use]
    pub fn experience(world: &World) -> &Experience {
        &world.experience
    }

    /// Items lying on the floor, ordered by identifier.
    #[must_use]
    pub fn pickups(world: &World) -> Vec<PickupSnapshot> {
        world
            .pickups
            .iter()
            .map(|(&id, pickup)| PickupSnapshot {
                id,
                item: pickup.item,
                position: pickup.position,
            })
            .collect()
    }

    /// Items the player collected, in collection order.
    #[must_use]
    pub fn inventory(world: &World) -> &[LootItem] {
        &world.inventory
    }

    /// Simulated time elapsed since the level started.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Reports how the level currently stands.
    #[must_use]
    pub fn outcome(world: &World) -> Outcome {
        if !world.player.vitals.is_alive() {
            Outcome::Defeated
        } else if world.agents.len() == 0 && world.stats.kills() > 0 {
            Outcome::Cleared
        } else {
            Outcome::InProgress
        }
    }

    /// Navigation context shared by every agent for a single frame.
    #[derive(Clone, Copy, Debug)]
    pub struct ArenaView<'a> {
        /// Walkability grid of the level.
        pub grid: &'a WalkabilityGrid,
        /// Position of the player agents chase.
        pub target: Vec2,
        /// Preferred destination, left of the player.
        pub primary_anchor: Vec2,
        /// Destination used when the primary anchor's node is blocked.
        pub fallback_anchor: Vec2,
        /// Whether agents should ignore the player (invisible or dead).
        pub target_invisible: bool,
        /// Maximum chase distance.
        pub room_radius: f32,
    }

    /// Immutable representation of a projectile in flight.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct ProjectileSnapshot {
        /// Pool slot occupied by the projectile.
        pub id: ProjectileId,
        /// Faction that fired it.
        pub owner: Faction,
        /// Current position.
        pub position: Vec2,
        /// Current velocity.
        pub velocity: Vec2,
    }

    /// Immutable representation of an item lying on the floor.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct PickupSnapshot {
        /// Identifier of the pickup.
        pub id: PickupId,
        /// Item waiting to be collected.
        pub item: LootItem,
        /// Current position.
        pub position: Vec2,
    }

    /// Progress of the current level.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Outcome {
        /// Enemies remain and the player lives.
        InProgress,
        /// Every spawned enemy has been killed.
        Cleared,
        /// The player died.
        Defeated,
    }
}
