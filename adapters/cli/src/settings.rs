//! Optional TOML tuning file layered over the default simulation config.

use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use prophecy_simulation::SimulationConfig;
use prophecy_system_movement::AvoidanceConfig;
use prophecy_system_steering::SteeringMode;
use serde::Deserialize;

/// Top-level settings document. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    pub(crate) fixed_step_ms: Option<u64>,
    pub(crate) steering_mode: Option<SteeringMode>,
    pub(crate) world: WorldSettings,
    pub(crate) loot: LootSettings,
    pub(crate) movement: MovementSettings,
    pub(crate) targeting: TargetingSettings,
    pub(crate) combat: CombatSettings,
    pub(crate) spawning: SpawningSettings,
    pub(crate) steering: SteeringSettings,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WorldSettings {
    pub(crate) player_max_health: Option<u32>,
    pub(crate) player_max_shield: Option<u32>,
    pub(crate) agent_max_health: Option<u32>,
    pub(crate) projectile_damage: Option<u32>,
    pub(crate) projectile_lifetime_ms: Option<u64>,
    pub(crate) projectile_pool_size: Option<usize>,
    pub(crate) melee_damage: Option<u32>,
    pub(crate) anchor_offset: Option<f32>,
    pub(crate) room_radius: Option<f32>,
    pub(crate) coin_drop_min: Option<u32>,
    pub(crate) coin_drop_max: Option<u32>,
    pub(crate) xp_drop_min: Option<u32>,
    pub(crate) xp_drop_max: Option<u32>,
    pub(crate) level_thresholds: Option<Vec<u32>>,
    pub(crate) attraction_radius: Option<f32>,
    pub(crate) attraction_speed: Option<f32>,
    pub(crate) attraction_delay_ms: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LootSettings {
    /// Relative chances of dropping zero, one, two and three items.
    pub(crate) drop_chances: Option<[f32; 4]>,
    /// Relative weights of the basic, rare, epic, legendary and special tables.
    pub(crate) tier_weights: Option<[f32; 5]>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct MovementSettings {
    pub(crate) replan_interval_ms: Option<u64>,
    pub(crate) arrival_threshold: Option<f32>,
    pub(crate) move_speed: Option<f32>,
    pub(crate) wander_range: Option<f32>,
    pub(crate) wander_speed: Option<f32>,
    pub(crate) wander_interval_ms: Option<u64>,
    /// Enables separation between chasing agents at this distance.
    pub(crate) avoidance_distance: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct TargetingSettings {
    pub(crate) player_auto_aim_range: Option<f32>,
    pub(crate) player_aim_tolerance_degrees: Option<f32>,
    pub(crate) enemy_auto_aim_range: Option<f32>,
    pub(crate) enemy_shooting_range: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CombatSettings {
    pub(crate) player_fire_cooldown_ms: Option<u64>,
    pub(crate) enemy_fire_cooldown_ms: Option<u64>,
    pub(crate) player_projectile_speed: Option<f32>,
    pub(crate) enemy_projectile_speed: Option<f32>,
    pub(crate) melee_delay_ms: Option<u64>,
    pub(crate) contact_distance: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SpawningSettings {
    pub(crate) interval_ms: Option<u64>,
    pub(crate) distance: Option<f32>,
    pub(crate) amount_per_spawn: Option<u32>,
    pub(crate) active_for_secs: Option<u64>,
    /// Keeps spawners running for the whole session.
    pub(crate) endless: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SteeringSettings {
    pub(crate) max_forward_speed: Option<f32>,
    pub(crate) max_turn_speed: Option<f32>,
    pub(crate) turn_acceleration: Option<f32>,
    pub(crate) forward_acceleration: Option<f32>,
    pub(crate) rotation_deceleration: Option<f32>,
    pub(crate) forward_deceleration: Option<f32>,
}

impl Settings {
    /// Reads and parses the settings file at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid settings in {}", path.display()))
    }

    /// Parses a settings document.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(contents).context("failed to parse settings toml contents")?;
        if settings.spawning.endless && settings.spawning.active_for_secs.is_some() {
            bail!("spawning.endless and spawning.active_for_secs are mutually exclusive");
        }
        Ok(settings)
    }

    /// Overrides the fields this document sets.
    pub(crate) fn apply(&self, config: &mut SimulationConfig) {
        set_millis(&mut config.fixed_step, self.fixed_step_ms);
        set(&mut config.steering_mode, self.steering_mode);

        let world = &self.world;
        let target = &mut config.world;
        set(&mut target.player_max_health, world.player_max_health);
        set(&mut target.player_max_shield, world.player_max_shield);
        set(&mut target.agent_max_health, world.agent_max_health);
        set(&mut target.projectile_damage, world.projectile_damage);
        set_millis(&mut target.projectile_lifetime, world.projectile_lifetime_ms);
        set(&mut target.projectile_pool_size, world.projectile_pool_size);
        set(&mut target.melee_damage, world.melee_damage);
        set(&mut target.anchor_offset, world.anchor_offset);
        set(&mut target.room_radius, world.room_radius);
        set(&mut target.coin_drop_min, world.coin_drop_min);
        set(&mut target.coin_drop_max, world.coin_drop_max);
        set(&mut target.xp_drop_min, world.xp_drop_min);
        set(&mut target.xp_drop_max, world.xp_drop_max);
        if let Some(thresholds) = &world.level_thresholds {
            target.level_thresholds.clone_from(thresholds);
        }
        set(&mut target.attraction_radius, world.attraction_radius);
        set(&mut target.attraction_speed, world.attraction_speed);
        set_millis(&mut target.attraction_delay, world.attraction_delay_ms);
        set(&mut target.loot.drop_chances, self.loot.drop_chances);
        if let Some(weights) = self.loot.tier_weights {
            for (category, weight) in target.loot.categories.iter_mut().zip(weights) {
                category.weight = weight;
            }
        }

        let movement = &self.movement;
        let target = &mut config.movement;
        set_millis(
            &mut target.follower.replan_interval,
            movement.replan_interval_ms,
        );
        set(
            &mut target.follower.arrival_threshold,
            movement.arrival_threshold,
        );
        set(&mut target.follower.move_speed, movement.move_speed);
        set(&mut target.wander.range, movement.wander_range);
        set(&mut target.wander.speed, movement.wander_speed);
        set_millis(&mut target.wander.interval, movement.wander_interval_ms);
        if let Some(min_distance) = movement.avoidance_distance {
            target.avoidance = Some(AvoidanceConfig { min_distance });
        }

        let targeting = &self.targeting;
        let target = &mut config.targeting;
        set(
            &mut target.player.auto_aim_range,
            targeting.player_auto_aim_range,
        );
        if let Some(tolerance) = targeting.player_aim_tolerance_degrees {
            target.player.aim_tolerance_degrees = Some(tolerance);
        }
        set(
            &mut target.enemy.auto_aim_range,
            targeting.enemy_auto_aim_range,
        );
        if let Some(range) = targeting.enemy_shooting_range {
            target.enemy.shooting_range = Some(range);
        }

        let combat = &self.combat;
        let target = &mut config.combat;
        set_millis(
            &mut target.player_fire_cooldown,
            combat.player_fire_cooldown_ms,
        );
        set_millis(&mut target.enemy_fire_cooldown, combat.enemy_fire_cooldown_ms);
        set(
            &mut target.player_projectile_speed,
            combat.player_projectile_speed,
        );
        set(
            &mut target.enemy_projectile_speed,
            combat.enemy_projectile_speed,
        );
        set_millis(&mut target.melee_delay, combat.melee_delay_ms);
        set(&mut target.contact_distance, combat.contact_distance);

        let spawning = &self.spawning;
        let mut spawner = config.spawning;
        if let Some(interval) = spawning.interval_ms {
            spawner = spawner.with_spawn_interval(Duration::from_millis(interval));
        }
        if let Some(distance) = spawning.distance {
            spawner = spawner.with_spawn_distance(distance);
        }
        if let Some(amount) = spawning.amount_per_spawn {
            spawner = spawner.with_amount_per_spawn(amount);
        }
        if let Some(seconds) = spawning.active_for_secs {
            spawner = spawner.with_active_for(Some(Duration::from_secs(seconds)));
        }
        if spawning.endless {
            spawner = spawner.with_active_for(None);
        }
        config.spawning = spawner;

        let steering = &self.steering;
        let target = &mut config.steering;
        set(&mut target.max_forward_speed, steering.max_forward_speed);
        set(&mut target.max_turn_speed, steering.max_turn_speed);
        set(&mut target.turn_acceleration, steering.turn_acceleration);
        set(
            &mut target.forward_acceleration,
            steering.forward_acceleration,
        );
        set(
            &mut target.rotation_deceleration,
            steering.rotation_deceleration,
        );
        set(
            &mut target.forward_deceleration,
            steering.forward_deceleration,
        );
    }
}

fn set<T: Copy>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn set_millis(slot: &mut Duration, millis: Option<u64>) {
    if let Some(millis) = millis {
        *slot = Duration::from_millis(millis);
    }
}
