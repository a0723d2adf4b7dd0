#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Prophecy arena simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Systems read immutable snapshots,
//! respond with [`Command`] batches, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values describing what
//! changed.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "The Prophecy awaits.";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the physics clock by one fixed step.
    Tick {
        /// Duration of simulated time covered by the step.
        dt: Duration,
    },
    /// Translates an enemy agent by a relative offset.
    MoveAgent {
        /// Identifier of the agent being moved.
        agent: AgentId,
        /// World-space offset applied to the agent's position.
        delta: Vec2,
        /// Horizontal facing implied by the movement, if any.
        facing: Option<Facing>,
    },
    /// Replaces the player's velocity and heading.
    SteerPlayer {
        /// Linear velocity integrated on subsequent ticks.
        velocity: Vec2,
        /// Heading angle in radians; zero points along the positive x axis.
        heading: f32,
    },
    /// Toggles the player's invisibility.
    SetPlayerInvisible {
        /// Whether enemies should lose track of the player.
        invisible: bool,
    },
    /// Requests that a new enemy agent enter the arena.
    SpawnAgent {
        /// World-space spawn position.
        position: Vec2,
        /// Behaviour archetype of the spawned agent.
        kind: AgentKind,
    },
    /// Requests that a shooter launch a pooled projectile.
    FireProjectile {
        /// Unit that fires the projectile.
        shooter: Shooter,
        /// Unit direction of travel.
        direction: Vec2,
        /// Speed in world units per second.
        speed: f32,
    },
    /// Requests that a melee agent strike the player it touches.
    MeleeStrike {
        /// Identifier of the attacking agent.
        agent: AgentId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the physics clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed.
        dt: Duration,
    },
    /// Confirms that an agent entered the arena.
    AgentSpawned {
        /// Identifier assigned to the agent.
        agent: AgentId,
        /// Behaviour archetype of the agent.
        kind: AgentKind,
        /// Position the agent occupies after spawning.
        position: Vec2,
    },
    /// Reports that a spawn request landed on an unwalkable node.
    SpawnRejected {
        /// Requested spawn position.
        position: Vec2,
        /// Requested archetype.
        kind: AgentKind,
    },
    /// Confirms that a projectile left the pool.
    ProjectileFired {
        /// Pool slot assigned to the projectile.
        projectile: ProjectileId,
        /// Unit that fired it.
        shooter: Shooter,
    },
    /// Reports that a projectile struck a unit and returned to the pool.
    ProjectileHit {
        /// Pool slot of the projectile.
        projectile: ProjectileId,
        /// Unit that received the damage.
        victim: Victim,
    },
    /// Reports that a projectile ran out of lifetime and returned to the pool.
    ProjectileExpired {
        /// Pool slot of the projectile.
        projectile: ProjectileId,
    },
    /// Reports the player's vitals after taking damage.
    PlayerDamaged {
        /// Vitals after the damage was applied.
        vitals: Vitals,
    },
    /// Reports an agent's vitals after taking damage.
    AgentDamaged {
        /// Identifier of the damaged agent.
        agent: AgentId,
        /// Vitals after the damage was applied.
        vitals: Vitals,
    },
    /// Confirms that an agent died and left the arena.
    AgentDied {
        /// Identifier of the removed agent.
        agent: AgentId,
    },
    /// Announces that the player died.
    PlayerDied,
    /// Announces a change in the player's invisibility.
    VisibilityChanged {
        /// Whether the player is now invisible.
        invisible: bool,
    },
    /// Reports experience awarded for a kill or a collected item.
    ExperienceEarned {
        /// Experience gained.
        amount: u32,
        /// Experience accumulated during the level.
        total: u32,
    },
    /// Announces that accumulated experience crossed a level threshold.
    PlayerLeveledUp {
        /// Level reached.
        level: u32,
    },
    /// Reports that a killed agent left an item on the floor.
    LootDropped {
        /// Identifier of the pickup holding the item.
        pickup: PickupId,
        /// Item that dropped.
        item: LootItem,
        /// Position the item lies at.
        position: Vec2,
    },
    /// Reports that the player collected an item.
    LootCollected {
        /// Identifier of the collected pickup.
        pickup: PickupId,
        /// Item added to the inventory.
        item: LootItem,
    },
}

/// Side a unit fights for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// The player and their projectiles.
    Player,
    /// Enemy agents and their projectiles.
    Enemy,
}

impl Faction {
    /// Faction this one deals damage to.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }
}

/// Behaviour archetype assigned to an enemy agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    /// Deals contact damage while touching the player.
    Melee,
    /// Fires projectiles at the player from range.
    Ranged,
}

/// Horizontal orientation of an agent's sprite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Facing {
    /// Sprite faces toward decreasing x.
    Left,
    /// Sprite faces toward increasing x.
    #[default]
    Right,
}

impl Facing {
    /// Derives a facing from a movement offset, ignoring purely vertical motion.
    #[must_use]
    pub fn from_horizontal(dx: f32) -> Option<Self> {
        if dx > 0.0 {
            Some(Self::Right)
        } else if dx < 0.0 {
            Some(Self::Left)
        } else {
            None
        }
    }
}

/// Unique identifier assigned to an enemy agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Slot occupied by a projectile inside the world's pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new projectile identifier with the provided slot index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the slot index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unit able to fire projectiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Shooter {
    /// The player ship.
    Player,
    /// An enemy agent.
    Agent(AgentId),
}

impl Shooter {
    /// Faction the shooter belongs to.
    #[must_use]
    pub const fn faction(self) -> Faction {
        match self {
            Self::Player => Faction::Player,
            Self::Agent(_) => Faction::Enemy,
        }
    }
}

/// Unit that received damage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Victim {
    /// The player ship.
    Player,
    /// An enemy agent.
    Agent(AgentId),
}

/// Identifier of an item lying in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PickupId(u32);

impl PickupId {
    /// Creates a new pickup identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Rarity bucket a loot item is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LootTier {
    /// Common drops.
    Basic,
    /// Uncommon drops.
    Rare,
    /// Scarce drops.
    Epic,
    /// Very scarce drops.
    Legendary,
    /// Event drops.
    Special,
}

/// What a collected item does for the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Restores health.
    Health,
    /// Restores shield.
    Shield,
    /// Weapon part kept in the inventory.
    Blaster,
    /// Engine part kept in the inventory.
    Thruster,
    /// Grants experience.
    Experience,
    /// Grants coins.
    Credits,
}

/// A single item from a loot table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LootItem {
    /// Table the item was drawn from.
    pub tier: LootTier,
    /// Effect applied on collection.
    pub kind: ItemKind,
    /// Magnitude of the effect.
    pub value: u32,
}

impl LootItem {
    /// Creates a new loot item.
    #[must_use]
    pub const fn new(tier: LootTier, kind: ItemKind, value: u32) -> Self {
        Self { tier, kind, value }
    }
}

/// Location of a single grid node expressed as column and row indices.
///
/// Rows grow upward in world space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeCoord {
    x: u32,
    y: u32,
}

impl NodeCoord {
    /// Creates a new node coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Chebyshev (king-move) distance between two coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: NodeCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Reports whether `other` is this node or one of its eight neighbours.
    #[must_use]
    pub fn is_adjacent_or_equal(self, other: NodeCoord) -> bool {
        self.chebyshev_distance(other) <= 1
    }
}

/// Health and shield pools carried by every unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Vitals {
    health: u32,
    max_health: u32,
    shield: u32,
    max_shield: u32,
}

impl Vitals {
    /// Creates full vitals with the provided maxima.
    #[must_use]
    pub const fn full(max_health: u32, max_shield: u32) -> Self {
        Self {
            health: max_health,
            max_health,
            shield: max_shield,
            max_shield,
        }
    }

    /// Remaining health.
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> u32 {
        self.max_health
    }

    /// Remaining shield.
    #[must_use]
    pub const fn shield(&self) -> u32 {
        self.shield
    }

    /// Maximum shield.
    #[must_use]
    pub const fn max_shield(&self) -> u32 {
        self.max_shield
    }

    /// Reports whether any health remains.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Applies damage, draining the shield before health.
    pub fn take_damage(&mut self, damage: u32) {
        let absorbed = damage.min(self.shield);
        self.shield -= absorbed;
        self.health = self.health.saturating_sub(damage - absorbed);
    }

    /// Restores health, clamped to the maximum.
    pub fn heal(&mut self, amount: u32) {
        self.health = self.health.saturating_add(amount).min(self.max_health);
    }

    /// Restores shield, clamped to the maximum.
    pub fn recharge(&mut self, amount: u32) {
        self.shield = self.shield.saturating_add(amount).min(self.max_shield);
    }
}

/// Immutable representation of a single agent's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// Behaviour archetype.
    pub kind: AgentKind,
    /// Current world-space position.
    pub position: Vec2,
    /// Position the agent spawned at; anchors idle wandering.
    pub spawn_point: Vec2,
    /// Current sprite orientation.
    pub facing: Facing,
    /// Remaining health.
    pub vitals: Vitals,
}

/// Read-only snapshot describing all agents within the arena.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured agent snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up a single agent by identifier.
    #[must_use]
    pub fn get(&self, agent: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&agent, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of captured agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of the player's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Current world-space position.
    pub position: Vec2,
    /// Current linear velocity.
    pub velocity: Vec2,
    /// Heading angle in radians; zero points along the positive x axis.
    pub heading: f32,
    /// Health and shield.
    pub vitals: Vitals,
    /// Whether enemies currently lose track of the player.
    pub invisible: bool,
}

impl PlayerSnapshot {
    /// Unit vector the player is facing.
    #[must_use]
    pub fn forward(&self) -> Vec2 {
        Vec2::from_angle(self.heading)
    }

    /// Reports whether the player is still alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.vitals.is_alive()
    }
}
