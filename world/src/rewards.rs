//! Kill rewards: loot tables and experience levels.

use prophecy_core::{ItemKind, LootItem, LootTier};
use rand::Rng;
use thiserror::Error;

/// Reasons a loot table or level ladder was rejected.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RewardError {
    /// A drop chance or category weight is negative or not finite.
    #[error("loot weight {0} must be a non-negative finite number")]
    InvalidWeight(f32),
    /// Every drop-count chance is zero.
    #[error("at least one drop-count chance must be positive")]
    NoDropChance,
    /// Level thresholds must strictly increase.
    #[error("level threshold {next} does not exceed the previous threshold {previous}")]
    UnorderedThresholds {
        /// Threshold before the offending one.
        previous: u32,
        /// Offending threshold.
        next: u32,
    },
}

/// Items of a single tier and the relative weight of picking that tier.
#[derive(Clone, Debug, PartialEq)]
pub struct LootCategory {
    /// Tier of every item in the category.
    pub tier: LootTier,
    /// Relative chance of the category being picked.
    pub weight: f32,
    /// Items drawn uniformly once the category is picked.
    pub items: Vec<LootItem>,
}

/// Weighted loot tables rolled when an agent dies.
///
/// A roll first decides how many items drop (none to three), then picks a
/// category for each item by weight and an item uniformly inside it. A
/// category without items yields nothing for that draw.
#[derive(Clone, Debug, PartialEq)]
pub struct LootTable {
    /// Relative chances of dropping zero, one, two and three items.
    pub drop_chances: [f32; 4],
    /// Categories in draw order.
    pub categories: Vec<LootCategory>,
}

impl Default for LootTable {
    fn default() -> Self {
        use ItemKind::{Blaster, Credits, Experience, Health, Shield, Thruster};
        use LootTier::{Basic, Epic, Legendary, Rare, Special};

        Self {
            drop_chances: [50.0, 30.0, 15.0, 5.0],
            categories: vec![
                category(Basic, 60.0, &[(Health, 10), (Shield, 10), (Credits, 5)]),
                category(Rare, 25.0, &[(Health, 25), (Shield, 25), (Experience, 50)]),
                category(Epic, 10.0, &[(Blaster, 1), (Credits, 25)]),
                category(Legendary, 4.0, &[(Thruster, 1)]),
                category(Special, 1.0, &[(Experience, 250)]),
            ],
        }
    }
}

fn category(tier: LootTier, weight: f32, items: &[(ItemKind, u32)]) -> LootCategory {
    LootCategory {
        tier,
        weight,
        items: items
            .iter()
            .map(|&(kind, value)| LootItem::new(tier, kind, value))
            .collect(),
    }
}

impl LootTable {
    /// Checks that every chance and weight can be sampled.
    pub fn validate(&self) -> Result<(), RewardError> {
        let weights = self
            .drop_chances
            .iter()
            .chain(self.categories.iter().map(|category| &category.weight));
        for &weight in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(RewardError::InvalidWeight(weight));
            }
        }
        if self.drop_chances.iter().sum::<f32>() <= 0.0 {
            return Err(RewardError::NoDropChance);
        }
        Ok(())
    }

    /// Rolls the drops for one kill, appending them to `out`.
    pub fn roll<R: Rng>(&self, rng: &mut R, out: &mut Vec<LootItem>) {
        let count = self.roll_count(rng);
        for _ in 0..count {
            if let Some(item) = self.roll_item(rng) {
                out.push(item);
            }
        }
    }

    fn roll_count<R: Rng>(&self, rng: &mut R) -> usize {
        let total: f32 = self.drop_chances.iter().sum();
        if total <= 0.0 {
            return 0;
        }
        let roll = rng.gen_range(0.0..total);
        let mut cumulative = 0.0;
        for (count, chance) in self.drop_chances.iter().enumerate() {
            cumulative += chance;
            if roll < cumulative {
                return count;
            }
        }
        self.drop_chances.len() - 1
    }

    fn roll_item<R: Rng>(&self, rng: &mut R) -> Option<LootItem> {
        let total: f32 = self.categories.iter().map(|category| category.weight).sum();
        if total <= 0.0 {
            return None;
        }
        let roll = rng.gen_range(0.0..total);
        let mut cumulative = 0.0;
        let category = self.categories.iter().find(|category| {
            cumulative += category.weight;
            roll < cumulative
        })?;
        if category.items.is_empty() {
            return None;
        }
        Some(category.items[rng.gen_range(0..category.items.len())])
    }
}

/// Experience accumulated during a level and the level it has reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Experience {
    total: u32,
    level: u32,
    thresholds: Vec<u32>,
}

impl Experience {
    /// Starts at level zero with the provided strictly increasing thresholds.
    pub fn new(thresholds: Vec<u32>) -> Result<Self, RewardError> {
        for pair in thresholds.windows(2) {
            if pair[1] <= pair[0] {
                return Err(RewardError::UnorderedThresholds {
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }
        Ok(Self {
            total: 0,
            level: 0,
            thresholds,
        })
    }

    /// Experience accumulated so far.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }

    /// Number of thresholds crossed.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Experience required for the next level, if any remain.
    #[must_use]
    pub fn next_threshold(&self) -> Option<u32> {
        self.thresholds.get(self.level as usize).copied()
    }

    /// Adds experience and returns how many levels were gained.
    pub fn earn(&mut self, amount: u32) -> u32 {
        self.total = self.total.saturating_add(amount);
        let before = self.level;
        while self
            .next_threshold()
            .is_some_and(|threshold| self.total >= threshold)
        {
            self.level += 1;
        }
        self.level - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn single(kind: ItemKind) -> LootTable {
        LootTable {
            drop_chances: [0.0, 0.0, 0.0, 1.0],
            categories: vec![LootCategory {
                tier: LootTier::Basic,
                weight: 1.0,
                items: vec![LootItem::new(LootTier::Basic, kind, 7)],
            }],
        }
    }

    #[test]
    fn default_table_is_valid() {
        assert_eq!(LootTable::default().validate(), Ok(()));
    }

    #[test]
    fn certain_three_item_drop_yields_three_items() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut out = Vec::new();
        single(ItemKind::Shield).roll(&mut rng, &mut out);
        assert_eq!(out, vec![LootItem::new(LootTier::Basic, ItemKind::Shield, 7); 3]);
    }

    #[test]
    fn certain_no_drop_yields_nothing() {
        let mut table = single(ItemKind::Health);
        table.drop_chances = [1.0, 0.0, 0.0, 0.0];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut out = Vec::new();
        for _ in 0..50 {
            table.roll(&mut rng, &mut out);
        }
        assert!(out.is_empty());
    }

    #[test]
    fn empty_category_yields_nothing_for_its_draw() {
        let mut table = single(ItemKind::Credits);
        table.categories[0].items.clear();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut out = Vec::new();
        table.roll(&mut rng, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn default_drop_counts_follow_their_chances() {
        let table = LootTable::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut counts = [0u32; 4];
        let mut out = Vec::new();
        for _ in 0..10_000 {
            out.clear();
            let count = table.roll_count(&mut rng);
            counts[count] += 1;
            table.roll(&mut rng, &mut out);
            assert!(out.len() <= 3);
        }
        assert!((4_500..5_500).contains(&counts[0]), "{counts:?}");
        assert!((2_500..3_500).contains(&counts[1]), "{counts:?}");
        assert!((300..700).contains(&counts[3]), "{counts:?}");
    }

    #[test]
    fn invalid_weights_are_rejected() {
        let mut table = LootTable::default();
        table.categories[1].weight = -1.0;
        assert_eq!(table.validate(), Err(RewardError::InvalidWeight(-1.0)));

        let mut table = LootTable::default();
        table.drop_chances = [0.0; 4];
        assert_eq!(table.validate(), Err(RewardError::NoDropChance));
    }

    #[test]
    fn experience_crosses_every_reached_threshold() {
        let mut experience = Experience::new(vec![100, 150, 400]).expect("ordered thresholds");
        assert_eq!(experience.earn(99), 0);
        assert_eq!(experience.earn(60), 2);
        assert_eq!(experience.level(), 2);
        assert_eq!(experience.next_threshold(), Some(400));
        assert_eq!(experience.earn(1_000), 1);
        assert_eq!(experience.next_threshold(), None);
        assert_eq!(experience.earn(1_000), 0);
        assert_eq!(experience.total(), 2_159);
    }

    #[test]
    fn unordered_thresholds_are_rejected() {
        assert_eq!(
            Experience::new(vec![10, 10]),
            Err(RewardError::UnorderedThresholds {
                previous: 10,
                next: 10
            })
        );
    }
}
