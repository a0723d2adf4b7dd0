//! Per-level run statistics.

/// Kill and coin tallies accumulated during a single level.
///
/// A level reset builds a fresh world, so the tallies never need clearing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    kills: u32,
    coins: u32,
}

impl RunStats {
    /// Number of enemies killed.
    #[must_use]
    pub const fn kills(&self) -> u32 {
        self.kills
    }

    /// Coins dropped by killed enemies or collected as credits.
    #[must_use]
    pub const fn coins(&self) -> u32 {
        self.coins
    }

    pub(crate) fn record_kill(&mut self, coins: u32) {
        self.kills = self.kills.saturating_add(1);
        self.coins = self.coins.saturating_add(coins);
    }

    pub(crate) fn add_coins(&mut self, coins: u32) {
        self.coins = self.coins.saturating_add(coins);
    }
}
