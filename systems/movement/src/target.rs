//! Destination selection between the two anchors flanking the player.

use glam::Vec2;
use prophecy_world::WalkabilityGrid;

/// Returns `primary` when its node is walkable, otherwise `fallback`.
#[must_use]
pub fn choose_destination(primary: Vec2, fallback: Vec2, grid: &WalkabilityGrid) -> Vec2 {
    if grid.node_at(primary).walkable() {
        primary
    } else {
        fallback
    }
}
