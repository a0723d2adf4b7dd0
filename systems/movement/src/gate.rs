//! Distance and visibility gate deciding whether an agent chases the player.

use glam::Vec2;

/// Decides between chasing and idling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangeGate {
    max_range: f32,
}

impl RangeGate {
    /// Creates a gate that opens within `max_range` of the target.
    #[must_use]
    pub const fn new(max_range: f32) -> Self {
        Self { max_range }
    }

    /// Maximum chase distance, inclusive.
    #[must_use]
    pub const fn max_range(&self) -> f32 {
        self.max_range
    }

    /// Reports whether an agent at `agent` should chase `target`.
    #[must_use]
    pub fn is_active(&self, agent: Vec2, target: Vec2, target_invisible: bool) -> bool {
        !target_invisible && agent.distance(target) <= self.max_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_distance_is_inclusive() {
        let gate = RangeGate::new(9.0);
        let target = Vec2::new(1.0, 2.0);

        assert!(gate.is_active(Vec2::new(10.0, 2.0), target, false));
        assert!(!gate.is_active(Vec2::new(10.001, 2.0), target, false));
    }

    #[test]
    fn invisible_target_closes_gate_at_any_distance() {
        let gate = RangeGate::new(9.0);
        assert!(!gate.is_active(Vec2::ZERO, Vec2::ZERO, true));
        assert!(!gate.is_active(Vec2::new(3.0, 0.0), Vec2::ZERO, true));
    }
}
