//! Pairwise separation pushes between nearby agents.
//!
//! Every agent is compared against every other, so cost grows quadratically
//! with the agent count. Arenas hold tens of agents.

use glam::Vec2;
use prophecy_core::AgentId;

/// Tuning for separation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AvoidanceConfig {
    /// Agents closer than this push each other apart.
    pub min_distance: f32,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self { min_distance: 1.5 }
    }
}

/// Computes the push applied to each agent listed in `movers`.
///
/// Every agent in `obstacles` closer than the minimum distance pushes the
/// mover directly away by `push` units. Coincident agents do not push.
pub fn separation(
    config: &AvoidanceConfig,
    movers: &[(AgentId, Vec2)],
    obstacles: &[(AgentId, Vec2)],
    push: f32,
    out: &mut Vec<(AgentId, Vec2)>,
) {
    for &(mover, position) in movers {
        let mut total = Vec2::ZERO;
        for &(other, other_position) in obstacles {
            if other == mover {
                continue;
            }
            let away = position - other_position;
            if away.length() < config.min_distance {
                total += away.normalize_or_zero() * push;
            }
        }
        if total != Vec2::ZERO {
            out.push((mover, total));
        }
    }
}
