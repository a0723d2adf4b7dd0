#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that picks auto-aim targets for the player and ranged enemies.

use glam::Vec2;
use prophecy_core::{AgentId, AgentKind, AgentView, PlayerSnapshot, Shooter, Victim};

/// Range and arc limits applied to one side's shooters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AimProfile {
    /// Maximum distance at which targets are considered.
    pub auto_aim_range: f32,
    /// Half-width of the firing arc around the shooter's heading, in degrees.
    pub aim_tolerance_degrees: Option<f32>,
    /// Maximum distance at which a selected target is actually engaged.
    pub shooting_range: Option<f32>,
}

/// Configuration for the targeting system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Limits applied to the player.
    pub player: AimProfile,
    /// Limits applied to ranged enemies.
    pub enemy: AimProfile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player: AimProfile {
                auto_aim_range: 10.0,
                aim_tolerance_degrees: Some(45.0),
                shooting_range: None,
            },
            enemy: AimProfile {
                auto_aim_range: 7.0,
                aim_tolerance_degrees: None,
                shooting_range: Some(5.0),
            },
        }
    }
}

/// Direction a shooter should fire in to hit its selected target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AimSolution {
    /// Unit that fires.
    pub shooter: Shooter,
    /// Unit being aimed at.
    pub target: Victim,
    /// Unit vector from the shooter toward the target.
    pub direction: Vec2,
}

/// Targeting system that reuses a scratch buffer of enemy positions.
#[derive(Debug, Default)]
pub struct Targeting {
    config: Config,
    agent_workspace: Vec<AgentCandidate>,
}

impl Targeting {
    /// Creates a targeting system with the provided limits.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            agent_workspace: Vec::new(),
        }
    }

    /// Computes aim solutions for every shooter able to engage a target.
    ///
    /// The output buffer is cleared first. The player's solution, if any,
    /// comes first, followed by ranged enemies in identifier order.
    pub fn handle(
        &mut self,
        player: &PlayerSnapshot,
        agents: &AgentView,
        out: &mut Vec<AimSolution>,
    ) {
        out.clear();
        self.prepare_agent_workspace(agents);

        if player.is_alive() {
            if let Some(solution) = self.aim_player(player) {
                out.push(solution);
            }

            let ranged = agents
                .iter()
                .filter(|agent| agent.kind == AgentKind::Ranged);
            for agent in ranged {
                let aim = engage(&self.config.enemy, agent.position, None, player.position);
                if let Some(direction) = aim {
                    out.push(AimSolution {
                        shooter: Shooter::Agent(agent.id),
                        target: Victim::Player,
                        direction,
                    });
                }
            }
        }
    }

    fn aim_player(&self, player: &PlayerSnapshot) -> Option<AimSolution> {
        let profile = &self.config.player;
        let max_distance_sq = profile.auto_aim_range * profile.auto_aim_range;

        let mut best: Option<BestCandidate> = None;
        for candidate in &self.agent_workspace {
            let distance_sq = player.position.distance_squared(candidate.position);
            if distance_sq > max_distance_sq {
                continue;
            }

            let current = BestCandidate {
                distance_sq,
                agent: candidate.id,
                position: candidate.position,
            };
            match &mut best {
                Some(existing) => {
                    if current.precedes(existing) {
                        *existing = current;
                    }
                }
                None => best = Some(current),
            }
        }

        let best = best?;
        let heading = Some(player.forward());
        let direction = engage(profile, player.position, heading, best.position)?;
        Some(AimSolution {
            shooter: Shooter::Player,
            target: Victim::Agent(best.agent),
            direction,
        })
    }

    fn prepare_agent_workspace(&mut self, agents: &AgentView) {
        self.agent_workspace.clear();
        self.agent_workspace.extend(
            agents
                .iter()
                .filter(|agent| agent.vitals.is_alive())
                .map(|agent| AgentCandidate {
                    id: agent.id,
                    position: agent.position,
                }),
        );
    }
}

/// Signed angle in degrees rotating `from` onto `to`, counter-clockwise positive.
#[must_use]
pub fn signed_angle_degrees(from: Vec2, to: Vec2) -> f32 {
    from.perp_dot(to).atan2(from.dot(to)).to_degrees()
}

fn engage(
    profile: &AimProfile,
    shooter: Vec2,
    heading: Option<Vec2>,
    target: Vec2,
) -> Option<Vec2> {
    let offset = target - shooter;
    let distance = offset.length();
    if distance > profile.auto_aim_range {
        return None;
    }
    if profile.shooting_range.is_some_and(|range| distance > range) {
        return None;
    }

    let direction = offset.normalize_or_zero();
    if direction == Vec2::ZERO {
        return None;
    }

    if let (Some(tolerance), Some(heading)) = (profile.aim_tolerance_degrees, heading) {
        if signed_angle_degrees(heading, direction).abs() > tolerance {
            return None;
        }
    }

    Some(direction)
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct AgentCandidate {
    id: AgentId,
    position: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct BestCandidate {
    distance_sq: f32,
    agent: AgentId,
    position: Vec2,
}

impl BestCandidate {
    fn precedes(&self, other: &Self) -> bool {
        if self.distance_sq != other.distance_sq {
            return self.distance_sq < other.distance_sq;
        }

        self.agent < other.agent
    }
}
