//! Authoritative enemy agent state management utilities.

use std::collections::BTreeMap;

use glam::Vec2;
use prophecy_core::{AgentId, AgentKind, AgentSnapshot, Facing, Vitals};

/// State of an agent stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct AgentState {
    pub(crate) id: AgentId,
    pub(crate) kind: AgentKind,
    pub(crate) position: Vec2,
    pub(crate) spawn_point: Vec2,
    pub(crate) facing: Facing,
    pub(crate) vitals: Vitals,
}

impl AgentState {
    pub(crate) fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position,
            spawn_point: self.spawn_point,
            facing: self.facing,
            vitals: self.vitals,
        }
    }
}

/// Registry that stores agents and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct AgentRegistry {
    entries: BTreeMap<AgentId, AgentState>,
    next_agent_id: AgentId,
}

impl AgentRegistry {
    /// Creates an empty agent registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_agent_id: AgentId::new(0),
        }
    }

    /// Registers a new agent and returns the identifier allocated for it.
    pub(crate) fn insert(&mut self, kind: AgentKind, position: Vec2, vitals: Vitals) -> AgentId {
        let id = self.next_agent_id;
        self.next_agent_id = AgentId::new(id.get().wrapping_add(1));
        let _ = self.entries.insert(
            id,
            AgentState {
                id,
                kind,
                position,
                spawn_point: position,
                facing: Facing::default(),
                vitals,
            },
        );
        id
    }

    pub(crate) fn get(&self, id: AgentId) -> Option<&AgentState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: AgentId) -> Option<&mut AgentState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: AgentId) -> Option<AgentState> {
        self.entries.remove(&id)
    }

    /// Agents in identifier order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &AgentState> {
        self.entries.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_starts_empty_with_zero_identifier() {
        let registry = AgentRegistry::new();
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.next_agent_id.get(), 0);
    }

    #[test]
    fn inserted_agents_receive_sequential_identifiers() {
        let mut registry = AgentRegistry::new();
        let first = registry.insert(AgentKind::Melee, Vec2::ZERO, Vitals::full(3, 0));
        let second = registry.insert(AgentKind::Ranged, Vec2::ONE, Vitals::full(3, 0));

        assert_eq!(first, AgentId::new(0));
        assert_eq!(second, AgentId::new(1));
        let state = registry.get(second).expect("agent registered");
        assert_eq!(state.spawn_point, Vec2::ONE);
        assert_eq!(state.kind, AgentKind::Ranged);
    }

    #[test]
    fn removed_identifiers_are_not_reused() {
        let mut registry = AgentRegistry::new();
        let first = registry.insert(AgentKind::Melee, Vec2::ZERO, Vitals::full(3, 0));
        assert!(registry.remove(first).is_some());

        let second = registry.insert(AgentKind::Melee, Vec2::ZERO, Vitals::full(3, 0));
        assert_ne!(first, second);
        assert_eq!(registry.len(), 1);
    }
}
