use std::collections::HashSet;

use slotmap::SlotMap;

use crate::AgentId;
use crate::agent::Agent;

/// Agent storage with generational handles and a stable insertion order.
#[derive(Debug, Clone, Default)]
pub struct AgentArena {
    slots: SlotMap<AgentId, Agent>,
    handles: Vec<AgentId>,
}

impl AgentArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: SlotMap::with_capacity_and_key(capacity),
            handles: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Handles in insertion order.
    #[must_use]
    pub fn handles(&self) -> &[AgentId] {
        &self.handles
    }

    /// Iterate agents in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &Agent)> + '_ {
        self.handles
            .iter()
            .filter_map(|&id| self.slots.get(id).map(|agent| (id, agent)))
    }

    #[must_use]
    pub fn contains(&self, id: AgentId) -> bool {
        self.slots.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.slots.get(id)
    }

    #[must_use]
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.slots.get_mut(id)
    }

    /// Insert a new agent at the end of the iteration order.
    pub fn insert(&mut self, agent: Agent) -> AgentId {
        let id = self.slots.insert(agent);
        self.handles.push(id);
        id
    }

    /// Overwrite the agent stored under `id`. Returns `false` if the handle is stale.
    pub fn replace(&mut self, id: AgentId, agent: Agent) -> bool {
        match self.slots.get_mut(id) {
            Some(slot) => {
                *slot = agent;
                true
            }
            None => false,
        }
    }

    /// Remove all agents whose ids are contained in `dead`, preserving iteration order.
    pub fn remove_many(&mut self, dead: &HashSet<AgentId>) -> usize {
        if dead.is_empty() {
            return 0;
        }
        let before = self.handles.len();
        for &id in dead {
            self.slots.remove(id);
        }
        self.handles.retain(|id| !dead.contains(id));
        before - self.handles.len()
    }
}
