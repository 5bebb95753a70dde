//! Direct perception: nearest threats, prey, food and corpses.

use ordered_float::OrderedFloat;
use slotmap::{Key, SlotMap};

use crate::agent::{Agent, TickContext};
use crate::entities::{Corpse, Food};
use crate::species::Species;
use crate::{AgentId, CorpseId, FoodId, Position};

/// Something the agent noticed, with its distance at the time of sensing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting<K: Key> {
    pub id: K,
    pub position: Position,
    pub distance: f32,
}

fn nearest_agent(
    agent: &Agent,
    id: AgentId,
    ctx: &TickContext<'_>,
    accept: impl Fn(&Agent) -> bool,
) -> Option<Sighting<AgentId>> {
    let mut best: Option<Sighting<AgentId>> = None;
    for (other_id, other) in ctx.agents.iter() {
        if other_id == id || !other.alive || !accept(other) {
            continue;
        }
        let distance = agent.position.distance(other.position);
        if distance >= agent.genome.vision {
            continue;
        }
        if ctx.nests.is_safe_zone(agent, other) {
            continue;
        }
        if best.is_none_or(|b| distance < b.distance) {
            best = Some(Sighting {
                id: other_id,
                position: other.position,
                distance,
            });
        }
    }
    best
}

/// Nearest visible predator big enough to eat `agent`.
#[must_use]
pub fn nearest_threat(
    agent: &Agent,
    id: AgentId,
    ctx: &TickContext<'_>,
) -> Option<Sighting<AgentId>> {
    let ratio = ctx.config.predation_size_ratio;
    nearest_agent(agent, id, ctx, |other| {
        other.species == Species::Predator && other.genome.size >= agent.genome.size * ratio
    })
}

/// Nearest visible agent small enough for `agent` to eat.
#[must_use]
pub fn nearest_prey(
    agent: &Agent,
    id: AgentId,
    ctx: &TickContext<'_>,
) -> Option<Sighting<AgentId>> {
    let ratio = ctx.config.predation_size_ratio;
    nearest_agent(agent, id, ctx, |other| {
        other.genome.size * ratio < agent.genome.size
    })
}

/// Nearest live food within `range` of `from`.
#[must_use]
pub fn nearest_food(
    from: Position,
    range: f32,
    food: &SlotMap<FoodId, Food>,
) -> Option<Sighting<FoodId>> {
    food.iter()
        .filter(|(_, item)| item.alive)
        .map(|(id, item)| Sighting {
            id,
            position: item.position,
            distance: from.distance(item.position),
        })
        .filter(|s| s.distance <= range)
        .min_by_key(|s| OrderedFloat(s.distance))
}

/// Nearest live corpse within `range` of `from`.
#[must_use]
pub fn nearest_corpse(
    from: Position,
    range: f32,
    corpses: &SlotMap<CorpseId, Corpse>,
) -> Option<Sighting<CorpseId>> {
    corpses
        .iter()
        .filter(|(_, corpse)| corpse.alive())
        .map(|(id, corpse)| Sighting {
            id,
            position: corpse.position,
            distance: from.distance(corpse.position),
        })
        .filter(|s| s.distance <= range)
        .min_by_key(|s| OrderedFloat(s.distance))
}
