use rand::Rng;
use tracing::trace;

use crate::agent::{Agent, TickContext};
use crate::entities::Food;
use crate::movement;
use crate::scent::ScentKind;
use crate::senses;
use crate::{AgentId, CorpseId, Position};

use super::{SpeciesRoutine, flee, follow_gradient, forage_cycle};

/// Carrion eaters that turn corpses into food and defend themselves with toxin.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecomposerRoutine;

impl SpeciesRoutine for DecomposerRoutine {
    fn escape(&self, agent: &mut Agent, id: AgentId, ctx: &mut TickContext<'_>) {
        agent.release_toxin(ctx);
        if flee(agent, id, ctx) {
            return;
        }
        follow_gradient(agent, ctx, ScentKind::Food, true);
        forage_cycle(agent, ctx);
    }

    fn gather(&self, agent: &mut Agent, _id: AgentId, ctx: &mut TickContext<'_>) {
        let range = agent.genome.vision * ctx.config.corpse_vision_factor;
        let cached = agent.target_corpse.and_then(|corpse_id| {
            let corpse = ctx.corpses.get(corpse_id)?;
            (corpse.alive() && agent.position.distance(corpse.position) <= range)
                .then_some(corpse_id)
        });
        let target = cached.or_else(|| {
            senses::nearest_corpse(agent.position, range, ctx.corpses).map(|sighting| sighting.id)
        });

        let Some(corpse_id) = target else {
            agent.target_corpse = None;
            if !follow_gradient(agent, ctx, ScentKind::Corpse, true) {
                movement::wander(agent, ctx.dt, ctx.rng);
            }
            return;
        };
        let Some(corpse) = ctx.corpses.get(corpse_id) else {
            agent.target_corpse = None;
            return;
        };
        let position = corpse.position;
        let contact = agent.radius + corpse.radius;

        agent.target_corpse = Some(corpse_id);
        agent.velocity = movement::steer_toward(agent.velocity, agent.position, position);
        if agent.position.distance(position) <= contact {
            bite(agent, corpse_id, ctx);
        }
    }

    fn neutral(&self, agent: &mut Agent, _id: AgentId, ctx: &mut TickContext<'_>) {
        forage_cycle(agent, ctx);
    }
}

fn bite(agent: &mut Agent, corpse_id: CorpseId, ctx: &mut TickContext<'_>) {
    let config = ctx.config;
    let Some(corpse) = ctx.corpses.get_mut(corpse_id) else {
        return;
    };
    let headroom = (agent.energy_max - agent.energy).max(0.0);
    let eaten = corpse.consume(headroom * config.decomposer_bite_fraction);
    let emptied = !corpse.alive();
    if emptied {
        agent.target_corpse = None;
    }
    if eaten <= 0.0 {
        return;
    }

    let absorbed = eaten * config.decomposer_absorb_fraction;
    agent.gain_energy(absorbed);
    agent.refresh_readiness(config);
    let excreted = excrete(agent.position, eaten - absorbed, ctx);
    trace!(eaten, absorbed, excreted, emptied, "decomposer bite");
}

/// Drops food items holding at most one unit each. Returns how many were dropped.
fn excrete(origin: Position, mut energy: f32, ctx: &mut TickContext<'_>) -> usize {
    let unit = ctx.config.food_unit_energy;
    let minimum = unit * ctx.config.min_food_fraction;
    let scatter = ctx.config.excretion_scatter;
    let width = ctx.config.width();
    let height = ctx.config.height();
    let mut dropped = 0;
    while energy > 0.0 && energy >= minimum {
        let portion = energy.min(unit);
        energy -= portion;
        let (dx, dy) = if scatter > 0.0 {
            (
                ctx.rng.random_range(-scatter..=scatter),
                ctx.rng.random_range(-scatter..=scatter),
            )
        } else {
            (0.0, 0.0)
        };
        let spot = origin.offset(dx, dy);
        let spot = Position::new(spot.x.clamp(0.0, width), spot.y.clamp(0.0, height));
        ctx.outbox.food.push(Food::with_energy(spot, portion));
        dropped += 1;
    }
    dropped
}
