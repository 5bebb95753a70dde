use tracing::trace;

use crate::AgentId;
use crate::agent::{Agent, TickContext};
use crate::entities::Food;
use crate::movement;
use crate::scent::ScentKind;
use crate::senses;

use super::{SpeciesRoutine, flee, follow_gradient};

/// Gatherers that carry food home to their nest.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForagerRoutine;

impl SpeciesRoutine for ForagerRoutine {
    fn escape(&self, agent: &mut Agent, id: AgentId, ctx: &mut TickContext<'_>) {
        if flee(agent, id, ctx) {
            return;
        }
        follow_gradient(agent, ctx, ScentKind::Food, true);
        forage_cycle(agent, ctx);
    }

    fn gather(&self, agent: &mut Agent, _id: AgentId, ctx: &mut TickContext<'_>) {
        forage_cycle(agent, ctx);
    }

    fn neutral(&self, agent: &mut Agent, _id: AgentId, ctx: &mut TickContext<'_>) {
        forage_cycle(agent, ctx);
    }
}

/// Pick up food, carry it home, deliver it.
pub(crate) fn forage_cycle(agent: &mut Agent, ctx: &mut TickContext<'_>) {
    if agent.carrying {
        carry_home(agent, ctx);
        return;
    }

    let keep_range = agent.genome.vision * ctx.config.food_vision_extension;
    let cached = agent.target_food.and_then(|food_id| {
        let item = ctx.food.get(food_id)?;
        (item.alive && agent.position.distance(item.position) <= keep_range)
            .then_some((food_id, item.position))
    });
    let target = cached.or_else(|| {
        senses::nearest_food(agent.position, agent.genome.vision, ctx.food)
            .map(|sighting| (sighting.id, sighting.position))
    });

    let Some((food_id, position)) = target else {
        agent.target_food = None;
        if !follow_gradient(agent, ctx, ScentKind::Food, true) {
            movement::wander(agent, ctx.dt, ctx.rng);
        }
        return;
    };

    agent.target_food = Some(food_id);
    agent.velocity = movement::steer_toward(agent.velocity, agent.position, position);
    if agent.position.distance(position) <= ctx.config.pickup_distance
        && let Some(item) = ctx.food.get_mut(food_id)
    {
        item.alive = false;
        agent.carrying = true;
        agent.carried_energy = item.energy.unwrap_or(ctx.config.delivery_reward);
        agent.target_food = None;
    }
}

fn carry_home(agent: &mut Agent, ctx: &mut TickContext<'_>) {
    let Some(zone) = ctx.nests.get_nest(agent) else {
        movement::wander(agent, ctx.dt, ctx.rng);
        return;
    };
    agent.velocity = movement::steer_toward(agent.velocity, agent.position, zone.center);
    if agent.position.distance(zone.center) > ctx.config.drop_distance {
        return;
    }

    agent.carrying = false;
    agent.gain_energy(agent.carried_energy);
    agent.carried_energy = 0.0;
    agent.refresh_readiness(ctx.config);
    ctx.outbox.deliveries.push(zone.id);
    if ctx.config.respawn_food_on_delivery {
        let position = ctx.config.random_point(ctx.rng);
        ctx.outbox.food.push(Food::new(position));
    }
    trace!(zone = zone.id.0, energy = agent.energy, "food delivered");
}
