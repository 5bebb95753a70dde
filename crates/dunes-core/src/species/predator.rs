use tracing::debug;

use crate::agent::{Agent, TickContext};
use crate::movement;
use crate::scent::ScentKind;
use crate::senses::{self, Sighting};
use crate::{AgentId, Velocity};

use super::{SpeciesRoutine, flee, follow_gradient};

/// Hunters that kill smaller agents and hibernate when starving.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredatorRoutine;

impl SpeciesRoutine for PredatorRoutine {
    fn escape(&self, agent: &mut Agent, id: AgentId, ctx: &mut TickContext<'_>) {
        if !flee(agent, id, ctx) {
            movement::wander(agent, ctx.dt, ctx.rng);
        }
    }

    fn gather(&self, agent: &mut Agent, id: AgentId, ctx: &mut TickContext<'_>) {
        let config = ctx.config;
        let fullness = agent.energy_fraction();
        let prey = senses::nearest_prey(agent, id, ctx);

        if fullness <= config.hibernation_fraction {
            agent.hibernating = true;
            // No floor: a long hibernation keeps lowering metabolism.
            agent.genome.metabolism *= config.hibernation_metabolism_decay;
            let pursuing = prey.is_some_and(|prey| pursue(agent, id, prey, ctx));
            if !pursuing {
                agent.target_prey = None;
                agent.velocity = Velocity::default();
            }
            return;
        }

        match prey {
            Some(prey) if fullness < config.predator_satiation_fraction => {
                if !pursue(agent, id, prey, ctx) {
                    agent.target_prey = None;
                    movement::wander(agent, ctx.dt, ctx.rng);
                }
            }
            Some(_) => movement::wander(agent, ctx.dt, ctx.rng),
            None => {
                agent.target_prey = None;
                if follow_gradient(agent, ctx, ScentKind::Prey, true) {
                    return;
                }
                if fullness < config.predator_hunger_fraction {
                    scavenge(agent, ctx);
                } else {
                    movement::wander(agent, ctx.dt, ctx.rng);
                }
            }
        }
    }

    fn neutral(&self, agent: &mut Agent, _id: AgentId, ctx: &mut TickContext<'_>) {
        movement::wander(agent, ctx.dt, ctx.rng);
    }
}

/// Chases `sighting`, killing on contact. Returns `false` when the prey is out of reach.
fn pursue(
    agent: &mut Agent,
    id: AgentId,
    sighting: Sighting<AgentId>,
    ctx: &mut TickContext<'_>,
) -> bool {
    let Some(prey) = ctx.agents.get(sighting.id) else {
        return false;
    };
    let sheltered = ctx
        .nests
        .get_nest(prey)
        .is_some_and(|zone| zone.contains(prey.position) && !ctx.nests.can_enter(agent, &zone));
    if sheltered {
        return false;
    }
    let contact = agent.radius + prey.radius;
    let safe = ctx.nests.is_safe_zone(agent, prey);
    let prey_position = prey.position;

    agent.target_prey = Some(sighting.id);
    agent.velocity = movement::steer_toward(agent.velocity, agent.position, prey_position);
    if agent.position.distance(prey_position) <= contact && !safe {
        kill(agent, id, sighting.id, ctx);
    }
    true
}

fn kill(agent: &mut Agent, id: AgentId, prey_id: AgentId, ctx: &mut TickContext<'_>) {
    let Some(prey) = ctx.agents.get_mut(prey_id) else {
        return;
    };
    prey.alive = false;
    prey.energy = 0.0;

    let config = ctx.config;
    let gain = config.predation_gain;
    if config.digest_time > 0.0 {
        agent.gain_energy(gain * config.predation_instant_fraction);
        agent.digest_pool += gain * (1.0 - config.predation_instant_fraction);
        agent.digest_timer = config.digest_time;
    } else {
        agent.gain_energy(gain);
    }
    agent.target_prey = None;
    agent.refresh_readiness(config);
    ctx.outbox.kills.push((id, prey_id));
    debug!(?id, ?prey_id, energy = agent.energy, "predator made a kill");
}

/// Eats plain food on the spot at a reduced reward.
fn scavenge(agent: &mut Agent, ctx: &mut TickContext<'_>) {
    let Some(food) = senses::nearest_food(agent.position, agent.genome.vision, ctx.food) else {
        movement::wander(agent, ctx.dt, ctx.rng);
        return;
    };
    agent.velocity = movement::steer_toward(agent.velocity, agent.position, food.position);
    if food.distance <= ctx.config.pickup_distance
        && let Some(item) = ctx.food.get_mut(food.id)
    {
        item.alive = false;
        agent.gain_energy(ctx.config.delivery_reward * ctx.config.predator_food_reward_factor);
        agent.refresh_readiness(ctx.config);
    }
}
