//! Courtship: calls, responses, pairing timeouts and reproduction.

use ordered_float::OrderedFloat;
use rand::Rng;
use tracing::debug;

use crate::arena::AgentArena;
use crate::agent::{Agent, TickContext};
use crate::genome::crossover;
use crate::movement;
use crate::{AgentId, Position, Velocity};

/// Clears the pairing on both sides.
pub fn unpair(agent: &mut Agent, id: AgentId, agents: &mut AgentArena) {
    if let Some(partner_id) = agent.courtship.partner
        && let Some(partner) = agents.get_mut(partner_id)
        && partner.courtship.partner == Some(id)
    {
        partner.courtship.clear_pairing();
    }
    agent.courtship.clear_pairing();
}

/// Gives up on a pairing that took too long; the abandoner's drive is scaled
/// by `drive_factor`.
pub fn abandon(agent: &mut Agent, id: AgentId, agents: &mut AgentArena, drive_factor: f32) {
    unpair(agent, id, agents);
    agent.mate_drive *= drive_factor;
}

/// Drops stale call and partner references and abandons overdue pairings.
pub fn check_pairing(agent: &mut Agent, id: AgentId, ctx: &mut TickContext<'_>) {
    if let Some(caller) = agent.courtship.heard_call
        && !ctx.agents.get(caller).is_some_and(|c| c.alive)
    {
        agent.courtship.heard_call = None;
    }

    let Some(partner_id) = agent.courtship.partner else {
        return;
    };
    let mutual = ctx
        .agents
        .get(partner_id)
        .is_some_and(|p| p.alive && p.courtship.partner == Some(id));
    if !mutual {
        unpair(agent, id, ctx.agents);
        return;
    }
    if agent.courtship.pair_age > agent.tuning(ctx.config).abandon_timeout {
        debug!(?id, ?partner_id, "pairing abandoned");
        abandon(agent, id, ctx.agents, ctx.config.abandon_drive_factor);
    }
}

/// The mate behavior: call, head home with a partner, and try to reproduce.
pub fn court(agent: &mut Agent, id: AgentId, ctx: &mut TickContext<'_>) {
    if !agent.courtship.calling && agent.courtship.call_cooldown <= 0.0 {
        maybe_call(agent, id, ctx);
    }

    if let Some(partner_id) = agent.courtship.partner {
        match ctx.nests.get_nest(agent) {
            Some(zone) if ctx.nests.can_enter(agent, &zone) => {
                if !zone.contains(agent.position) {
                    agent.velocity =
                        movement::steer_toward(agent.velocity, agent.position, zone.center);
                } else if let Some(partner) = ctx.agents.get(partner_id) {
                    let close = agent.tuning(ctx.config).mate_distance_factor * agent.radius;
                    if agent.position.distance(partner.position) > close {
                        agent.velocity = movement::steer_toward(
                            agent.velocity,
                            agent.position,
                            partner.position,
                        );
                    }
                }
            }
            _ => unpair(agent, id, ctx.agents),
        }
    } else if let Some(caller) = agent
        .courtship
        .heard_call
        .and_then(|caller| ctx.agents.get(caller))
    {
        let target = caller.position;
        agent.velocity = movement::steer_toward(agent.velocity, agent.position, target);
    } else {
        agent.species.routine().neutral(agent, id, ctx);
    }

    if let Some(child) = try_mate(agent, id, ctx) {
        ctx.outbox.births.push(child);
    }
}

/// Opens a call from inside the home zone. The first eligible listener in range
/// responds and pairs immediately; every eligible listener records the call.
pub fn maybe_call(agent: &mut Agent, id: AgentId, ctx: &mut TickContext<'_>) {
    if !agent.alive
        || !agent.ready_to_mate
        || agent.courtship.is_paired()
        || agent.courtship.call_cooldown > 0.0
    {
        return;
    }
    let Some(zone) = ctx.nests.home_if_inside(agent) else {
        return;
    };

    let tuning = *agent.tuning(ctx.config);
    agent.courtship.calling = true;
    agent.courtship.call_timer = ctx.config.call_duration;
    agent.courtship.call_cooldown = tuning.call_cooldown;
    let range = ctx.config.call_range_per_vision * agent.genome.vision * tuning.call_range_factor;

    let listeners: Vec<AgentId> = ctx
        .agents
        .iter()
        .filter(|&(other_id, other)| {
            other_id != id
                && other.alive
                && other.ready_to_mate
                && !other.courtship.is_paired()
                && agent.position.distance(other.position) < range
                && ctx
                    .nests
                    .get_nest(other)
                    .is_some_and(|home| home.id == zone.id)
        })
        .map(|(other_id, _)| other_id)
        .collect();

    for other_id in listeners {
        let Some(other) = ctx.agents.get_mut(other_id) else {
            continue;
        };
        other.courtship.heard_call = Some(id);
        if agent.courtship.is_paired() {
            continue;
        }
        other.courtship.responding = true;
        other.courtship.response_timer = ctx.config.response_duration;
        other.courtship.partner = Some(id);
        other.courtship.pair_age = 0.0;
        agent.courtship.partner = Some(other_id);
        agent.courtship.pair_age = 0.0;
        debug!(caller = ?id, responder = ?other_id, "pair formed");
    }
}

fn eligible_in_home(agent: &Agent, ctx: &TickContext<'_>) -> bool {
    agent.alive && agent.ready_to_mate && ctx.nests.home_if_inside(agent).is_some()
}

/// Reproduces with the partner (or the nearest ready agent sharing the zone)
/// once within mating distance; otherwise closes in on it.
pub fn try_mate(agent: &mut Agent, id: AgentId, ctx: &mut TickContext<'_>) -> Option<Agent> {
    if !agent.alive || !agent.ready_to_mate {
        return None;
    }
    let zone = ctx.nests.get_nest(agent)?;
    if !ctx.nests.can_enter(agent, &zone) {
        return None;
    }
    if !zone.contains(agent.position) {
        agent.velocity = movement::steer_toward(agent.velocity, agent.position, zone.center);
        return None;
    }

    let candidate = match agent.courtship.partner {
        Some(partner_id) => {
            let partner = ctx.agents.get(partner_id)?;
            (partner.courtship.partner == Some(id) && eligible_in_home(partner, ctx))
                .then_some(partner_id)
        }
        None => nearest_unpaired_mate(agent, id, ctx),
    }?;

    let (distance, candidate_position) = {
        let other = ctx.agents.get(candidate)?;
        (agent.position.distance(other.position), other.position)
    };
    let threshold = agent.tuning(ctx.config).mate_distance_factor * agent.radius;
    if distance > threshold {
        agent.velocity = movement::steer_toward(agent.velocity, agent.position, candidate_position);
        return None;
    }

    reproduce(agent, id, candidate, ctx)
}

fn nearest_unpaired_mate(agent: &Agent, id: AgentId, ctx: &TickContext<'_>) -> Option<AgentId> {
    let reach = agent.genome.vision * ctx.config.mate_search_vision_factor;
    let home = ctx.nests.get_nest(agent)?;
    ctx.agents
        .iter()
        .filter(|&(other_id, other)| {
            other_id != id
                && !other.courtship.is_paired()
                && eligible_in_home(other, ctx)
                && ctx.nests.get_nest(other).is_some_and(|z| z.id == home.id)
                && ctx.nests.is_safe_zone(agent, other)
        })
        .map(|(other_id, other)| (other_id, agent.position.distance(other.position)))
        .filter(|&(_, distance)| distance < reach)
        .min_by_key(|&(_, distance)| OrderedFloat(distance))
        .map(|(other_id, _)| other_id)
}

fn reproduce(
    agent: &mut Agent,
    id: AgentId,
    mate_id: AgentId,
    ctx: &mut TickContext<'_>,
) -> Option<Agent> {
    let config = ctx.config;
    let mate = ctx.agents.get_mut(mate_id)?;

    agent.energy *= 1.0 - agent.tuning(config).mating_cost;
    mate.energy *= 1.0 - mate.tuning(config).mating_cost;
    agent.ready_to_mate = false;
    mate.ready_to_mate = false;

    let genome = crossover(&agent.genome, &mate.genome, config.mutation_sigma, ctx.rng);
    let generation = agent.generation.max(mate.generation).next();
    let midpoint = agent.position.midpoint(mate.position);

    mate.courtship.clear_pairing();
    mate.courtship.call_cooldown = mate.tuning(config).call_cooldown;
    mate.mate_drive = 0.0;
    agent.courtship.clear_pairing();
    agent.courtship.call_cooldown = agent.tuning(config).call_cooldown;
    agent.mate_drive = 0.0;

    let jitter = config.child_spawn_jitter;
    let (dx, dy) = if jitter > 0.0 {
        (
            ctx.rng.random_range(-jitter..=jitter),
            ctx.rng.random_range(-jitter..=jitter),
        )
    } else {
        (0.0, 0.0)
    };
    let spot = midpoint.offset(dx, dy);
    let spot = Position::new(
        spot.x.clamp(0.0, config.width()),
        spot.y.clamp(0.0, config.height()),
    );

    let mut child = Agent::new(genome, spot, config);
    child.energy = child.energy_max
        * ctx
            .rng
            .random_range(config.child_energy_min..=config.child_energy_max);
    child.velocity = Velocity::from_angle(ctx.rng.random_range(0.0..std::f32::consts::TAU));
    child.wander_timer = ctx.rng.random_range(0.2..=1.0);
    child.generation = generation;
    debug!(parent = ?id, mate = ?mate_id, generation = generation.0, "child conceived");
    Some(child)
}
