//! Individual creatures and their per-tick update sequence.

use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tracing::debug;

use crate::arena::AgentArena;
use crate::config::{SimConfig, SpeciesTuning};
use crate::entities::{Corpse, Food};
use crate::genome::Genome;
use crate::mating;
use crate::movement;
use crate::nest::{NestGateway, ZoneId};
use crate::priority::{
    Behavior, OverrideOutcome, Priorities, PriorityInputs, escape_score, gather_score,
    select_behavior,
};
use crate::scent::{ScentField, ScentKind};
use crate::senses;
use crate::species::Species;
use crate::{AgentId, CorpseId, FoodId, Generation, Position, Velocity};

/// Call, response and pairing state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Courtship {
    pub calling: bool,
    pub call_timer: f32,
    pub responding: bool,
    pub response_timer: f32,
    pub call_cooldown: f32,
    /// Mutual: `a.partner == Some(b)` exactly when `b.partner == Some(a)`.
    pub partner: Option<AgentId>,
    pub heard_call: Option<AgentId>,
    /// Seconds since the current pairing formed.
    pub pair_age: f32,
}

impl Courtship {
    /// Drops partner, call and response state. Cooldown is left alone.
    pub fn clear_pairing(&mut self) {
        self.partner = None;
        self.heard_call = None;
        self.calling = false;
        self.call_timer = 0.0;
        self.responding = false;
        self.response_timer = 0.0;
        self.pair_age = 0.0;
    }

    #[must_use]
    pub const fn is_paired(&self) -> bool {
        self.partner.is_some()
    }
}

/// A single creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub position: Position,
    /// Unit heading, or zero while resting.
    pub velocity: Velocity,
    pub radius: f32,
    pub base_speed: f32,
    pub energy_max: f32,
    pub energy: f32,
    pub alive: bool,
    pub genome: Genome,
    pub species: Species,
    pub generation: Generation,
    pub carrying: bool,
    pub carried_energy: f32,
    pub target_food: Option<FoodId>,
    pub target_prey: Option<AgentId>,
    pub target_corpse: Option<CorpseId>,
    pub ready_to_mate: bool,
    pub mate_drive: f32,
    pub courtship: Courtship,
    pub digest_timer: f32,
    /// Energy still waiting to be digested.
    pub digest_pool: f32,
    pub toxin_cooldown: f32,
    pub hibernating: bool,
    pub wander_timer: f32,
    pub scent_timer: f32,
    pub priorities: Priorities,
    pub behavior: Behavior,
}

impl Agent {
    /// Builds an agent with full energy and stats derived from `genome`.
    #[must_use]
    pub fn new(genome: Genome, position: Position, config: &SimConfig) -> Self {
        let species = Species::classify(&genome, config);
        let base_speed = match species {
            Species::Decomposer => config.decomposer_speed,
            _ => config.base_speed * genome.speed,
        };
        let energy_max = config.energy_base_max * genome.size;
        Self {
            position,
            velocity: Velocity::new(1.0, 0.0),
            radius: config.base_radius * genome.size,
            base_speed,
            energy_max,
            energy: energy_max,
            alive: true,
            genome,
            species,
            generation: Generation::default(),
            carrying: false,
            carried_energy: 0.0,
            target_food: None,
            target_prey: None,
            target_corpse: None,
            ready_to_mate: false,
            mate_drive: 0.0,
            courtship: Courtship::default(),
            digest_timer: 0.0,
            digest_pool: 0.0,
            toxin_cooldown: 0.0,
            hibernating: false,
            wander_timer: 0.0,
            scent_timer: 0.0,
            priorities: Priorities::default(),
            behavior: Behavior::default(),
        }
    }

    /// Seeding variant: random heading, partial energy and staggered timers.
    pub fn founder(
        genome: Genome,
        position: Position,
        config: &SimConfig,
        rng: &mut SmallRng,
    ) -> Self {
        let mut agent = Self::new(genome, position, config);
        agent.velocity = Velocity::from_angle(rng.random_range(0.0..std::f32::consts::TAU));
        agent.energy = agent.energy_max * rng.random_range(0.6..=1.0);
        agent.wander_timer = rng.random_range(0.5..=2.0);
        let cooldown = agent.tuning(config).call_cooldown;
        if cooldown > 0.0 {
            agent.courtship.call_cooldown = rng.random_range(0.0..cooldown);
        }
        agent
    }

    #[must_use]
    pub fn energy_fraction(&self) -> f32 {
        if self.energy_max > 0.0 {
            self.energy / self.energy_max
        } else {
            0.0
        }
    }

    #[must_use]
    pub fn tuning<'c>(&self, config: &'c SimConfig) -> &'c SpeciesTuning {
        config.species.get(self.species)
    }

    #[must_use]
    pub const fn scent_kind(&self) -> ScentKind {
        self.species.scent_kind()
    }

    /// Adds energy, capped at capacity.
    pub fn gain_energy(&mut self, amount: f32) {
        self.energy = (self.energy + amount).clamp(0.0, self.energy_max);
    }

    /// Re-evaluates readiness after feeding.
    pub fn refresh_readiness(&mut self, config: &SimConfig) {
        self.ready_to_mate = self.energy >= config.mating_energy_fraction * self.energy_max;
    }

    /// Runs one tick for this agent. `id` is the handle the agent is stored under.
    pub fn update(&mut self, id: AgentId, ctx: &mut TickContext<'_>) {
        if !self.alive {
            return;
        }
        let dt = ctx.dt;
        self.hibernating = false;
        self.tick_timers(dt);
        mating::check_pairing(self, id, ctx);
        self.mate_drive = (self.mate_drive + ctx.config.mate_drive_rate * dt)
            .clamp(0.0, ctx.config.mate_drive_cap);
        self.emit_scent(ctx);

        let outcome = self.decide(id, ctx);
        if outcome.break_pairing {
            mating::unpair(self, id, ctx.agents);
        }
        if outcome.release_toxin {
            self.release_toxin(ctx);
        }
        self.execute(id, ctx);

        movement::integrate(self, dt, ctx.config, ctx.nests);
        self.metabolize(dt, ctx.config);
    }

    fn tick_timers(&mut self, dt: f32) {
        let courtship = &mut self.courtship;
        if courtship.call_timer > 0.0 {
            courtship.call_timer -= dt;
            if courtship.call_timer <= 0.0 {
                courtship.call_timer = 0.0;
                courtship.calling = false;
            }
        }
        if courtship.response_timer > 0.0 {
            courtship.response_timer -= dt;
            if courtship.response_timer <= 0.0 {
                courtship.response_timer = 0.0;
                courtship.responding = false;
            }
        }
        courtship.call_cooldown = (courtship.call_cooldown - dt).max(0.0);
        if courtship.partner.is_some() {
            courtship.pair_age += dt;
        }
        self.toxin_cooldown = (self.toxin_cooldown - dt).max(0.0);
    }

    fn emit_scent(&mut self, ctx: &mut TickContext<'_>) {
        self.scent_timer += ctx.dt;
        if self.scent_timer > ctx.config.agent_scent_interval {
            ctx.scent
                .emit(self.position.x, self.position.y, self.scent_kind(), 1.0);
            self.scent_timer = 0.0;
        }
    }

    fn decide(&mut self, id: AgentId, ctx: &mut TickContext<'_>) -> OverrideOutcome {
        let threat = senses::nearest_threat(self, id, ctx);
        let escape = escape_score(threat.map(|t| t.distance), self.genome.vision);
        let spread = ctx.config.gather_noise;
        let noise = if spread > 0.0 {
            ctx.rng.random_range(-spread..=spread)
        } else {
            0.0
        };
        let base = Priorities::new(
            escape,
            gather_score(self.energy_fraction(), noise),
            self.mate_drive,
        );
        let inputs = PriorityInputs {
            energy_fraction: self.energy_fraction(),
            is_decomposer: self.species == Species::Decomposer,
            paired: self.courtship.is_paired(),
        };
        let (scores, behavior, outcome) = select_behavior(base, &inputs, ctx.config);
        self.priorities = scores;
        self.behavior = behavior;
        outcome
    }

    fn execute(&mut self, id: AgentId, ctx: &mut TickContext<'_>) {
        let routine = self.species.routine();
        match self.behavior {
            Behavior::Escape => routine.escape(self, id, ctx),
            Behavior::Gather => routine.gather(self, id, ctx),
            Behavior::Mate => mating::court(self, id, ctx),
        }
    }

    /// Deposits a toxin plume when the cooldown allows.
    pub fn release_toxin(&mut self, ctx: &mut TickContext<'_>) {
        if self.toxin_cooldown > 0.0 {
            return;
        }
        ctx.scent.emit(
            self.position.x,
            self.position.y,
            ScentKind::Toxin,
            self.genome.toxin,
        );
        self.toxin_cooldown = ctx.config.toxin_cooldown;
        ctx.outbox.toxin_releases += 1;
        debug!(x = self.position.x, y = self.position.y, "toxin released");
    }

    fn metabolize(&mut self, dt: f32, config: &SimConfig) {
        let intensity = self.velocity.length().clamp(0.0, 1.0);
        let drain =
            (config.idle_energy_cost + config.move_energy_cost * intensity) * self.genome.metabolism;
        self.energy -= drain * dt;

        if self.digest_timer > 0.0 {
            let share = self.digest_pool * (dt / self.digest_timer).min(1.0);
            self.digest_pool -= share;
            self.energy += share;
            self.digest_timer -= dt;
            if self.digest_timer <= 0.0 {
                self.digest_timer = 0.0;
                self.digest_pool = 0.0;
                self.energy = self.energy.clamp(0.0, self.energy_max);
                self.refresh_readiness(config);
            }
        }

        self.energy = self.energy.clamp(0.0, self.energy_max);
        if self.energy <= 0.0 {
            self.alive = false;
        }
    }
}

/// Deferred population changes and events produced during an agent pass.
#[derive(Debug, Default)]
pub struct TickOutbox {
    pub births: Vec<Agent>,
    pub food: Vec<Food>,
    /// `(predator, prey)` pairs.
    pub kills: Vec<(AgentId, AgentId)>,
    pub deliveries: Vec<ZoneId>,
    pub toxin_releases: usize,
}

impl TickOutbox {
    pub fn clear(&mut self) {
        self.births.clear();
        self.food.clear();
        self.kills.clear();
        self.deliveries.clear();
        self.toxin_releases = 0;
    }
}

/// Everything an agent may read or touch while it updates.
///
/// The agent being updated is detached from `agents`; the arena still holds
/// its stale copy, which lookups must skip by id.
pub struct TickContext<'a> {
    pub dt: f32,
    pub config: &'a SimConfig,
    pub agents: &'a mut AgentArena,
    pub food: &'a mut SlotMap<FoodId, Food>,
    pub corpses: &'a mut SlotMap<CorpseId, Corpse>,
    pub nests: &'a dyn NestGateway,
    pub scent: &'a mut ScentField,
    pub rng: &'a mut SmallRng,
    pub outbox: &'a mut TickOutbox,
}
