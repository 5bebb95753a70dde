//! World driver: owns the populations and runs the tick pipeline.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use thiserror::Error;
use tracing::{debug, trace};

use crate::agent::{Agent, TickContext, TickOutbox};
use crate::arena::AgentArena;
use crate::config::{ConfigError, SimConfig};
use crate::entities::{Corpse, Food};
use crate::genome::{Genome, GenomeError};
use crate::nest::{NestGateway, NoNests, ZoneId};
use crate::scent::{ScentError, ScentField, ScentKind};
use crate::species::Species;
use crate::{AgentId, CorpseId, FoodId, Generation, Tick};

/// Errors raised while building or driving a world.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scent(#[from] ScentError),
    #[error(transparent)]
    Genome(#[from] GenomeError),
}

/// Events emitted after processing a world tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TickEvents {
    pub tick: Tick,
    pub births: usize,
    pub deaths: usize,
    pub kills: usize,
    pub deliveries: usize,
    pub toxin_releases: usize,
    pub scent_advanced: bool,
}

/// Population snapshot retained in the history ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSummary {
    pub tick: Tick,
    pub agent_count: usize,
    pub foragers: usize,
    pub predators: usize,
    pub decomposers: usize,
    pub food_count: usize,
    pub corpse_count: usize,
    pub births: usize,
    pub deaths: usize,
    pub total_energy: f32,
    pub average_energy: f32,
    pub max_generation: Generation,
}

/// Complete simulation state.
pub struct WorldState {
    config: SimConfig,
    tick: Tick,
    rng: SmallRng,
    agents: AgentArena,
    food: SlotMap<FoodId, Food>,
    corpses: SlotMap<CorpseId, Corpse>,
    scent: ScentField,
    scent_clock: f32,
    nests: Box<dyn NestGateway>,
    deliveries: BTreeMap<ZoneId, u64>,
    total_deliveries: u64,
    outbox: TickOutbox,
    history: VecDeque<TickSummary>,
}

impl fmt::Debug for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldState")
            .field("config", &self.config)
            .field("tick", &self.tick)
            .field("agent_count", &self.agents.len())
            .field("food_count", &self.food.len())
            .field("corpse_count", &self.corpses.len())
            .field("total_deliveries", &self.total_deliveries)
            .finish()
    }
}

fn seeded_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => {
            let seed: u64 = rand::random();
            SmallRng::seed_from_u64(seed)
        }
    }
}

impl WorldState {
    /// Instantiate an empty world without nests.
    pub fn new(config: SimConfig) -> Result<Self, WorldError> {
        Self::with_nests(config, Box::new(NoNests))
    }

    /// Instantiate an empty world using the supplied nest layout.
    pub fn with_nests(config: SimConfig, nests: Box<dyn NestGateway>) -> Result<Self, WorldError> {
        config.validate()?;
        let scent = ScentField::from_config(&config)?;
        let rng = seeded_rng(config.rng_seed);
        let history_capacity = config.history_capacity;
        Ok(Self {
            agents: AgentArena::with_capacity(config.initial_creatures),
            food: SlotMap::with_capacity_and_key(config.initial_food),
            corpses: SlotMap::with_key(),
            config,
            tick: Tick::zero(),
            rng,
            scent,
            scent_clock: 0.0,
            nests,
            deliveries: BTreeMap::new(),
            total_deliveries: 0,
            outbox: TickOutbox::default(),
            history: VecDeque::with_capacity(history_capacity),
        })
    }

    /// Seeds founders and food at random points according to the configuration.
    pub fn populate(&mut self) {
        let creatures = self.config.initial_creatures;
        let decomposers =
            ((creatures as f32) * self.config.decomposer_fraction).round() as usize;
        for index in 0..creatures {
            let genome = Genome::random(&mut self.rng, index < decomposers);
            let position = self.config.random_point(&mut self.rng);
            let agent = Agent::founder(genome, position, &self.config, &mut self.rng);
            self.agents.insert(agent);
        }
        for _ in 0..self.config.initial_food {
            let position = self.config.random_point(&mut self.rng);
            self.food.insert(Food::new(position));
        }
        debug!(
            creatures,
            decomposers,
            food = self.config.initial_food,
            "world populated"
        );
    }

    /// Advances the world by `dt` seconds.
    pub fn step(&mut self, dt: f32) -> TickEvents {
        let next_tick = self.tick.next();
        let scent_advanced = self.stage_scent(dt);
        self.stage_agents(dt);
        let deaths = self.stage_death_cleanup();
        let kills = self.outbox.kills.len();
        let toxin_releases = self.outbox.toxin_releases;
        let (births, deliveries) = self.stage_commit();

        self.tick = next_tick;
        self.push_summary(births, deaths);
        TickEvents {
            tick: next_tick,
            births,
            deaths,
            kills,
            deliveries,
            toxin_releases,
            scent_advanced,
        }
    }

    /// Ambient scent from food and corpses, then one field update, on the scent cadence.
    fn stage_scent(&mut self, dt: f32) -> bool {
        self.scent_clock += dt;
        if self.scent_clock < self.config.scent_update_interval {
            return false;
        }
        for item in self.food.values().filter(|item| item.alive) {
            self.scent.emit(
                item.position.x,
                item.position.y,
                ScentKind::Food,
                self.config.food_scent_strength,
            );
        }
        for corpse in self.corpses.values().filter(|corpse| corpse.alive()) {
            self.scent.emit(
                corpse.position.x,
                corpse.position.y,
                ScentKind::Corpse,
                self.config.corpse_scent_strength,
            );
        }
        self.scent.update(self.scent_clock);
        self.scent_clock = 0.0;
        true
    }

    /// Sequential agent pass in insertion order. Each agent is detached, updated
    /// against the live collections, then written back.
    fn stage_agents(&mut self, dt: f32) {
        let handles = self.agents.handles().to_vec();
        let mut ctx = TickContext {
            dt,
            config: &self.config,
            agents: &mut self.agents,
            food: &mut self.food,
            corpses: &mut self.corpses,
            nests: self.nests.as_ref(),
            scent: &mut self.scent,
            rng: &mut self.rng,
            outbox: &mut self.outbox,
        };
        for id in handles {
            let Some(mut agent) = ctx.agents.get(id).filter(|agent| agent.alive).cloned() else {
                continue;
            };
            agent.update(id, &mut ctx);
            ctx.agents.replace(id, agent);
        }
    }

    /// Unpairs and removes dead agents, leaving corpses behind; prunes eaten
    /// food and empty corpses.
    fn stage_death_cleanup(&mut self) -> usize {
        let dead: Vec<AgentId> = self
            .agents
            .iter()
            .filter(|(_, agent)| !agent.alive)
            .map(|(id, _)| id)
            .collect();

        for &id in &dead {
            let Some(agent) = self.agents.get(id) else {
                continue;
            };
            let corpse = Corpse::new(
                agent.position,
                agent.radius,
                agent.energy_max * self.config.corpse_energy_fraction,
            );
            let partner = agent.courtship.partner;
            if let Some(partner_id) = partner
                && let Some(partner) = self.agents.get_mut(partner_id)
                && partner.courtship.partner == Some(id)
            {
                partner.courtship.clear_pairing();
            }
            if let Some(agent) = self.agents.get_mut(id) {
                agent.courtship.clear_pairing();
            }
            if corpse.alive() {
                self.corpses.insert(corpse);
            }
        }

        let dead: HashSet<AgentId> = dead.into_iter().collect();
        let removed = self.agents.remove_many(&dead);
        self.food.retain(|_, item| item.alive);
        self.corpses.retain(|_, corpse| corpse.alive());
        if removed > 0 {
            debug!(removed, remaining = self.agents.len(), "agents died");
        }
        removed
    }

    /// Applies deliveries and commits spawned children and food.
    fn stage_commit(&mut self) -> (usize, usize) {
        let deliveries = self.outbox.deliveries.len();
        for zone in self.outbox.deliveries.drain(..) {
            *self.deliveries.entry(zone).or_default() += 1;
            self.total_deliveries += 1;
        }
        let births = self.outbox.births.len();
        for child in self.outbox.births.drain(..) {
            let generation = child.generation;
            let id = self.agents.insert(child);
            debug!(?id, generation = generation.0, "agent born");
        }
        for item in self.outbox.food.drain(..) {
            self.food.insert(item);
        }
        self.outbox.clear();
        (births, deliveries)
    }

    fn push_summary(&mut self, births: usize, deaths: usize) {
        let mut summary = TickSummary {
            tick: self.tick,
            agent_count: self.agents.len(),
            foragers: 0,
            predators: 0,
            decomposers: 0,
            food_count: self.food.len(),
            corpse_count: self.corpses.len(),
            births,
            deaths,
            total_energy: 0.0,
            average_energy: 0.0,
            max_generation: Generation::default(),
        };
        for (_, agent) in self.agents.iter() {
            match agent.species {
                Species::Forager => summary.foragers += 1,
                Species::Predator => summary.predators += 1,
                Species::Decomposer => summary.decomposers += 1,
            }
            summary.total_energy += agent.energy;
            summary.max_generation = summary.max_generation.max(agent.generation);
        }
        if summary.agent_count > 0 {
            summary.average_energy = summary.total_energy / summary.agent_count as f32;
        }
        trace!(tick = self.tick.0, agents = summary.agent_count, "tick summarised");
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary);
    }

    /// Returns an immutable reference to configuration.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current simulation tick.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// Iterate over retained tick summaries.
    pub fn history(&self) -> impl Iterator<Item = &TickSummary> {
        self.history.iter()
    }

    /// Most recent tick summary, if any tick has run.
    #[must_use]
    pub fn last_summary(&self) -> Option<&TickSummary> {
        self.history.back()
    }

    /// Read-only access to the agent arena.
    #[must_use]
    pub fn agents(&self) -> &AgentArena {
        &self.agents
    }

    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    #[must_use]
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id)
    }

    /// Number of live agents.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Spawn a new agent, returning its handle.
    pub fn spawn_agent(&mut self, agent: Agent) -> AgentId {
        self.agents.insert(agent)
    }

    /// Place a food item.
    pub fn spawn_food(&mut self, item: Food) -> FoodId {
        self.food.insert(item)
    }

    /// Place a corpse.
    pub fn spawn_corpse(&mut self, corpse: Corpse) -> CorpseId {
        self.corpses.insert(corpse)
    }

    #[must_use]
    pub fn food(&self) -> &SlotMap<FoodId, Food> {
        &self.food
    }

    #[must_use]
    pub fn corpses(&self) -> &SlotMap<CorpseId, Corpse> {
        &self.corpses
    }

    #[must_use]
    pub fn scent(&self) -> &ScentField {
        &self.scent
    }

    #[must_use]
    pub fn nests(&self) -> &dyn NestGateway {
        self.nests.as_ref()
    }

    /// Deliveries credited to `zone` so far.
    #[must_use]
    pub fn deliveries(&self, zone: ZoneId) -> u64 {
        self.deliveries.get(&zone).copied().unwrap_or(0)
    }

    /// Per-zone delivery counters in zone order.
    pub fn zone_deliveries(&self) -> impl Iterator<Item = (ZoneId, u64)> + '_ {
        self.deliveries.iter().map(|(zone, count)| (*zone, *count))
    }

    #[must_use]
    pub const fn total_deliveries(&self) -> u64 {
        self.total_deliveries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Position, Velocity};
    use crate::nest::{NestKind, Zone};
    use crate::priority::Behavior;

    /// Every species' home is one zone covering the whole world.
    struct Commons {
        zone: [Zone; 1],
    }

    impl Commons {
        fn new(config: &SimConfig) -> Self {
            Self {
                zone: [Zone::new(
                    ZoneId(0),
                    NestKind::Prey,
                    Position::new(config.width() * 0.5, config.height() * 0.5),
                    config.width().hypot(config.height()),
                )],
            }
        }
    }

    impl NestGateway for Commons {
        fn get_nest(&self, _agent: &Agent) -> Option<Zone> {
            Some(self.zone[0])
        }
        fn can_enter(&self, _agent: &Agent, _zone: &Zone) -> bool {
            true
        }
        fn is_safe_zone(&self, a: &Agent, b: &Agent) -> bool {
            self.zone[0].contains(a.position) && self.zone[0].contains(b.position)
        }
        fn check_wall_collision(&self, _agent: &Agent, x: f32, y: f32) -> Position {
            Position::new(x, y)
        }
        fn zones(&self) -> &[Zone] {
            &self.zone
        }
    }

    fn quiet_config() -> SimConfig {
        SimConfig {
            rng_seed: Some(0xfeed),
            initial_creatures: 0,
            initial_food: 0,
            idle_energy_cost: 0.0,
            move_energy_cost: 0.0,
            ..SimConfig::default()
        }
    }

    fn forager_at(config: &SimConfig, position: Position) -> Agent {
        let mut agent = Agent::new(Genome::default(), position, config);
        agent.velocity = Velocity::new(1.0, 0.0);
        agent
    }

    #[test]
    fn mating_pair_produces_one_child() {
        let config = quiet_config();
        let nests = Commons::new(&config);
        let mut world = WorldState::with_nests(config.clone(), Box::new(nests)).expect("world");

        let spot = Position::new(300.0, 300.0);
        let mut ids = Vec::new();
        for generation in [2, 5] {
            let mut parent = forager_at(&config, spot);
            parent.ready_to_mate = true;
            parent.mate_drive = config.mate_drive_cap;
            parent.generation = Generation(generation);
            ids.push(world.spawn_agent(parent));
        }

        let events = world.step(0.016);
        assert_eq!(events.births, 1);
        assert_eq!(world.agent_count(), 3);

        let cost = config.species.forager.mating_cost;
        for id in &ids {
            let parent = world.agent(*id).expect("parent survives");
            assert!((parent.energy - parent.energy_max * (1.0 - cost)).abs() < 1e-3);
            assert!(!parent.ready_to_mate);
            assert_eq!(parent.courtship.partner, None);
            assert!(parent.mate_drive < 0.01);
        }
        let child = world
            .agents()
            .iter()
            .find(|(id, _)| !ids.contains(id))
            .map(|(_, agent)| agent)
            .expect("child");
        assert_eq!(child.generation, Generation(6));
        assert!(child.energy >= child.energy_max * 0.7 - 1e-3);
        assert!(child.energy <= child.energy_max * 0.9 + 1e-3);
    }

    #[test]
    fn starving_agent_dies_and_is_pruned() {
        let config = SimConfig {
            idle_energy_cost: 1.2,
            ..quiet_config()
        };
        let mut world = WorldState::new(config.clone()).expect("world");
        let mut doomed = forager_at(&config, Position::new(200.0, 200.0));
        doomed.energy = 0.001;
        let id = world.spawn_agent(doomed);

        let events = world.step(0.1);
        assert_eq!(events.deaths, 1);
        assert!(world.agent(id).is_none());
        assert_eq!(world.agent_count(), 0);
        assert_eq!(world.corpses().len(), 1);
        let corpse = world.corpses().values().next().expect("corpse");
        assert!((corpse.energy - 100.0 * config.corpse_energy_fraction).abs() < 1e-3);
    }

    #[test]
    fn overdue_pairing_is_abandoned() {
        let config = SimConfig {
            mate_drive_rate: 0.0,
            ..quiet_config()
        };
        let mut world = WorldState::new(config.clone()).expect("world");
        let a = world.spawn_agent(forager_at(&config, Position::new(100.0, 100.0)));
        let b = world.spawn_agent(forager_at(&config, Position::new(400.0, 100.0)));
        let timeout = config.species.forager.abandon_timeout;
        for (me, other) in [(a, b), (b, a)] {
            let agent = world.agent_mut(me).expect("agent");
            agent.courtship.partner = Some(other);
            agent.courtship.pair_age = timeout + 1.0;
            agent.mate_drive = 0.8;
        }

        world.step(0.016);
        let first = world.agent(a).expect("a");
        let second = world.agent(b).expect("b");
        assert_eq!(first.courtship.partner, None);
        assert_eq!(second.courtship.partner, None);
        assert!((first.mate_drive - 0.4).abs() < 1e-6);
        assert!((second.mate_drive - 0.8).abs() < 1e-6);
    }

    #[test]
    fn starvation_breaks_pairing_on_both_sides() {
        let config = quiet_config();
        let mut world = WorldState::new(config.clone()).expect("world");
        let mut hungry = forager_at(&config, Position::new(100.0, 100.0));
        hungry.energy = hungry.energy_max * 0.2;
        let starving = world.spawn_agent(hungry);
        let sated = world.spawn_agent(forager_at(&config, Position::new(140.0, 100.0)));
        for (me, other) in [(sated, starving), (starving, sated)] {
            world.agent_mut(me).expect("agent").courtship.partner = Some(other);
        }

        world.step(0.016);
        let hungry = world.agent(starving).expect("starving agent survives");
        assert_eq!(hungry.behavior, Behavior::Gather);
        assert_eq!(hungry.courtship.partner, None);
        assert_eq!(world.agent(sated).expect("sated").courtship.partner, None);
    }

    #[test]
    fn partner_death_clears_survivor() {
        let config = quiet_config();
        let mut world = WorldState::new(config.clone()).expect("world");
        let a = world.spawn_agent(forager_at(&config, Position::new(100.0, 100.0)));
        let mut doomed = forager_at(&config, Position::new(400.0, 100.0));
        doomed.alive = false;
        let b = world.spawn_agent(doomed);
        world.agent_mut(a).expect("a").courtship.partner = Some(b);
        world.agent_mut(b).expect("b").courtship.partner = Some(a);

        world.step(0.016);
        assert!(world.agent(b).is_none());
        assert_eq!(world.agent(a).expect("a").courtship.partner, None);
    }

    #[test]
    fn predator_kills_adjacent_prey_and_digests() {
        let config = quiet_config();
        let mut world = WorldState::new(config.clone()).expect("world");
        let mut hunter = Agent::new(
            Genome {
                size: 1.5,
                aggression: 0.9,
                ..Genome::default()
            },
            Position::new(500.0, 500.0),
            &config,
        );
        hunter.energy = hunter.energy_max * 0.5;
        let hunter_id = world.spawn_agent(hunter);
        let prey = Agent::new(
            Genome {
                size: 0.6,
                ..Genome::default()
            },
            Position::new(503.0, 500.0),
            &config,
        );
        let prey_id = world.spawn_agent(prey);

        let events = world.step(0.016);
        assert_eq!(events.kills, 1);
        assert!(world.agent(prey_id).is_none());
        let hunter = world.agent(hunter_id).expect("hunter");
        assert!(hunter.digest_timer > 0.0);
        assert!(hunter.digest_pool > 0.0);
        assert!(hunter.energy > hunter.energy_max * 0.5);
        assert_eq!(world.corpses().len(), 1);
    }

    #[test]
    fn history_is_bounded() {
        let config = SimConfig {
            history_capacity: 4,
            ..quiet_config()
        };
        let mut world = WorldState::new(config).expect("world");
        for _ in 0..10 {
            world.step(0.016);
        }
        assert_eq!(world.history().count(), 4);
        assert_eq!(world.last_summary().map(|s| s.tick), Some(Tick(10)));
    }

    #[test]
    fn scent_advances_on_its_own_cadence() {
        let config = quiet_config();
        let mut world = WorldState::new(config).expect("world");
        world.spawn_food(Food::new(Position::new(300.0, 300.0)));
        let mut advanced = 0;
        for _ in 0..10 {
            if world.step(0.05).scent_advanced {
                advanced += 1;
            }
        }
        assert_eq!(advanced, 5);
        assert!(world.scent().total_mass(ScentKind::Food) > 0.0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SimConfig {
            world_width: 0,
            ..SimConfig::default()
        };
        assert!(matches!(
            WorldState::new(config),
            Err(WorldError::Config(ConfigError::Invalid(_)))
        ));
    }
}
