use dunes_core::{
    Agent, Corpse, Genome, NestGateway, NestKind, Position, ScentKind, SimConfig, Species, Tick,
    TickSummary, Trait, Velocity, WorldState, Zone, ZoneId,
};

/// One shared home zone covering the whole world; nobody is ever blocked.
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

fn free_energy_config() -> SimConfig {
    SimConfig {
        rng_seed: Some(0xD00D),
        initial_creatures: 0,
        initial_food: 0,
        idle_energy_cost: 0.0,
        move_energy_cost: 0.0,
        ..SimConfig::default()
    }
}

fn run_summaries(seed: u64, ticks: usize) -> Vec<TickSummary> {
    let config = SimConfig {
        world_width: 600,
        world_height: 400,
        initial_creatures: 24,
        initial_food: 30,
        rng_seed: Some(seed),
        history_capacity: ticks,
        ..SimConfig::default()
    };
    let nests = Commons::new(&config);
    let mut world = WorldState::with_nests(config, Box::new(nests)).expect("world");
    world.populate();
    for _ in 0..ticks {
        world.step(1.0 / 60.0);
    }
    world.history().cloned().collect()
}

#[test]
fn seeded_world_advances_deterministically() {
    let first = run_summaries(0xDEAD_BEEF, 120);
    let second = run_summaries(0xDEAD_BEEF, 120);
    assert_eq!(first.len(), 120);
    assert_eq!(first, second);
    assert_eq!(first.last().map(|s| s.tick), Some(Tick(120)));
}

#[test]
fn populate_respects_decomposer_fraction_and_margins() {
    let config = SimConfig {
        initial_creatures: 20,
        initial_food: 15,
        decomposer_fraction: 0.25,
        rng_seed: Some(11),
        ..SimConfig::default()
    };
    let mut world = WorldState::new(config.clone()).expect("world");
    world.populate();
    assert_eq!(world.agent_count(), 20);
    assert_eq!(world.food().len(), 15);
    let decomposers = world
        .agents()
        .iter()
        .filter(|(_, agent)| agent.species == Species::Decomposer)
        .count();
    assert_eq!(decomposers, 5);
    for (_, agent) in world.agents().iter() {
        let p = agent.position;
        assert!(p.x >= config.spawn_margin && p.x <= config.width() - config.spawn_margin);
        assert!(p.y >= config.spawn_margin && p.y <= config.height() - config.spawn_margin);
        assert!(agent.energy >= 0.6 * agent.energy_max - 1e-3);
        assert!(agent.energy <= agent.energy_max);
    }
}

#[test]
fn long_run_preserves_core_invariants() {
    let config = SimConfig {
        rng_seed: Some(42),
        initial_creatures: 30,
        initial_food: 40,
        ..SimConfig::default()
    };
    let nests = Commons::new(&config);
    let mut world = WorldState::with_nests(config.clone(), Box::new(nests)).expect("world");
    world.populate();

    for _ in 0..900 {
        world.step(1.0 / 30.0);
        for (id, agent) in world.agents().iter() {
            assert!(agent.alive, "dead agents are pruned at the end of a tick");
            assert!(agent.energy >= 0.0 && agent.energy <= agent.energy_max);
            assert!(agent.position.x >= 0.0 && agent.position.x <= config.width());
            assert!(agent.position.y >= 0.0 && agent.position.y <= config.height());
            assert!(agent.mate_drive >= 0.0 && agent.mate_drive <= config.mate_drive_cap);
            if let Some(partner_id) = agent.courtship.partner {
                let partner = world.agent(partner_id).expect("partner is alive");
                assert_eq!(partner.courtship.partner, Some(id));
            }
        }
        let scent = world.scent();
        for kind in ScentKind::ALL {
            assert!(scent.layer(kind).iter().all(|cell| (0.0..=1.0).contains(cell)));
        }
    }
}

#[test]
fn hibernating_predator_metabolism_keeps_decaying() {
    let config = free_energy_config();
    let mut world = WorldState::new(config.clone()).expect("world");
    let mut predator = Agent::new(
        Genome {
            aggression: 0.9,
            size: 1.2,
            ..Genome::default()
        },
        Position::new(600.0, 400.0),
        &config,
    );
    predator.energy = predator.energy_max * 0.15;
    let id = world.spawn_agent(predator);

    for _ in 0..200 {
        world.step(0.016);
    }
    let predator = world.agent(id).expect("predator");
    assert!(predator.hibernating);
    assert_eq!(predator.velocity, Velocity::default());
    assert_eq!(predator.position, Position::new(600.0, 400.0));
    assert!(predator.genome.metabolism < 0.5);
    assert!(predator.genome.metabolism > 0.0);
}

#[test]
fn decomposer_bites_corpse_and_excretes_food() {
    let config = free_energy_config();
    let mut world = WorldState::new(config.clone()).expect("world");
    let mut decomposer = Agent::new(
        Genome {
            is_decomposer: true,
            ..Genome::default()
        },
        Position::new(300.0, 300.0),
        &config,
    );
    decomposer.energy = 50.0;
    let id = world.spawn_agent(decomposer);
    world.spawn_corpse(Corpse::new(Position::new(302.0, 300.0), 6.0, 60.0));

    world.step(0.016);

    let decomposer = world.agent(id).expect("decomposer");
    assert!((decomposer.energy - 62.5).abs() < 1e-3);
    let corpse = world.corpses().values().next().expect("corpse remains");
    assert!((corpse.energy - 35.0).abs() < 1e-3);
    assert!(corpse.radius < 6.0);
    let excreted: Vec<_> = world.food().values().collect();
    assert_eq!(excreted.len(), 1);
    assert_eq!(excreted[0].energy, Some(12.5));
}

#[test]
fn threatened_decomposer_releases_toxin_once_per_cooldown() {
    let config = free_energy_config();
    let mut world = WorldState::new(config.clone()).expect("world");
    world.spawn_agent(Agent::new(
        Genome {
            is_decomposer: true,
            ..Genome::default()
        },
        Position::new(600.0, 400.0),
        &config,
    ));
    world.spawn_agent(Agent::new(
        Genome {
            aggression: 0.9,
            size: 1.5,
            ..Genome::default()
        },
        Position::new(620.0, 400.0),
        &config,
    ));

    let mut releases = 0;
    for _ in 0..10 {
        releases += world.step(0.016).toxin_releases;
    }
    assert_eq!(releases, 1);
    assert!(world.scent().total_mass(ScentKind::Toxin) > 0.0);
}

#[test]
fn child_inherits_bounded_genome_and_next_generation() {
    let config = free_energy_config();
    let nests = Commons::new(&config);
    let mut world = WorldState::with_nests(config.clone(), Box::new(nests)).expect("world");
    let spot = Position::new(200.0, 200.0);
    for size in [0.6, 1.5] {
        let mut parent = Agent::new(
            Genome {
                size,
                ..Genome::default()
            },
            spot,
            &config,
        );
        parent.ready_to_mate = true;
        parent.mate_drive = config.mate_drive_cap;
        world.spawn_agent(parent);
    }

    let events = world.step(0.016);
    assert_eq!(events.births, 1);
    let summary = world.last_summary().expect("summary");
    assert_eq!(summary.agent_count, 3);
    assert_eq!(summary.births, 1);
    assert_eq!(summary.max_generation.0, 1);
    let bounds = Trait::Size.bounds();
    for (_, agent) in world.agents().iter() {
        assert!(bounds.contains(agent.genome.size));
    }
}
