//! Headless runner: builds a world around the standard nest layout, drives it
//! for a fixed number of ticks and condenses the run into a JSON report.

use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use dunes_core::{ScentKind, SimConfig, TickSummary, WorldState, ZoneId};
use dunes_nest::NestLayout;
use serde::Serialize;
use tracing::{debug, info};

/// Installs the fmt subscriber, honoring `RUST_LOG` and defaulting to `info`.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Reads a JSON configuration; absent fields take their defaults.
pub fn load_config(path: &Path) -> Result<SimConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: SimConfig = serde_json::from_str(&raw)
        .with_context(|| format!("config file {} did not contain valid JSON", path.display()))?;
    config
        .validate()
        .with_context(|| format!("config file {} failed validation", path.display()))?;
    Ok(config)
}

/// Parameters of one headless run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub ticks: u64,
    pub dt: f32,
    /// Record a frame every this many ticks; zero disables frames.
    pub sample_every: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ticks: 3_600,
            dt: 1.0 / 60.0,
            sample_every: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameStats {
    pub tick: u64,
    pub agent_count: usize,
    pub foragers: usize,
    pub predators: usize,
    pub decomposers: usize,
    pub food_count: usize,
    pub corpse_count: usize,
    pub avg_energy: f32,
}

impl From<&TickSummary> for FrameStats {
    fn from(summary: &TickSummary) -> Self {
        Self {
            tick: summary.tick.0,
            agent_count: summary.agent_count,
            foragers: summary.foragers,
            predators: summary.predators,
            decomposers: summary.decomposers,
            food_count: summary.food_count,
            corpse_count: summary.corpse_count,
            avg_energy: summary.average_energy,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneDeliveries {
    pub zone: ZoneId,
    pub deliveries: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScentMass {
    pub kind: ScentKind,
    pub total: f32,
}

/// Aggregates produced over the whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunTotals {
    pub births: usize,
    pub deaths: usize,
    pub kills: usize,
    pub deliveries: usize,
    pub toxin_releases: usize,
    pub max_generation: u32,
}

/// Everything a headless run reports.
#[derive(Debug, Clone, Serialize)]
pub struct HeadlessReport {
    pub seed: Option<u64>,
    pub ticks: u64,
    pub dt: f32,
    pub frames: Vec<FrameStats>,
    pub last: Option<FrameStats>,
    pub totals: RunTotals,
    pub zones: Vec<ZoneDeliveries>,
    pub scent: Vec<ScentMass>,
}

impl HeadlessReport {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self).context("failed to serialize headless report")?;
        Ok(())
    }
}

/// Seeds a world with the standard nests and runs it to completion.
pub fn run_headless(config: SimConfig, options: &RunOptions) -> Result<HeadlessReport> {
    let layout = NestLayout::standard(config.width(), config.height());
    let seed = config.rng_seed;
    let mut world =
        WorldState::with_nests(config, Box::new(layout)).context("failed to build world")?;
    world.populate();
    info!(
        agents = world.agent_count(),
        food = world.food().len(),
        ticks = options.ticks,
        "starting headless run"
    );

    let mut totals = RunTotals::default();
    let mut frames = Vec::new();
    for _ in 0..options.ticks {
        let events = world.step(options.dt);
        totals.births += events.births;
        totals.deaths += events.deaths;
        totals.kills += events.kills;
        totals.deliveries += events.deliveries;
        totals.toxin_releases += events.toxin_releases;

        let Some(summary) = world.last_summary() else {
            continue;
        };
        totals.max_generation = totals.max_generation.max(summary.max_generation.0);
        if options.sample_every > 0 && events.tick.0 % options.sample_every == 0 {
            info!(
                tick = summary.tick.0,
                agents = summary.agent_count,
                foragers = summary.foragers,
                predators = summary.predators,
                decomposers = summary.decomposers,
                avg_energy = summary.average_energy,
                "progress"
            );
            frames.push(FrameStats::from(summary));
        }
        if summary.agent_count == 0 {
            info!(tick = summary.tick.0, "population extinct, stopping early");
            break;
        }
    }

    let zones = world
        .nests()
        .zones()
        .iter()
        .map(|zone| ZoneDeliveries {
            zone: zone.id,
            deliveries: world.deliveries(zone.id),
        })
        .collect();
    let scent = ScentKind::ALL
        .into_iter()
        .map(|kind| ScentMass {
            kind,
            total: world.scent().total_mass(kind),
        })
        .collect();
    debug!(?totals, "headless run finished");

    Ok(HeadlessReport {
        seed,
        ticks: world.tick().0,
        dt: options.dt,
        frames,
        last: world.last_summary().map(FrameStats::from),
        totals,
        zones,
        scent,
    })
}
