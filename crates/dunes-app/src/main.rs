use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use dunes_app::{RunOptions, init_tracing, load_config, run_headless};
use dunes_core::SimConfig;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "dunes",
    version,
    about = "Run a headless Dunes creature simulation"
)]
struct Cli {
    /// JSON configuration file; missing fields fall back to defaults.
    #[arg(long, env = "DUNES_CONFIG")]
    config: Option<PathBuf>,

    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 3_600)]
    ticks: u64,

    /// Seconds advanced per tick.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// RNG seed; overrides the configuration file.
    #[arg(long, env = "DUNES_SEED")]
    seed: Option<u64>,

    /// Log and record a frame every this many ticks (0 disables).
    #[arg(long, default_value_t = 60)]
    sample_every: u64,

    /// Write the JSON run report to this path.
    #[arg(long, env = "DUNES_REPORT")]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if !(cli.dt.is_finite() && cli.dt > 0.0) {
        bail!("--dt must be a positive number of seconds, got {}", cli.dt);
    }
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SimConfig::default(),
    };
    if cli.seed.is_some() {
        config.rng_seed = cli.seed;
    }

    let options = RunOptions {
        ticks: cli.ticks,
        dt: cli.dt,
        sample_every: cli.sample_every,
    };
    let report = run_headless(config, &options)?;
    info!(
        ticks = report.ticks,
        births = report.totals.births,
        deaths = report.totals.deaths,
        kills = report.totals.kills,
        deliveries = report.totals.deliveries,
        max_generation = report.totals.max_generation,
        "run complete"
    );

    if let Some(path) = &cli.report {
        report.write_json(path)?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}
