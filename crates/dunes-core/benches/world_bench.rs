use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use dunes_core::{SimConfig, WorldState};
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(fallback)
}

fn bench_world_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    group.sample_size(env_or("DUNES_BENCH_SAMPLES", 20_usize).max(10));
    group.warm_up_time(Duration::from_secs(env_or("DUNES_BENCH_WARMUP_SECS", 2)));
    group.measurement_time(Duration::from_secs(env_or("DUNES_BENCH_MEASURE_SECS", 8)));
    let steps: usize = env_or("DUNES_BENCH_STEPS", 120_usize).max(1);
    let creature_counts: Vec<usize> = std::env::var("DUNES_BENCH_CREATURES")
        .ok()
        .map(|s| {
            s.split(',')
                .filter_map(|t| t.trim().parse::<usize>().ok())
                .collect::<Vec<_>>()
        })
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| vec![40_usize, 200, 800]);

    for &creatures in &creature_counts {
        group.bench_function(format!("steps{steps}_creatures{creatures}"), |b| {
            b.iter_batched(
                || {
                    let config = SimConfig {
                        rng_seed: Some(0xBEEF),
                        initial_creatures: creatures,
                        initial_food: creatures * 3 / 2,
                        history_capacity: 1,
                        ..SimConfig::default()
                    };
                    let mut world = WorldState::new(config).expect("world");
                    world.populate();
                    world
                },
                |mut world| {
                    for _ in 0..steps {
                        world.step(1.0 / 60.0);
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_world_steps);
criterion_main!(benches);
