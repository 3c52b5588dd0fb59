// Benchmarks for the two hot paths: building the navigation grid from a
// host's sample points, and stepping a populated simulation.
//
// Run with `cargo bench -p shoal_sim`. The lattice here is roughly the size
// of a small ocean level (40×10×40 points, spacing 4).

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use shoal_sim::config::SimConfig;
use shoal_sim::host::{LatticeProvider, SamplePointProvider};
use shoal_sim::nav::NavGrid;
use shoal_sim::sim::SimState;
use shoal_sim::types::Vec3;

fn level() -> LatticeProvider {
    LatticeProvider {
        origin: Vec3::ZERO,
        counts: (40, 10, 40),
        spacing: 4.0,
    }
}

fn bench_nav_build(c: &mut Criterion) {
    let provider = level();
    let points = provider.sample_points();
    c.bench_function("nav grid build / 16k points", |b| {
        b.iter_batched(
            || points.clone(),
            |points| black_box(NavGrid::build(points, provider.spacing())),
            BatchSize::LargeInput,
        );
    });
}

fn bench_step(c: &mut Criterion) {
    let provider = level();
    let mut config = SimConfig::default();
    config.population.target = 300;
    c.bench_function("sim step / 300 agents x 100 ticks", |b| {
        b.iter_batched(
            || {
                let mut sim = SimState::from_provider(42, config.clone(), &provider)
                    .expect("lattice is valid");
                sim.step(&[], 1.0 / 60.0);
                sim
            },
            |mut sim| {
                for _ in 0..100 {
                    black_box(sim.step(&[], 1.0 / 60.0));
                }
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_nav_build, bench_step);
criterion_main!(benches);
