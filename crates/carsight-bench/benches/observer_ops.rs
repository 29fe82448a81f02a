//! Criterion benchmarks for composing a full observation step.

use carsight_bench::{feed_sensors, reference_profile, reference_values, reference_world};
use carsight_core::{ActorId, FrameId};
use carsight_handlers::build_observer;
use carsight_obs::EnvState;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

/// Benchmark: validate the reference profile and spawn its sensors.
fn bench_build_observer(c: &mut Criterion) {
    let entries = reference_profile();
    c.bench_function("build_observer_reference", |b| {
        b.iter(|| {
            let world = reference_world(8);
            let observer = build_observer(&world, &entries).unwrap();
            std::hint::black_box(&observer);
        });
    });
}

/// Benchmark: one `observe` call over the reference profile, by traffic
/// density. Sensor readings are pushed before each step.
fn bench_observe_step(c: &mut Criterion) {
    let entries = reference_profile();
    let values = reference_values();
    let mut group = c.benchmark_group("observe_step");
    for traffic in [0u64, 16, 64] {
        let world = reference_world(traffic);
        let mut observer = build_observer(&world, &entries).unwrap();
        observer.reset().unwrap();
        let mut frame = 0u64;
        group.bench_with_input(BenchmarkId::from_parameter(traffic), &traffic, |b, _| {
            b.iter(|| {
                frame += 1;
                feed_sensors(&world, frame, 2048);
                let env = EnvState::new(&world, FrameId(frame), ActorId(1), &values);
                let step = observer.observe(&env).unwrap();
                std::hint::black_box(&step);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_observer, bench_observe_step);
criterion_main!(benches);
