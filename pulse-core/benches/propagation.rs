//! Benchmarks for pulse-core
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pulse_core::{Dependency, Graph};

// =============================================================================
// SIGNAL BENCHMARKS
// =============================================================================

fn bench_signal_create(c: &mut Criterion) {
    let graph = Graph::new();
    c.bench_function("signal_create", |b| {
        b.iter(|| black_box(graph.signal(0i32)))
    });
}

fn bench_signal_get(c: &mut Criterion) {
    let graph = Graph::new();
    let s = graph.signal(42i32);
    c.bench_function("signal_get", |b| b.iter(|| black_box(s.get())));
}

fn bench_signal_set(c: &mut Criterion) {
    let graph = Graph::new();
    let s = graph.signal(0i32);
    c.bench_function("signal_set", |b| b.iter(|| s.set(black_box(42))));
}

// =============================================================================
// PROPAGATION BENCHMARKS
// =============================================================================

fn bench_computed_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("computed_fan_out");
    for width in [1usize, 10, 100] {
        let graph = Graph::new();
        let source = graph.signal(0i32);
        let computeds: Vec<_> = (0..width)
            .map(|i| {
                let s = source.clone();
                graph.computed(move || s.get() + i as i32, &[&source])
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            let mut next = 0;
            b.iter(|| {
                next += 1;
                source.set(black_box(next));
            })
        });
        black_box(computeds.len());
    }
    group.finish();
}

fn bench_computed_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("computed_chain");
    for depth in [1usize, 10, 50] {
        let graph = Graph::new();
        let source = graph.signal(0i32);
        let mut tail = {
            let s = source.clone();
            graph.computed(move || s.get() + 1, &[&source])
        };
        for _ in 1..depth {
            let prev = tail.clone();
            tail = graph.computed(move || prev.get() + 1, &[&tail as &dyn Dependency]);
        }

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            let mut next = 0;
            b.iter(|| {
                next += 1;
                source.set(black_box(next));
                black_box(tail.get())
            })
        });
    }
    group.finish();
}

fn bench_effect_trigger(c: &mut Criterion) {
    let graph = Graph::new();
    let s = graph.signal(0i32);
    let reader = s.clone();
    graph.effect(
        move || {
            black_box(reader.get());
        },
        &[&s],
    );

    c.bench_function("effect_trigger", |b| {
        let mut next = 0;
        b.iter(|| {
            next += 1;
            s.set(black_box(next));
        })
    });
}

criterion_group!(signal_benches, bench_signal_create, bench_signal_get, bench_signal_set);

criterion_group!(
    propagation_benches,
    bench_computed_fan_out,
    bench_computed_chain,
    bench_effect_trigger,
);

criterion_main!(signal_benches, propagation_benches);
