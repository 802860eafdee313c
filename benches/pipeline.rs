//! Aggregate + benchmark pipeline throughput
//!
//! Measures the filter → aggregate → benchmark chain and the two-test
//! hypothesis wrapper over synthetic pit-stop exports of increasing size.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench pipeline
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pitwall::aggregate::{aggregate, AggregateOptions};
use pitwall::benchmark::benchmark_against_best;
use pitwall::config::AnalysisConfig;
use pitwall::dataset::{Dataset, Facet, Observation};
use pitwall::filter::FilterSpec;
use pitwall::hypothesis::{compare_samples, Direction};
use pitwall::kpi::Kpi;

const TEAMS: [&str; 5] = ["williams", "renault", "haas", "force_india", "racing_point"];

/// Deterministic pit-stop dataset with `n` observations
fn pit_stop_dataset(n: usize) -> Dataset {
    let observations = (0..n)
        .map(|i| {
            let team = TEAMS[i % TEAMS.len()];
            let jitter = ((i * 7919) % 2000) as f64;
            Observation::new(team, 22_000.0 + (i % TEAMS.len()) as f64 * 300.0 + jitter)
                .with(Facet::Year, 2015 + (i % 5) as i64)
                .with(Facet::LongStop, i % 50 == 0)
        })
        .collect();
    Dataset::from_observations(Kpi::PitStops.schema(), observations)
}

fn bench_aggregate_and_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate_benchmark");
    let options =
        AggregateOptions::new(Kpi::PitStops.metrics()).with_scale(Kpi::PitStops.scale());
    let filter = FilterSpec::all().years([2016, 2017, 2018]).long_stop(false);

    for size in [1_000, 10_000, 100_000] {
        let dataset = pit_stop_dataset(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &dataset, |b, dataset| {
            b.iter(|| {
                let rows = aggregate(black_box(dataset), &filter, &options).unwrap();
                benchmark_against_best(&rows, &options.metrics, 3, 2).unwrap()
            });
        });
    }
    group.finish();
}

fn bench_compare_samples(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare_samples");
    let config = AnalysisConfig::default();

    for size in [30, 300, 3_000] {
        let a: Vec<f64> = (0..size).map(|i| 23.0 + ((i * 31) % 100) as f64 / 100.0).collect();
        let b: Vec<f64> = (0..size).map(|i| 22.8 + ((i * 17) % 100) as f64 / 100.0).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &(a, b), |bench, (a, b)| {
            bench.iter(|| compare_samples(black_box(a), black_box(b), Direction::Greater, &config));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_aggregate_and_benchmark, bench_compare_samples);
criterion_main!(benches);
