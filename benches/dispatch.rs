//! Dispatch benchmarks
//!
//! ```bash
//! cargo bench --bench dispatch
//! cargo bench --bench dispatch -- greedy
//! ```
//!
//! Exact solves are left out: their cost is dominated by the backend.

use batteryopt::domain::{BatteryConfig, PriceSignal, TimeSeriesInput, HOURS_PER_YEAR};
use batteryopt::optimizer::{DispatchModel, GreedyDispatchHeuristic, ModelOptions};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn input(hours: usize) -> TimeSeriesInput {
    let demand = (0..hours).map(|t| 800.0 + 400.0 * ((t % 24) as f64 / 24.0)).collect();
    let pv = (0..hours)
        .map(|t| match t % 24 {
            9..=16 => 3_500.0,
            _ => 0.0,
        })
        .collect();
    TimeSeriesInput::with_horizon(hours, demand, pv, PriceSignal::Flat(0.0002624), 0.0000791)
        .expect("valid benchmark input")
}

fn bench_greedy(c: &mut Criterion) {
    let battery = BatteryConfig::default();
    let heuristic =
        GreedyDispatchHeuristic::new(battery.soc_min_wh, battery.soc_max_wh).expect("valid bounds");
    let year = input(HOURS_PER_YEAR);

    c.bench_function("greedy_full_year", |b| {
        b.iter(|| heuristic.run(black_box(&year)))
    });
}

fn bench_model_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_build");
    let battery = BatteryConfig::default();
    let options = ModelOptions::default();

    for hours in [24, 168, HOURS_PER_YEAR] {
        let series = input(hours);
        group.bench_with_input(BenchmarkId::from_parameter(hours), &series, |b, series| {
            b.iter(|| DispatchModel::build(black_box(series), &battery, &options))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_greedy, bench_model_build);
criterion_main!(benches);
