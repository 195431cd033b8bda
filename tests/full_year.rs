//! Full-year exact solves
//!
//! 87 600 variables, slow on the pure-Rust backend. Run explicitly:
//! ```bash
//! cargo test --release --test full_year -- --ignored --test-threads=1
//! ```
//! or with `--features highs` for a faster backend.

use std::time::Instant;

use batteryopt::domain::{BatteryConfig, Entity, PriceSignal, TimeSeriesInput, HOURS_PER_YEAR};
use batteryopt::optimizer::{
    DispatchStrategy, GoodLpSolver, GreedyDispatcher, MilpDispatcher, ModelOptions,
    SolverBackend, StrategyComparison,
};

fn backend() -> SolverBackend {
    if SolverBackend::Highs.is_available() {
        SolverBackend::Highs
    } else {
        SolverBackend::Microlp
    }
}

/// Daily PV bell, stronger in summer; flat household load
fn synthetic_year() -> TimeSeriesInput {
    let pv = (0..HOURS_PER_YEAR)
        .map(|t| {
            let hour = (t % 24) as f64;
            let day = (t / 24) as f64;
            let season = 0.6 + 0.4 * (std::f64::consts::PI * day / 365.0).sin();
            let daylight = (std::f64::consts::PI * (hour - 6.0) / 12.0).sin().max(0.0);
            6_000.0 * season * daylight
        })
        .collect();
    TimeSeriesInput::new(
        vec![1_200.0; HOURS_PER_YEAR],
        pv,
        PriceSignal::Flat(0.0002624),
        0.0000791,
    )
    .unwrap()
}

#[test]
#[ignore]
fn full_year_exact_solve() {
    let input = synthetic_year();
    let battery = BatteryConfig::default();
    let milp = MilpDispatcher::new(
        ModelOptions::default(),
        GoodLpSolver::new(backend(), Some(3_600.0)).unwrap(),
    );

    let started = Instant::now();
    let plan = milp.dispatch(&input, &battery).unwrap();
    println!("full year solved in {:?}", started.elapsed());

    let soc = plan.table.column(Entity::Soc);
    assert!((soc[0] - battery.soc_min_wh).abs() < 1e-3);
    assert!(soc
        .iter()
        .all(|s| *s >= battery.soc_min_wh - 1e-3 && *s <= battery.soc_max_wh + 1e-3));
    assert!(plan.summary.discharged_wh <= plan.summary.charged_wh + 1e-3);
    assert!(plan.summary.savings() >= -1e-6);
}

#[test]
#[ignore]
fn full_year_comparison() {
    let input = synthetic_year();
    let milp = MilpDispatcher::new(
        ModelOptions::default(),
        GoodLpSolver::new(backend(), Some(3_600.0)).unwrap(),
    );

    let comparison =
        StrategyComparison::run(&milp, &GreedyDispatcher, &input, &BatteryConfig::default())
            .unwrap();
    println!(
        "exact net cost {:.2}, greedy net cost {:.2}, gap {:.4}",
        comparison.exact.summary.net_cost,
        comparison.heuristic.summary.net_cost,
        comparison.optimality_gap()
    );
    assert_eq!(comparison.exact.table.horizon(), HOURS_PER_YEAR);
}
