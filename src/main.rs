use std::path::PathBuf;

use anyhow::{Context, Result};
use batteryopt::config::Config;
use batteryopt::domain::BatteryConfig;
use batteryopt::io::{self, OutputFormat, DEFAULT_OUTPUT_FILE};
use batteryopt::optimizer::{
    BatteryOptimizer, DispatchPlan, DispatchSummary, GreedyDispatcher, MilpDispatcher,
    ObjectiveReport, ObjectiveSense, SolverBackend, StrategyComparison,
};
use batteryopt::telemetry::init_tracing;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::info;

/// Battery dispatch for PV self-consumption over one year of hourly data
#[derive(Debug, Parser)]
#[command(name = "batteryopt", version, about)]
struct Cli {
    /// Result file
    #[arg(default_value = DEFAULT_OUTPUT_FILE)]
    out: PathBuf,

    /// TOML configuration file (default: ./batteryopt.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Flat electricity price ($/Wh)
    #[arg(long)]
    price: Option<f64>,

    /// CSV with an hourly PRICE column, replaces --price
    #[arg(long)]
    price_file: Option<PathBuf>,

    /// Feed-in tariff ($/Wh)
    #[arg(long)]
    feed_in_tariff: Option<f64>,

    /// Minimum charging power when charging (W)
    #[arg(long)]
    charge_min: Option<f64>,

    /// Maximum charging power (W)
    #[arg(long)]
    charge_max: Option<f64>,

    /// Minimum discharging power when discharging (W)
    #[arg(long)]
    discharge_min: Option<f64>,

    /// Maximum discharging power (W)
    #[arg(long)]
    discharge_max: Option<f64>,

    #[arg(long)]
    charge_efficiency: Option<f64>,

    #[arg(long)]
    discharge_efficiency: Option<f64>,

    /// Minimum state of charge (Wh)
    #[arg(long)]
    soc_min: Option<f64>,

    /// Maximum state of charge (Wh)
    #[arg(long)]
    soc_max: Option<f64>,

    #[arg(long)]
    big_m: Option<f64>,

    /// maximize_revenue or minimize_cost
    #[arg(long)]
    sense: Option<ObjectiveSense>,

    /// microlp, highs or cbc
    #[arg(long)]
    solver: Option<SolverBackend>,

    /// Solver time limit in seconds (highs, cbc)
    #[arg(long)]
    time_limit: Option<f64>,

    #[arg(long, value_enum, default_value_t = Strategy::Milp)]
    strategy: Strategy,

    /// grid_import (Time Step,P_grid) or full
    #[arg(long, default_value_t = OutputFormat::GridImport)]
    format: OutputFormat,

    /// Also write a JSON summary here
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Exact mixed-integer model
    Milp,
    /// Solver-free forward heuristic
    Greedy,
    /// Both, writing the exact schedule
    Compare,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        let battery: &mut BatteryConfig = &mut config.battery;
        override_with(&mut battery.charge_min_w, self.charge_min);
        override_with(&mut battery.charge_max_w, self.charge_max);
        override_with(&mut battery.discharge_min_w, self.discharge_min);
        override_with(&mut battery.discharge_max_w, self.discharge_max);
        override_with(&mut battery.charge_efficiency, self.charge_efficiency);
        override_with(&mut battery.discharge_efficiency, self.discharge_efficiency);
        override_with(&mut battery.soc_min_wh, self.soc_min);
        override_with(&mut battery.soc_max_wh, self.soc_max);

        override_with(&mut config.tariff.price, self.price);
        override_with(&mut config.tariff.feed_in_tariff, self.feed_in_tariff);
        if let Some(path) = &self.price_file {
            config.tariff.price_file = Some(path.clone());
        }

        override_with(&mut config.model.big_m, self.big_m);
        override_with(&mut config.model.sense, self.sense);
        override_with(&mut config.model.solver, self.solver);
        if self.time_limit.is_some() {
            config.model.time_limit_seconds = self.time_limit;
        }
    }
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

#[derive(Debug, Serialize)]
struct PlanReport {
    strategy: &'static str,
    objective: Option<ObjectiveReport>,
    summary: DispatchSummary,
    savings: f64,
}

impl From<&DispatchPlan> for PlanReport {
    fn from(plan: &DispatchPlan) -> Self {
        Self {
            strategy: plan.strategy,
            objective: plan.objective,
            summary: plan.summary,
            savings: plan.summary.savings(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ComparisonReport {
    exact: PlanReport,
    heuristic: PlanReport,
    optimality_gap: f64,
    relative_gap: Option<f64>,
}

fn log_plan(plan: &DispatchPlan) {
    let summary = &plan.summary;
    info!(
        strategy = plan.strategy,
        objective = plan.objective.map(|o| o.value),
        grid_import_wh = summary.grid_import_wh,
        pv_export_wh = summary.pv_export_wh,
        net_cost = summary.net_cost,
        net_cost_without_battery = summary.net_cost_without_battery,
        savings = summary.savings(),
        "dispatch finished"
    );
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut cfg = Config::load(cli.config.as_deref())?;
    cli.apply(&mut cfg);
    cfg.validate().context("invalid configuration")?;

    let input = io::load_input(&cfg)?;
    let milp = || -> Result<MilpDispatcher> {
        Ok(MilpDispatcher::new(cfg.model.options(), cfg.model.solver()?))
    };

    let (plan, report) = match cli.strategy {
        Strategy::Milp => {
            let optimizer = BatteryOptimizer::new(milp()?);
            let plan = optimizer.optimize(&input, &cfg.battery)?;
            let report = serde_json::to_value(PlanReport::from(&plan))?;
            (plan, report)
        }
        Strategy::Greedy => {
            let optimizer = BatteryOptimizer::new(GreedyDispatcher);
            let plan = optimizer.optimize(&input, &cfg.battery)?;
            let report = serde_json::to_value(PlanReport::from(&plan))?;
            (plan, report)
        }
        Strategy::Compare => {
            let comparison =
                StrategyComparison::run(&milp()?, &GreedyDispatcher, &input, &cfg.battery)?;
            log_plan(&comparison.heuristic);
            let report = serde_json::to_value(ComparisonReport {
                exact: PlanReport::from(&comparison.exact),
                heuristic: PlanReport::from(&comparison.heuristic),
                optimality_gap: comparison.optimality_gap(),
                relative_gap: comparison.relative_gap(),
            })?;
            (comparison.exact, report)
        }
    };

    log_plan(&plan);
    io::write_table(&plan.table, &cli.out, cli.format)?;
    if let Some(path) = &cli.summary {
        io::write_json(&report, path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["batteryopt"]);
        assert_eq!(cli.out, PathBuf::from("Pbought_aggregated.csv"));
        assert_eq!(cli.strategy, Strategy::Milp);
        assert_eq!(cli.format, OutputFormat::GridImport);
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "batteryopt",
            "--soc-min",
            "1000",
            "--sense",
            "minimize_cost",
            "--strategy",
            "compare",
            "--format",
            "full",
            "out.csv",
        ]);
        let mut cfg = Config::default();
        cli.apply(&mut cfg);

        assert_eq!(cfg.battery.soc_min_wh, 1000.0);
        assert_eq!(cfg.battery.soc_max_wh, 100_000.0);
        assert_eq!(cfg.model.sense, ObjectiveSense::MinimizeCost);
        assert_eq!(cli.strategy, Strategy::Compare);
        assert_eq!(cli.format, OutputFormat::Full);
        assert_eq!(cli.out, PathBuf::from("out.csv"));
    }
}
