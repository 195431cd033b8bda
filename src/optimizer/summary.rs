//! Economic summary of a dispatch schedule
//!
//! Hourly timesteps, so a power column summed over the horizon is energy in Wh.

use serde::Serialize;

use super::types::{DispatchPlan, DispatchStrategy};
use crate::domain::{BatteryConfig, DispatchTable, Entity, TimeSeriesInput};
use crate::error::DispatchError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DispatchSummary {
    pub grid_import_wh: f64,
    pub pv_export_wh: f64,
    pub charged_wh: f64,
    pub discharged_wh: f64,
    pub import_cost: f64,
    pub export_revenue: f64,
    /// Import cost minus export revenue
    pub net_cost: f64,
    /// Net cost if the grid covered every shortfall and took every surplus
    pub net_cost_without_battery: f64,
    pub final_soc_wh: f64,
}

impl DispatchSummary {
    pub fn from_table(table: &DispatchTable, input: &TimeSeriesInput) -> Self {
        let horizon = table.horizon().min(input.horizon());
        let fit = input.feed_in_tariff();

        let mut import_cost = 0.0;
        let mut export_revenue = 0.0;
        let mut baseline = 0.0;
        for t in 0..horizon {
            let price = input.price(t);
            import_cost += table.value(Entity::GridImport, t) * price;
            export_revenue += table.value(Entity::PvExport, t) * fit;
            baseline += input.shortfall(t) * price - input.surplus(t) * fit;
        }

        Self {
            grid_import_wh: table.total(Entity::GridImport),
            pv_export_wh: table.total(Entity::PvExport),
            charged_wh: table.total(Entity::ChargePower),
            discharged_wh: table.total(Entity::DischargePower),
            import_cost,
            export_revenue,
            net_cost: import_cost - export_revenue,
            net_cost_without_battery: baseline,
            final_soc_wh: table.column(Entity::Soc).last().copied().unwrap_or(0.0),
        }
    }

    /// What the battery saves over the no-battery baseline
    pub fn savings(&self) -> f64 {
        self.net_cost_without_battery - self.net_cost
    }

    pub fn net_revenue(&self) -> f64 {
        -self.net_cost
    }
}

/// Exact schedule next to the heuristic one, over the same input
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyComparison {
    pub exact: DispatchPlan,
    pub heuristic: DispatchPlan,
}

impl StrategyComparison {
    pub fn new(exact: DispatchPlan, heuristic: DispatchPlan) -> Self {
        Self { exact, heuristic }
    }

    /// Run both strategies on the same input
    pub fn run(
        exact: &dyn DispatchStrategy,
        heuristic: &dyn DispatchStrategy,
        input: &TimeSeriesInput,
        battery: &BatteryConfig,
    ) -> Result<Self, DispatchError> {
        let exact_plan = exact.dispatch(input, battery)?;
        let heuristic_plan = heuristic.dispatch(input, battery)?;
        let comparison = Self::new(exact_plan, heuristic_plan);
        tracing::info!(
            exact = exact.name(),
            heuristic = heuristic.name(),
            exact_net_cost = comparison.exact.summary.net_cost,
            heuristic_net_cost = comparison.heuristic.summary.net_cost,
            gap = comparison.optimality_gap(),
            "strategies compared"
        );
        Ok(comparison)
    }

    /// Extra net cost of the heuristic over the exact schedule
    ///
    /// Can be slightly negative: the heuristic may end the horizon with a
    /// different state of charge than it started with, the exact schedule may not.
    pub fn optimality_gap(&self) -> f64 {
        self.heuristic.summary.net_cost - self.exact.summary.net_cost
    }

    /// Gap relative to the exact savings, `None` when the battery saves nothing
    pub fn relative_gap(&self) -> Option<f64> {
        let savings = self.exact.summary.savings();
        (savings.abs() > f64::EPSILON).then(|| self.optimality_gap() / savings)
    }
}
