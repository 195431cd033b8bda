use serde::Serialize;

use super::model::ObjectiveSense;
use super::summary::DispatchSummary;
use crate::domain::{BatteryConfig, DispatchTable, TimeSeriesInput};
use crate::error::DispatchError;

/// Objective value reported by an exact solve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObjectiveReport {
    pub sense: ObjectiveSense,
    pub value: f64,
}

/// Schedule produced by a [`DispatchStrategy`]
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchPlan {
    pub strategy: &'static str,
    pub table: DispatchTable,
    pub summary: DispatchSummary,
    /// `None` for strategies that do not optimize an objective
    pub objective: Option<ObjectiveReport>,
}

impl DispatchPlan {
    pub fn new(
        strategy: &'static str,
        table: DispatchTable,
        input: &TimeSeriesInput,
        objective: Option<ObjectiveReport>,
    ) -> Self {
        let summary = DispatchSummary::from_table(&table, input);
        Self {
            strategy,
            table,
            summary,
            objective,
        }
    }
}

pub trait DispatchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn dispatch(
        &self,
        input: &TimeSeriesInput,
        battery: &BatteryConfig,
    ) -> Result<DispatchPlan, DispatchError>;
}

pub struct BatteryOptimizer {
    pub strategy: Box<dyn DispatchStrategy>,
}

impl BatteryOptimizer {
    pub fn new(strategy: impl DispatchStrategy + 'static) -> Self {
        Self {
            strategy: Box::new(strategy),
        }
    }

    pub fn optimize(
        &self,
        input: &TimeSeriesInput,
        battery: &BatteryConfig,
    ) -> Result<DispatchPlan, DispatchError> {
        tracing::debug!(
            strategy = self.strategy.name(),
            hours = input.horizon(),
            "dispatching battery"
        );
        self.strategy.dispatch(input, battery)
    }
}
