//! MILP (Mixed-Integer Linear Programming) dispatcher
//!
//! Exact strategy: builds the full [`DispatchModel`], hands it to a
//! [`SolverAdapter`] and lays the optimal assignment out as a table.
//!
//! Binaries per hour:
//! - is_buying (no simultaneous import and export)
//! - is_charging / is_discharging (no simultaneous charge and discharge,
//!   minimum power when active)
//!
//! A full year is 87 600 variables, 26 280 of them binary. The pure-Rust
//! backend handles days to weeks; use HiGHS or CBC for full-year runs.

use crate::domain::{BatteryConfig, TimeSeriesInput};
use crate::error::DispatchError;
use crate::optimizer::{
    DispatchModel, DispatchPlan, DispatchStrategy, GoodLpSolver, ModelOptions, ObjectiveReport,
    ResultExtractor, SolvedModel, SolverAdapter,
};

/// MILP dispatcher producing the cost-optimal schedule
pub struct MilpDispatcher {
    options: ModelOptions,
    solver: Box<dyn SolverAdapter>,
}

impl Default for MilpDispatcher {
    fn default() -> Self {
        Self {
            options: ModelOptions::default(),
            solver: Box::new(GoodLpSolver::default()),
        }
    }
}

impl MilpDispatcher {
    pub fn new(options: ModelOptions, solver: impl SolverAdapter + 'static) -> Self {
        Self {
            options,
            solver: Box::new(solver),
        }
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    /// Build and solve, keeping the model for inspection
    pub fn solve(
        &self,
        input: &TimeSeriesInput,
        battery: &BatteryConfig,
    ) -> Result<(DispatchModel, SolvedModel), DispatchError> {
        let model = DispatchModel::build(input, battery, &self.options)?;
        let solved = self.solver.solve(&model)?;
        Ok((model, solved))
    }
}

impl DispatchStrategy for MilpDispatcher {
    fn name(&self) -> &'static str {
        "milp"
    }

    fn dispatch(
        &self,
        input: &TimeSeriesInput,
        battery: &BatteryConfig,
    ) -> Result<DispatchPlan, DispatchError> {
        let (model, solved) = self.solve(input, battery)?;
        let table = ResultExtractor::extract(&model, &solved)?;
        let objective = ObjectiveReport {
            sense: model.objective().sense,
            value: solved.objective_value(),
        };
        Ok(DispatchPlan::new(self.name(), table, input, Some(objective)))
    }
}
