//! Exact dispatch formulation
//!
//! Emits the grid / PV / battery balancing problem as a mixed-integer linear
//! model. Per-timestep variables:
//! - grid_import, pv_export, charge_power, discharge_power (W, >= 0)
//! - unmet_demand, excess_pv (W, >= 0, pinned to the data at build time)
//! - soc (Wh, bounded by constraints)
//! - is_buying, is_charging, is_discharging (binary)
//!
//! The state of charge wraps around: the first hour follows the last one, so
//! a solved year ends where it started.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};

use super::model::{
    ConstraintFamily, ConstraintRow, LinearConstraint, LinearExpr, Objective, ObjectiveSense,
    VarId, VariableDef, VariableDomain,
};
use crate::domain::{BatteryConfig, Entity, TimeSeriesInput};
use crate::error::DispatchError;

/// Default big-M constant for the buy/sell disjunction
pub const DEFAULT_BIG_M: f64 = 5.0e7;

/// Formulation options that are not part of the battery or the data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    pub sense: ObjectiveSense,
    /// Must exceed any feasible grid import or PV export (W)
    pub big_m: f64,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            sense: ObjectiveSense::MaximizeRevenue,
            big_m: DEFAULT_BIG_M,
        }
    }
}

impl ModelOptions {
    pub fn with_sense(mut self, sense: ObjectiveSense) -> Self {
        self.sense = sense;
        self
    }

    pub fn with_big_m(mut self, big_m: f64) -> Self {
        self.big_m = big_m;
        self
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if !self.big_m.is_finite() || self.big_m <= 0.0 {
            return Err(DispatchError::config(format!(
                "big_m must be positive and finite, got {}",
                self.big_m
            )));
        }
        Ok(())
    }
}

/// What an assignment violates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationSource {
    Constraint(ConstraintFamily),
    Domain(Entity),
}

/// A constraint or variable domain that an assignment fails to satisfy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Violation {
    pub source: ViolationSource,
    pub timestep: Option<usize>,
    pub amount: f64,
}

/// The assembled optimization model, ready to be handed to a solver
#[derive(Debug, Clone)]
pub struct DispatchModel {
    horizon: usize,
    variables: Vec<VariableDef>,
    /// `index[entity][t]`
    index: Vec<Vec<VarId>>,
    constraints: BTreeMap<ConstraintFamily, Vec<ConstraintRow>>,
    objective: Objective,
    options: ModelOptions,
}

impl DispatchModel {
    /// Build the formulation for `input` and `battery`
    pub fn build(
        input: &TimeSeriesInput,
        battery: &BatteryConfig,
        options: &ModelOptions,
    ) -> Result<Self, DispatchError> {
        battery.validate()?;
        options.validate()?;

        let mut model = Self::declare_variables(input.horizon(), *options);
        model.add_flow_constraints(input);
        model.add_battery_constraints(battery);
        model.add_grid_constraints(input, options.big_m);
        model.objective = model.build_objective(input, options.sense);

        tracing::debug!(
            horizon = model.horizon,
            variables = model.variable_count(),
            binaries = model.binary_count(),
            constraints = model.constraint_count(),
            sense = %options.sense,
            "dispatch model built"
        );

        Ok(model)
    }

    fn declare_variables(horizon: usize, options: ModelOptions) -> Self {
        let mut variables = Vec::with_capacity(horizon * Entity::COUNT);
        let mut index = Vec::new();

        for entity in Entity::iter() {
            let domain = match entity {
                e if e.is_indicator() => VariableDomain::Binary,
                Entity::Soc => VariableDomain::free(),
                _ => VariableDomain::non_negative(),
            };
            let ids = (0..horizon)
                .map(|timestep| {
                    let id = VarId(variables.len());
                    variables.push(VariableDef {
                        entity,
                        timestep,
                        domain,
                    });
                    id
                })
                .collect();
            index.push(ids);
        }

        Self {
            horizon,
            variables,
            index,
            constraints: BTreeMap::new(),
            objective: Objective {
                sense: options.sense,
                expr: LinearExpr::default(),
            },
            options,
        }
    }

    fn push(&mut self, family: ConstraintFamily, timestep: Option<usize>, c: LinearConstraint) {
        self.constraints.entry(family).or_default().push(ConstraintRow {
            timestep,
            constraint: c,
        });
    }

    /// Shortfall / surplus definitions and the limits they put on grid and export flows
    fn add_flow_constraints(&mut self, input: &TimeSeriesInput) {
        use ConstraintFamily::*;

        for t in 0..self.horizon {
            let demand = input.demand()[t];
            let pv = input.pv()[t];
            let grid = self.var(Entity::GridImport, t);
            let export = self.var(Entity::PvExport, t);
            let unmet = self.var(Entity::UnmetDemand, t);
            let excess = self.var(Entity::ExcessPv, t);
            let discharge = self.var(Entity::DischargePower, t);

            self.push(GridImportNonNegative, Some(t), LinearConstraint::ge(grid, 0.0));
            self.push(GridImportWithinUnmetDemand, Some(t), LinearConstraint::le(grid, unmet));

            // Branch picked from the data now, not by the solver.
            let unmet_value = if demand > pv { demand - pv } else { 0.0 };
            self.push(UnmetDemandDefinition, Some(t), LinearConstraint::equal(unmet, unmet_value));

            self.push(PvExportNonNegative, Some(t), LinearConstraint::ge(export, 0.0));
            self.push(PvExportWithinExcessPv, Some(t), LinearConstraint::le(export, excess));

            let excess_value = if pv > demand { pv - demand } else { 0.0 };
            self.push(ExcessPvDefinition, Some(t), LinearConstraint::equal(excess, excess_value));

            self.push(PvExportWithinGeneration, Some(t), LinearConstraint::ge(pv, export));
            self.push(
                DeficitCoverage,
                Some(t),
                LinearConstraint::equal(LinearExpr::from(discharge).plus(1.0, grid), unmet),
            );
        }
    }

    /// Power limits, mutual exclusion and the state-of-charge chain
    fn add_battery_constraints(&mut self, battery: &BatteryConfig) {
        use ConstraintFamily::*;

        let eta_c = battery.charge_efficiency;
        let inv_eta_d = 1.0 / battery.discharge_efficiency;
        let last = self.horizon - 1;

        for t in 0..self.horizon {
            let charge = self.var(Entity::ChargePower, t);
            let discharge = self.var(Entity::DischargePower, t);
            let is_charging = self.var(Entity::IsCharging, t);
            let is_discharging = self.var(Entity::IsDischarging, t);
            let soc = self.var(Entity::Soc, t);

            self.push(
                ChargeLowerBound,
                Some(t),
                LinearConstraint::ge(charge, LinearExpr::term(is_charging, battery.charge_min_w)),
            );
            self.push(
                ChargeUpperBound,
                Some(t),
                LinearConstraint::le(charge, LinearExpr::term(is_charging, battery.charge_max_w)),
            );
            self.push(
                DischargeLowerBound,
                Some(t),
                LinearConstraint::ge(
                    discharge,
                    LinearExpr::term(is_discharging, battery.discharge_min_w),
                ),
            );
            self.push(
                DischargeUpperBound,
                Some(t),
                LinearConstraint::le(
                    discharge,
                    LinearExpr::term(is_discharging, battery.discharge_max_w),
                ),
            );
            self.push(
                ChargeDischargeExclusion,
                Some(t),
                LinearConstraint::le(LinearExpr::sum([is_charging, is_discharging]), 1.0),
            );

            if t >= 1 {
                let previous = self.var(Entity::Soc, t - 1);
                self.push(
                    SocRecurrence,
                    Some(t),
                    LinearConstraint::equal(
                        soc,
                        LinearExpr::from(previous)
                            .plus(eta_c, charge)
                            .plus(-inv_eta_d, discharge),
                    ),
                );
            }

            self.push(SocLowerBound, Some(t), LinearConstraint::ge(soc, battery.soc_min_wh));
            self.push(SocUpperBound, Some(t), LinearConstraint::le(soc, battery.soc_max_wh));
        }

        let first = self.var(Entity::Soc, 0);
        let closing = LinearExpr::from(self.var(Entity::Soc, last))
            .plus(eta_c, self.var(Entity::ChargePower, 0))
            .plus(-inv_eta_d, self.var(Entity::DischargePower, 0));
        self.push(SocWraparound, None, LinearConstraint::equal(first, closing));
        self.push(SocInitial, None, LinearConstraint::equal(first, battery.soc_min_wh));

        let total_discharge = LinearExpr::sum(self.index[Entity::DischargePower as usize].clone());
        let total_charge = LinearExpr::sum(self.index[Entity::ChargePower as usize].clone());
        self.push(
            EnergyConservation,
            None,
            LinearConstraint::le(total_discharge, total_charge),
        );
    }

    /// Buy/sell disjunction and the power balance
    fn add_grid_constraints(&mut self, input: &TimeSeriesInput, big_m: f64) {
        use ConstraintFamily::*;

        for t in 0..self.horizon {
            let grid = self.var(Entity::GridImport, t);
            let export = self.var(Entity::PvExport, t);
            let charge = self.var(Entity::ChargePower, t);
            let discharge = self.var(Entity::DischargePower, t);
            let is_buying = self.var(Entity::IsBuying, t);

            self.push(
                ExportBigM,
                Some(t),
                LinearConstraint::le(export, LinearExpr::constant(big_m).plus(-big_m, is_buying)),
            );
            self.push(ImportBigM, Some(t), LinearConstraint::le(grid, LinearExpr::term(is_buying, big_m)));

            // demand == grid + pv - export - charge + discharge
            let supply = LinearExpr::constant(input.pv()[t])
                .plus(1.0, grid)
                .plus(-1.0, export)
                .plus(-1.0, charge)
                .plus(1.0, discharge);
            self.push(PowerBalance, Some(t), LinearConstraint::equal(input.demand()[t], supply));
        }
    }

    fn build_objective(&self, input: &TimeSeriesInput, sense: ObjectiveSense) -> Objective {
        let sign = match sense {
            ObjectiveSense::MaximizeRevenue => 1.0,
            ObjectiveSense::MinimizeCost => -1.0,
        };
        let feed_in = input.feed_in_tariff();

        let mut expr = LinearExpr::default();
        for t in 0..self.horizon {
            expr.add_term(self.var(Entity::PvExport, t), sign * feed_in);
            expr.add_term(self.var(Entity::GridImport, t), -sign * input.price(t));
        }

        Objective { sense, expr }
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    /// Variable modelling `entity` at timestep `t`
    pub fn var(&self, entity: Entity, t: usize) -> VarId {
        self.index[entity as usize][t]
    }

    pub fn variables(&self) -> &[VariableDef] {
        &self.variables
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn binary_count(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.domain == VariableDomain::Binary)
            .count()
    }

    /// Rows of one constraint family, in timestep order
    pub fn family(&self, family: ConstraintFamily) -> &[ConstraintRow] {
        self.constraints.get(&family).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every constraint row, grouped by family in emission order
    pub fn constraints(&self) -> impl Iterator<Item = (ConstraintFamily, &ConstraintRow)> + '_ {
        self.constraints
            .iter()
            .flat_map(|(family, rows)| rows.iter().map(move |row| (*family, row)))
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.values().map(Vec::len).sum()
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Constraints and variable domains violated by `values` beyond `tolerance`
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<Violation> {
        let constraints = self.constraints().filter_map(|(family, row)| {
            let amount = row.constraint.violation(values);
            (amount > tolerance).then_some(Violation {
                source: ViolationSource::Constraint(family),
                timestep: row.timestep,
                amount,
            })
        });

        let domains = self.variables.iter().zip(values).filter_map(|(def, value)| {
            let amount = def.domain.distance(*value);
            (amount > tolerance).then_some(Violation {
                source: ViolationSource::Domain(def.entity),
                timestep: Some(def.timestep),
                amount,
            })
        });

        constraints.chain(domains).collect()
    }
}
