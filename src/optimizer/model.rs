//! Solver-independent description of a linear / mixed-integer model
//!
//! The dispatch formulation is emitted in this form and handed to a
//! [`SolverAdapter`](super::SolverAdapter). Every constraint stays addressable
//! by family and timestep so that models can be inspected and solutions
//! checked without a solver.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::domain::Entity;

/// Handle of a model variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VariableDomain {
    Continuous { lower: f64, upper: f64 },
    Binary,
}

impl VariableDomain {
    pub fn non_negative() -> Self {
        VariableDomain::Continuous {
            lower: 0.0,
            upper: f64::INFINITY,
        }
    }

    pub fn free() -> Self {
        VariableDomain::Continuous {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }

    /// Distance from `value` to the domain (0 inside it)
    pub fn distance(&self, value: f64) -> f64 {
        match *self {
            VariableDomain::Continuous { lower, upper } => {
                (lower - value).max(value - upper).max(0.0)
            }
            VariableDomain::Binary => value.abs().min((value - 1.0).abs()),
        }
    }

    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        self.distance(value) <= tolerance
    }
}

/// A declared variable: which entity it models at which timestep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableDef {
    pub entity: Entity,
    pub timestep: usize,
    pub domain: VariableDomain,
}

/// `Σ coefficient·variable + constant`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn term(var: VarId, coefficient: f64) -> Self {
        Self {
            terms: vec![(var, coefficient)],
            constant: 0.0,
        }
    }

    /// Sum of `vars`, each with coefficient 1
    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (v, 1.0)).collect(),
            constant: 0.0,
        }
    }

    /// Append `coefficient·var`
    pub fn plus(mut self, coefficient: f64, var: VarId) -> Self {
        self.terms.push((var, coefficient));
        self
    }

    pub fn add_term(&mut self, var: VarId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    /// Value of the expression for a full assignment indexed by [`VarId`]
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coefficient)| coefficient * values[var.0])
            .sum::<f64>()
            + self.constant
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        LinearExpr::term(var, 1.0)
    }
}

impl From<f64> for LinearExpr {
    fn from(value: f64) -> Self {
        LinearExpr::constant(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessOrEqual,
    GreaterOrEqual,
    Equal,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::LessOrEqual => write!(f, "<="),
            Relation::GreaterOrEqual => write!(f, ">="),
            Relation::Equal => write!(f, "=="),
        }
    }
}

/// `lhs (<=|>=|==) rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub lhs: LinearExpr,
    pub relation: Relation,
    pub rhs: LinearExpr,
}

impl LinearConstraint {
    pub fn le(lhs: impl Into<LinearExpr>, rhs: impl Into<LinearExpr>) -> Self {
        Self {
            lhs: lhs.into(),
            relation: Relation::LessOrEqual,
            rhs: rhs.into(),
        }
    }

    pub fn ge(lhs: impl Into<LinearExpr>, rhs: impl Into<LinearExpr>) -> Self {
        Self {
            lhs: lhs.into(),
            relation: Relation::GreaterOrEqual,
            rhs: rhs.into(),
        }
    }

    pub fn equal(lhs: impl Into<LinearExpr>, rhs: impl Into<LinearExpr>) -> Self {
        Self {
            lhs: lhs.into(),
            relation: Relation::Equal,
            rhs: rhs.into(),
        }
    }

    /// Amount by which the assignment violates the constraint (0 when satisfied)
    pub fn violation(&self, values: &[f64]) -> f64 {
        let diff = self.lhs.evaluate(values) - self.rhs.evaluate(values);
        match self.relation {
            Relation::LessOrEqual => diff.max(0.0),
            Relation::GreaterOrEqual => (-diff).max(0.0),
            Relation::Equal => diff.abs(),
        }
    }
}

/// Constraint families of the dispatch formulation, in emission order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum ConstraintFamily {
    GridImportNonNegative,
    GridImportWithinUnmetDemand,
    UnmetDemandDefinition,
    PvExportNonNegative,
    PvExportWithinExcessPv,
    ExcessPvDefinition,
    ChargeLowerBound,
    ChargeUpperBound,
    DischargeLowerBound,
    DischargeUpperBound,
    ChargeDischargeExclusion,
    EnergyConservation,
    SocRecurrence,
    SocWraparound,
    SocInitial,
    SocLowerBound,
    SocUpperBound,
    ExportBigM,
    ImportBigM,
    PowerBalance,
    PvExportWithinGeneration,
    DeficitCoverage,
}

/// A constraint together with the timestep it belongs to
///
/// Horizon-wide constraints (energy conservation, wraparound, initial soc)
/// carry `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRow {
    pub timestep: Option<usize>,
    pub constraint: LinearConstraint,
}

/// Objective sign convention
///
/// Both senses produce the same optimal schedules; the reported objective
/// values are negatives of each other.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ObjectiveSense {
    /// maximize Σ (export·feed_in_tariff − import·price)
    #[default]
    MaximizeRevenue,
    /// minimize Σ (import·price − export·feed_in_tariff)
    MinimizeCost,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub sense: ObjectiveSense,
    pub expr: LinearExpr,
}

impl Objective {
    /// Net revenue (export revenue minus import cost) for an objective value in this sense
    pub fn net_revenue(&self, objective_value: f64) -> f64 {
        match self.sense {
            ObjectiveSense::MaximizeRevenue => objective_value,
            ObjectiveSense::MinimizeCost => -objective_value,
        }
    }
}
