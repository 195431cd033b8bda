//! Solver boundary
//!
//! A [`SolverAdapter`] receives a finished [`DispatchModel`] and returns either
//! an optimal assignment or an [`DispatchError::OptimizationFailure`] carrying
//! the termination status. Values of non-optimal solves never leave this module.

use std::time::Instant;

use good_lp::{
    constraint, variable, Constraint, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::formulation::DispatchModel;
use super::model::{LinearConstraint, LinearExpr, ObjectiveSense, Relation, VarId, VariableDomain};
use crate::error::DispatchError;

/// Solver verdict on a solve attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TerminationStatus {
    Optimal,
    Infeasible,
    Unbounded,
    Other,
}

impl From<&ResolutionError> for TerminationStatus {
    fn from(error: &ResolutionError) -> Self {
        match error {
            ResolutionError::Infeasible => TerminationStatus::Infeasible,
            ResolutionError::Unbounded => TerminationStatus::Unbounded,
            _ => TerminationStatus::Other,
        }
    }
}

/// Optimal assignment of a [`DispatchModel`]
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedModel {
    values: Vec<f64>,
    objective_value: f64,
}

impl SolvedModel {
    /// Wrap an optimal assignment, evaluating the model objective on it
    pub fn new(model: &DispatchModel, values: Vec<f64>) -> Result<Self, DispatchError> {
        if values.len() != model.variable_count() {
            return Err(DispatchError::misaligned(format!(
                "solver returned {} values for {} variables",
                values.len(),
                model.variable_count()
            )));
        }
        let objective_value = model.objective().expr.evaluate(&values);
        Ok(Self {
            values,
            objective_value,
        })
    }

    pub fn status(&self) -> TerminationStatus {
        TerminationStatus::Optimal
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.index()]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Objective value in the model's own sense
    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }
}

/// Anything that can solve a [`DispatchModel`]
pub trait SolverAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, model: &DispatchModel) -> Result<SolvedModel, DispatchError>;
}

/// good_lp backend used by [`GoodLpSolver`]
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
pub enum SolverBackend {
    /// Pure-Rust simplex with branch and bound
    #[default]
    Microlp,
    /// HiGHS (faster for full-year problems)
    Highs,
    /// COIN-OR CBC
    Cbc,
}

impl SolverBackend {
    /// Whether the backend was compiled into this build
    pub fn is_available(self) -> bool {
        match self {
            SolverBackend::Microlp => cfg!(feature = "microlp"),
            SolverBackend::Highs => cfg!(feature = "highs"),
            SolverBackend::Cbc => cfg!(feature = "cbc"),
        }
    }
}

/// Above this many hours the pure-Rust backend gets slow
const MICROLP_COMFORT_HOURS: usize = 168;

/// [`SolverAdapter`] on top of good_lp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoodLpSolver {
    backend: SolverBackend,
    /// Passed through to backends that support it (HiGHS, CBC)
    time_limit_seconds: Option<f64>,
}

impl Default for GoodLpSolver {
    fn default() -> Self {
        Self {
            backend: SolverBackend::default(),
            time_limit_seconds: None,
        }
    }
}

impl GoodLpSolver {
    pub fn new(
        backend: SolverBackend,
        time_limit_seconds: Option<f64>,
    ) -> Result<Self, DispatchError> {
        if !backend.is_available() {
            return Err(DispatchError::config(format!(
                "solver backend '{backend}' is not compiled in (enable the '{backend}' feature)"
            )));
        }
        if let Some(limit) = time_limit_seconds {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(DispatchError::config(format!(
                    "time_limit_seconds must be positive, got {limit}"
                )));
            }
        }
        Ok(Self {
            backend,
            time_limit_seconds,
        })
    }

    pub fn backend(&self) -> SolverBackend {
        self.backend
    }

    pub fn time_limit_seconds(&self) -> Option<f64> {
        self.time_limit_seconds
    }

    fn run(&self, model: &DispatchModel) -> Result<Vec<f64>, ResolutionError> {
        let mut problem = ProblemVariables::new();
        let handles: Vec<Variable> = model
            .variables()
            .iter()
            .map(|def| problem.add(definition(def.domain)))
            .collect();

        let objective = expression(&model.objective().expr, &handles);
        let unsolved = match model.objective().sense {
            ObjectiveSense::MaximizeRevenue => problem.maximise(objective),
            ObjectiveSense::MinimizeCost => problem.minimise(objective),
        };

        let constraints: Vec<Constraint> = model
            .constraints()
            .map(|(_, row)| translate(&row.constraint, &handles))
            .collect();

        match self.backend {
            #[cfg(feature = "microlp")]
            SolverBackend::Microlp => {
                if self.time_limit_seconds.is_some() {
                    tracing::warn!("microlp does not support a time limit; ignoring it");
                }
                let solver_model = unsolved.using(good_lp::solvers::microlp::microlp);
                finish(solver_model, constraints, &handles)
            }
            #[cfg(feature = "highs")]
            SolverBackend::Highs => {
                let mut solver_model = unsolved.using(good_lp::solvers::highs::highs);
                if let Some(limit) = self.time_limit_seconds {
                    solver_model = solver_model.set_time_limit(limit);
                }
                finish(solver_model, constraints, &handles)
            }
            #[cfg(feature = "cbc")]
            SolverBackend::Cbc => {
                let mut solver_model = unsolved.using(good_lp::solvers::coin_cbc::coin_cbc);
                if let Some(limit) = self.time_limit_seconds {
                    solver_model.set_parameter("sec", &limit.to_string());
                }
                finish(solver_model, constraints, &handles)
            }
            #[allow(unreachable_patterns)]
            _ => Err(ResolutionError::Str(format!(
                "solver backend '{}' is not compiled in",
                self.backend
            ))),
        }
    }
}

impl SolverAdapter for GoodLpSolver {
    fn name(&self) -> &'static str {
        match self.backend {
            SolverBackend::Microlp => "microlp",
            SolverBackend::Highs => "highs",
            SolverBackend::Cbc => "cbc",
        }
    }

    fn solve(&self, model: &DispatchModel) -> Result<SolvedModel, DispatchError> {
        if self.backend == SolverBackend::Microlp && model.horizon() > MICROLP_COMFORT_HOURS {
            tracing::warn!(
                "microlp received {} hours with {} binaries. This may take a long time; \
                 consider the 'highs' backend for full-year runs.",
                model.horizon(),
                model.binary_count()
            );
        }

        tracing::info!(
            solver = self.name(),
            variables = model.variable_count(),
            constraints = model.constraint_count(),
            "solving dispatch model"
        );
        let started = Instant::now();

        match self.run(model) {
            Ok(values) => {
                let solved = SolvedModel::new(model, values)?;
                tracing::info!(
                    solver = self.name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    objective = solved.objective_value(),
                    "dispatch model solved to optimality"
                );
                Ok(solved)
            }
            Err(error) => {
                let status = TerminationStatus::from(&error);
                tracing::error!(
                    solver = self.name(),
                    %status,
                    error = %error,
                    "dispatch model did not solve to optimality"
                );
                Err(DispatchError::OptimizationFailure { status })
            }
        }
    }
}

fn definition(domain: VariableDomain) -> good_lp::VariableDefinition {
    match domain {
        VariableDomain::Binary => variable().binary(),
        VariableDomain::Continuous { lower, upper } => {
            let mut def = variable();
            if lower.is_finite() {
                def = def.min(lower);
            }
            if upper.is_finite() {
                def = def.max(upper);
            }
            def
        }
    }
}

fn expression(expr: &LinearExpr, handles: &[Variable]) -> Expression {
    let mut out = Expression::from(expr.constant_term());
    for (var, coefficient) in expr.terms() {
        out += *coefficient * handles[var.index()];
    }
    out
}

fn translate(c: &LinearConstraint, handles: &[Variable]) -> Constraint {
    let lhs = expression(&c.lhs, handles);
    let rhs = expression(&c.rhs, handles);
    match c.relation {
        Relation::LessOrEqual => constraint!(lhs <= rhs),
        Relation::GreaterOrEqual => constraint!(lhs >= rhs),
        Relation::Equal => constraint!(lhs == rhs),
    }
}

#[allow(dead_code)]
fn finish<M>(
    mut solver_model: M,
    constraints: Vec<Constraint>,
    handles: &[Variable],
) -> Result<Vec<f64>, ResolutionError>
where
    M: SolverModel<Error = ResolutionError>,
{
    for c in constraints {
        solver_model.add_constraint(c);
    }
    let solution = solver_model.solve()?;
    Ok(handles.iter().map(|h| solution.value(*h)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_resolution_error() {
        assert_eq!(
            TerminationStatus::from(&ResolutionError::Infeasible),
            TerminationStatus::Infeasible
        );
        assert_eq!(
            TerminationStatus::from(&ResolutionError::Unbounded),
            TerminationStatus::Unbounded
        );
        assert_eq!(
            TerminationStatus::from(&ResolutionError::Str("numerical trouble".to_string())),
            TerminationStatus::Other
        );
        assert_eq!(TerminationStatus::Optimal.to_string(), "optimal");
    }

    #[test]
    fn test_backend_availability() {
        assert_eq!(SolverBackend::Microlp.is_available(), cfg!(feature = "microlp"));
        assert_eq!("highs".parse::<SolverBackend>().unwrap(), SolverBackend::Highs);
    }

    #[test]
    fn test_unavailable_backend_rejected() {
        #[cfg(not(feature = "cbc"))]
        assert!(matches!(
            GoodLpSolver::new(SolverBackend::Cbc, None),
            Err(DispatchError::InvalidConfig(_))
        ));
        #[cfg(feature = "microlp")]
        assert!(matches!(
            GoodLpSolver::new(SolverBackend::Microlp, Some(-1.0)),
            Err(DispatchError::InvalidConfig(_))
        ));
    }
}
