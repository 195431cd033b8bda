use super::formulation::DispatchModel;
use super::solver::SolvedModel;
use crate::domain::{DispatchTable, Entity};
use crate::error::DispatchError;

/// Turns a solved [`DispatchModel`] into a [`DispatchTable`]
///
/// Indicator columns are snapped to exactly 0 or 1; the solver may report
/// binaries a few ulps away from an integer.
pub struct ResultExtractor;

impl ResultExtractor {
    pub fn extract(model: &DispatchModel, solved: &SolvedModel) -> Result<DispatchTable, DispatchError> {
        if solved.values().len() != model.variable_count() {
            return Err(DispatchError::misaligned(format!(
                "solution has {} values, model declares {}",
                solved.values().len(),
                model.variable_count()
            )));
        }

        let horizon = model.horizon();
        DispatchTable::try_from_fn(horizon, |entity| {
            (0..horizon)
                .map(|t| {
                    let value = solved.value(model.var(entity, t));
                    if entity.is_indicator() {
                        value.round()
                    } else {
                        value
                    }
                })
                .collect()
        })
    }

    /// Column values of one entity straight from the solution
    pub fn series(model: &DispatchModel, solved: &SolvedModel, entity: Entity) -> Vec<f64> {
        (0..model.horizon())
            .map(|t| solved.value(model.var(entity, t)))
            .collect()
    }
}
