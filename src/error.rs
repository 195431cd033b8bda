use thiserror::Error;

use crate::optimizer::TerminationStatus;

/// Errors raised while validating inputs, building or solving a dispatch model
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Misaligned input: {0}")]
    MisalignedInput(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Optimization failed with solver status: {status}")]
    OptimizationFailure { status: TerminationStatus },
}

impl DispatchError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        DispatchError::InvalidConfig(msg.into())
    }

    pub(crate) fn misaligned(msg: impl Into<String>) -> Self {
        DispatchError::MisalignedInput(msg.into())
    }

    pub(crate) fn input(msg: impl Into<String>) -> Self {
        DispatchError::InvalidInput(msg.into())
    }

    /// Termination status carried by an optimization failure, if any
    pub fn status(&self) -> Option<TerminationStatus> {
        match self {
            DispatchError::OptimizationFailure { status } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DispatchError::config("charge_min_w must be <= charge_max_w");
        assert_eq!(
            error.to_string(),
            "Invalid configuration: charge_min_w must be <= charge_max_w"
        );

        let error = DispatchError::OptimizationFailure {
            status: TerminationStatus::Infeasible,
        };
        assert_eq!(error.to_string(), "Optimization failed with solver status: infeasible");
    }

    #[test]
    fn test_status_accessor() {
        let error = DispatchError::OptimizationFailure {
            status: TerminationStatus::Unbounded,
        };
        assert_eq!(error.status(), Some(TerminationStatus::Unbounded));
        assert_eq!(DispatchError::misaligned("x").status(), None);
    }
}
