//! Dispatch strategies backed by a solver
//!
//! - MILP: exact mixed-integer formulation solved through good_lp
//!
//! The solver-free heuristic lives in [`crate::optimizer::greedy`].

pub mod milp;

pub use milp::*;
