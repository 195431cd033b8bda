//! Battery dispatch for PV self-consumption over an hourly year
//!
//! Two strategies share one input and output format:
//! - [`optimizer::MilpDispatcher`]: exact mixed-integer formulation
//! - [`optimizer::GreedyDispatcher`]: solver-free forward heuristic

pub mod config;
pub mod domain;
pub mod error;
pub mod io;
pub mod optimizer;
pub mod telemetry;

pub use error::DispatchError;
