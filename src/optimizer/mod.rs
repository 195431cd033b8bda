pub mod extract;
pub mod formulation;
pub mod greedy;
pub mod model;
pub mod solver;
pub mod strategies;
pub mod summary;
pub mod types;

pub use extract::*;
pub use formulation::*;
pub use greedy::*;
pub use model::*;
pub use solver::*;
pub use strategies::*;
pub use summary::*;
pub use types::*;
