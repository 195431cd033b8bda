pub mod battery;
pub mod schedule;
pub mod series;

pub use battery::*;
pub use schedule::*;
pub use series::*;
