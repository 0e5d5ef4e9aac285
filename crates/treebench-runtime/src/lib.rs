pub mod config;
pub mod evaluator;
pub mod planner;
pub mod runner;
pub mod sink;
pub mod source;
pub mod timing;

pub use config::*;
pub use evaluator::*;
pub use planner::*;
pub use runner::*;
pub use sink::*;
pub use source::*;
pub use timing::*;
