pub mod alignment;
pub mod binning;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod constraint_errors;
pub mod constraints;
pub mod evaluation;
pub mod logging;
pub mod model_data;
pub mod observations;
pub mod plotting;

pub use constraint_errors::ConstraintError;
pub use constraints::{parse, Constraint, ConstraintKind, ConstraintSet};
pub use evaluation::{evaluate, evaluate_particles, log_results, EvaluationContext};
