pub mod config;
pub mod engine;
pub mod factors;
pub mod validation;

pub use config::*;
pub use engine::{aggregate, Aggregate, ScoringEngine};
pub use factors::{confidence_for_count, record_value};
pub use validation::validate_scoring;
