pub mod config;
pub mod detector;

pub use config::{default_axis, validate_bias, Axis, BiasConfig};
pub use detector::{BiasCheckInconclusive, BiasDetector, BiasReview};
