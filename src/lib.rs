pub mod bias;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod evaluation;
pub mod model;
pub mod output;
pub mod scoring;
pub mod sources;
