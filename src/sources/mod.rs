//! Acquisition of evidence from external civic data providers.

pub mod cache;
pub mod collector;
pub mod fetcher;
pub mod health;
pub mod http;
pub mod normalize;
pub mod rate_limit;

pub use cache::{CacheKey, CacheStats, ResponseCache};
pub use collector::{merge_evidence, CollectedEvidence, DataCollector};
pub use fetcher::{FetchOutcome, SourceFetcher};
pub use health::{Availability, HealthRegistry, SourceHealth};
pub use http::HttpSourceClient;
pub use normalize::{normalize_payload, InvalidEvidence, Normalized};
pub use rate_limit::{RateLimiter, RateLimiterStats, RATE_WINDOW};

use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use thiserror::Error;

use crate::model::TimeRange;

/// Why one source failed to contribute to a collection.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    #[error("source {source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    #[error("source {source_name} rejected credentials (HTTP {status})")]
    Unauthorized { source_name: String, status: u16 },

    #[error("source {source_name} rate limit exhausted")]
    RateLimited { source_name: String },

    #[error("source {source_name} timed out after {after:?}")]
    Timeout { source_name: String, after: Duration },

    #[error("source {source_name} returned an unreadable payload: {reason}")]
    Payload { source_name: String, reason: String },
}

impl SourceError {
    pub fn source_name(&self) -> &str {
        match self {
            SourceError::Unavailable { source_name, .. }
            | SourceError::Unauthorized { source_name, .. }
            | SourceError::RateLimited { source_name }
            | SourceError::Timeout { source_name, .. }
            | SourceError::Payload { source_name, .. } => source_name,
        }
    }
}

/// Parameters of one evidence request, normalized to whole days so that
/// equivalent requests share a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceQuery {
    pub subject_id: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl SourceQuery {
    pub fn new(subject_id: &str, range: &TimeRange) -> Self {
        Self {
            subject_id: subject_id.trim().to_string(),
            from: range.start.date_naive(),
            to: range.end.date_naive(),
        }
    }

    /// Stable textual form used as the cache key
    pub fn normalized(&self) -> String {
        format!(
            "subject={}&from={}&to={}",
            self.subject_id.to_lowercase(),
            self.from.format("%Y-%m-%d"),
            self.to.format("%Y-%m-%d")
        )
    }
}

/// Performs the raw network call against one data provider.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Name the source is configured, rate limited and cached under
    fn name(&self) -> &str;

    /// Fetch the raw JSON payload for a query
    async fn fetch_raw(&self, query: &SourceQuery) -> Result<serde_json::Value, SourceError>;
}
