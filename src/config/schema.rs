use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::bias::BiasConfig;
use crate::scoring::ScoringConfig;

pub const DEFAULT_CACHE_DURATION: &str = "24h";
pub const DEFAULT_SOURCE_TIMEOUT: &str = "30s";
pub const DEFAULT_RATE_LIMIT_WAIT: &str = "30s";
pub const DEFAULT_SUBJECT_TIMEOUT: &str = "5m";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_MAX_CONCURRENT_SUBJECTS: usize = 4;

/// Top-level configuration, loaded once at startup and validated before use.
///
/// Example YAML:
/// ```yaml
/// sources:
///   - name: congress.gov
///     base_url: https://api.congress.gov/v3
///     rate_limit: 1000
///     api_key_env: CONGRESS_GOV_API_KEY
/// cache:
///   enabled: true
///   duration: 24h
/// bias_detection:
///   enabled: true
///   source_concentration_threshold: 0.7
/// scoring:
///   category_weights:
///     healthcare: 0.2
/// confidence_threshold: 0.7
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub bias_detection: BiasConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Reports below this overall confidence are flagged in their metadata
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Subjects evaluated at once in a batch
    #[serde(default = "default_max_concurrent_subjects")]
    pub max_concurrent_subjects: usize,

    /// How long a request may wait for a rate-limit slot (e.g. "30s")
    #[serde(default = "default_rate_limit_wait")]
    pub rate_limit_wait: String,

    /// Upper bound on one subject's whole evaluation (e.g. "5m")
    #[serde(default = "default_subject_timeout")]
    pub subject_timeout: String,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            cache: CacheConfig::default(),
            bias_detection: BiasConfig::default(),
            scoring: ScoringConfig::default(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_concurrent_subjects: DEFAULT_MAX_CONCURRENT_SUBJECTS,
            rate_limit_wait: DEFAULT_RATE_LIMIT_WAIT.to_string(),
            subject_timeout: DEFAULT_SUBJECT_TIMEOUT.to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    pub fn rate_limit_wait(&self) -> Duration {
        parse_duration_or(&self.rate_limit_wait, DEFAULT_RATE_LIMIT_WAIT)
    }

    pub fn subject_timeout(&self) -> Duration {
        parse_duration_or(&self.subject_timeout, DEFAULT_SUBJECT_TIMEOUT)
    }
}

/// One external data provider.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub name: String,
    pub base_url: String,

    /// Requests admitted per rolling hour
    pub rate_limit: u32,

    /// Environment variable holding this source's API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Per-request timeout (e.g. "30s")
    #[serde(default = "default_source_timeout")]
    pub timeout: String,
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        parse_duration_or(&self.timeout, DEFAULT_SOURCE_TIMEOUT)
    }

    /// Timeout for sources without a configuration entry
    pub fn default_timeout() -> Duration {
        parse_duration_or(DEFAULT_SOURCE_TIMEOUT, DEFAULT_SOURCE_TIMEOUT)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub enabled: bool, // false when --no-cache

    /// Time-to-live of a cached response (e.g. "24h")
    pub duration: String,

    /// Write entries through to an on-disk store
    pub persist: bool,

    /// Override for the on-disk store location
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration: DEFAULT_CACHE_DURATION.to_string(),
            persist: false,
            dir: None,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        parse_duration_or(&self.duration, DEFAULT_CACHE_DURATION)
    }
}

/// Retry budget for failed evaluation steps.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff: String,
    pub max_backoff: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_backoff: "500ms".to_string(),
            max_backoff: "10s".to_string(),
        }
    }
}

impl RetryConfig {
    pub fn initial_backoff(&self) -> Duration {
        parse_duration_or(&self.initial_backoff, "500ms")
    }

    pub fn max_backoff(&self) -> Duration {
        parse_duration_or(&self.max_backoff, "10s")
    }
}

fn parse_duration_or(value: &str, fallback: &str) -> Duration {
    humantime::parse_duration(value.trim())
        .or_else(|_| humantime::parse_duration(fallback))
        .unwrap_or_default()
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            name: "congress.gov".to_string(),
            base_url: "https://api.congress.gov/v3".to_string(),
            rate_limit: 1000,
            api_key_env: Some("CONGRESS_GOV_API_KEY".to_string()),
            timeout: DEFAULT_SOURCE_TIMEOUT.to_string(),
        },
        SourceConfig {
            name: "govtrack.us".to_string(),
            base_url: "https://www.govtrack.us/api/v2".to_string(),
            rate_limit: 1000,
            api_key_env: Some("GOVTRACK_API_KEY".to_string()),
            timeout: DEFAULT_SOURCE_TIMEOUT.to_string(),
        },
        SourceConfig {
            name: "opensecrets.org".to_string(),
            base_url: "https://www.opensecrets.org/api".to_string(),
            rate_limit: 500,
            api_key_env: Some("OPENSECRETS_API_KEY".to_string()),
            timeout: DEFAULT_SOURCE_TIMEOUT.to_string(),
        },
    ]
}

fn default_source_timeout() -> String {
    DEFAULT_SOURCE_TIMEOUT.to_string()
}

fn default_rate_limit_wait() -> String {
    DEFAULT_RATE_LIMIT_WAIT.to_string()
}

fn default_subject_timeout() -> String {
    DEFAULT_SUBJECT_TIMEOUT.to_string()
}

fn default_confidence_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_max_concurrent_subjects() -> usize {
    DEFAULT_MAX_CONCURRENT_SUBJECTS
}
