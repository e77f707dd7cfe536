use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::SourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Not queried since startup
    Unknown,
    Available,
    Unavailable,
}

/// Last known state of one source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceHealth {
    pub name: String,
    pub availability: Availability,
    pub consecutive_failures: u32,
    pub total_successes: u64,
    pub total_failures: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl SourceHealth {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            availability: Availability::Unknown,
            consecutive_failures: 0,
            total_successes: 0,
            total_failures: 0,
            last_success: None,
            last_failure: None,
            last_error: None,
        }
    }
}

/// Availability of every configured source, updated after each fetch.
///
/// The set of sources is fixed at construction and each entry has its own
/// lock, so concurrent fetches only contend on the same source.
#[derive(Debug, Default)]
pub struct HealthRegistry {
    sources: BTreeMap<String, Mutex<SourceHealth>>,
}

impl HealthRegistry {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let sources = names
            .into_iter()
            .map(|name| (name.to_string(), Mutex::new(SourceHealth::new(name))))
            .collect();
        Self { sources }
    }

    fn update(&self, source: &str, apply: impl FnOnce(&mut SourceHealth)) {
        match self.sources.get(source) {
            Some(entry) => apply(&mut entry.lock().unwrap()),
            None => tracing::debug!(source, "ignoring health update for unregistered source"),
        }
    }

    pub fn record_success(&self, source: &str, at: DateTime<Utc>) {
        self.update(source, |health| {
            health.availability = Availability::Available;
            health.consecutive_failures = 0;
            health.total_successes += 1;
            health.last_success = Some(at);
        });
    }

    pub fn record_failure(&self, error: &SourceError, at: DateTime<Utc>) {
        self.update(error.source_name(), |health| {
            health.availability = Availability::Unavailable;
            health.consecutive_failures += 1;
            health.total_failures += 1;
            health.last_failure = Some(at);
            health.last_error = Some(error.to_string());
        });
    }

    /// Current state of every registered source, ordered by name
    pub fn snapshot(&self) -> Vec<SourceHealth> {
        self.sources
            .values()
            .map(|entry| entry.lock().unwrap().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_availability_transitions() {
        let registry = HealthRegistry::new(["govtrack.us", "congress.gov"]);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].name, "congress.gov");
        assert_eq!(snapshot[0].availability, Availability::Unknown);

        let now = Utc::now();
        let error = SourceError::Unavailable {
            source_name: "congress.gov".to_string(),
            reason: "HTTP 503".to_string(),
        };
        registry.record_failure(&error, now);
        registry.record_failure(&error, now);

        let congress = &registry.snapshot()[0];
        assert_eq!(congress.availability, Availability::Unavailable);
        assert_eq!(congress.consecutive_failures, 2);
        assert!(congress.last_error.as_deref().unwrap().contains("HTTP 503"));

        registry.record_success("congress.gov", now);
        let congress = &registry.snapshot()[0];
        assert_eq!(congress.availability, Availability::Available);
        assert_eq!(congress.consecutive_failures, 0);
        assert_eq!(congress.total_failures, 2);
        assert_eq!(congress.total_successes, 1);
    }

    #[test]
    fn test_unregistered_source_is_ignored() {
        let registry = HealthRegistry::new(["congress.gov"]);
        registry.record_success("votesmart.org", Utc::now());
        registry.record_failure(
            &SourceError::RateLimited {
                source_name: "votesmart.org".to_string(),
            },
            Utc::now(),
        );

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "congress.gov");
        assert_eq!(snapshot[0].availability, Availability::Unknown);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let registry = std::sync::Arc::new(HealthRegistry::new(["a", "b"]));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let source = if i % 2 == 0 { "a" } else { "b" };
                    for _ in 0..100 {
                        registry.record_success(source, Utc::now());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].total_successes, 400);
        assert_eq!(snapshot[1].total_successes, 400);
    }
}
