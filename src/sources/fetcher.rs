use std::sync::Arc;
use std::time::Duration;

use super::cache::{CacheKey, ResponseCache};
use super::normalize::normalize_payload;
use super::rate_limit::RateLimiter;
use super::{SourceClient, SourceError, SourceQuery};
use crate::model::{EvidenceRecord, Subject, TimeRange};

/// Evidence one source contributed to a collection
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub source: String,
    pub records: Vec<EvidenceRecord>,
    pub dropped: usize,
    pub from_cache: bool,
}

/// One source's client together with the shared cache and rate limiter it
/// goes through.
#[derive(Clone)]
pub struct SourceFetcher {
    client: Arc<dyn SourceClient>,
    cache: Arc<ResponseCache>,
    limiter: Arc<RateLimiter>,
    timeout: Duration,
}

impl SourceFetcher {
    pub fn new(
        client: Arc<dyn SourceClient>,
        cache: Arc<ResponseCache>,
        limiter: Arc<RateLimiter>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            cache,
            limiter,
            timeout,
        }
    }

    pub fn name(&self) -> &str {
        self.client.name()
    }

    /// Fetch and normalize a subject's evidence for a time range.
    ///
    /// Cache first; on a miss, take a rate-limit slot, call the source and
    /// cache the raw payload once it normalizes. A payload that fails to
    /// normalize is not cached, so the next request refetches it instead of
    /// serving the same error for the whole TTL. Records dated outside the
    /// range are discarded.
    pub async fn fetch_evidence(
        &self,
        subject: &Subject,
        range: &TimeRange,
    ) -> Result<FetchOutcome, SourceError> {
        let name = self.client.name();
        let query = SourceQuery::new(&subject.id, range);
        let key = CacheKey::new(name, &query);

        let (payload, from_cache) = match self.cache.get(&key) {
            Some(payload) => {
                tracing::debug!(source = name, subject = subject.id.as_str(), "cache hit");
                (payload, true)
            }
            None => {
                self.limiter.acquire(name).await?;
                let payload = tokio::time::timeout(self.timeout, self.client.fetch_raw(&query))
                    .await
                    .map_err(|_| SourceError::Timeout {
                        source_name: name.to_string(),
                        after: self.timeout,
                    })??;
                (payload, false)
            }
        };

        let normalized = normalize_payload(name, &payload)?;
        if !from_cache {
            self.cache.put(&key, payload);
        }

        let total = normalized.records.len();
        let records: Vec<_> = normalized
            .records
            .into_iter()
            .filter(|r| range.contains(r.date()))
            .collect();

        if records.len() < total {
            tracing::debug!(
                source = name,
                outside_range = total - records.len(),
                "discarded records outside the requested range"
            );
        }

        Ok(FetchOutcome {
            source: name.to_string(),
            records,
            dropped: normalized.dropped.len(),
            from_cache,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticClient {
        payload: serde_json::Value,
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl SourceClient for StaticClient {
        fn name(&self) -> &str {
            "congress.gov"
        }

        async fn fetch_raw(&self, _query: &SourceQuery) -> Result<serde_json::Value, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(self.payload.clone())
        }
    }

    fn subject() -> Subject {
        Subject {
            id: "s-1".to_string(),
            name: "Jane Roe".to_string(),
            party: "Independent".to_string(),
            state: "VT".to_string(),
            position: "Senator".to_string(),
            start_date: Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap(),
            end_date: None,
            image_url: None,
        }
    }

    fn range() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn payload() -> serde_json::Value {
        json!({
            "legislative_actions": [
                {"bill_number": "HR 1", "date": "2023-05-01", "action": "sponsored",
                 "category": "healthcare", "impact": "positive"},
                {"bill_number": "HR 2", "date": "2019-05-01", "action": "sponsored",
                 "category": "healthcare", "impact": "positive"},
                {"bill_number": "HR 3", "action": "sponsored"}
            ]
        })
    }

    fn fetcher(client: Arc<StaticClient>, cache_enabled: bool, timeout: Duration) -> SourceFetcher {
        let cache = ResponseCache::new(cache_enabled, Duration::from_secs(3600), Arc::new(SystemClock));
        let limiter = RateLimiter::new(
            vec![("congress.gov".to_string(), 100)],
            Duration::from_secs(3600),
            Duration::ZERO,
        );
        SourceFetcher::new(client, Arc::new(cache), Arc::new(limiter), timeout)
    }

    #[tokio::test]
    async fn test_filters_range_and_counts_dropped() {
        let client = Arc::new(StaticClient {
            payload: payload(),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        });
        let outcome = fetcher(client, true, Duration::from_secs(5))
            .fetch_evidence(&subject(), &range())
            .await
            .unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.dropped, 1);
        assert!(!outcome.from_cache);
    }

    #[tokio::test]
    async fn test_second_fetch_served_from_cache() {
        let client = Arc::new(StaticClient {
            payload: payload(),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        });
        let fetcher = fetcher(client.clone(), true, Duration::from_secs(5));

        let first = fetcher.fetch_evidence(&subject(), &range()).await.unwrap();
        let second = fetcher.fetch_evidence(&subject(), &range()).await.unwrap();

        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert!(second.from_cache);
        assert_eq!(first.records, second.records);
    }

    #[tokio::test]
    async fn test_disabled_cache_calls_every_time() {
        let client = Arc::new(StaticClient {
            payload: payload(),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        });
        let fetcher = fetcher(client.clone(), false, Duration::from_secs(5));

        fetcher.fetch_evidence(&subject(), &range()).await.unwrap();
        fetcher.fetch_evidence(&subject(), &range()).await.unwrap();
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unreadable_payload_is_not_cached() {
        let client = Arc::new(StaticClient {
            payload: json!([1, 2, 3]),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        });
        let fetcher = fetcher(client.clone(), true, Duration::from_secs(5));

        assert!(fetcher.fetch_evidence(&subject(), &range()).await.is_err());
        assert!(fetcher.fetch_evidence(&subject(), &range()).await.is_err());
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_source_times_out() {
        let client = Arc::new(StaticClient {
            payload: payload(),
            calls: AtomicUsize::new(0),
            delay: Duration::from_secs(60),
        });
        let err = fetcher(client, true, Duration::from_secs(1))
            .fetch_evidence(&subject(), &range())
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Timeout { .. }));
    }
}
