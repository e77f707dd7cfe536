//! Per-source admission control over a rolling window.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use super::SourceError;
use crate::config::Config;

/// Length of the rolling window quotas are expressed in
pub const RATE_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Bounds requests per source within a rolling window.
///
/// Each source has its own lock, so sources never contend with each other.
/// Requests to sources without a configured limit are admitted immediately.
pub struct RateLimiter {
    windows: HashMap<String, SourceWindow>,
    window: Duration,
    max_wait: Duration,
}

struct SourceWindow {
    limit: u32,
    admitted: Mutex<VecDeque<Instant>>,
    total_admitted: AtomicU64,
    total_rejected: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimiterStats {
    pub source: String,
    pub limit: u32,
    pub in_window: u32,
    pub total_admitted: u64,
    pub total_rejected: u64,
}

impl RateLimiter {
    pub fn new<I>(limits: I, window: Duration, max_wait: Duration) -> Self
    where
        I: IntoIterator<Item = (String, u32)>,
    {
        let windows = limits
            .into_iter()
            .map(|(source, limit)| {
                (
                    source,
                    SourceWindow {
                        limit,
                        admitted: Mutex::new(VecDeque::new()),
                        total_admitted: AtomicU64::new(0),
                        total_rejected: AtomicU64::new(0),
                    },
                )
            })
            .collect();

        Self {
            windows,
            window,
            max_wait,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config
                .sources
                .iter()
                .map(|s| (s.name.clone(), s.rate_limit)),
            RATE_WINDOW,
            config.rate_limit_wait(),
        )
    }

    /// Wait for a request slot for `source`.
    ///
    /// Sleeps until the oldest admission leaves the window. Fails with
    /// `RateLimited` if no slot frees up within the configured wait.
    pub async fn acquire(&self, source: &str) -> Result<(), SourceError> {
        let Some(slot) = self.windows.get(source) else {
            return Ok(());
        };
        let deadline = Instant::now() + self.max_wait;

        loop {
            let wake_at = {
                let mut admitted = slot.admitted.lock().unwrap();
                let now = Instant::now();
                prune(&mut admitted, now, self.window);

                if admitted.len() < slot.limit as usize {
                    admitted.push_back(now);
                    slot.total_admitted.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }

                match admitted.front() {
                    Some(oldest) => *oldest + self.window,
                    None => now, // limit of zero
                }
            };

            if slot.limit == 0 || wake_at > deadline {
                slot.total_rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    source,
                    limit = slot.limit,
                    max_wait_secs = self.max_wait.as_secs(),
                    "rate limit exhausted"
                );
                return Err(SourceError::RateLimited {
                    source_name: source.to_string(),
                });
            }

            tracing::debug!(
                source,
                wait_ms = wake_at.saturating_duration_since(Instant::now()).as_millis() as u64,
                "waiting for rate limit slot"
            );
            tokio::time::sleep_until(wake_at).await;
        }
    }

    pub fn stats(&self) -> Vec<RateLimiterStats> {
        let now = Instant::now();
        let mut stats: Vec<_> = self
            .windows
            .iter()
            .map(|(source, slot)| {
                let mut admitted = slot.admitted.lock().unwrap();
                prune(&mut admitted, now, self.window);
                RateLimiterStats {
                    source: source.clone(),
                    limit: slot.limit,
                    in_window: admitted.len() as u32,
                    total_admitted: slot.total_admitted.load(Ordering::Relaxed),
                    total_rejected: slot.total_rejected.load(Ordering::Relaxed),
                }
            })
            .collect();
        stats.sort_by(|a, b| a.source.cmp(&b.source));
        stats
    }
}

fn prune(admitted: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(front) = admitted.front() {
        if now.saturating_duration_since(*front) >= window {
            admitted.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limiter(limit: u32, max_wait: Duration) -> RateLimiter {
        RateLimiter::new(
            vec![("congress.gov".to_string(), limit), ("govtrack.us".to_string(), limit)],
            RATE_WINDOW,
            max_wait,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_admits_up_to_limit_then_rejects() {
        let limiter = limiter(3, Duration::from_secs(1));
        for _ in 0..3 {
            assert!(limiter.acquire("congress.gov").await.is_ok());
        }
        let err = limiter.acquire("congress.gov").await.unwrap_err();
        assert!(matches!(err, SourceError::RateLimited { .. }));

        let stats = limiter.stats();
        assert_eq!(stats[0].source, "congress.gov");
        assert_eq!(stats[0].in_window, 3);
        assert_eq!(stats[0].total_admitted, 3);
        assert_eq!(stats[0].total_rejected, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sources_are_independent() {
        let limiter = limiter(1, Duration::ZERO);
        assert!(limiter.acquire("congress.gov").await.is_ok());
        assert!(limiter.acquire("congress.gov").await.is_err());
        assert!(limiter.acquire("govtrack.us").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfigured_source_is_unlimited() {
        let limiter = limiter(1, Duration::ZERO);
        for _ in 0..100 {
            assert!(limiter.acquire("unknown.example").await.is_ok());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_slot_to_leave_window() {
        let limiter = limiter(2, Duration::from_secs(2 * 60 * 60));
        let start = Instant::now();
        limiter.acquire("congress.gov").await.unwrap();
        limiter.acquire("congress.gov").await.unwrap();

        // Third call sleeps until the first admission is an hour old
        limiter.acquire("congress.gov").await.unwrap();
        assert!(start.elapsed() >= RATE_WINDOW);
        assert_eq!(limiter.stats()[0].total_rejected, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_load_never_exceeds_limit_per_window() {
        let limit = 5;
        let limiter = Arc::new(limiter(limit, Duration::from_secs(3 * 60 * 60)));
        let admissions = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..15 {
            let limiter = limiter.clone();
            let admissions = admissions.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire("congress.gov").await.unwrap();
                admissions.lock().unwrap().push(Instant::now());
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut times = admissions.lock().unwrap().clone();
        times.sort();
        assert_eq!(times.len(), 15);
        for (i, t) in times.iter().enumerate() {
            let in_window = times[i..]
                .iter()
                .take_while(|other| other.duration_since(*t) < RATE_WINDOW)
                .count();
            assert!(in_window <= limit as usize, "{} admissions within one window", in_window);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_burst_with_no_wait_admits_exactly_limit() {
        let limiter = Arc::new(limiter(4, Duration::ZERO));
        let mut handles = Vec::new();
        for _ in 0..20 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.acquire("govtrack.us").await.is_ok() }));
        }
        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 4);
    }
}
