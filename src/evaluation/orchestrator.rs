use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::state::{transition, Action, EvaluationState, Event, RetryPolicy};
use crate::bias::{BiasDetector, BiasReview};
use crate::clock::Clock;
use crate::config::{Config, SourceConfig};
use crate::credentials;
use crate::error::EvaluationError;
use crate::model::{
    promise_fulfillment_rate, EvaluationMetadata, EvaluationReport, PoliticianScore, Subject,
    TimeRange,
};
use crate::scoring::ScoringEngine;
use crate::sources::{
    CacheStats, CollectedEvidence, DataCollector, HealthRegistry, HttpSourceClient,
    RateLimiter, RateLimiterStats, ResponseCache, SourceClient, SourceFetcher, SourceHealth,
};

/// Snapshot of the shared components
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub sources: Vec<SourceHealth>,
    pub cache: CacheStats,
    pub rate_limiter: Vec<RateLimiterStats>,
}

#[derive(Debug, Clone)]
pub struct SubjectOutcome {
    pub subject_id: String,
    pub result: Result<EvaluationReport, EvaluationError>,
}

/// Result of a batch: one outcome per input subject, in input order
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub outcomes: Vec<SubjectOutcome>,
    pub succeeded: usize,
    pub total: usize,
}

impl BatchOutcome {
    /// Successful reports, in input order
    pub fn reports(&self) -> Vec<&EvaluationReport> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .collect()
    }

    pub fn into_reports(self) -> Vec<EvaluationReport> {
        self.outcomes
            .into_iter()
            .filter_map(|o| o.result.ok())
            .collect()
    }

    pub fn failures(&self) -> Vec<&EvaluationError> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err())
            .collect()
    }

    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }
}

/// Runs the collect, score, bias-check and assemble steps for subjects.
///
/// Owns the process-wide cache, rate limiter and health registry; everything
/// else is per evaluation.
pub struct Orchestrator {
    collector: DataCollector,
    engine: ScoringEngine,
    detector: BiasDetector,
    cache: Arc<ResponseCache>,
    limiter: Arc<RateLimiter>,
    health: Arc<HealthRegistry>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    confidence_threshold: f64,
    max_concurrent_subjects: usize,
    subject_timeout: Duration,
}

impl Orchestrator {
    pub fn new(config: &Config, clients: Vec<Arc<dyn SourceClient>>, clock: Arc<dyn Clock>) -> Self {
        let cache = Arc::new(ResponseCache::from_config(&config.cache, clock.clone()));
        let limiter = Arc::new(RateLimiter::from_config(config));
        let health = Arc::new(HealthRegistry::new(clients.iter().map(|c| c.name())));

        let timeouts: HashMap<&str, Duration> = config
            .sources
            .iter()
            .map(|s| (s.name.as_str(), s.timeout()))
            .collect();
        let default_timeout = SourceConfig::default_timeout();

        let fetchers = clients
            .into_iter()
            .map(|client| {
                let timeout = timeouts
                    .get(client.name())
                    .copied()
                    .unwrap_or(default_timeout);
                SourceFetcher::new(client, cache.clone(), limiter.clone(), timeout)
            })
            .collect();

        Self {
            collector: DataCollector::new(fetchers, health.clone(), clock.clone()),
            engine: ScoringEngine::new(&config.scoring),
            detector: BiasDetector::new(&config.bias_detection),
            cache,
            limiter,
            health,
            clock,
            policy: RetryPolicy::from_config(&config.retry),
            confidence_threshold: config.confidence_threshold,
            max_concurrent_subjects: config.max_concurrent_subjects.max(1),
            subject_timeout: config.subject_timeout(),
        }
    }

    /// Build an orchestrator over HTTP clients for every configured source
    pub fn with_http_sources(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let clients = config
            .sources
            .iter()
            .map(|source| {
                let api_key = credentials::get_api_key(source);
                HttpSourceClient::new(source, api_key).map(|c| Arc::new(c) as Arc<dyn SourceClient>)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(config, clients, clock))
    }

    /// Evaluate one subject, bounded by the per-subject timeout.
    pub async fn evaluate_subject(
        &self,
        subject: &Subject,
        range: &TimeRange,
    ) -> Result<EvaluationReport, EvaluationError> {
        if !subject.served_during(range) {
            tracing::warn!(
                subject = subject.id.as_str(),
                "subject did not hold office during the requested range"
            );
        }

        match tokio::time::timeout(self.subject_timeout, self.run(subject, range)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    subject = subject.id.as_str(),
                    timeout_secs = self.subject_timeout.as_secs(),
                    "evaluation timed out"
                );
                Err(EvaluationError::Timeout {
                    subject_id: subject.id.clone(),
                    after: self.subject_timeout,
                })
            }
        }
    }

    async fn run(
        &self,
        subject: &Subject,
        range: &TimeRange,
    ) -> Result<EvaluationReport, EvaluationError> {
        let started = Instant::now();
        let mut state = EvaluationState::Collecting;
        let mut attempt = 0;

        let mut collected: Option<CollectedEvidence> = None;
        let mut draft: Option<PoliticianScore> = None;
        let mut review: Option<BiasReview> = None;
        let mut report: Option<EvaluationReport> = None;

        loop {
            let event = match &state {
                EvaluationState::Collecting => match self.collector.collect(subject, range).await {
                    Ok(evidence) => {
                        collected = Some(evidence);
                        Event::Completed
                    }
                    Err(e) => Event::StepFailed(e),
                },
                EvaluationState::Scoring => match collected.as_ref() {
                    Some(evidence) => {
                        draft = Some(self.engine.score(&subject.id, &evidence.records, self.clock.now()));
                        Event::Completed
                    }
                    None => Event::StepFailed(missing_input(subject, "scoring")),
                },
                EvaluationState::BiasChecking => match (draft.take(), collected.as_ref()) {
                    (Some(score), Some(evidence)) => {
                        review = Some(self.detector.review(score, &evidence.records, range, &self.engine));
                        Event::Completed
                    }
                    _ => Event::StepFailed(missing_input(subject, "bias checking")),
                },
                EvaluationState::Assembling => match (review.take(), collected.take()) {
                    (Some(review), Some(evidence)) => {
                        report = Some(self.assemble(subject, evidence, review, started));
                        Event::Completed
                    }
                    _ => Event::StepFailed(missing_input(subject, "report assembly")),
                },
                EvaluationState::Done => {
                    return report.ok_or_else(|| missing_input(subject, "report"));
                }
                EvaluationState::Failed(error) => {
                    tracing::warn!(subject = subject.id.as_str(), error = %error, "evaluation failed");
                    return Err(error.clone());
                }
            };

            let next = transition(&state, event, attempt, &self.policy);
            match next.action {
                Action::Run(_) => attempt = 0,
                Action::RetryAfter(step, delay) => {
                    tracing::info!(
                        subject = subject.id.as_str(),
                        ?step,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "retrying evaluation step"
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Action::Finish | Action::Abort => {}
            }
            state = next.next;
        }
    }

    fn assemble(
        &self,
        subject: &Subject,
        evidence: CollectedEvidence,
        review: BiasReview,
        started: Instant,
    ) -> EvaluationReport {
        let legislative_actions = evidence.legislative_actions();
        let campaign_promises = evidence.campaign_promises();
        let score = review.score;

        tracing::info!(
            subject = subject.id.as_str(),
            overall = score.overall_score,
            confidence = score.confidence,
            data_points = score.data_points,
            unavailable = evidence.unavailable_sources.len(),
            dropped = evidence.dropped_records,
            "evaluation complete"
        );

        EvaluationReport {
            politician: subject.clone(),
            promise_fulfillment_rate: promise_fulfillment_rate(&campaign_promises),
            legislative_actions,
            campaign_promises,
            data_sources: evidence.sources_queried,
            unavailable_sources: evidence.unavailable_sources,
            evaluation_metadata: EvaluationMetadata {
                total_data_points: score.data_points,
                evaluation_duration_ms: started.elapsed().as_millis() as u64,
                bias_checks: review.checks,
                last_updated: self.clock.now(),
                meets_confidence_threshold: score.confidence >= self.confidence_threshold,
            },
            score,
        }
    }

    /// Evaluate many subjects independently with bounded concurrency.
    ///
    /// Never fails: each subject's failure is recorded in its outcome.
    pub async fn evaluate_subjects(&self, subjects: &[Subject], range: &TimeRange) -> BatchOutcome {
        let evaluate = |index, subject| async move {
            (index, self.evaluate_subject(subject, range).await)
        };

        let mut results: Vec<Option<Result<EvaluationReport, EvaluationError>>> =
            subjects.iter().map(|_| None).collect();
        let mut pending = subjects.iter().enumerate();
        let mut futures = FuturesUnordered::new();

        // Fill initial batch
        for _ in 0..self.max_concurrent_subjects {
            if let Some((index, subject)) = pending.next() {
                futures.push(evaluate(index, subject));
            }
        }

        // Process results and feed new tasks
        while let Some((index, result)) = futures.next().await {
            results[index] = Some(result);
            if let Some((index, subject)) = pending.next() {
                futures.push(evaluate(index, subject));
            }
        }

        let outcomes: Vec<SubjectOutcome> = subjects
            .iter()
            .zip(results)
            .map(|(subject, result)| SubjectOutcome {
                subject_id: subject.id.clone(),
                result: result.unwrap_or_else(|| Err(missing_input(subject, "batch"))),
            })
            .collect();
        let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();

        tracing::info!(succeeded, total = subjects.len(), "batch evaluation finished");

        BatchOutcome {
            outcomes,
            succeeded,
            total: subjects.len(),
        }
    }

    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            sources: self.health.snapshot(),
            cache: self.cache.stats(),
            rate_limiter: self.limiter.stats(),
        }
    }
}

/// A step ran without the output of the step before it
fn missing_input(subject: &Subject, step: &str) -> EvaluationError {
    EvaluationError::NoDataAvailable {
        subject_id: subject.id.clone(),
        reason: format!("{} ran without its input", step),
    }
}
