use futures::stream::{FuturesUnordered, StreamExt};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::fetcher::SourceFetcher;
use super::health::HealthRegistry;
use super::SourceError;
use crate::clock::Clock;
use crate::error::EvaluationError;
use crate::model::{CampaignPromise, EvidenceRecord, LegislativeAction, Subject, TimeRange};

/// Merged evidence for one subject and the per-source bookkeeping behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedEvidence {
    pub records: Vec<EvidenceRecord>,
    pub sources_queried: Vec<String>,
    pub unavailable_sources: Vec<String>,
    pub failures: Vec<SourceError>,
    pub dropped_records: usize,
}

impl CollectedEvidence {
    pub fn legislative_actions(&self) -> Vec<LegislativeAction> {
        self.records
            .iter()
            .filter_map(|r| match r {
                EvidenceRecord::LegislativeAction(a) => Some(a.clone()),
                EvidenceRecord::CampaignPromise(_) => None,
            })
            .collect()
    }

    pub fn campaign_promises(&self) -> Vec<CampaignPromise> {
        self.records
            .iter()
            .filter_map(|r| match r {
                EvidenceRecord::CampaignPromise(p) => Some(p.clone()),
                EvidenceRecord::LegislativeAction(_) => None,
            })
            .collect()
    }
}

/// Fans out to every configured source for one subject and merges what comes back.
pub struct DataCollector {
    fetchers: Vec<SourceFetcher>,
    health: Arc<HealthRegistry>,
    clock: Arc<dyn Clock>,
}

impl DataCollector {
    pub fn new(fetchers: Vec<SourceFetcher>, health: Arc<HealthRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            fetchers,
            health,
            clock,
        }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.fetchers.iter().map(|f| f.name().to_string()).collect()
    }

    /// Query all sources concurrently.
    ///
    /// A failing source contributes nothing and is listed as unavailable.
    /// Collection only fails when every source failed.
    pub async fn collect(
        &self,
        subject: &Subject,
        range: &TimeRange,
    ) -> Result<CollectedEvidence, EvaluationError> {
        let mut futures = FuturesUnordered::new();
        for fetcher in &self.fetchers {
            futures.push(fetcher.fetch_evidence(subject, range));
        }

        let mut records = Vec::new();
        let mut failures = Vec::new();
        let mut dropped_records = 0;

        while let Some(result) = futures.next().await {
            match result {
                Ok(outcome) => {
                    tracing::debug!(
                        source = outcome.source.as_str(),
                        subject = subject.id.as_str(),
                        records = outcome.records.len(),
                        dropped = outcome.dropped,
                        cached = outcome.from_cache,
                        "source returned evidence"
                    );
                    self.health.record_success(&outcome.source, self.clock.now());
                    dropped_records += outcome.dropped;
                    records.extend(outcome.records);
                }
                Err(e) => {
                    tracing::warn!(subject = subject.id.as_str(), error = %e, "source unavailable");
                    self.health.record_failure(&e, self.clock.now());
                    failures.push(e);
                }
            }
        }

        if failures.len() == self.fetchers.len() {
            return Err(all_failed(&subject.id, &failures));
        }

        let mut unavailable_sources: Vec<String> =
            failures.iter().map(|e| e.source_name().to_string()).collect();
        unavailable_sources.sort();

        Ok(CollectedEvidence {
            records: merge_evidence(records),
            sources_queried: self.source_names(),
            unavailable_sources,
            failures,
            dropped_records,
        })
    }
}

/// Subject-level error when no source produced anything
fn all_failed(subject_id: &str, failures: &[SourceError]) -> EvaluationError {
    let subject_id = subject_id.to_string();

    if failures.is_empty() {
        return EvaluationError::NoDataAvailable {
            subject_id,
            reason: "no sources configured".to_string(),
        };
    }
    if failures.iter().all(|e| matches!(e, SourceError::RateLimited { .. })) {
        return EvaluationError::RateLimited { subject_id };
    }
    if failures.iter().all(|e| matches!(e, SourceError::Unauthorized { .. })) {
        return EvaluationError::Unauthorized { subject_id };
    }

    let timeouts: Vec<Duration> = failures
        .iter()
        .filter_map(|e| match e {
            SourceError::Timeout { after, .. } => Some(*after),
            _ => None,
        })
        .collect();
    if timeouts.len() == failures.len() {
        return EvaluationError::Timeout {
            subject_id,
            after: timeouts.into_iter().max().unwrap_or_default(),
        };
    }

    EvaluationError::NoDataAvailable {
        subject_id,
        reason: failures
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; "),
    }
}

/// Deduplicate evidence reported by several sources.
///
/// Legislative actions are keyed by (bill, action, date) and campaign promises
/// by (normalized text, date). Among duplicates the record with more citations
/// wins, then the lower source name, then the lower id. The result is sorted
/// by key, so input order never matters.
pub fn merge_evidence(records: impl IntoIterator<Item = EvidenceRecord>) -> Vec<EvidenceRecord> {
    let mut actions: BTreeMap<_, LegislativeAction> = BTreeMap::new();
    let mut promises: BTreeMap<_, CampaignPromise> = BTreeMap::new();

    for record in records {
        match record {
            EvidenceRecord::LegislativeAction(action) => {
                let key = action.natural_key();
                match actions.get(&key) {
                    Some(existing) if prefer_action(existing, &action) != Ordering::Greater => {}
                    _ => {
                        actions.insert(key, action);
                    }
                }
            }
            EvidenceRecord::CampaignPromise(promise) => {
                let key = promise.natural_key();
                match promises.get(&key) {
                    Some(existing) if prefer_promise(existing, &promise) != Ordering::Greater => {}
                    _ => {
                        promises.insert(key, promise);
                    }
                }
            }
        }
    }

    actions
        .into_values()
        .map(EvidenceRecord::LegislativeAction)
        .chain(promises.into_values().map(EvidenceRecord::CampaignPromise))
        .collect()
}

/// `Less` when `a` should be kept over `b`
fn prefer_action(a: &LegislativeAction, b: &LegislativeAction) -> Ordering {
    b.evidence
        .len()
        .cmp(&a.evidence.len())
        .then_with(|| a.source.cmp(&b.source))
        .then_with(|| a.id.cmp(&b.id))
}

fn prefer_promise(a: &CampaignPromise, b: &CampaignPromise) -> Ordering {
    let citations = |p: &CampaignPromise| usize::from(!p.citation.is_empty()) + p.related_legislation.len();
    citations(b)
        .cmp(&citations(a))
        .then_with(|| a.source.cmp(&b.source))
        .then_with(|| a.id.cmp(&b.id))
}
