use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::evidence::{CampaignPromise, LegislativeAction, PromiseStatus};
use super::score::{BiasCheck, PoliticianScore};
use super::subject::Subject;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub politician: Subject,
    pub score: PoliticianScore,
    pub legislative_actions: Vec<LegislativeAction>,
    pub campaign_promises: Vec<CampaignPromise>,
    pub promise_fulfillment_rate: f64, // 0 to 1
    pub data_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable_sources: Vec<String>,
    pub evaluation_metadata: EvaluationMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetadata {
    pub total_data_points: usize,
    pub evaluation_duration_ms: u64,
    pub bias_checks: Vec<BiasCheck>,
    pub last_updated: DateTime<Utc>,
    pub meets_confidence_threshold: bool,
}

/// Share of promises kept: fulfilled count fully, partially fulfilled count half.
/// Zero when there are no promises.
pub fn promise_fulfillment_rate(promises: &[CampaignPromise]) -> f64 {
    if promises.is_empty() {
        return 0.0;
    }
    let kept: f64 = promises
        .iter()
        .map(|p| match p.status {
            PromiseStatus::Fulfilled => 1.0,
            PromiseStatus::PartiallyFulfilled => 0.5,
            PromiseStatus::Broken | PromiseStatus::Pending => 0.0,
        })
        .sum();
    kept / promises.len() as f64
}
