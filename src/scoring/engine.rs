use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use super::config::ScoringConfig;
use super::factors::{confidence_for_count, record_value};
use crate::model::{Category, CategoryScore, EvidenceRecord, PoliticianScore};

/// How the overall numbers were derived from the category scores
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub overall_score: f64,
    pub confidence: f64,
    pub base_confidence: f64, // effective-weight average of category confidences
    pub coverage_factor: f64, // discount for categories without evidence
    pub confidence_cap: f64,  // lowest confidence among non-trivially weighted categories
}

/// Converts evidence into category scores, an overall score and a confidence.
///
/// Pure: the same evidence and evaluation time always yield the same score.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn score(
        &self,
        politician_id: &str,
        evidence: &[EvidenceRecord],
        evaluated_at: DateTime<Utc>,
    ) -> PoliticianScore {
        let category_scores = self.category_scores(evidence);
        let aggregate = aggregate(&category_scores, &self.config);

        tracing::debug!(
            politician = politician_id,
            categories = category_scores.len(),
            overall = aggregate.overall_score,
            base_confidence = aggregate.base_confidence,
            coverage_factor = aggregate.coverage_factor,
            confidence_cap = aggregate.confidence_cap,
            "scored evidence"
        );

        PoliticianScore {
            politician_id: politician_id.to_string(),
            overall_score: aggregate.overall_score,
            category_scores,
            evaluation_date: evaluated_at,
            data_points: evidence.len(),
            confidence: aggregate.confidence,
            bias_detected: false,
            bias_mitigation_applied: Vec::new(),
        }
    }

    /// One score per category that has evidence, in category order
    pub fn category_scores(&self, evidence: &[EvidenceRecord]) -> Vec<CategoryScore> {
        let multipliers = self.config.multipliers();
        let saturation = self.config.saturation();

        let mut buckets: BTreeMap<Category, Vec<&EvidenceRecord>> = BTreeMap::new();
        for record in evidence {
            buckets.entry(record.category()).or_default().push(record);
        }

        buckets
            .into_iter()
            .map(|(category, records)| {
                let total: f64 = records.iter().map(|r| record_value(r, &multipliers)).sum();
                let mean = total / records.len() as f64;
                let citations: BTreeSet<String> =
                    records.iter().flat_map(|r| r.citations()).collect();

                CategoryScore {
                    category,
                    score: (mean * 100.0).clamp(-100.0, 100.0),
                    weight: self.config.weight_for(category).clamp(0.0, 1.0),
                    confidence: confidence_for_count(records.len(), saturation),
                    evidence_count: records.len(),
                    evidence: citations.into_iter().collect(),
                }
            })
            .collect()
    }

    /// Recompute overall score and confidence after category scores were adjusted
    pub fn recombine(&self, score: &mut PoliticianScore) -> Aggregate {
        let aggregate = aggregate(&score.category_scores, &self.config);
        score.overall_score = aggregate.overall_score;
        score.confidence = aggregate.confidence;
        aggregate
    }
}

/// Combine category scores using effective weights (declared weight x confidence).
pub fn aggregate(categories: &[CategoryScore], config: &ScoringConfig) -> Aggregate {
    let effective: Vec<f64> = categories
        .iter()
        .map(|c| c.weight.max(0.0) * c.confidence.clamp(0.0, 1.0))
        .collect();
    let total_effective: f64 = effective.iter().sum();

    let missing = Category::ALL.len().saturating_sub(categories.len());
    let coverage_factor = (1.0
        - config.coverage_penalty() * missing as f64 / Category::ALL.len() as f64)
        .clamp(0.0, 1.0);

    if total_effective <= f64::EPSILON {
        return Aggregate {
            overall_score: 0.0,
            confidence: 0.0,
            base_confidence: 0.0,
            coverage_factor,
            confidence_cap: 0.0,
        };
    }

    let overall_score = categories
        .iter()
        .zip(&effective)
        .map(|(c, w)| c.score * w)
        .sum::<f64>()
        / total_effective;

    let base_confidence = categories
        .iter()
        .zip(&effective)
        .map(|(c, w)| c.confidence * w)
        .sum::<f64>()
        / total_effective;

    let trivial_share = config.trivial_weight_share();
    let confidence_cap = categories
        .iter()
        .zip(&effective)
        .filter(|(_, w)| *w / total_effective >= trivial_share)
        .map(|(c, _)| c.confidence)
        .fold(1.0_f64, f64::min);

    Aggregate {
        overall_score: overall_score.clamp(-100.0, 100.0),
        confidence: (base_confidence * coverage_factor)
            .min(confidence_cap)
            .clamp(0.0, 1.0),
        base_confidence,
        coverage_factor,
        confidence_cap,
    }
}
