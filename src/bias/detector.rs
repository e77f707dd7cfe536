use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

use super::config::{Axis, BiasConfig};
use crate::model::{
    BiasCheck, BiasKind, Category, EvidenceRecord, PoliticianScore, Severity, TimeRange,
};
use crate::scoring::{ScoringConfig, ScoringEngine};

/// A check that could not reach a verdict. Never fatal.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind} check inconclusive: {reason}")]
pub struct BiasCheckInconclusive {
    pub kind: BiasKind,
    pub reason: String,
}

/// The reviewed score and the outcome of every check
#[derive(Debug, Clone, PartialEq)]
pub struct BiasReview {
    pub score: PoliticianScore,
    pub checks: Vec<BiasCheck>,
}

/// Looks for known bias patterns in a draft score and mitigates them.
#[derive(Debug, Clone)]
pub struct BiasDetector {
    config: BiasConfig,
}

impl BiasDetector {
    pub fn new(config: &BiasConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Run all four checks against a draft score.
    ///
    /// Source-concentration and weight-skew mitigations adjust category
    /// confidences and weights, after which the overall numbers are recombined
    /// by `engine`. Temporal and algorithmic mitigations then act on the
    /// overall confidence only.
    pub fn review(
        &self,
        draft: PoliticianScore,
        evidence: &[EvidenceRecord],
        range: &TimeRange,
        engine: &ScoringEngine,
    ) -> BiasReview {
        let mut score = draft;

        if !self.config.enabled {
            let checks = [
                BiasKind::SourceConcentration,
                BiasKind::CategoryWeightSkew,
                BiasKind::TemporalSkew,
                BiasKind::Algorithmic,
            ]
            .into_iter()
            .map(|kind| BiasCheck::clear(kind, "skipped: bias detection disabled"))
            .collect();
            return BiasReview { score, checks };
        }

        let concentration = self.source_concentration(&mut score, evidence);
        let skew = self.weight_skew(&mut score, engine.config());
        if concentration.applied || skew.applied {
            engine.recombine(&mut score);
        }

        let temporal = match self.temporal_skew(&mut score, evidence, range) {
            Ok(check) => check,
            Err(inconclusive) => {
                tracing::info!(subject = score.politician_id.as_str(), "{}", inconclusive);
                BiasCheck::clear(inconclusive.kind, inconclusive.to_string())
            }
        };
        let algorithmic = self.algorithmic(&mut score);

        let checks = vec![concentration, skew, temporal, algorithmic];
        for check in checks.iter().filter(|c| c.applied) {
            tracing::info!(
                subject = score.politician_id.as_str(),
                kind = check.kind.as_str(),
                severity = ?check.severity,
                mitigation = check.mitigation.as_deref().unwrap_or(""),
                "bias mitigation applied"
            );
        }

        score.bias_detected = checks.iter().any(|c| c.detected);
        score.bias_mitigation_applied = checks
            .iter()
            .filter(|c| c.applied)
            .filter_map(|c| c.mitigation.clone())
            .collect();

        BiasReview { score, checks }
    }

    fn source_concentration(&self, score: &mut PoliticianScore, evidence: &[EvidenceRecord]) -> BiasCheck {
        let kind = BiasKind::SourceConcentration;
        let threshold = self.config.source_concentration_threshold;

        let mut per_category: BTreeMap<Category, BTreeMap<&str, usize>> = BTreeMap::new();
        for record in evidence {
            *per_category
                .entry(record.category())
                .or_default()
                .entry(record.source())
                .or_insert(0) += 1;
        }

        let mut flagged = Vec::new();
        for (category, sources) in &per_category {
            let total: usize = sources.values().sum();
            // Highest count wins, ties go to the lower source name
            let dominant = sources
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)));
            if let Some((source, count)) = dominant {
                let share = *count as f64 / total as f64;
                if share >= threshold {
                    flagged.push((*category, source.to_string(), share));
                }
            }
        }

        if flagged.is_empty() {
            return BiasCheck::clear(
                kind,
                format!(
                    "no category draws {:.0}% or more of its evidence from a single source",
                    threshold * 100.0
                ),
            );
        }

        let factor = 1.0 - self.config.concentration_penalty;
        for (category, _, _) in &flagged {
            if let Some(cs) = score
                .category_scores
                .iter_mut()
                .find(|c| c.category == *category)
            {
                cs.confidence = (cs.confidence * factor).clamp(0.0, 1.0);
            }
        }

        let description = flagged
            .iter()
            .map(|(category, source, share)| {
                format!("{}: {:.0}% from {}", category, share * 100.0, source)
            })
            .collect::<Vec<_>>()
            .join(", ");
        let categories = flagged
            .iter()
            .map(|(category, _, _)| category.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        BiasCheck::mitigated(
            kind,
            Severity::Medium,
            format!("single-source evidence ({})", description),
            format!(
                "reduced confidence of {} by {:.0}%",
                categories,
                self.config.concentration_penalty * 100.0
            ),
        )
    }

    fn weight_skew(&self, score: &mut PoliticianScore, scoring: &ScoringConfig) -> BiasCheck {
        let kind = BiasKind::CategoryWeightSkew;
        let threshold = self.config.weight_skew_threshold;
        let declared = scoring.declared_weights();

        let mut totals: BTreeMap<Axis, f64> = BTreeMap::new();
        totals.insert(Axis::Progressive, 0.0);
        totals.insert(Axis::Conservative, 0.0);
        for (category, weight) in &declared {
            match self.config.axis_for(*category) {
                Axis::Neutral => {}
                axis => *totals.entry(axis).or_insert(0.0) += weight.max(0.0),
            }
        }

        let by_weight = |a: &(&Axis, &f64), b: &(&Axis, &f64)| a.1.total_cmp(b.1);
        let (Some((heavy_axis, heavy)), Some((light_axis, light))) = (
            totals.iter().max_by(by_weight),
            totals.iter().min_by(by_weight),
        ) else {
            return BiasCheck::clear(kind, "no partisan axes configured");
        };

        if *heavy <= 0.0 {
            return BiasCheck::clear(kind, "no declared weight on partisan categories");
        }

        let ratio = if *light > 0.0 { heavy / light } else { f64::INFINITY };
        if ratio <= threshold {
            return BiasCheck::clear(
                kind,
                format!("axis weight ratio {:.2} within {:.2}", ratio, threshold),
            );
        }

        let severity = if ratio >= 2.0 * threshold {
            Severity::High
        } else {
            Severity::Medium
        };

        let uniform = declared.values().sum::<f64>() / declared.len() as f64;
        let blend = self.config.weight_blend;
        for cs in score.category_scores.iter_mut() {
            cs.weight = (cs.weight + blend * (uniform - cs.weight)).clamp(0.0, 1.0);
        }

        BiasCheck::mitigated(
            kind,
            severity,
            format!(
                "{} categories carry {:.2} of declared weight vs {:.2} for {} (ratio {:.2})",
                heavy_axis.as_str(),
                heavy,
                light,
                light_axis.as_str(),
                ratio
            ),
            format!(
                "blended category weights {:.0}% toward uniform",
                blend * 100.0
            ),
        )
    }

    fn temporal_skew(
        &self,
        score: &mut PoliticianScore,
        evidence: &[EvidenceRecord],
        range: &TimeRange,
    ) -> Result<BiasCheck, BiasCheckInconclusive> {
        let kind = BiasKind::TemporalSkew;
        let mut dates: Vec<DateTime<Utc>> = evidence.iter().map(|r| r.date()).collect();

        if dates.len() < self.config.temporal_min_records {
            return Err(BiasCheckInconclusive {
                kind,
                reason: format!(
                    "{} dated records, need at least {}",
                    dates.len(),
                    self.config.temporal_min_records
                ),
            });
        }
        dates.sort();

        let window_ms =
            (range.duration().num_milliseconds() as f64 * self.config.temporal_window_share) as i64;
        let window = Duration::milliseconds(window_ms);
        let densest = densest_window(&dates, window);
        let share = densest as f64 / dates.len() as f64;

        if share <= self.config.temporal_concentration_threshold {
            return Ok(BiasCheck::clear(
                kind,
                format!(
                    "at most {:.0}% of evidence within any {}-day window",
                    share * 100.0,
                    window.num_days()
                ),
            ));
        }

        let severity = if share > 0.9 { Severity::Medium } else { Severity::Low };
        score.confidence = (score.confidence * (1.0 - self.config.temporal_penalty)).clamp(0.0, 1.0);

        Ok(BiasCheck::mitigated(
            kind,
            severity,
            format!(
                "{:.0}% of evidence falls within one {}-day window",
                share * 100.0,
                window.num_days()
            ),
            format!(
                "reduced overall confidence by {:.0}%",
                self.config.temporal_penalty * 100.0
            ),
        ))
    }

    fn algorithmic(&self, score: &mut PoliticianScore) -> BiasCheck {
        let kind = BiasKind::Algorithmic;
        let extreme = score.overall_score.abs() > self.config.extreme_score_threshold;

        if !extreme || score.data_points >= self.config.min_evidence {
            return BiasCheck::clear(
                kind,
                format!(
                    "overall score {:.1} on {} records",
                    score.overall_score, score.data_points
                ),
            );
        }

        let cap = self.config.algorithmic_confidence_cap;
        score.confidence = score.confidence.min(cap);

        BiasCheck::mitigated(
            kind,
            Severity::High,
            format!(
                "extreme overall score {:.1} from only {} records (fewer than {})",
                score.overall_score, score.data_points, self.config.min_evidence
            ),
            format!("capped confidence at {:.0}%", cap * 100.0),
        )
    }
}

/// Largest number of sorted dates that fit in one window of the given length
fn densest_window(sorted: &[DateTime<Utc>], window: Duration) -> usize {
    let mut best = 0;
    let mut end = 0;
    for start in 0..sorted.len() {
        while end < sorted.len() && sorted[end] - sorted[start] <= window {
            end += 1;
        }
        best = best.max(end - start);
    }
    best
}
