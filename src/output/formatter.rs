use owo_colors::OwoColorize;
use std::io::IsTerminal;

use crate::evaluation::{BatchOutcome, SystemStatus};
use crate::model::{BiasCheck, CategoryScore, EvaluationReport, Severity};
use crate::sources::Availability;

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a score with an explicit sign and one decimal ("+42.5", "-7.0", "0.0")
pub fn format_score(score: f64) -> String {
    let rounded = (score * 10.0).round() / 10.0;
    if rounded > 0.0 {
        format!("+{:.1}", rounded)
    } else if rounded < 0.0 {
        format!("{:.1}", rounded)
    } else {
        "0.0".to_string()
    }
}

/// Format a 0..1 confidence as a whole percentage
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.0}%", (confidence * 100.0).clamp(0.0, 100.0))
}

fn colored_score(score: f64, width: usize, use_colors: bool) -> String {
    let text = format!("{:>width$}", format_score(score), width = width);
    if !use_colors {
        return text;
    }
    if score > 0.0 {
        text.green().to_string()
    } else if score < 0.0 {
        text.red().to_string()
    } else {
        text.dimmed().to_string()
    }
}

/// Format one category as a table row: label, score, confidence, evidence count
fn format_category_row(category: &CategoryScore, use_colors: bool) -> String {
    format!(
        "  {:<26}{}  {:>4}  n={}",
        category.category.label(),
        colored_score(category.score, 7, use_colors),
        format_confidence(category.confidence),
        category.evidence_count
    )
}

fn format_bias_check(check: &BiasCheck, use_colors: bool) -> String {
    let severity = match check.severity {
        Severity::Low => "low",
        Severity::Medium => "medium",
        Severity::High => "high",
    };
    let mitigation = match (&check.mitigation, check.applied) {
        (Some(m), true) => format!(" -> {}", m),
        _ => String::new(),
    };
    let marker = if use_colors {
        "!".yellow().bold().to_string()
    } else {
        "!".to_string()
    };
    format!(
        "  {} {} ({}): {}{}",
        marker,
        check.kind.as_str(),
        severity,
        check.description,
        mitigation
    )
}

/// Format a full report for the terminal
pub fn format_report(report: &EvaluationReport, use_colors: bool) -> String {
    let subject = &report.politician;
    let score = &report.score;
    let meta = &report.evaluation_metadata;

    let heading = format!(
        "{} ({}, {}) - {}",
        subject.name, subject.party, subject.state, subject.position
    );
    let confidence = format_confidence(score.confidence);
    let confidence = match (meta.meets_confidence_threshold, use_colors) {
        (true, _) => confidence,
        (false, true) => format!("{} {}", confidence.yellow(), "(below threshold)".yellow()),
        (false, false) => format!("{} (below threshold)", confidence),
    };

    let mut lines = vec![
        if use_colors {
            heading.bold().to_string()
        } else {
            heading
        },
        format!(
            "  Overall: {}  Confidence: {}",
            colored_score(score.overall_score, 0, use_colors),
            confidence
        ),
        format!(
            "  Evidence: {} records ({} actions, {} promises), queried {}",
            score.data_points,
            report.legislative_actions.len(),
            report.campaign_promises.len(),
            report.data_sources.join(", ")
        ),
    ];

    if !report.unavailable_sources.is_empty() {
        let unavailable = format!("  Unavailable: {}", report.unavailable_sources.join(", "));
        lines.push(if use_colors {
            unavailable.red().to_string()
        } else {
            unavailable
        });
    }

    if !report.campaign_promises.is_empty() {
        lines.push(format!(
            "  Promises kept: {}",
            format_confidence(report.promise_fulfillment_rate)
        ));
    }

    if !score.category_scores.is_empty() {
        lines.push(String::new());
        lines.extend(
            score
                .category_scores
                .iter()
                .map(|c| format_category_row(c, use_colors)),
        );
    }

    let detected: Vec<_> = meta.bias_checks.iter().filter(|c| c.detected).collect();
    if !detected.is_empty() {
        lines.push(String::new());
        lines.extend(detected.into_iter().map(|c| format_bias_check(c, use_colors)));
    }

    lines.join("\n")
}

/// Format a batch: every report, then a summary line and the failures
pub fn format_batch(outcome: &BatchOutcome, use_colors: bool) -> String {
    let mut sections: Vec<String> = outcome
        .reports()
        .into_iter()
        .map(|r| format_report(r, use_colors))
        .collect();

    let summary = format!("Evaluated {} of {} subjects", outcome.succeeded, outcome.total);
    let mut footer = vec![if use_colors && outcome.failed() > 0 {
        summary.yellow().to_string()
    } else {
        summary
    }];
    for failure in outcome.failures() {
        footer.push(format!("  x {}", failure));
    }
    sections.push(footer.join("\n"));

    sections.join("\n\n")
}

/// Format reports as tab-separated values for scripting
/// Columns: id, name, overall, confidence, data points (no headers, no colors)
pub fn format_tsv(reports: &[&EvaluationReport]) -> String {
    reports
        .iter()
        .map(|r| {
            format!(
                "{}\t{}\t{:.1}\t{:.2}\t{}",
                r.politician.id,
                r.politician.name,
                r.score.overall_score,
                r.score.confidence,
                r.score.data_points
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format the system status: source availability, cache and rate limiter counters
pub fn format_status(status: &SystemStatus, missing_keys: &[(String, String)], use_colors: bool) -> String {
    let mut lines = vec!["Sources:".to_string()];
    for source in &status.sources {
        let state = match source.availability {
            Availability::Unknown => "not queried".to_string(),
            Availability::Available => "available".to_string(),
            Availability::Unavailable => format!(
                "unavailable ({} consecutive failures)",
                source.consecutive_failures
            ),
        };
        let state = match (source.availability, use_colors) {
            (Availability::Available, true) => state.green().to_string(),
            (Availability::Unavailable, true) => state.red().to_string(),
            _ => state,
        };
        let key_note = missing_keys
            .iter()
            .find(|(name, _)| *name == source.name)
            .map(|(_, var)| format!("  (no key: set {})", var))
            .unwrap_or_default();
        lines.push(format!("  {:<20}{}{}", source.name, state, key_note));
    }

    let cache = &status.cache;
    lines.push(format!(
        "Cache: {} ({} entries, {} hits, {} misses, {} expired)",
        if cache.enabled { "enabled" } else { "disabled" },
        cache.entries,
        cache.hits,
        cache.misses,
        cache.expired
    ));

    lines.push("Rate limits (per hour):".to_string());
    for limiter in &status.rate_limiter {
        lines.push(format!(
            "  {:<20}{}/{} in window, {} rejected",
            limiter.source, limiter.in_window, limiter.limit, limiter.total_rejected
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvaluationError;
    use crate::evaluation::SubjectOutcome;
    use crate::model::{
        BiasKind, Category, EvaluationMetadata, PoliticianScore, Subject,
    };
    use chrono::{TimeZone, Utc};

    fn sample_report() -> EvaluationReport {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        EvaluationReport {
            politician: Subject {
                id: "s-1".to_string(),
                name: "Jane Roe".to_string(),
                party: "Independent".to_string(),
                state: "VT".to_string(),
                position: "Senator".to_string(),
                start_date: now,
                end_date: None,
                image_url: None,
            },
            score: PoliticianScore {
                politician_id: "s-1".to_string(),
                overall_score: 42.46,
                category_scores: vec![CategoryScore {
                    category: Category::Healthcare,
                    score: 42.46,
                    weight: 0.1,
                    confidence: 0.181,
                    evidence_count: 1,
                    evidence: vec!["HR1".to_string()],
                }],
                evaluation_date: now,
                data_points: 1,
                confidence: 0.1,
                bias_detected: true,
                bias_mitigation_applied: vec!["capped confidence at 30%".to_string()],
            },
            legislative_actions: vec![],
            campaign_promises: vec![],
            promise_fulfillment_rate: 0.0,
            data_sources: vec!["congress.gov".to_string(), "govtrack.us".to_string()],
            unavailable_sources: vec!["govtrack.us".to_string()],
            evaluation_metadata: EvaluationMetadata {
                total_data_points: 1,
                evaluation_duration_ms: 12,
                bias_checks: vec![
                    BiasCheck::clear(BiasKind::TemporalSkew, "inconclusive"),
                    BiasCheck::mitigated(
                        BiasKind::Algorithmic,
                        Severity::High,
                        "extreme score",
                        "capped confidence at 30%",
                    ),
                ],
                last_updated: now,
                meets_confidence_threshold: false,
            },
        }
    }

    #[test]
    fn test_format_score_signs() {
        assert_eq!(format_score(42.46), "+42.5");
        assert_eq!(format_score(-7.0), "-7.0");
        assert_eq!(format_score(0.0), "0.0");
        assert_eq!(format_score(-0.01), "0.0");
    }

    #[test]
    fn test_format_confidence() {
        assert_eq!(format_confidence(0.734), "73%");
        assert_eq!(format_confidence(1.5), "100%");
    }

    #[test]
    fn test_format_report_plain() {
        let result = format_report(&sample_report(), false);
        assert!(result.starts_with("Jane Roe (Independent, VT) - Senator"));
        assert!(result.contains("Overall: +42.5  Confidence: 10% (below threshold)"));
        assert!(result.contains("Unavailable: govtrack.us"));
        assert!(result.contains("Healthcare"));
        assert!(result.contains("n=1"));
        assert!(result.contains("! algorithmic (high): extreme score -> capped confidence at 30%"));
        // Clean checks are not listed
        assert!(!result.contains("temporal_skew"));
        // No promises, no fulfillment line
        assert!(!result.contains("Promises kept"));
    }

    #[test]
    fn test_format_batch_summary() {
        let outcome = BatchOutcome {
            outcomes: vec![
                SubjectOutcome {
                    subject_id: "s-1".to_string(),
                    result: Ok(sample_report()),
                },
                SubjectOutcome {
                    subject_id: "s-2".to_string(),
                    result: Err(EvaluationError::NoDataAvailable {
                        subject_id: "s-2".to_string(),
                        reason: "all sources failed".to_string(),
                    }),
                },
            ],
            succeeded: 1,
            total: 2,
        };
        let result = format_batch(&outcome, false);
        assert!(result.contains("Jane Roe"));
        assert!(result.contains("Evaluated 1 of 2 subjects"));
        assert!(result.contains("  x no data available for s-2: all sources failed"));
    }

    #[test]
    fn test_format_tsv() {
        let report = sample_report();
        assert_eq!(format_tsv(&[&report]), "s-1\tJane Roe\t42.5\t0.10\t1");
        assert_eq!(format_tsv(&[]), "");
    }
}
