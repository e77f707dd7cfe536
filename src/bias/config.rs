use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::Category;

/// Ideological leaning a category is associated with for weight-skew checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Progressive,
    Conservative,
    Neutral,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Progressive => "progressive",
            Axis::Conservative => "conservative",
            Axis::Neutral => "neutral",
        }
    }
}

/// Default axis of each category. Balanced so that uniform weights show no skew.
pub fn default_axis(category: Category) -> Axis {
    match category {
        Category::SocialWelfare | Category::EnvironmentalProtection | Category::CivilRights => {
            Axis::Progressive
        }
        Category::EconomicImpact | Category::NationalSecurity | Category::ForeignPolicy => {
            Axis::Conservative
        }
        Category::Healthcare
        | Category::Education
        | Category::Infrastructure
        | Category::GovernmentTransparency => Axis::Neutral,
    }
}

/// Thresholds and penalties for the bias checks.
///
/// Example YAML:
/// ```yaml
/// bias_detection:
///   enabled: true
///   source_concentration_threshold: 0.7
///   concentration_penalty: 0.2
///   category_axes:
///     healthcare: progressive
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BiasConfig {
    pub enabled: bool,

    /// Share of a category's evidence from one source that counts as concentrated
    pub source_concentration_threshold: f64,
    /// Fraction of a concentrated category's confidence that is removed
    pub concentration_penalty: f64,

    /// Heaviest/lightest axis weight ratio above which weights are skewed
    pub weight_skew_threshold: f64,
    /// How far skewed weights are pulled toward uniform (0 = untouched, 1 = uniform)
    pub weight_blend: f64,
    /// Per-category overrides of the default axis table
    pub category_axes: Option<BTreeMap<Category, Axis>>,

    /// Length of the temporal sub-window as a share of the requested range
    pub temporal_window_share: f64,
    /// Share of evidence inside one sub-window that counts as clustered
    pub temporal_concentration_threshold: f64,
    /// Fraction of overall confidence removed for clustered evidence
    pub temporal_penalty: f64,
    /// Dated records needed before the temporal check is conclusive
    pub temporal_min_records: usize,

    /// Absolute overall score treated as extreme
    pub extreme_score_threshold: f64,
    /// Records needed to trust an extreme score
    pub min_evidence: usize,
    /// Confidence ceiling for extreme scores on thin evidence
    pub algorithmic_confidence_cap: f64,
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_concentration_threshold: 0.7,
            concentration_penalty: 0.2,
            weight_skew_threshold: 1.5,
            weight_blend: 0.5,
            category_axes: None,
            temporal_window_share: 0.1,
            temporal_concentration_threshold: 0.8,
            temporal_penalty: 0.1,
            temporal_min_records: 3,
            extreme_score_threshold: 90.0,
            min_evidence: 10,
            algorithmic_confidence_cap: 0.3,
        }
    }
}

impl BiasConfig {
    pub fn axis_for(&self, category: Category) -> Axis {
        self.category_axes
            .as_ref()
            .and_then(|axes| axes.get(&category).copied())
            .unwrap_or_else(|| default_axis(category))
    }
}

/// Validate bias-detection configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_bias(config: &BiasConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let shares = [
        ("source_concentration_threshold", config.source_concentration_threshold),
        ("temporal_concentration_threshold", config.temporal_concentration_threshold),
        ("temporal_window_share", config.temporal_window_share),
    ];
    for (name, value) in shares {
        if !(value > 0.0 && value <= 1.0) {
            errors.push(format!(
                "bias_detection.{}: must be in (0, 1], got {}",
                name, value
            ));
        }
    }

    let fractions = [
        ("concentration_penalty", config.concentration_penalty),
        ("weight_blend", config.weight_blend),
        ("temporal_penalty", config.temporal_penalty),
        ("algorithmic_confidence_cap", config.algorithmic_confidence_cap),
    ];
    for (name, value) in fractions {
        if !(0.0..=1.0).contains(&value) {
            errors.push(format!(
                "bias_detection.{}: must be between 0 and 1, got {}",
                name, value
            ));
        }
    }

    if !(config.weight_skew_threshold >= 1.0) {
        errors.push(format!(
            "bias_detection.weight_skew_threshold: must be at least 1, got {}",
            config.weight_skew_threshold
        ));
    }

    if !(0.0..=100.0).contains(&config.extreme_score_threshold) {
        errors.push(format!(
            "bias_detection.extreme_score_threshold: must be between 0 and 100, got {}",
            config.extreme_score_threshold
        ));
    }

    if config.temporal_min_records == 0 {
        errors.push("bias_detection.temporal_min_records: must be positive".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
