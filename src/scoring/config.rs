use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{ActionKind, Category};

pub const DEFAULT_CATEGORY_WEIGHT: f64 = 0.1;
pub const DEFAULT_EVIDENCE_SATURATION: f64 = 5.0;
pub const DEFAULT_COVERAGE_PENALTY: f64 = 0.5;
pub const DEFAULT_TRIVIAL_WEIGHT_SHARE: f64 = 0.05;

/// Scoring configuration.
///
/// Every field is optional; unset fields fall back to the built-in defaults.
///
/// Example YAML:
/// ```yaml
/// scoring:
///   category_weights:
///     healthcare: 0.2
///     national_security: 0.05
///   action_multipliers:
///     sponsored: 1.0
///     abstained: 0.1
///   evidence_saturation: 8
///   coverage_penalty: 0.4
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Declared weight per category (0 to 1). Categories not listed use 0.1.
    #[serde(default)]
    pub category_weights: Option<BTreeMap<Category, f64>>,

    /// How much each kind of legislative action counts
    #[serde(default)]
    pub action_multipliers: Option<ActionMultipliers>,

    /// Evidence count at which category confidence reaches ~63%
    #[serde(default)]
    pub evidence_saturation: Option<f64>,

    /// Confidence lost when no category at all has evidence (scaled by the missing share)
    #[serde(default)]
    pub coverage_penalty: Option<f64>,

    /// Effective-weight share below which a category does not cap overall confidence
    #[serde(default)]
    pub trivial_weight_share: Option<f64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            category_weights: None,
            action_multipliers: Some(ActionMultipliers::default()),
            evidence_saturation: Some(DEFAULT_EVIDENCE_SATURATION),
            coverage_penalty: Some(DEFAULT_COVERAGE_PENALTY),
            trivial_weight_share: Some(DEFAULT_TRIVIAL_WEIGHT_SHARE),
        }
    }
}

impl ScoringConfig {
    pub fn weight_for(&self, category: Category) -> f64 {
        self.category_weights
            .as_ref()
            .and_then(|w| w.get(&category).copied())
            .unwrap_or(DEFAULT_CATEGORY_WEIGHT)
    }

    /// Declared weights for all ten categories
    pub fn declared_weights(&self) -> BTreeMap<Category, f64> {
        Category::ALL
            .into_iter()
            .map(|c| (c, self.weight_for(c)))
            .collect()
    }

    pub fn multipliers(&self) -> ActionMultipliers {
        self.action_multipliers.clone().unwrap_or_default()
    }

    pub fn saturation(&self) -> f64 {
        self.evidence_saturation.unwrap_or(DEFAULT_EVIDENCE_SATURATION)
    }

    pub fn coverage_penalty(&self) -> f64 {
        self.coverage_penalty.unwrap_or(DEFAULT_COVERAGE_PENALTY)
    }

    pub fn trivial_weight_share(&self) -> f64 {
        self.trivial_weight_share.unwrap_or(DEFAULT_TRIVIAL_WEIGHT_SHARE)
    }
}

/// Weight of each legislative action kind. Sponsorship counts most, abstaining least.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ActionMultipliers {
    pub sponsored: f64,
    pub co_sponsored: f64,
    pub voted_for: f64,
    pub voted_against: f64,
    pub abstained: f64,
}

impl Default for ActionMultipliers {
    fn default() -> Self {
        Self {
            sponsored: 1.0,
            co_sponsored: 0.8,
            voted_for: 0.6,
            voted_against: 0.6,
            abstained: 0.2,
        }
    }
}

impl ActionMultipliers {
    pub fn for_action(&self, action: ActionKind) -> f64 {
        match action {
            ActionKind::Sponsored => self.sponsored,
            ActionKind::CoSponsored => self.co_sponsored,
            ActionKind::VotedFor => self.voted_for,
            ActionKind::VotedAgainst => self.voted_against,
            ActionKind::Abstained => self.abstained,
        }
    }
}
