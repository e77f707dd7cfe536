use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::evidence::Category;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: Category,
    pub score: f64,      // -100 to 100
    pub weight: f64,     // 0 to 1, declared
    pub confidence: f64, // 0 to 1
    pub evidence_count: usize,
    pub evidence: Vec<String>, // supporting citations
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoliticianScore {
    pub politician_id: String,
    pub overall_score: f64, // -100 to 100
    pub category_scores: Vec<CategoryScore>,
    pub evaluation_date: DateTime<Utc>,
    pub data_points: usize,
    pub confidence: f64, // 0 to 1
    pub bias_detected: bool,
    pub bias_mitigation_applied: Vec<String>,
}

impl PoliticianScore {
    pub fn category(&self, category: Category) -> Option<&CategoryScore> {
        self.category_scores.iter().find(|c| c.category == category)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasKind {
    SourceConcentration,
    CategoryWeightSkew,
    TemporalSkew,
    Algorithmic,
}

impl BiasKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BiasKind::SourceConcentration => "source_concentration",
            BiasKind::CategoryWeightSkew => "category_weight_skew",
            BiasKind::TemporalSkew => "temporal_skew",
            BiasKind::Algorithmic => "algorithmic",
        }
    }
}

impl fmt::Display for BiasKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Outcome of one bias check. Recorded for every check, including clean ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasCheck {
    pub kind: BiasKind,
    pub detected: bool,
    pub severity: Severity,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mitigation: Option<String>,
    pub applied: bool,
}

impl BiasCheck {
    pub fn clear(kind: BiasKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            detected: false,
            severity: Severity::Low,
            description: description.into(),
            mitigation: None,
            applied: false,
        }
    }

    pub fn mitigated(
        kind: BiasKind,
        severity: Severity,
        description: impl Into<String>,
        mitigation: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            detected: true,
            severity,
            description: description.into(),
            mitigation: Some(mitigation.into()),
            applied: true,
        }
    }
}
