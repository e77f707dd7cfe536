use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of policy domains evidence and scores are bucketed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    EconomicImpact,
    SocialWelfare,
    EnvironmentalProtection,
    NationalSecurity,
    CivilRights,
    Healthcare,
    Education,
    Infrastructure,
    ForeignPolicy,
    GovernmentTransparency,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::EconomicImpact,
        Category::SocialWelfare,
        Category::EnvironmentalProtection,
        Category::NationalSecurity,
        Category::CivilRights,
        Category::Healthcare,
        Category::Education,
        Category::Infrastructure,
        Category::ForeignPolicy,
        Category::GovernmentTransparency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::EconomicImpact => "economic_impact",
            Category::SocialWelfare => "social_welfare",
            Category::EnvironmentalProtection => "environmental_protection",
            Category::NationalSecurity => "national_security",
            Category::CivilRights => "civil_rights",
            Category::Healthcare => "healthcare",
            Category::Education => "education",
            Category::Infrastructure => "infrastructure",
            Category::ForeignPolicy => "foreign_policy",
            Category::GovernmentTransparency => "government_transparency",
        }
    }

    /// Title-cased label for terminal output
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Sponsored,
    CoSponsored,
    VotedFor,
    VotedAgainst,
    Abstained,
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "sponsored" => Ok(ActionKind::Sponsored),
            "co_sponsored" | "cosponsored" => Ok(ActionKind::CoSponsored),
            "voted_for" | "yea" => Ok(ActionKind::VotedFor),
            "voted_against" | "nay" => Ok(ActionKind::VotedAgainst),
            "abstained" | "not_voting" => Ok(ActionKind::Abstained),
            other => Err(format!("unknown action kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Positive,
    Neutral,
    Negative,
}

impl Impact {
    pub fn sign(&self) -> f64 {
        match self {
            Impact::Positive => 1.0,
            Impact::Neutral => 0.0,
            Impact::Negative => -1.0,
        }
    }
}

impl FromStr for Impact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Impact::Positive),
            "neutral" => Ok(Impact::Neutral),
            "negative" => Ok(Impact::Negative),
            other => Err(format!("unknown impact '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromiseStatus {
    Fulfilled,
    PartiallyFulfilled,
    Broken,
    Pending,
}

impl PromiseStatus {
    /// Contribution of a promise with this status to its category score
    pub fn value(&self) -> f64 {
        match self {
            PromiseStatus::Fulfilled => 1.0,
            PromiseStatus::PartiallyFulfilled => 0.5,
            PromiseStatus::Broken => -1.0,
            PromiseStatus::Pending => 0.0,
        }
    }
}

impl FromStr for PromiseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "fulfilled" | "kept" => Ok(PromiseStatus::Fulfilled),
            "partially_fulfilled" | "partial" | "compromise" => Ok(PromiseStatus::PartiallyFulfilled),
            "broken" => Ok(PromiseStatus::Broken),
            "pending" | "in_progress" | "stalled" => Ok(PromiseStatus::Pending),
            other => Err(format!("unknown promise status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegislativeAction {
    pub id: String,
    pub bill_number: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
    pub action: ActionKind,
    pub category: Category,
    pub impact: Impact,
    #[serde(default)]
    pub evidence: Vec<String>, // citations
    pub source: String,        // reporting data source
}

impl LegislativeAction {
    /// Key under which two sources' reports of the same action are considered duplicates
    pub fn natural_key(&self) -> (String, ActionKind, DateTime<Utc>) {
        (
            self.bill_number.trim().to_ascii_uppercase().replace([' ', '.'], ""),
            self.action,
            self.date,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignPromise {
    pub id: String,
    pub promise: String,
    pub category: Category,
    pub citation: String, // where the promise was made
    pub date: DateTime<Utc>,
    pub status: PromiseStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_legislation: Vec<String>,
    pub source: String, // reporting data source
}

impl CampaignPromise {
    pub fn natural_key(&self) -> (String, DateTime<Utc>) {
        let text = self
            .promise
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        (text, self.date)
    }
}

/// A normalized piece of scoring input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvidenceRecord {
    LegislativeAction(LegislativeAction),
    CampaignPromise(CampaignPromise),
}

impl EvidenceRecord {
    pub fn category(&self) -> Category {
        match self {
            EvidenceRecord::LegislativeAction(a) => a.category,
            EvidenceRecord::CampaignPromise(p) => p.category,
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        match self {
            EvidenceRecord::LegislativeAction(a) => a.date,
            EvidenceRecord::CampaignPromise(p) => p.date,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            EvidenceRecord::LegislativeAction(a) => &a.source,
            EvidenceRecord::CampaignPromise(p) => &p.source,
        }
    }

    /// Citations backing this record
    pub fn citations(&self) -> Vec<String> {
        match self {
            EvidenceRecord::LegislativeAction(a) => {
                if a.evidence.is_empty() {
                    vec![a.bill_number.clone()]
                } else {
                    a.evidence.clone()
                }
            }
            EvidenceRecord::CampaignPromise(p) => vec![p.citation.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_category_parse_variants() {
        assert_eq!("healthcare".parse::<Category>().unwrap(), Category::Healthcare);
        assert_eq!("Civil Rights".parse::<Category>().unwrap(), Category::CivilRights);
        assert_eq!(
            "government-transparency".parse::<Category>().unwrap(),
            Category::GovernmentTransparency
        );
        assert!("astrology".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_label() {
        assert_eq!(Category::ForeignPolicy.label(), "Foreign Policy");
    }

    #[test]
    fn test_evidence_record_serializes_with_kind_tag() {
        let record = EvidenceRecord::CampaignPromise(CampaignPromise {
            id: "p-1".to_string(),
            promise: "Expand rural broadband".to_string(),
            category: Category::Infrastructure,
            citation: "https://example.org/speech".to_string(),
            date: Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap(),
            status: PromiseStatus::PartiallyFulfilled,
            related_legislation: vec![],
            source: "govtrack.us".to_string(),
        });

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "campaign_promise");
        assert_eq!(json["status"], "partially_fulfilled");
        assert_eq!(json["category"], "infrastructure");

        let parsed: EvidenceRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_natural_keys_normalize() {
        let date = Utc.with_ymd_and_hms(2021, 5, 4, 0, 0, 0).unwrap();
        let action = |bill: &str| LegislativeAction {
            id: "a".to_string(),
            bill_number: bill.to_string(),
            title: String::new(),
            description: String::new(),
            date,
            action: ActionKind::Sponsored,
            category: Category::Education,
            impact: Impact::Positive,
            evidence: vec![],
            source: "x".to_string(),
        };
        assert_eq!(action("H.R. 1234").natural_key(), action("hr1234").natural_key());
    }

    #[test]
    fn test_action_kind_aliases() {
        assert_eq!("co-sponsored".parse::<ActionKind>().unwrap(), ActionKind::CoSponsored);
        assert_eq!("Yea".parse::<ActionKind>().unwrap(), ActionKind::VotedFor);
        assert!("filibustered".parse::<ActionKind>().is_err());
    }
}
