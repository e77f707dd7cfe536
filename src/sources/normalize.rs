use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use thiserror::Error;

use super::SourceError;
use crate::model::{
    ActionKind, CampaignPromise, Category, EvidenceRecord, Impact, LegislativeAction,
    PromiseStatus,
};

/// A single source record that could not be turned into evidence.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("dropped {kind} #{index} from {source_name}: {reason}")]
pub struct InvalidEvidence {
    pub source_name: String,
    pub kind: &'static str,
    pub index: usize,
    pub reason: String,
}

/// Evidence extracted from one payload, plus the records that were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub records: Vec<EvidenceRecord>,
    pub dropped: Vec<InvalidEvidence>,
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(default, alias = "legislativeActions")]
    legislative_actions: Vec<serde_json::Value>,
    #[serde(default, alias = "campaignPromises")]
    campaign_promises: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawAction {
    id: Option<String>,
    #[serde(alias = "billNumber", alias = "bill")]
    bill_number: Option<String>,
    title: Option<String>,
    description: Option<String>,
    date: Option<String>,
    #[serde(alias = "type")]
    action: Option<String>,
    category: Option<String>,
    impact: Option<String>,
    #[serde(default)]
    evidence: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawPromise {
    id: Option<String>,
    #[serde(alias = "text")]
    promise: Option<String>,
    category: Option<String>,
    #[serde(alias = "source_url", alias = "sourceUrl")]
    citation: Option<String>,
    date: Option<String>,
    status: Option<String>,
    #[serde(default, alias = "relatedLegislation")]
    related_legislation: Vec<String>,
}

/// Turn a raw provider payload into evidence records attributed to `source_name`.
///
/// The payload must be an object with optional `legislative_actions` and
/// `campaign_promises` arrays; anything else is a payload error. Individual
/// malformed records are dropped and logged, the rest are kept.
pub fn normalize_payload(
    source_name: &str,
    payload: &serde_json::Value,
) -> Result<Normalized, SourceError> {
    if payload.is_null() {
        return Ok(Normalized::default());
    }

    let raw: RawPayload =
        serde_json::from_value(payload.clone()).map_err(|e| SourceError::Payload {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })?;

    let mut normalized = Normalized::default();

    for (index, value) in raw.legislative_actions.into_iter().enumerate() {
        match action_from_value(source_name, value) {
            Ok(action) => normalized
                .records
                .push(EvidenceRecord::LegislativeAction(action)),
            Err(reason) => normalized.dropped.push(InvalidEvidence {
                source_name: source_name.to_string(),
                kind: "legislative_action",
                index,
                reason,
            }),
        }
    }

    for (index, value) in raw.campaign_promises.into_iter().enumerate() {
        match promise_from_value(source_name, index, value) {
            Ok(promise) => normalized
                .records
                .push(EvidenceRecord::CampaignPromise(promise)),
            Err(reason) => normalized.dropped.push(InvalidEvidence {
                source_name: source_name.to_string(),
                kind: "campaign_promise",
                index,
                reason,
            }),
        }
    }

    for invalid in &normalized.dropped {
        tracing::warn!(
            source = invalid.source_name.as_str(),
            kind = invalid.kind,
            index = invalid.index,
            reason = invalid.reason.as_str(),
            "dropping invalid evidence record"
        );
    }

    Ok(normalized)
}

fn action_from_value(source_name: &str, value: serde_json::Value) -> Result<LegislativeAction, String> {
    let raw: RawAction = serde_json::from_value(value).map_err(|e| e.to_string())?;

    let bill_number = non_empty(raw.bill_number).ok_or("missing bill_number")?;
    let date = parse_date(&required(raw.date, "date")?)?;
    let action: ActionKind = required(raw.action, "action")?.parse()?;
    let category: Category = required(raw.category, "category")?.parse()?;
    let impact: Impact = required(raw.impact, "impact")?.parse()?;

    let id = non_empty(raw.id).unwrap_or_else(|| {
        format!(
            "{}:{}:{}",
            source_name,
            bill_number.replace(' ', ""),
            date.format("%Y-%m-%d")
        )
    });

    Ok(LegislativeAction {
        id,
        title: non_empty(raw.title).unwrap_or_else(|| bill_number.clone()),
        bill_number,
        description: raw.description.unwrap_or_default(),
        date,
        action,
        category,
        impact,
        evidence: raw
            .evidence
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect(),
        source: source_name.to_string(),
    })
}

fn promise_from_value(
    source_name: &str,
    index: usize,
    value: serde_json::Value,
) -> Result<CampaignPromise, String> {
    let raw: RawPromise = serde_json::from_value(value).map_err(|e| e.to_string())?;

    let promise = non_empty(raw.promise).ok_or("missing promise text")?;
    let date = parse_date(&required(raw.date, "date")?)?;
    let category: Category = required(raw.category, "category")?.parse()?;
    let status: PromiseStatus = required(raw.status, "status")?.parse()?;

    Ok(CampaignPromise {
        id: non_empty(raw.id)
            .unwrap_or_else(|| {
                format!("{}:promise:{}:{}", source_name, date.format("%Y-%m-%d"), index)
            }),
        promise,
        category,
        citation: non_empty(raw.citation).unwrap_or_else(|| source_name.to_string()),
        date,
        status,
        related_legislation: raw.related_legislation,
        source: source_name.to_string(),
    })
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (taken as midnight UTC)
pub fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("unparseable date '{}'", value))
}

fn required(value: Option<String>, field: &str) -> Result<String, String> {
    non_empty(value).ok_or_else(|| format!("missing {}", field))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
