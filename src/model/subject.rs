use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The official being evaluated. Immutable for the duration of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub party: String,
    pub state: String,    // jurisdiction, e.g. "CA"
    pub position: String, // role, e.g. "Senator"
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Subject {
    /// Whether the subject's tenure overlaps the given range
    pub fn served_during(&self, range: &TimeRange) -> bool {
        let tenure_end = self.end_date.unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.start_date < range.end && tenure_end > range.start
    }
}

/// Half-open `[start, end)` window of evidence dates requested for an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> anyhow::Result<Self> {
        if start >= end {
            anyhow::bail!(
                "Invalid time range: start {} is not before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            );
        }
        Ok(Self { start, end })
    }

    /// The `days` days leading up to `now`
    pub fn last_days(now: DateTime<Utc>, days: i64) -> anyhow::Result<Self> {
        let start = Duration::try_days(days.max(1))
            .and_then(|span| now.checked_sub_signed(span))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid time range: {} days before {} is out of range",
                    days,
                    now.to_rfc3339()
                )
            })?;
        Ok(Self { start, end: now })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}
