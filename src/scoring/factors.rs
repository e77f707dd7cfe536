use super::config::ActionMultipliers;
use crate::model::EvidenceRecord;

/// Signed contribution of one record in [-1, 1].
///
/// Legislative actions: impact sign scaled by the action multiplier.
/// Promises: fulfilled +1, partially fulfilled +0.5, broken -1, pending 0.
pub fn record_value(record: &EvidenceRecord, multipliers: &ActionMultipliers) -> f64 {
    let value = match record {
        EvidenceRecord::LegislativeAction(action) => {
            action.impact.sign() * multipliers.for_action(action.action)
        }
        EvidenceRecord::CampaignPromise(promise) => promise.status.value(),
    };
    value.clamp(-1.0, 1.0)
}

/// Confidence from evidence volume: `1 - e^(-n / saturation)`.
///
/// Zero with no evidence, strictly increasing in `n`, never above 1.
pub fn confidence_for_count(count: usize, saturation: f64) -> f64 {
    if count == 0 || saturation <= 0.0 {
        return 0.0;
    }
    (1.0 - (-(count as f64) / saturation).exp()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ActionKind, CampaignPromise, Category, Impact, LegislativeAction, PromiseStatus,
    };
    use chrono::Utc;

    fn action(kind: ActionKind, impact: Impact) -> EvidenceRecord {
        EvidenceRecord::LegislativeAction(LegislativeAction {
            id: "a".to_string(),
            bill_number: "S 1".to_string(),
            title: "Test".to_string(),
            description: String::new(),
            date: Utc::now(),
            action: kind,
            category: Category::Healthcare,
            impact,
            evidence: vec![],
            source: "congress.gov".to_string(),
        })
    }

    fn promise(status: PromiseStatus) -> EvidenceRecord {
        EvidenceRecord::CampaignPromise(CampaignPromise {
            id: "p".to_string(),
            promise: "Test".to_string(),
            category: Category::Healthcare,
            citation: "rally".to_string(),
            date: Utc::now(),
            status,
            related_legislation: vec![],
            source: "govtrack.us".to_string(),
        })
    }

    #[test]
    fn test_action_values_scale_by_kind() {
        let m = ActionMultipliers::default();
        assert_eq!(record_value(&action(ActionKind::Sponsored, Impact::Positive), &m), 1.0);
        assert_eq!(record_value(&action(ActionKind::CoSponsored, Impact::Negative), &m), -0.8);
        assert_eq!(record_value(&action(ActionKind::Abstained, Impact::Positive), &m), 0.2);
        assert_eq!(record_value(&action(ActionKind::VotedFor, Impact::Neutral), &m), 0.0);
    }

    #[test]
    fn test_promise_values() {
        let m = ActionMultipliers::default();
        assert_eq!(record_value(&promise(PromiseStatus::Fulfilled), &m), 1.0);
        assert_eq!(record_value(&promise(PromiseStatus::PartiallyFulfilled), &m), 0.5);
        assert_eq!(record_value(&promise(PromiseStatus::Broken), &m), -1.0);
        assert_eq!(record_value(&promise(PromiseStatus::Pending), &m), 0.0);
    }

    #[test]
    fn test_oversized_multiplier_is_clamped() {
        let m = ActionMultipliers {
            sponsored: 3.0,
            ..ActionMultipliers::default()
        };
        assert_eq!(record_value(&action(ActionKind::Sponsored, Impact::Negative), &m), -1.0);
    }

    #[test]
    fn test_confidence_monotonic_and_bounded() {
        assert_eq!(confidence_for_count(0, 5.0), 0.0);
        let mut previous = 0.0;
        for n in 1..100 {
            let c = confidence_for_count(n, 5.0);
            assert!(c > previous);
            assert!(c <= 1.0);
            previous = c;
        }
        assert!(confidence_for_count(1, 5.0) < 0.2);
    }
}
