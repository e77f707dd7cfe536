use super::config::ScoringConfig;

/// Validate scoring configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_scoring(config: &ScoringConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Some(ref weights) = config.category_weights {
        for (category, weight) in weights {
            if !(0.0..=1.0).contains(weight) {
                errors.push(format!(
                    "scoring.category_weights.{}: must be between 0 and 1, got {}",
                    category, weight
                ));
            }
        }
        if !weights.is_empty() && weights.values().all(|w| *w == 0.0) {
            errors.push("scoring.category_weights: at least one weight must be non-zero".to_string());
        }
    }

    if let Some(ref multipliers) = config.action_multipliers {
        let fields = [
            ("sponsored", multipliers.sponsored),
            ("co_sponsored", multipliers.co_sponsored),
            ("voted_for", multipliers.voted_for),
            ("voted_against", multipliers.voted_against),
            ("abstained", multipliers.abstained),
        ];
        for (name, value) in fields {
            if !(0.0..=1.0).contains(&value) {
                errors.push(format!(
                    "scoring.action_multipliers.{}: must be between 0 and 1, got {}",
                    name, value
                ));
            }
        }
    }

    if let Some(saturation) = config.evidence_saturation {
        if saturation <= 0.0 {
            errors.push("scoring.evidence_saturation: must be positive".to_string());
        }
    }

    if let Some(penalty) = config.coverage_penalty {
        if !(0.0..=1.0).contains(&penalty) {
            errors.push("scoring.coverage_penalty: must be between 0 and 1".to_string());
        }
    }

    if let Some(share) = config.trivial_weight_share {
        if !(0.0..1.0).contains(&share) {
            errors.push("scoring.trivial_weight_share: must be in [0, 1)".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
