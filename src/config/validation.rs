use std::collections::HashSet;

use super::schema::Config;
use crate::bias::validate_bias;
use crate::scoring::validate_scoring;

/// Validate the whole configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.sources.is_empty() {
        errors.push("sources: at least one source must be configured".to_string());
    }

    let mut seen = HashSet::new();
    for (i, source) in config.sources.iter().enumerate() {
        if source.name.trim().is_empty() {
            errors.push(format!("sources[{}].name: must not be empty", i));
        } else if !seen.insert(source.name.as_str()) {
            errors.push(format!("sources[{}].name: duplicate source '{}'", i, source.name));
        }
        if !source.base_url.starts_with("http://") && !source.base_url.starts_with("https://") {
            errors.push(format!(
                "sources[{}].base_url: invalid '{}' - must be an http(s) URL",
                i, source.base_url
            ));
        }
        if source.rate_limit == 0 {
            errors.push(format!("sources[{}].rate_limit: must be positive", i));
        }
        check_duration(&mut errors, &format!("sources[{}].timeout", i), &source.timeout);
    }

    check_duration(&mut errors, "cache.duration", &config.cache.duration);
    check_duration(&mut errors, "rate_limit_wait", &config.rate_limit_wait);
    check_duration(&mut errors, "subject_timeout", &config.subject_timeout);
    check_duration(&mut errors, "retry.initial_backoff", &config.retry.initial_backoff);
    check_duration(&mut errors, "retry.max_backoff", &config.retry.max_backoff);

    if !(0.0..=1.0).contains(&config.confidence_threshold) {
        errors.push("confidence_threshold: must be between 0 and 1".to_string());
    }
    if config.max_concurrent_subjects == 0 {
        errors.push("max_concurrent_subjects: must be positive".to_string());
    }

    if let Err(scoring_errors) = validate_scoring(&config.scoring) {
        errors.extend(scoring_errors);
    }
    if let Err(bias_errors) = validate_bias(&config.bias_detection) {
        errors.extend(bias_errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_duration(errors: &mut Vec<String>, field: &str, value: &str) {
    match humantime::parse_duration(value.trim()) {
        Ok(d) if d.is_zero() => errors.push(format!("{}: must be greater than zero", field)),
        Ok(_) => {}
        Err(e) => errors.push(format!("{}: invalid duration '{}' - {}", field, value, e)),
    }
}
