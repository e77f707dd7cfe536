//! API keys for data sources, read from environment variables.

use crate::config::{Config, SourceConfig};

/// Environment variable a source's key is read from: the configured name, or
/// one derived from the source name (`congress.gov` -> `CONGRESS_GOV_API_KEY`).
pub fn api_key_var(source: &SourceConfig) -> String {
    match source.api_key_env.as_deref().map(str::trim) {
        Some(var) if !var.is_empty() => var.to_string(),
        _ => {
            let stem: String = source
                .name
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
                .collect();
            format!("{}_API_KEY", stem)
        }
    }
}

/// Read an environment variable, treating unset and blank values alike.
fn get_from_env(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(val) => {
            let trimmed = val.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}

/// The API key for a source, if one is set. A missing key is logged and the
/// source is queried without one.
pub fn get_api_key(source: &SourceConfig) -> Option<String> {
    let var = api_key_var(source);
    let key = get_from_env(&var);
    if key.is_none() {
        tracing::warn!(
            source = source.name.as_str(),
            env = var.as_str(),
            "no API key set, querying unauthenticated"
        );
    }
    key
}

/// Sources without a key, paired with the variable that would hold it
pub fn missing_keys(config: &Config) -> Vec<(String, String)> {
    config
        .sources
        .iter()
        .map(|source| (source.name.clone(), api_key_var(source)))
        .filter(|(_, var)| get_from_env(var).is_none())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, env: Option<&str>) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            base_url: "https://example.org".to_string(),
            rate_limit: 10,
            api_key_env: env.map(String::from),
            timeout: "30s".to_string(),
        }
    }

    #[test]
    fn test_derived_variable_name() {
        assert_eq!(api_key_var(&source("congress.gov", None)), "CONGRESS_GOV_API_KEY");
        assert_eq!(api_key_var(&source("my-source", Some("  "))), "MY_SOURCE_API_KEY");
        assert_eq!(api_key_var(&source("x", Some("CUSTOM_KEY"))), "CUSTOM_KEY");
    }

    #[test]
    fn test_reads_and_trims_key() {
        std::env::set_var("CIVIC_SCORECARD_TEST_KEY_SET", "  abc123 \n");
        let s = source("test", Some("CIVIC_SCORECARD_TEST_KEY_SET"));
        assert_eq!(get_api_key(&s).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        std::env::set_var("CIVIC_SCORECARD_TEST_KEY_BLANK", "   ");
        let s = source("blank", Some("CIVIC_SCORECARD_TEST_KEY_BLANK"));
        assert!(get_api_key(&s).is_none());

        let config = Config {
            sources: vec![s],
            ..Config::default()
        };
        assert_eq!(
            missing_keys(&config),
            vec![("blank".to_string(), "CIVIC_SCORECARD_TEST_KEY_BLANK".to_string())]
        );
    }
}
