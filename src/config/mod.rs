mod schema;
mod validation;

pub use schema::{CacheConfig, Config, RetryConfig, SourceConfig};
pub use validation::validate_config;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::Subject;

/// Get the config directory path (~/.config/civic-scorecard/)
pub fn get_config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".config").join("civic-scorecard"))
        .unwrap_or_else(|| PathBuf::from(".civic-scorecard"))
}

/// Get the default config file path (~/.config/civic-scorecard/config.yaml)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.yaml")
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses the default path and
///   falls back to built-in defaults when that file does not exist.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let explicit = path.is_some();
    let config_path = path.unwrap_or_else(get_config_path);

    if !config_path.exists() {
        if explicit {
            anyhow::bail!("Config file not found at {}", config_path.display());
        }
        tracing::debug!(path = %config_path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: Config = serde_saphyr::from_str(&config_content).with_context(|| {
        format!(
            "Failed to parse config: invalid YAML in {}",
            config_path.display()
        )
    })?;

    Ok(config)
}

/// Load the subjects to evaluate from a YAML list
pub fn load_subjects(path: &Path) -> Result<Vec<Subject>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read subjects file at {}", path.display()))?;

    let subjects: Vec<Subject> = serde_saphyr::from_str(&content)
        .with_context(|| format!("Failed to parse subjects in {}", path.display()))?;

    if subjects.is_empty() {
        anyhow::bail!("No subjects listed in {}", path.display());
    }

    let mut seen = std::collections::HashSet::new();
    for subject in &subjects {
        if subject.id.trim().is_empty() {
            anyhow::bail!("Subject '{}' has an empty id", subject.name);
        }
        if !seen.insert(subject.id.as_str()) {
            anyhow::bail!("Subject id '{}' is listed more than once", subject.id);
        }
    }

    Ok(subjects)
}
