use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::path::Path;

use crate::model::EvaluationReport;

/// Write reports to a JSON file atomically
///
/// The file is either fully replaced or left untouched; a half-written
/// report set is never observed.
pub fn save_reports(path: &Path, reports: &[&EvaluationReport]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, reports).context("Failed to serialize reports")?;

    file.commit()
        .with_context(|| format!("Failed to save reports to {}", path.display()))?;

    Ok(())
}

/// Reports as a pretty-printed JSON array
pub fn reports_json(reports: &[&EvaluationReport]) -> Result<String> {
    serde_json::to_string_pretty(reports).context("Failed to serialize reports")
}
