pub mod export;
pub mod formatter;

pub use export::{reports_json, save_reports};
pub use formatter::{
    format_batch, format_confidence, format_report, format_score, format_status, format_tsv,
    should_use_colors,
};
