use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use civic_scorecard::clock::{Clock, SystemClock};
use civic_scorecard::config::{self, Config};
use civic_scorecard::error::EvaluationError;
use civic_scorecard::evaluation::{BatchOutcome, Orchestrator};
use civic_scorecard::model::TimeRange;
use civic_scorecard::{credentials, output, sources};

const EXIT_SUCCESS: i32 = 0;
const EXIT_AUTH: i32 = 1;
const EXIT_NETWORK: i32 = 2;
const EXIT_PARTIAL: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate every subject in a YAML file
    Evaluate {
        /// YAML list of subjects (id, name, party, state, position, start_date)
        #[arg(short, long)]
        subjects: PathBuf,

        /// Start of the evidence window (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        from: Option<String>,

        /// End of the evidence window, exclusive (defaults to now)
        #[arg(long)]
        to: Option<String>,

        /// Window length in days when --from is not given
        #[arg(long, default_value_t = 365)]
        days: i64,

        /// Print reports as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Print one tab-separated line per report
        #[arg(long, conflicts_with = "json")]
        tsv: bool,

        /// Also write the reports to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Bypass the response cache for this run
        #[arg(long)]
        no_cache: bool,
    },
    /// Show configured sources, API keys and cache settings
    Status,
    /// Remove the persisted response cache
    ClearCache,
}

#[derive(Parser, Debug)]
#[command(name = "civic-scorecard")]
#[command(about = "Evidence-based scorecards for public officials", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/civic-scorecard/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("civic_scorecard={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_instant(value: &str, flag: &str) -> Result<DateTime<Utc>, String> {
    sources::normalize::parse_date(value).map_err(|e| format!("Invalid {} date: {}", flag, e))
}

fn resolve_range(
    from: Option<&str>,
    to: Option<&str>,
    days: i64,
    now: DateTime<Utc>,
) -> Result<TimeRange, String> {
    let end = match to {
        Some(value) => parse_instant(value, "--to")?,
        None => now,
    };
    match from {
        Some(value) => {
            let start = parse_instant(value, "--from")?;
            TimeRange::new(start, end).map_err(|e| e.to_string())
        }
        None if days < 1 => Err(format!("--days must be at least 1, got {}", days)),
        None => TimeRange::last_days(end, days).map_err(|e| e.to_string()),
    }
}

fn load_and_validate(path: Option<PathBuf>) -> Config {
    let config = match config::load_config(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Err(errors) = config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    config
}

/// Exit code for a finished batch
fn batch_exit_code(outcome: &BatchOutcome) -> i32 {
    if outcome.failed() == 0 {
        return EXIT_SUCCESS;
    }
    if outcome.succeeded > 0 {
        return EXIT_PARTIAL;
    }
    let all_auth = outcome
        .failures()
        .iter()
        .all(|e| matches!(e, EvaluationError::Unauthorized { .. }));
    if all_auth {
        EXIT_AUTH
    } else {
        EXIT_NETWORK
    }
}

#[tokio::main]
async fn main() {
    sources::http::install_crypto_provider();

    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let start_time = Instant::now();

    let mut config = load_and_validate(cli.config);
    tracing::debug!(sources = config.sources.len(), "configuration loaded");

    match cli.command {
        Commands::Evaluate {
            subjects,
            from,
            to,
            days,
            json,
            tsv,
            output: output_path,
            no_cache,
        } => {
            let clock: Arc<dyn Clock> = Arc::new(SystemClock);

            let range = match resolve_range(from.as_deref(), to.as_deref(), days, clock.now()) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            };

            let subjects = match config::load_subjects(&subjects) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Subjects error: {:#}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            };

            if no_cache {
                config.cache.enabled = false;
            }

            let orchestrator = match Orchestrator::with_http_sources(&config, clock) {
                Ok(o) => o,
                Err(e) => {
                    eprintln!("Failed to set up data sources: {:#}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            };

            let outcome = orchestrator.evaluate_subjects(&subjects, &range).await;
            let reports = outcome.reports();

            if let Some(path) = &output_path {
                if let Err(e) = output::save_reports(path, &reports) {
                    eprintln!("{:#}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            }

            let use_colors = output::should_use_colors();
            if json {
                match output::reports_json(&reports) {
                    Ok(text) => println!("{}", text),
                    Err(e) => eprintln!("{:#}", e),
                }
                for failure in outcome.failures() {
                    eprintln!("{}", failure);
                }
            } else if tsv {
                if !reports.is_empty() {
                    println!("{}", output::format_tsv(&reports));
                }
                for failure in outcome.failures() {
                    eprintln!("{}", failure);
                }
            } else {
                println!("{}", output::format_batch(&outcome, use_colors));
            }

            if cli.verbose {
                eprintln!();
                eprintln!(
                    "Evaluated {} subjects in {:?}",
                    outcome.total,
                    start_time.elapsed()
                );
                eprintln!(
                    "{}",
                    output::format_status(&orchestrator.status(), &[], false)
                );
            }

            std::process::exit(batch_exit_code(&outcome));
        }
        Commands::Status => {
            let orchestrator = match Orchestrator::with_http_sources(&config, Arc::new(SystemClock)) {
                Ok(o) => o,
                Err(e) => {
                    eprintln!("Failed to set up data sources: {:#}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            };
            let missing = credentials::missing_keys(&config);
            println!(
                "{}",
                output::format_status(&orchestrator.status(), &missing, output::should_use_colors())
            );
        }
        Commands::ClearCache => {
            if let Err(e) = sources::cache::clear_cache(config.cache.dir.clone()) {
                eprintln!("{:#}", e);
                std::process::exit(EXIT_CONFIG);
            }
            println!("Response cache cleared");
        }
    }

    std::process::exit(EXIT_SUCCESS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use civic_scorecard::evaluation::SubjectOutcome;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_resolve_range_defaults_to_last_days() {
        let range = resolve_range(None, None, 30, now()).unwrap();
        assert_eq!(range.end, now());
        assert_eq!(range.start, now() - chrono::Duration::days(30));
    }

    #[test]
    fn test_resolve_range_explicit_dates() {
        let range = resolve_range(Some("2023-01-01"), Some("2024-01-01"), 365, now()).unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_resolve_range_rejects_bad_input() {
        assert!(resolve_range(Some("2024-02-01"), Some("2024-01-01"), 365, now()).is_err());
        assert!(resolve_range(Some("yesterday"), None, 365, now()).is_err());
        assert!(resolve_range(None, None, 0, now()).is_err());
        assert!(resolve_range(None, None, 200_000_000, now()).is_err());
        assert!(resolve_range(None, None, i64::MAX, now()).is_err());
    }

    fn failed(error: EvaluationError) -> SubjectOutcome {
        SubjectOutcome {
            subject_id: error.subject_id().to_string(),
            result: Err(error),
        }
    }

    #[test]
    fn test_batch_exit_codes() {
        let unauthorized = || EvaluationError::Unauthorized {
            subject_id: "a".to_string(),
        };
        let no_data = || EvaluationError::NoDataAvailable {
            subject_id: "b".to_string(),
            reason: "all sources failed".to_string(),
        };

        let empty = BatchOutcome {
            outcomes: vec![],
            succeeded: 0,
            total: 0,
        };
        assert_eq!(batch_exit_code(&empty), EXIT_SUCCESS);

        let auth = BatchOutcome {
            outcomes: vec![failed(unauthorized())],
            succeeded: 0,
            total: 1,
        };
        assert_eq!(batch_exit_code(&auth), EXIT_AUTH);

        let network = BatchOutcome {
            outcomes: vec![failed(unauthorized()), failed(no_data())],
            succeeded: 0,
            total: 2,
        };
        assert_eq!(batch_exit_code(&network), EXIT_NETWORK);
    }
}
