//! Hourledger - project hour-budget reports
//!
//! A CLI tool that normalizes a project payload, derives progress and
//! over-allocation metrics, and renders an hours report.
//!
//! Exit codes:
//!   0 - Success (no over-allocated projects, or no --fail-on-over-allocated)
//!   1 - Runtime error (unreadable input, HTTP failure, bad config, etc.)
//!   2 - Over-allocated projects found with --fail-on-over-allocated

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod normalize;
mod report;
mod snapshot;
mod source;

use anyhow::{bail, Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use normalize::FieldAliases;
use report::ReportMetadata;
use snapshot::{Snapshot, SnapshotStore};
use source::{HttpOptions, PayloadSource};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration first; it can turn on verbose logging
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("Hourledger v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run_report(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .hourledger.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the backend URL, field names and report sections.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so a report written to stdout stays clean.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete report workflow. Returns exit code (0 or 2).
async fn run_report(args: Args, config: Config) -> Result<i32> {
    let payload_source = resolve_source(&args, &config)?;
    let aliases = FieldAliases::from(&config.fields);

    // Each run is one fetch generation; the store only keeps the newest.
    let store = SnapshotStore::new();
    let generation = store.next_generation();

    let raw = source::load_payload(&payload_source)
        .await
        .with_context(|| format!("Failed to load projects from {}", payload_source.describe()))?;

    if !store.publish(Snapshot::build(generation, &raw, &aliases)) {
        bail!("Snapshot #{} was superseded before it could be published", generation);
    }
    let snapshot = store.current();

    for warning in &snapshot.warnings {
        warn!("{}", warning);
    }

    if args.dry_run {
        return handle_dry_run(&snapshot);
    }

    let metadata = ReportMetadata {
        source: payload_source.describe(),
        raw_records: raw.len(),
    };

    let format = OutputFormat::from_config(&config.general.format).unwrap_or_else(|| {
        warn!(
            "Unknown report format `{}`, using markdown",
            config.general.format
        );
        OutputFormat::Markdown
    });

    let output = match format {
        OutputFormat::Json => report::generate_json_report(&snapshot, &metadata)?,
        OutputFormat::Markdown => {
            report::generate_markdown_report(&snapshot, &metadata, &config.report)
        }
    };

    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path))?;
            info!("Report saved to {}", path);

            if !args.quiet {
                print_summary(&snapshot);
                println!("\n✅ Report saved to: {}", path);
            }
        }
        None => print!("{}", output),
    }

    // Check --fail-on-over-allocated
    let code = exit_code(&snapshot, args.fail_on_over_allocated);
    if code == 2 {
        let over_allocated = snapshot.over_allocated();
        eprintln!(
            "\n⛔ {} project(s) over allocated: {}. Failing (exit code 2).",
            over_allocated.len(),
            over_allocated.join(", ")
        );
    }

    Ok(code)
}

/// Exit code for a completed report: 2 when failing on over-allocation was
/// requested and at least one project is over allocated, otherwise 0.
fn exit_code(snapshot: &Snapshot, fail_on_over_allocated: bool) -> i32 {
    if fail_on_over_allocated && !snapshot.over_allocated().is_empty() {
        2
    } else {
        0
    }
}

/// Pick the payload source: --input wins, then the configured URL.
fn resolve_source(args: &Args, config: &Config) -> Result<PayloadSource> {
    if let Some(ref input) = args.input {
        if args.reads_stdin() {
            return Ok(PayloadSource::Stdin);
        }
        return Ok(PayloadSource::File(input.clone()));
    }

    match config.source.url {
        Some(ref url) => Ok(PayloadSource::Http(HttpOptions {
            url: url.clone(),
            token: args.token.clone(),
            manager_id: config.source.manager_id.clone(),
            timeout_seconds: config.source.timeout_seconds,
            show_progress: !args.quiet,
        })),
        None => bail!("No project source: pass --input or --url, or set [source] url in the config"),
    }
}

/// Print a short summary of the snapshot to stdout.
fn print_summary(snapshot: &Snapshot) {
    let totals = &snapshot.totals;

    println!("\n📊 Hours Summary:");
    println!("   Projects: {}", totals.project_count);
    println!(
        "   Estimated: {}h | Approved: {}h | Remaining: {}h",
        report::generator::format_hours(totals.total_allocated_hours),
        report::generator::format_hours(totals.total_consumed_hours),
        report::generator::format_hours(totals.total_remaining_hours),
    );
    println!("   Overall progress: {}%", totals.overall_progress_percent);
    println!("   Over allocated: {}", totals.over_allocated_count);
    if !snapshot.rejected.is_empty() {
        println!("   Skipped records: {}", snapshot.rejected.len());
    }
}

/// Handle --dry-run: list what normalization kept and dropped, exit.
fn handle_dry_run(snapshot: &Snapshot) -> Result<i32> {
    println!("\n🔍 Dry run: normalized payload (no report written)...\n");

    if snapshot.records.is_empty() {
        println!("   No valid project records found.");
    } else {
        println!("   {} projects accepted:\n", snapshot.records.len());
        for record in &snapshot.records {
            println!(
                "     📁 {} [{}] estimated {}h, approved {}h",
                record.label(),
                record.id,
                report::generator::format_hours(record.allocated_hours),
                report::generator::format_hours(record.consumed_hours),
            );
        }
    }

    if !snapshot.rejected.is_empty() {
        println!("\n   {} records skipped:\n", snapshot.rejected.len());
        for rejected in &snapshot.rejected {
            println!("     ⚠️  {}", rejected);
        }
    }

    println!("\n✅ Dry run complete.");
    Ok(0)
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is initialized, so problems go straight to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}. Using defaults.", DEFAULT_CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;

    fn snapshot(raw: &[serde_json::Value]) -> Snapshot {
        Snapshot::build(1, raw, &FieldAliases::default())
    }

    fn over_allocated_snapshot() -> Snapshot {
        snapshot(&[
            json!({ "id": "web", "estimated_hours": 120, "approved_hours": 85 }),
            json!({ "id": "db", "estimated_hours": 80, "approved_hours": 95 }),
        ])
    }

    fn on_budget_snapshot() -> Snapshot {
        snapshot(&[
            json!({ "id": "web", "estimated_hours": 120, "approved_hours": 85 }),
            json!({ "id": "app", "estimated_hours": 160, "approved_hours": 160 }),
        ])
    }

    #[test]
    fn test_exit_code_fails_on_over_allocation() {
        assert_eq!(exit_code(&over_allocated_snapshot(), true), 2);
    }

    #[test]
    fn test_exit_code_without_over_allocation() {
        assert_eq!(exit_code(&on_budget_snapshot(), true), 0);
        assert_eq!(exit_code(&Snapshot::empty(), true), 0);
    }

    #[test]
    fn test_exit_code_without_flag() {
        assert_eq!(exit_code(&over_allocated_snapshot(), false), 0);
        assert_eq!(exit_code(&on_budget_snapshot(), false), 0);
    }

    #[test]
    fn test_dry_run_succeeds() {
        assert_eq!(handle_dry_run(&over_allocated_snapshot()).unwrap(), 0);
        assert_eq!(handle_dry_run(&Snapshot::empty()).unwrap(), 0);
    }

    #[test]
    fn test_input_wins_over_configured_url() {
        let args = Args::try_parse_from(["hourledger", "--input", "projects.json"]).unwrap();
        let mut config = Config::default();
        config.source.url = Some("https://api.example.com/test/project/manager".to_string());

        match resolve_source(&args, &config).unwrap() {
            PayloadSource::File(path) => assert_eq!(path, std::path::PathBuf::from("projects.json")),
            other => panic!("expected a file source, got {:?}", other),
        }
    }

    #[test]
    fn test_stdin_and_http_sources() {
        let args = Args::try_parse_from(["hourledger", "--input", "-"]).unwrap();
        assert!(matches!(
            resolve_source(&args, &Config::default()).unwrap(),
            PayloadSource::Stdin
        ));

        let args = Args::try_parse_from(["hourledger", "--quiet"]).unwrap();
        let mut config = Config::default();
        config.source.url = Some("https://api.example.com/test/project/manager".to_string());
        config.source.manager_id = Some("42".to_string());

        match resolve_source(&args, &config).unwrap() {
            PayloadSource::Http(options) => {
                assert_eq!(options.manager_id.as_deref(), Some("42"));
                assert_eq!(options.timeout_seconds, 30);
                assert!(!options.show_progress);
            }
            other => panic!("expected an HTTP source, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let mut args = Args::try_parse_from(["hourledger"]).unwrap();
        args.url = None;
        assert!(resolve_source(&args, &Config::default()).is_err());
    }
}
