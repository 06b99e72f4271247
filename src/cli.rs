//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Hourledger - project hour-budget reports
///
/// Reads a project payload (allocated and consumed hours per project) and
/// reports completion, remaining budget, over-allocation and the
/// allocated-hours distribution. Markdown/JSON output.
///
/// Examples:
///   hourledger --input projects.json
///   hourledger --input - --format json < projects.json
///   hourledger --url https://api.example.com/test/project/manager --manager-id 42
///   hourledger --input projects.json --fail-on-over-allocated
///   hourledger --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// JSON payload file to read (`-` for stdin)
    ///
    /// Either a bare array of projects or an object with a `data` array.
    /// Takes precedence over --url.
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Backend endpoint returning the projects
    #[arg(long, value_name = "URL", env = "HOURLEDGER_URL")]
    pub url: Option<String>,

    /// Authorization header value for the backend request
    #[arg(long, value_name = "TOKEN", env = "HOURLEDGER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Manager id sent in the request body
    #[arg(long, value_name = "ID")]
    pub manager_id: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output file path for the report (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .hourledger.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with code 2 when any project is over-allocated
    #[arg(long)]
    pub fail_on_over_allocated: bool,

    /// Dry run: normalize the payload and list accepted/rejected records
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .hourledger.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "markdown",
            OutputFormat::Json => "json",
        }
    }

    /// Parse the format name used in the config file.
    pub fn from_config(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "markdown" | "md" => Some(OutputFormat::Markdown),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns true when the payload is read from stdin.
    pub fn reads_stdin(&self) -> bool {
        self.input.as_deref() == Some(std::path::Path::new("-"))
    }

    /// Validate the parsed arguments.
    ///
    /// A URL may still come from the config file, so a missing source is
    /// only checked after merging.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Validate backend URL format
        if let Some(ref url) = self.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("URL must start with 'http://' or 'https://'".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        // Validate input file if provided
        if let Some(ref input) = self.input {
            if !self.reads_stdin() && !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `[general] verbose` key; --quiet overrides it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
