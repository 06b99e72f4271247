//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.hourledger.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".hourledger.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Payload source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Backend field names.
    #[serde(default)]
    pub fields: FieldsConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output file path; the report goes to stdout when unset.
    #[serde(default)]
    pub output: Option<String>,

    /// Report format (`markdown` or `json`).
    #[serde(default = "default_format")]
    pub format: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: None,
            format: default_format(),
            verbose: false,
        }
    }
}

fn default_format() -> String {
    "markdown".to_string()
}

/// Where the project payload comes from when `--input` is not given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Backend endpoint returning the manager's projects.
    #[serde(default)]
    pub url: Option<String>,

    /// Manager id sent in the request body.
    #[serde(default)]
    pub manager_id: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            manager_id: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// Backend key names for each canonical field, first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldsConfig {
    #[serde(default = "default_id_keys")]
    pub id: Vec<String>,

    #[serde(default = "default_name_keys")]
    pub name: Vec<String>,

    #[serde(default = "default_allocated_keys")]
    pub allocated_hours: Vec<String>,

    #[serde(default = "default_consumed_keys")]
    pub consumed_hours: Vec<String>,

    #[serde(default = "default_start_keys")]
    pub start_date: Vec<String>,

    #[serde(default = "default_end_keys")]
    pub end_date: Vec<String>,
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            id: default_id_keys(),
            name: default_name_keys(),
            allocated_hours: default_allocated_keys(),
            consumed_hours: default_consumed_keys(),
            start_date: default_start_keys(),
            end_date: default_end_keys(),
        }
    }
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn default_id_keys() -> Vec<String> {
    keys(&["id", "project_id", "projectId"])
}

fn default_name_keys() -> Vec<String> {
    keys(&["name", "project_name", "projectName"])
}

fn default_allocated_keys() -> Vec<String> {
    keys(&[
        "allocated_hours",
        "allocatedHours",
        "estimated_hours",
        "estimatedHours",
    ])
}

fn default_consumed_keys() -> Vec<String> {
    keys(&[
        "consumed_hours",
        "consumedHours",
        "approved_hours",
        "approvedHours",
        "actual_hours",
        "actualHours",
    ])
}

fn default_start_keys() -> Vec<String> {
    keys(&["start_date", "startDate"])
}

fn default_end_keys() -> Vec<String> {
    keys(&["end_date", "endDate"])
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the allocated-hours distribution table.
    #[serde(default = "default_true")]
    pub include_distribution: bool,

    /// Include the allocated/consumed/remaining comparison table.
    #[serde(default = "default_true")]
    pub include_comparison: bool,

    /// List records that were excluded during normalization.
    #[serde(default = "default_true")]
    pub include_rejected: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_distribution: true,
            include_comparison: true,
            include_rejected: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only explicitly provided CLI values override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.url {
            self.source.url = Some(url.clone());
        }
        if let Some(ref manager_id) = args.manager_id {
            self.source.manager_id = Some(manager_id.clone());
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }

        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
        if let Some(format) = args.format {
            self.general.format = format.as_str().to_string();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.format, "markdown");
        assert_eq!(config.source.timeout_seconds, 30);
        assert!(config
            .fields
            .allocated_hours
            .contains(&"estimated_hours".to_string()));
        assert!(config
            .fields
            .consumed_hours
            .contains(&"approved_hours".to_string()));
        assert!(config.report.include_distribution);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "hours.md"
verbose = true

[source]
url = "https://api.example.com/test/project/manager"
manager_id = "42"

[fields]
allocated_hours = ["budget"]

[report]
include_rejected = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output.as_deref(), Some("hours.md"));
        assert!(config.general.verbose);
        assert_eq!(
            config.source.url.as_deref(),
            Some("https://api.example.com/test/project/manager")
        );
        assert_eq!(config.source.manager_id.as_deref(), Some("42"));
        assert_eq!(config.source.timeout_seconds, 30);
        assert_eq!(config.fields.allocated_hours, vec!["budget"]);
        assert_eq!(config.fields.id, vec!["id", "project_id", "projectId"]);
        assert!(!config.report.include_rejected);
        assert!(config.report.include_comparison);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[source]"));
        assert!(toml_str.contains("[fields]"));
        assert!(toml_str.contains("[report]"));
    }

    #[test]
    fn test_default_toml_round_trips() {
        let parsed: Config = toml::from_str(&Config::default_toml()).unwrap();
        assert_eq!(parsed.fields, FieldsConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[source]\ntimeout_seconds = 5\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.source.timeout_seconds, 5);
        assert!(config.source.url.is_none());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(&dir.path().join("missing.toml"));
        assert!(result.is_err());
    }
}
