//! Configuration management for the CLI.
//!
//! One TOML file holds the rule settings for both engines plus the output
//! preferences:
//!
//! ```toml
//! [enforcer]
//! lenient_listing = true
//!
//! [reconciler]
//! standalone = false
//!
//! [settings]
//! format = "table"
//! color = true
//! ```

use crate::error::{CliError, Result};
use allot_gatekeeper::EnforcerConfig;
use allot_reconciler::ReconcilerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Rule enforcement settings
    #[serde(default)]
    pub enforcer: EnforcerConfig,

    /// Bonus pool reconciliation settings
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// Output settings
    #[serde(default)]
    pub settings: Settings,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.enforcer.lenient_listing);
        assert!(!config.reconciler.standalone);
        assert!(config.settings.color);
        assert_eq!(config.settings.format, OutputFormat::Table);
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml(
            r#"
            [reconciler]
            standalone = true

            [settings]
            format = "json"
            "#,
        )
        .unwrap();

        assert!(config.reconciler.standalone);
        assert!(config.enforcer.run_product_rules);
        assert_eq!(config.settings.format, OutputFormat::Json);
        assert!(config.settings.color);
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = Config::default();
        config.enforcer = EnforcerConfig::strict();

        let serialized = config.to_toml().unwrap();
        let parsed = Config::from_toml(&serialized).unwrap();
        assert!(!parsed.enforcer.lenient_listing);
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
