//! Gatekeeper configuration

use crate::GatekeeperError;
use serde::{Deserialize, Serialize};

/// Configuration for the enforcer
///
/// # Examples
///
/// ```
/// use allot_gatekeeper::EnforcerConfig;
///
/// let config = EnforcerConfig::from_toml("lenient_listing = false").unwrap();
/// assert!(!config.lenient_listing);
/// assert!(config.run_product_rules);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcerConfig {
    /// Report virt-only / physical-only mismatches as warnings when listing pools
    ///
    /// Administrators listing with "show all" then still see those pools.
    #[serde(default = "default_true")]
    pub lenient_listing: bool,

    /// Run the installed product rule source after the built-in validators
    #[serde(default = "default_true")]
    pub run_product_rules: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        Self {
            lenient_listing: true,
            run_product_rules: true,
        }
    }
}

impl EnforcerConfig {
    /// Strict configuration: every mismatch is an error, whoever is asking
    pub fn strict() -> Self {
        Self {
            lenient_listing: false,
            run_product_rules: true,
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, GatekeeperError> {
        toml::from_str(toml_str)
            .map_err(|e| GatekeeperError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, GatekeeperError> {
        toml::to_string_pretty(self)
            .map_err(|e| GatekeeperError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}
