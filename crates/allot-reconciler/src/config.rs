//! Configuration for pool reconciliation
//!
//! The only switch is the deployment mode. A hosted service tracks exports to
//! downstream distributors and keeps bonus pools in step with them; a
//! standalone (on-site) deployment instead creates host-restricted pools when
//! a physical host binds.

use crate::ReconcilerError;
use serde::{Deserialize, Serialize};

/// Configuration for the reconciler
///
/// # Examples
///
/// ```
/// use allot_reconciler::ReconcilerConfig;
///
/// // Default configuration (hosted)
/// let config = ReconcilerConfig::default();
/// assert!(!config.standalone);
///
/// let config = ReconcilerConfig::standalone();
/// assert!(config.standalone);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Standalone (on-site) deployment rather than the hosted service
    /// Default: false
    #[serde(default)]
    pub standalone: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::hosted()
    }
}

impl ReconcilerConfig {
    /// Hosted service configuration
    pub fn hosted() -> Self {
        Self { standalone: false }
    }

    /// Standalone (on-site) configuration
    pub fn standalone() -> Self {
        Self { standalone: true }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ReconcilerError> {
        toml::from_str(toml_str)
            .map_err(|e| ReconcilerError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ReconcilerError> {
        toml::to_string_pretty(self)
            .map_err(|e| ReconcilerError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}
