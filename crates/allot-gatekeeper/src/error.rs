//! Gatekeeper error types
//!
//! Business-rule failures never show up here; they are reported in a
//! [`ValidationResult`](crate::ValidationResult). These errors cover the
//! collaborators and configuration around the rules.

use thiserror::Error;

/// Errors that can occur during gatekeeper operations
#[derive(Error, Debug)]
pub enum GatekeeperError {
    /// Consumer directory lookup failed
    #[error("Directory error: {0}")]
    Directory(String),

    /// A product rule raised instead of reporting through the result
    #[error("Rule execution failed for product '{label}': {message}")]
    RuleExecution {
        /// Product label the rule was registered under
        label: String,
        /// Failure reported by the rule
        message: String,
    },

    /// Validation context built without a required field
    #[error("Missing validation context field: {0}")]
    MissingContextField(&'static str),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
