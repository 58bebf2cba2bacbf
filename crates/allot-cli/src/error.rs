//! Error types for the CLI application.

use allot_gatekeeper::GatekeeperError;
use allot_reconciler::ReconcilerError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Scenario file is inconsistent
    #[error("Scenario error: {0}")]
    Scenario(String),

    /// Referenced entity does not exist in the scenario
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of entity
        kind: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Rule enforcement failed
    #[error(transparent)]
    Gatekeeper(#[from] GatekeeperError),

    /// Pool reconciliation failed
    #[error(transparent)]
    Reconciler(#[from] ReconcilerError),

    /// In-memory store rejected a write
    #[error("Store error: {0}")]
    Store(String),

    /// The rules rejected a bind
    #[error("Bind rejected for pool {0}")]
    Rejected(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML writing error
    #[error("TOML writing error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
