//! Error types for pool reconciliation

use thiserror::Error;

/// Errors that can occur while reconciling pool quantities
#[derive(Error, Debug)]
pub enum ReconcilerError {
    /// Consumer directory lookup failed
    #[error("Directory error: {0}")]
    Directory(String),

    /// Pool manager read or write failed
    #[error("Pool manager error: {0}")]
    PoolManager(String),

    /// An entitlement has no matching pool-quantity entry
    #[error("No pool quantity recorded for pool '{0}'")]
    MissingPoolQuantity(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
