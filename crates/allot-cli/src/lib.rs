//! Allot CLI library.
//!
//! Runs the entitlement rules and the pool reconciler against a scenario file,
//! so rule changes can be tried out without a running entitlement service.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod scenario;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
pub use scenario::{MemoryStore, Scenario};
