//! CLI command definitions and argument parsing.

use crate::config::OutputFormat;
use allot_gatekeeper::CallerType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Allot CLI - Check and apply entitlement rules against a scenario file.
#[derive(Debug, Parser)]
#[command(name = "allot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Scenario file (TOML) holding consumers, pools and entitlements
    #[arg(short, long, global = true, env = "ALLOT_SCENARIO")]
    pub scenario: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log rule decisions to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => OutputFormat::Table,
            CliFormat::Json => OutputFormat::Json,
        }
    }
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate one pool for a consumer
    Validate(ValidateArgs),

    /// List the pools a consumer could bind to
    Filter(FilterArgs),

    /// Bind a consumer to a pool and show the resulting pool changes
    Bind(BindArgs),

    /// Remove an entitlement and show the restored pool quantities
    Unbind(UnbindArgs),
}

/// Arguments for the validate command.
#[derive(Debug, Parser)]
pub struct ValidateArgs {
    /// Consumer uuid
    #[arg(long)]
    pub consumer: String,

    /// Pool id
    #[arg(long)]
    pub pool: String,

    /// Requested quantity
    #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
    pub quantity: i64,

    /// Who is asking
    #[arg(long, value_enum, default_value = "unknown")]
    pub caller: CallerArg,
}

/// Arguments for the filter command.
#[derive(Debug, Parser)]
pub struct FilterArgs {
    /// Consumer uuid
    #[arg(long)]
    pub consumer: String,

    /// Keep pools that only produced warnings
    #[arg(long)]
    pub show_all: bool,
}

/// Arguments for the bind command.
#[derive(Debug, Parser)]
pub struct BindArgs {
    /// Consumer uuid
    #[arg(long)]
    pub consumer: String,

    /// Pool id
    #[arg(long)]
    pub pool: String,

    /// Units to bind
    #[arg(short, long, default_value_t = 1)]
    pub quantity: u64,

    /// Write the updated scenario back to the file
    #[arg(short, long)]
    pub write: bool,
}

/// Arguments for the unbind command.
#[derive(Debug, Parser)]
pub struct UnbindArgs {
    /// Entitlement id
    #[arg(long)]
    pub entitlement: String,

    /// Write the updated scenario back to the file
    #[arg(short, long)]
    pub write: bool,
}

/// Caller classification accepted on the command line.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CallerArg {
    /// A consumer binding to a pool
    Bind,
    /// Listing pools
    ListPools,
    /// Anything else
    Unknown,
}

impl From<CallerArg> for CallerType {
    fn from(caller: CallerArg) -> Self {
        match caller {
            CallerArg::Bind => CallerType::Bind,
            CallerArg::ListPools => CallerType::ListPools,
            CallerArg::Unknown => CallerType::Unknown,
        }
    }
}
