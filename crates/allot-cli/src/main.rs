//! Allot CLI - check and apply entitlement rules against a scenario file.

use allot_cli::commands;
use allot_cli::{Cli, Command, Config, Formatter, MemoryStore, Scenario};
use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;

    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    let scenario_path = cli
        .scenario
        .context("No scenario file given (use --scenario or ALLOT_SCENARIO)")?;
    let scenario = Scenario::load(&scenario_path)
        .with_context(|| format!("Failed to load scenario {}", scenario_path.display()))?;
    let mut store = MemoryStore::from_scenario(scenario)?;

    match cli.command {
        Command::Validate(args) => commands::execute_validate(args, &store, &config, &formatter)?,
        Command::Filter(args) => commands::execute_filter(args, &store, &config, &formatter)?,
        Command::Bind(args) => {
            commands::execute_bind(args, &mut store, &config, &formatter, &scenario_path)?
        }
        Command::Unbind(args) => {
            commands::execute_unbind(args, &mut store, &config, &formatter, &scenario_path)?
        }
    }

    Ok(())
}

/// Rule decisions go to stderr so stdout stays parseable.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}
