//! Validate command implementation.

use super::enforcer;
use crate::cli::ValidateArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use crate::scenario::MemoryStore;
use allot_gatekeeper::ValidationResult;

/// Run every applicable rule for one consumer and pool.
pub fn run_validate(args: &ValidateArgs, store: &MemoryStore, config: &Config) -> Result<ValidationResult> {
    let consumer = store.consumer(&args.consumer)?;
    let pool = store.pool(&args.pool)?;

    Ok(enforcer(store, config).pre_entitlement_as(consumer, pool, args.quantity, args.caller.into())?)
}

/// Execute the validate command.
pub fn execute_validate(
    args: ValidateArgs,
    store: &MemoryStore,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let result = run_validate(&args, store, config)?;
    println!("{}", formatter.format_result(&args.pool, &result)?);
    Ok(())
}
