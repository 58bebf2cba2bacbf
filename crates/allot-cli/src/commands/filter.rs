//! Filter command implementation.

use super::enforcer;
use crate::cli::FilterArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use crate::scenario::MemoryStore;
use allot_domain::Pool;

/// Pools of the consumer's organisation it could take one unit of.
pub fn run_filter(args: &FilterArgs, store: &MemoryStore, config: &Config) -> Result<Vec<Pool>> {
    let consumer = store.consumer(&args.consumer)?;
    let candidates = store.pools_for_owner(&consumer.owner_id);

    let kept = enforcer(store, config).filter_pools(consumer, &candidates, args.show_all)?;
    Ok(kept.into_iter().cloned().collect())
}

/// Execute the filter command.
pub fn execute_filter(
    args: FilterArgs,
    store: &MemoryStore,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let pools = run_filter(&args, store, config)?;
    let refs: Vec<&Pool> = pools.iter().collect();
    println!("{}", formatter.format_pools(&refs)?);
    Ok(())
}
