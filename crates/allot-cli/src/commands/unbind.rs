//! Unbind command implementation.

use super::reconciler;
use crate::cli::UnbindArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use crate::scenario::MemoryStore;
use allot_domain::{Entitlement, PoolOperationCallback};
use std::path::Path;
use tracing::info;

/// Remove an entitlement and give its exported capacity back to the bonus pools.
pub fn run_unbind(
    args: &UnbindArgs,
    store: &mut MemoryStore,
    config: &Config,
) -> Result<(Entitlement, PoolOperationCallback)> {
    let entitlement = store.entitlement(&args.entitlement)?;
    let exported = store.consumer_type(&entitlement.consumer)?.is_manifest();

    store.remove_entitlement(&entitlement, exported)?;
    let callback = reconciler(store, config).post_unbind(store, &entitlement)?;

    info!(
        entitlement = %entitlement.id,
        pool = %entitlement.pool.id,
        "Entitlement removed"
    );

    Ok((entitlement, callback))
}

/// Execute the unbind command.
pub fn execute_unbind(
    args: UnbindArgs,
    store: &mut MemoryStore,
    config: &Config,
    formatter: &Formatter,
    scenario_path: &Path,
) -> Result<()> {
    let (entitlement, callback) = run_unbind(&args, store, config)?;

    println!(
        "{}",
        formatter.success(&format!(
            "Entitlement {} removed from {}",
            entitlement.id, entitlement.pool.id
        ))
    );
    println!("{}", formatter.format_callback(&callback)?);

    if args.write {
        store.to_scenario().save(scenario_path)?;
        println!("{}", formatter.info(&format!("Scenario written to {}", scenario_path.display())));
    }

    Ok(())
}
