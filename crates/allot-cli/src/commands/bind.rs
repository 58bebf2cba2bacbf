//! Bind command implementation.

use super::{enforcer, reconciler};
use crate::cli::BindArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::scenario::MemoryStore;
use allot_domain::{Entitlement, PoolOperationCallback, PoolQuantity};
use allot_gatekeeper::{CallerType, ValidationResult};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// What a bind attempt produced.
#[derive(Debug)]
pub struct BindOutcome {
    /// Rule findings for the pool
    pub result: ValidationResult,

    /// The granted entitlement, absent when the rules rejected the bind
    pub entitlement: Option<Entitlement>,

    /// Pool changes applied to the store
    pub callback: PoolOperationCallback,
}

/// Validate a bind, then grant it and reconcile the affected pools.
///
/// The store is only touched when the rules pass.
pub fn run_bind(args: &BindArgs, store: &mut MemoryStore, config: &Config) -> Result<BindOutcome> {
    if args.quantity == 0 {
        return Err(CliError::InvalidInput("Quantity must be at least 1".to_string()));
    }
    let requested = i64::try_from(args.quantity)
        .map_err(|_| CliError::InvalidInput(format!("Quantity {} is too large", args.quantity)))?;

    let consumer = store.consumer(&args.consumer)?.clone();
    let pool = store.pool(&args.pool)?.clone();

    let result = enforcer(store, config).pre_entitlement_as(&consumer, &pool, requested, CallerType::Bind)?;
    if !result.is_successful() {
        return Ok(BindOutcome {
            result,
            entitlement: None,
            callback: PoolOperationCallback::new(),
        });
    }

    let exported = store.consumer_type(&consumer)?.is_manifest();
    let entitlement = Entitlement::new(store.next_entitlement_id(), consumer.clone(), pool.clone(), args.quantity)
        .map_err(CliError::InvalidInput)?;
    let entitlements = BTreeMap::from([(pool.id.clone(), entitlement.clone())]);
    let pool_quantities = BTreeMap::from([(pool.id.clone(), PoolQuantity::new(pool, requested))]);
    let sub_pools = store.stack_sub_pools(&consumer);

    let callback = reconciler(store, config).post_entitlement(
        &*store,
        &consumer,
        &consumer.owner_id,
        &entitlements,
        &sub_pools,
        false,
        &pool_quantities,
    )?;
    callback.apply(store).map_err(CliError::Store)?;
    store.record_entitlement(&entitlement, exported)?;

    info!(
        entitlement = %entitlement.id,
        consumer = %consumer.uuid,
        pool = %entitlement.pool.id,
        quantity = entitlement.quantity,
        "Entitlement granted"
    );

    Ok(BindOutcome {
        result,
        entitlement: Some(entitlement),
        callback,
    })
}

/// Execute the bind command.
pub fn execute_bind(
    args: BindArgs,
    store: &mut MemoryStore,
    config: &Config,
    formatter: &Formatter,
    scenario_path: &Path,
) -> Result<()> {
    let outcome = run_bind(&args, store, config)?;
    println!("{}", formatter.format_result(&args.pool, &outcome.result)?);

    let Some(entitlement) = outcome.entitlement else {
        return Err(CliError::Rejected(args.pool));
    };

    println!(
        "{}",
        formatter.success(&format!(
            "Entitlement {} grants {} unit(s) of {}",
            entitlement.id, entitlement.quantity, entitlement.pool.id
        ))
    );
    println!("{}", formatter.format_callback(&outcome.callback)?);

    if args.write {
        store.to_scenario().save(scenario_path)?;
        println!("{}", formatter.info(&format!("Scenario written to {}", scenario_path.display())));
    }

    Ok(())
}
