//! Command implementations.

pub mod bind;
pub mod filter;
pub mod unbind;
pub mod validate;

pub use self::bind::execute_bind;
pub use self::filter::execute_filter;
pub use self::unbind::execute_unbind;
pub use self::validate::execute_validate;

use crate::config::Config;
use crate::scenario::{MemoryStore, ScenarioDirectory};
use allot_domain::FixedClock;
use allot_gatekeeper::Enforcer;
use allot_reconciler::Reconciler;

/// Enforcer evaluating at the scenario's time.
fn enforcer(store: &MemoryStore, config: &Config) -> Enforcer<ScenarioDirectory, FixedClock> {
    Enforcer::new(store.directory())
        .with_clock(FixedClock(store.now()))
        .with_config(config.enforcer.clone())
}

fn reconciler(store: &MemoryStore, config: &Config) -> Reconciler<ScenarioDirectory> {
    Reconciler::new(store.directory(), config.reconciler.clone())
}
