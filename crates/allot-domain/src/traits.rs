//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the entitlement rules and the
//! persistence layer that owns consumers, pools and entitlements.
//! Implementations live outside the rule crates.

use crate::attributes::Attributes;
use crate::{Capacity, Consumer, ConsumerType, Entitlement, Pool, PoolOperationCallback};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Resolves consumer types and virtualization hosts
pub trait ConsumerDirectory {
    /// Error type for directory lookups
    type Error: fmt::Display;

    /// Resolve the type of a consumer
    fn consumer_type(&self, consumer: &Consumer) -> Result<ConsumerType, Self::Error>;

    /// Find the host currently reporting the guest with `guest_uuid`
    fn host(&self, guest_uuid: &str, owner_id: &str) -> Result<Option<Consumer>, Self::Error>;
}

/// Write access used when replaying a [`PoolOperationCallback`]
pub trait PoolWriter {
    /// Error type for pool reads and writes
    type Error: fmt::Display;

    /// Persist a new quantity for a pool
    fn set_pool_quantity(&mut self, pool_id: &str, quantity: Capacity) -> Result<(), Self::Error>;

    /// Persist a newly created pool
    fn create_pool(&mut self, pool: Pool) -> Result<(), Self::Error>;
}

/// Pool management handle passed to the quantity reconciler
///
/// Reads must happen inside the same transaction that later replays the
/// callback built from them.
pub trait PoolManager: PoolWriter {
    /// All pools (physical and derived) created from one subscription
    fn pools_by_subscription_id(
        &self,
        owner_id: &str,
        subscription_id: &str,
    ) -> Result<Vec<Pool>, Self::Error>;

    /// All pools created from any of the given subscriptions, in one round trip
    fn pools_by_subscription_ids(
        &self,
        owner_id: &str,
        subscription_ids: &BTreeSet<String>,
    ) -> Result<Vec<Pool>, Self::Error>;

    /// Build host-restricted derived pools for the given physical pools
    ///
    /// Returns the pending work instead of writing it.
    fn create_host_restricted_pools(
        &self,
        consumer: &Consumer,
        pools: &[&Pool],
        entitlements: &BTreeMap<String, Entitlement>,
        attributes: &BTreeMap<String, Attributes>,
    ) -> Result<PoolOperationCallback, Self::Error>;
}

/// Source of the current time (seconds since the Unix epoch)
pub trait Clock {
    /// Current time
    fn now(&self) -> u64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}
