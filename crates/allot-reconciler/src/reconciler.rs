//! Bonus pool reconciliation after binds and unbinds

use crate::{ReconcilerConfig, ReconcilerError};
use allot_domain::attributes::{self, Attributes};
use allot_domain::traits::{ConsumerDirectory, PoolManager};
use allot_domain::{
    Capacity, Consumer, ConsumerType, Entitlement, Pool, PoolOperationCallback, PoolQuantity,
    VirtLimit,
};
use std::collections::{BTreeMap, BTreeSet};

/// An entitlement whose pool carries a virt limit, with everything needed to act on it
struct VirtLimitBind<'a> {
    pool_id: &'a str,
    entitlement: &'a Entitlement,
    pool_quantity: &'a PoolQuantity,
    attributes: Attributes,
}

impl VirtLimitBind<'_> {
    fn pool(&self) -> &Pool {
        &self.pool_quantity.pool
    }

    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    fn is_host_limited(&self) -> bool {
        is_host_limited(&self.attributes)
    }
}

/// Keeps derived (bonus) pools in step with binds on their physical pool
///
/// Physical hosts binding a virt-limited pool on a standalone deployment (or a
/// host-limited pool anywhere) get host-restricted pools created for their
/// guests. Manifest consumers binding on the hosted service export capacity,
/// so the bonus pools of the same subscription shrink accordingly; unbinding
/// gives that capacity back.
pub struct Reconciler<D> {
    directory: D,
    config: ReconcilerConfig,
}

impl<D: ConsumerDirectory> Reconciler<D> {
    /// Create a new reconciler
    pub fn new(directory: D, config: ReconcilerConfig) -> Self {
        Self { directory, config }
    }

    /// Active configuration
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Work out the pool changes a batch of new (or updated) entitlements implies
    ///
    /// `entitlements` and `pool_quantities` are keyed by pool id; the quantity
    /// entry is the requested change, negative when an update gives units back.
    /// `sub_pools_for_stack_ids` are derived pools that already exist for the
    /// consumer's stacks. Nothing is written; the caller replays the returned
    /// callback.
    ///
    /// # Errors
    /// Fails when an entitlement has no pool-quantity entry, or when the
    /// directory or the pool manager does.
    #[allow(clippy::too_many_arguments)]
    pub fn post_entitlement<M: PoolManager>(
        &self,
        manager: &M,
        consumer: &Consumer,
        owner_id: &str,
        entitlements: &BTreeMap<String, Entitlement>,
        sub_pools_for_stack_ids: &[Pool],
        is_update: bool,
        pool_quantities: &BTreeMap<String, PoolQuantity>,
    ) -> Result<PoolOperationCallback, ReconcilerError> {
        let mut binds = Vec::new();
        for (pool_id, entitlement) in entitlements {
            let pool_quantity = pool_quantities
                .get(pool_id)
                .ok_or_else(|| ReconcilerError::MissingPoolQuantity(pool_id.clone()))?;
            let flattened = pool_quantity.pool.flattened_attributes();
            if flattened.contains_key(attributes::VIRT_LIMIT) {
                binds.push(VirtLimitBind {
                    pool_id,
                    entitlement,
                    pool_quantity,
                    attributes: flattened,
                });
            }
        }

        if binds.is_empty() {
            return Ok(PoolOperationCallback::new());
        }

        let consumer_type = self.consumer_type(consumer)?;

        // Standalone manifest consumers have nothing to create and no bonus pools to adjust
        if consumer_type.is_manifest() && self.config.standalone {
            tracing::debug!(
                consumer = %consumer.uuid,
                "Skipping virt_limit post-bind for manifest consumer in standalone mode"
            );
            return Ok(PoolOperationCallback::new());
        }

        self.post_bind_virt_limit(
            manager,
            consumer,
            &consumer_type,
            owner_id,
            &binds,
            sub_pools_for_stack_ids,
            is_update,
        )
    }

    /// Give exported capacity back to the bonus pools when an entitlement is removed
    ///
    /// The resulting callback is applied to `manager` before it is returned.
    pub fn post_unbind<M: PoolManager>(
        &self,
        manager: &mut M,
        entitlement: &Entitlement,
    ) -> Result<PoolOperationCallback, ReconcilerError> {
        let mut callback = PoolOperationCallback::new();
        let pool = &entitlement.pool;

        if pool.attribute(attributes::VIRT_LIMIT).is_none()
            && pool.product_attribute(attributes::VIRT_LIMIT).is_none()
        {
            return Ok(callback);
        }

        tracing::debug!(entitlement = %entitlement.id, "Running virt_limit post-unbind");

        let flattened = pool.flattened_attributes();
        let consumer_type = self.consumer_type(&entitlement.consumer)?;
        if self.config.standalone || is_host_limited(&flattened) || !consumer_type.is_manifest() {
            return Ok(callback);
        }

        let Some(subscription_id) = pool.subscription_id.as_deref() else {
            tracing::debug!(pool_id = %pool.id, "Pool has no subscription, no bonus pools to restore");
            return Ok(callback);
        };
        let Some(raw_limit) = flattened.get(attributes::VIRT_LIMIT) else {
            return Ok(callback);
        };

        let siblings = manager
            .pools_by_subscription_id(&pool.owner_id, subscription_id)
            .map_err(|e| ReconcilerError::PoolManager(e.to_string()))?;
        let derived = siblings.iter().filter(|p| p.is_derived());

        match VirtLimit::parse(raw_limit) {
            Some(VirtLimit::Limited(limit)) => {
                let restored = limit.saturating_mul(entitlement.signed_quantity());
                if restored > 0 {
                    for derived_pool in derived {
                        callback.set_quantity_to_pool(derived_pool, derived_pool.quantity.adjusted(restored));
                    }
                }
            }
            Some(VirtLimit::Unlimited) => {
                for derived_pool in derived.filter(|p| p.quantity.is_blocked()) {
                    callback.set_quantity_to_pool(derived_pool, Capacity::Unlimited);
                }
            }
            None => {
                tracing::warn!(
                    pool_id = %pool.id,
                    value = %raw_limit,
                    "Ignoring malformed virt_limit on unbind"
                );
            }
        }

        if !callback.is_empty() {
            tracing::info!(
                "Restoring {} bonus pool quantities after unbinding {}",
                callback.quantity_changes().len(),
                entitlement.id
            );
            callback
                .apply(manager)
                .map_err(|e| ReconcilerError::PoolManager(e.to_string()))?;
        }

        Ok(callback)
    }

    #[allow(clippy::too_many_arguments)]
    fn post_bind_virt_limit<M: PoolManager>(
        &self,
        manager: &M,
        consumer: &Consumer,
        consumer_type: &ConsumerType,
        owner_id: &str,
        binds: &[VirtLimitBind<'_>],
        sub_pools_for_stack_ids: &[Pool],
        is_update: bool,
    ) -> Result<PoolOperationCallback, ReconcilerError> {
        tracing::debug!(consumer = %consumer.uuid, "Running virt_limit post-bind");

        let mut callback = PoolOperationCallback::new();
        let physical_consumer = !consumer_type.is_manifest() && !consumer.is_guest();

        let stacks_with_sub_pools: BTreeSet<&str> = sub_pools_for_stack_ids
            .iter()
            .filter_map(|p| p.source_stack_id.as_deref())
            .collect();
        let mut covered_stacks: BTreeSet<&str> = BTreeSet::new();

        let mut create_for: Vec<&VirtLimitBind<'_>> = Vec::new();
        let mut adjust_for: Vec<&VirtLimitBind<'_>> = Vec::new();

        for bind in binds {
            let creates_pools =
                physical_consumer && (self.config.standalone || bind.is_host_limited()) && !is_update;
            if !creates_pools {
                adjust_for.push(bind);
                continue;
            }

            let stack_id = bind.attribute(attributes::STACKING_ID);
            let uncovered = match stack_id {
                None => true,
                Some(id) => !stacks_with_sub_pools.contains(id) && !covered_stacks.contains(id),
            };
            if !uncovered {
                tracing::debug!(pool_id = %bind.pool_id, "Skipping sub-pool creation, stack already covered");
                continue;
            }
            if let Some(id) = stack_id {
                covered_stacks.insert(id);
            }

            let raw_limit = bind.attribute(attributes::VIRT_LIMIT).unwrap_or_default();
            match VirtLimit::parse(raw_limit) {
                Some(VirtLimit::Unlimited) => create_for.push(bind),
                Some(VirtLimit::Limited(limit)) if limit > 0 => create_for.push(bind),
                Some(VirtLimit::Limited(_)) => {
                    tracing::debug!(pool_id = %bind.pool_id, "Non-positive virt_limit, no sub-pool")
                }
                None => tracing::debug!(
                    pool_id = %bind.pool_id,
                    value = raw_limit,
                    "Malformed virt_limit, no sub-pool"
                ),
            }
        }

        if !create_for.is_empty() {
            tracing::info!("Creating host restricted pools for {} pools", create_for.len());

            let pools: Vec<&Pool> = create_for.iter().map(|b| b.pool()).collect();
            let entitlements: BTreeMap<String, Entitlement> = binds
                .iter()
                .map(|b| (b.pool_id.to_string(), b.entitlement.clone()))
                .collect();
            let attribute_maps: BTreeMap<String, Attributes> = binds
                .iter()
                .map(|b| (b.pool_id.to_string(), b.attributes.clone()))
                .collect();

            let created = manager
                .create_host_restricted_pools(consumer, &pools, &entitlements, &attribute_maps)
                .map_err(|e| ReconcilerError::PoolManager(e.to_string()))?;
            callback.append_callback(created);
        }

        if !adjust_for.is_empty() {
            callback.append_callback(self.adjust_hosted_bonus_pool_quantity(
                manager,
                consumer_type,
                owner_id,
                &adjust_for,
                is_update,
            )?);
        }

        Ok(callback)
    }

    /// Shrink (or block) bonus pools after a manifest consumer exports capacity
    fn adjust_hosted_bonus_pool_quantity<M: PoolManager>(
        &self,
        manager: &M,
        consumer_type: &ConsumerType,
        owner_id: &str,
        binds: &[&VirtLimitBind<'_>],
        is_update: bool,
    ) -> Result<PoolOperationCallback, ReconcilerError> {
        let mut callback = PoolOperationCallback::new();

        if !consumer_type.is_manifest() || self.config.standalone {
            return Ok(callback);
        }

        let subscription_ids: BTreeSet<String> = binds
            .iter()
            .filter_map(|b| b.pool().subscription_id.clone())
            .collect();
        if subscription_ids.is_empty() {
            return Ok(callback);
        }

        let subscription_pools = manager
            .pools_by_subscription_ids(owner_id, &subscription_ids)
            .map_err(|e| ReconcilerError::PoolManager(e.to_string()))?;

        let mut derived_by_subscription: BTreeMap<&str, Vec<&Pool>> = BTreeMap::new();
        for pool in subscription_pools.iter().filter(|p| p.is_derived()) {
            if let Some(subscription_id) = pool.subscription_id.as_deref() {
                derived_by_subscription
                    .entry(subscription_id)
                    .or_default()
                    .push(pool);
            }
        }

        // Current value per derived pool, so several binds in one batch compound
        let mut running: BTreeMap<&str, Capacity> = BTreeMap::new();

        for bind in binds {
            if bind.is_host_limited() {
                continue;
            }
            let pool = bind.pool();
            let Some(derived) = pool
                .subscription_id
                .as_deref()
                .and_then(|s| derived_by_subscription.get(s))
            else {
                tracing::debug!(pool_id = %pool.id, "No bonus pools for subscription");
                continue;
            };

            let raw_limit = bind.attribute(attributes::VIRT_LIMIT).unwrap_or_default();
            match VirtLimit::parse(raw_limit) {
                Some(VirtLimit::Limited(limit)) => {
                    let exported = limit.saturating_mul(bind.pool_quantity.quantity);
                    if exported == 0 {
                        continue;
                    }
                    for derived_pool in derived {
                        let current = running
                            .entry(derived_pool.id.as_str())
                            .or_insert(derived_pool.quantity);
                        *current = current.adjusted(-exported);
                        callback.set_quantity_to_pool(derived_pool, *current);
                    }
                }
                Some(VirtLimit::Unlimited) => {
                    let mut exported = i64::try_from(pool.exported).unwrap_or(i64::MAX);
                    if !is_update {
                        exported = exported.saturating_add(bind.entitlement.signed_quantity());
                    }
                    // Fully exported: block guests instead of leaving the bonus pool unlimited
                    if pool.quantity.to_raw() == exported {
                        for derived_pool in derived {
                            running.insert(derived_pool.id.as_str(), Capacity::Blocked);
                            callback.set_quantity_to_pool(derived_pool, Capacity::Blocked);
                        }
                    }
                }
                None => {
                    tracing::warn!(
                        pool_id = %pool.id,
                        value = raw_limit,
                        "Ignoring malformed virt_limit on hosted bind"
                    );
                }
            }
        }

        if !callback.is_empty() {
            tracing::info!(
                "Adjusted {} bonus pool quantities for {} exported pools",
                callback.quantity_changes().len(),
                binds.len()
            );
        }

        Ok(callback)
    }

    fn consumer_type(&self, consumer: &Consumer) -> Result<ConsumerType, ReconcilerError> {
        self.directory
            .consumer_type(consumer)
            .map_err(|e| ReconcilerError::Directory(e.to_string()))
    }
}

fn is_host_limited(flattened: &Attributes) -> bool {
    flattened.get(attributes::HOST_LIMITED).map(String::as_str) == Some("true")
}
