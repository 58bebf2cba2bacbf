//! Entitlement enforcer - runs the validators over pools

use crate::messages::{ErrorKeys, MessageTranslator, EXPIRED_TEMPLATE};
use crate::rules::{RuleOutcome, RuleSource};
use crate::validator::PoolValidator;
use crate::{
    CallerType, DefaultTranslator, EnforcerConfig, GatekeeperError, ValidationContext,
    ValidationError, ValidationResult,
};
use allot_domain::attributes::{self, is_yes};
use allot_domain::traits::ConsumerDirectory;
use allot_domain::{Clock, Consumer, ConsumerType, Entitlement, Pool, PoolQuantity, SystemClock};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Decides whether consumers may take entitlements from pools
///
/// Every check reports into a [`ValidationResult`]; the enforcer itself only
/// fails when a collaborator does.
///
/// # Examples
///
/// ```
/// use allot_domain::traits::ConsumerDirectory;
/// use allot_domain::{Capacity, Consumer, ConsumerType, FixedClock, Pool};
/// use allot_gatekeeper::Enforcer;
///
/// struct Systems;
///
/// impl ConsumerDirectory for Systems {
///     type Error = String;
///
///     fn consumer_type(&self, _consumer: &Consumer) -> Result<ConsumerType, String> {
///         Ok(ConsumerType::system())
///     }
///
///     fn host(&self, _guest_uuid: &str, _owner_id: &str) -> Result<Option<Consumer>, String> {
///         Ok(None)
///     }
/// }
///
/// let enforcer = Enforcer::new(Systems).with_clock(FixedClock(1_000));
/// let consumer = Consumer::new("c1", "org", "system");
/// let mut pool = Pool::new("p1", "org", "prod", Capacity::Count(1));
/// pool.end_date = 2_000;
///
/// assert!(enforcer.pre_entitlement(&consumer, &pool, 1).unwrap().is_successful());
///
/// pool.consumed = 1;
/// let result = enforcer.pre_entitlement(&consumer, &pool, 1).unwrap();
/// assert!(result.has_error("rulefailed.no.entitlements.available"));
/// ```
pub struct Enforcer<D, C = SystemClock, T = DefaultTranslator> {
    directory: D,
    clock: C,
    translator: T,
    config: EnforcerConfig,
    rule_source: Option<Box<dyn RuleSource>>,
}

impl<D: ConsumerDirectory> Enforcer<D> {
    /// Create an enforcer with the wall clock, untranslated messages and default config
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            clock: SystemClock,
            translator: DefaultTranslator,
            config: EnforcerConfig::default(),
            rule_source: None,
        }
    }
}

impl<D, C, T> Enforcer<D, C, T> {
    /// Replace the time source
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Enforcer<D, C2, T> {
        Enforcer {
            directory: self.directory,
            clock,
            translator: self.translator,
            config: self.config,
            rule_source: self.rule_source,
        }
    }

    /// Replace the message translator
    pub fn with_translator<T2: MessageTranslator>(self, translator: T2) -> Enforcer<D, C, T2> {
        Enforcer {
            directory: self.directory,
            clock: self.clock,
            translator,
            config: self.config,
            rule_source: self.rule_source,
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: EnforcerConfig) -> Self {
        self.config = config;
        self
    }

    /// Install a product rule source
    pub fn with_rule_source(mut self, source: impl RuleSource + 'static) -> Self {
        self.rule_source = Some(Box::new(source));
        self
    }

    /// Active configuration
    pub fn config(&self) -> &EnforcerConfig {
        &self.config
    }
}

impl<D, C, T> Enforcer<D, C, T>
where
    D: ConsumerDirectory,
    C: Clock,
    T: MessageTranslator,
{
    /// Validate one pool for a consumer, caller unknown
    pub fn pre_entitlement(
        &self,
        consumer: &Consumer,
        pool: &Pool,
        quantity: i64,
    ) -> Result<ValidationResult, GatekeeperError> {
        self.pre_entitlement_as(consumer, pool, quantity, CallerType::Unknown)
    }

    /// Validate one pool for a consumer on behalf of `caller`
    pub fn pre_entitlement_as(
        &self,
        consumer: &Consumer,
        pool: &Pool,
        quantity: i64,
        caller: CallerType,
    ) -> Result<ValidationResult, GatekeeperError> {
        let host = self.resolve_host(consumer)?;
        let consumer_type = self.resolve_consumer_type(consumer)?;
        let mut results =
            self.validate_pools(consumer, &consumer_type, host.as_ref(), &[(pool, quantity)], caller)?;
        Ok(results.remove(&pool.id).unwrap_or_default())
    }

    /// Validate a batch of pools, keyed by pool id
    pub fn pre_entitlement_batch(
        &self,
        consumer: &Consumer,
        pool_quantities: &[PoolQuantity],
        caller: CallerType,
    ) -> Result<BTreeMap<String, ValidationResult>, GatekeeperError> {
        let host = self.resolve_host(consumer)?;
        self.pre_entitlement_with_host(consumer, host.as_ref(), pool_quantities, caller)
    }

    /// Validate a batch of pools with an already resolved host
    ///
    /// When a pool id appears more than once the last occurrence wins.
    pub fn pre_entitlement_with_host(
        &self,
        consumer: &Consumer,
        host: Option<&Consumer>,
        pool_quantities: &[PoolQuantity],
        caller: CallerType,
    ) -> Result<BTreeMap<String, ValidationResult>, GatekeeperError> {
        let consumer_type = self.resolve_consumer_type(consumer)?;
        let pools: Vec<(&Pool, i64)> = pool_quantities
            .iter()
            .map(|pq| (&pq.pool, pq.quantity))
            .collect();
        self.validate_pools(consumer, &consumer_type, host, &pools, caller)
    }

    /// Pools the consumer could take one unit of, in input order
    ///
    /// Pools with warnings are kept only when `show_all` is set.
    pub fn filter_pools<'p>(
        &self,
        consumer: &Consumer,
        pools: &'p [Pool],
        show_all: bool,
    ) -> Result<Vec<&'p Pool>, GatekeeperError> {
        let host = self.resolve_host(consumer)?;
        let consumer_type = self.resolve_consumer_type(consumer)?;

        let mut kept = Vec::with_capacity(pools.len());
        for pool in pools {
            let mut result =
                self.run_validators(consumer, &consumer_type, host.as_ref(), pool, 1, CallerType::ListPools)?;
            self.finish_validation(&mut result, pool, 1);

            if result.is_successful() && (!result.has_warnings() || show_all) {
                kept.push(pool);
            } else {
                debug!(
                    pool_id = %pool.id,
                    errors = ?result.errors(),
                    warnings = ?result.warnings(),
                    "Omitting pool due to failed rules"
                );
            }
        }

        Ok(kept)
    }

    /// Validate changing an existing entitlement's quantity by `change`
    pub fn update(
        &self,
        consumer: &Consumer,
        entitlement: &Entitlement,
        change: i64,
    ) -> Result<ValidationResult, GatekeeperError> {
        let consumer_type = self.resolve_consumer_type(consumer)?;
        let mut result = ValidationResult::new();
        let pool = &entitlement.pool;
        let new_quantity = entitlement.signed_quantity().saturating_add(change);

        if !consumer_type.is_manifest() {
            if !is_yes(pool.product_attribute(attributes::MULTI_ENTITLEMENT)) && new_quantity > 1 {
                result.add_error(ErrorKeys::MULTI_ENTITLEMENT_UNSUPPORTED);
            }

            if !consumer.is_guest() {
                if let Some(raw) = pool.product_attribute(attributes::INSTANCE_MULTIPLIER) {
                    match raw.trim().parse::<i64>() {
                        Ok(multiplier) if multiplier > 0 => {
                            if new_quantity % multiplier != 0 {
                                result.add_error(
                                    ValidationError::new(ErrorKeys::QUANTITY_MISMATCH)
                                        .with_args([multiplier, new_quantity]),
                                );
                            }
                        }
                        _ => warn!(
                            pool_id = %pool.id,
                            value = raw,
                            "Ignoring malformed instance multiplier"
                        ),
                    }
                }
            }
        }

        self.finish_validation(&mut result, pool, change);
        Ok(result)
    }

    /// Universal post-checks: capacity, then expiration
    pub fn finish_validation(&self, result: &mut ValidationResult, pool: &Pool, quantity: i64) {
        if !pool.entitlements_available(quantity) {
            result.add_error(ErrorKeys::NO_ENTITLEMENTS_AVAILABLE);
        }

        if pool.is_expired(self.clock.now()) {
            let args = [pool.product_id.clone(), pool.end_date.to_string()];
            let message = self
                .translator
                .translate(ErrorKeys::POOL_EXPIRED, EXPIRED_TEMPLATE, &args);
            result.add_error(
                ValidationError::new(ErrorKeys::POOL_EXPIRED)
                    .with_args(args)
                    .with_message(message),
            );
        }
    }

    /// Run every applicable validator, then the product rule, for one pool
    ///
    /// Does not include the universal post-checks.
    pub fn run_validators(
        &self,
        consumer: &Consumer,
        consumer_type: &ConsumerType,
        host: Option<&Consumer>,
        pool: &Pool,
        quantity: i64,
        caller: CallerType,
    ) -> Result<ValidationResult, GatekeeperError> {
        let context = ValidationContext::builder()
            .caller(caller)
            .consumer(consumer)
            .consumer_type(consumer_type)
            .pool(pool)
            .quantity(quantity)
            .host(host)
            .build()?;

        let mut result = ValidationResult::new();
        for validator in PoolValidator::ALL {
            if validator.applies_to(pool) {
                validator.validate(&context, &self.config, &mut result);
            }
        }

        if self.config.run_product_rules {
            if let Some(source) = &self.rule_source {
                let outcome = source
                    .evaluate(&pool.product_id, &context, &mut result)
                    .map_err(|e| GatekeeperError::RuleExecution {
                        label: pool.product_id.clone(),
                        message: e.to_string(),
                    })?;
                if outcome == RuleOutcome::NoRule {
                    debug!(product_id = %pool.product_id, "No product rule registered");
                }
            }
        }

        Ok(result)
    }

    fn validate_pools(
        &self,
        consumer: &Consumer,
        consumer_type: &ConsumerType,
        host: Option<&Consumer>,
        pools: &[(&Pool, i64)],
        caller: CallerType,
    ) -> Result<BTreeMap<String, ValidationResult>, GatekeeperError> {
        let mut results = BTreeMap::new();
        for (pool, quantity) in pools {
            let result = self.run_validators(consumer, consumer_type, host, pool, *quantity, caller)?;
            results.insert(pool.id.clone(), result);
        }

        // Walk backwards so a repeated pool id is finished with its last quantity
        let mut finished = BTreeSet::new();
        for (pool, quantity) in pools.iter().rev() {
            if !finished.insert(pool.id.as_str()) {
                continue;
            }
            let result = results.entry(pool.id.clone()).or_insert_with(|| {
                info!(pool_id = %pool.id, "No result returned for pool");
                ValidationResult::new()
            });
            self.finish_validation(result, pool, *quantity);
        }

        Ok(results)
    }

    fn resolve_host(&self, consumer: &Consumer) -> Result<Option<Consumer>, GatekeeperError> {
        match consumer.virt_uuid() {
            Some(virt_uuid) => self
                .directory
                .host(virt_uuid, &consumer.owner_id)
                .map_err(|e| GatekeeperError::Directory(e.to_string())),
            None => Ok(None),
        }
    }

    fn resolve_consumer_type(&self, consumer: &Consumer) -> Result<ConsumerType, GatekeeperError> {
        self.directory
            .consumer_type(consumer)
            .map_err(|e| GatekeeperError::Directory(e.to_string()))
    }
}
