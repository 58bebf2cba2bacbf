//! Attribute-keyed pool validators
//!
//! The set is closed: every validator is a variant of [`PoolValidator`] and
//! [`PoolValidator::ALL`] fixes the order they run in. A validator runs when
//! the pool (or its product) carries its attribute key; [`PoolValidator::Global`]
//! has no key and always runs.

use crate::messages::{ErrorKeys, WarningKeys};
use crate::{CallerType, EnforcerConfig, ValidationContext, ValidationError, ValidationResult};
use allot_domain::attributes::{self, facts, is_affirmative, is_yes};
use allot_domain::Pool;
use tracing::warn;

const KIB_PER_GIB: u64 = 1024 * 1024;

/// One compiled validation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolValidator {
    /// Checks that apply to every pool
    Global,
    /// Restricts the pool to listed consumer types
    RequiresConsumerType,
    /// Restricts the pool to one consumer
    RequiresConsumer,
    /// Restricts the pool to guests of one host
    RequiresHost,
    /// Restricts the pool to guests
    VirtOnly,
    /// Restricts the pool to physical consumers
    PhysicalOnly,
    /// Restricts the pool to guests whose host is unknown
    UnmappedGuestsOnly,
    /// Requires quantities in multiples of the instance multiplier
    InstanceMultiplier,
    /// Warns on unsupported architectures
    Architecture,
    /// Warns when the consumer has more sockets than covered
    Sockets,
    /// Warns when the consumer has more cores than covered
    Cores,
    /// Warns when the consumer has more RAM than covered
    Ram,
}

impl PoolValidator {
    /// Every validator, in the order they run
    pub const ALL: [PoolValidator; 12] = [
        PoolValidator::Global,
        PoolValidator::RequiresConsumerType,
        PoolValidator::RequiresConsumer,
        PoolValidator::RequiresHost,
        PoolValidator::VirtOnly,
        PoolValidator::PhysicalOnly,
        PoolValidator::UnmappedGuestsOnly,
        PoolValidator::InstanceMultiplier,
        PoolValidator::Architecture,
        PoolValidator::Sockets,
        PoolValidator::Cores,
        PoolValidator::Ram,
    ];

    /// Attribute key that triggers this validator; `None` for [`PoolValidator::Global`]
    pub fn attribute_key(&self) -> Option<&'static str> {
        match self {
            PoolValidator::Global => None,
            PoolValidator::RequiresConsumerType => Some(attributes::REQUIRES_CONSUMER_TYPE),
            PoolValidator::RequiresConsumer => Some(attributes::REQUIRES_CONSUMER),
            PoolValidator::RequiresHost => Some(attributes::REQUIRES_HOST),
            PoolValidator::VirtOnly => Some(attributes::VIRT_ONLY),
            PoolValidator::PhysicalOnly => Some(attributes::PHYSICAL_ONLY),
            PoolValidator::UnmappedGuestsOnly => Some(attributes::UNMAPPED_GUESTS_ONLY),
            PoolValidator::InstanceMultiplier => Some(attributes::INSTANCE_MULTIPLIER),
            PoolValidator::Architecture => Some(attributes::ARCHITECTURE),
            PoolValidator::Sockets => Some(attributes::SOCKETS),
            PoolValidator::Cores => Some(attributes::CORES),
            PoolValidator::Ram => Some(attributes::RAM),
        }
    }

    /// Whether this validator runs for `pool`
    pub fn applies_to(&self, pool: &Pool) -> bool {
        match self.attribute_key() {
            None => true,
            Some(key) => pool.has_merged_attribute(key),
        }
    }

    /// Run the rule, appending findings to `result`
    pub fn validate(
        &self,
        context: &ValidationContext<'_>,
        config: &EnforcerConfig,
        result: &mut ValidationResult,
    ) {
        match self {
            PoolValidator::Global => global(context, result),
            PoolValidator::RequiresConsumerType => requires_consumer_type(context, result),
            PoolValidator::RequiresConsumer => requires_consumer(context, result),
            PoolValidator::RequiresHost => requires_host(context, result),
            PoolValidator::VirtOnly => virt_only(context, config, result),
            PoolValidator::PhysicalOnly => physical_only(context, config, result),
            PoolValidator::UnmappedGuestsOnly => unmapped_guests_only(context, result),
            PoolValidator::InstanceMultiplier => instance_multiplier(context, result),
            PoolValidator::Architecture => architecture(context, result),
            PoolValidator::Sockets => sockets(context, result),
            PoolValidator::Cores => cores(context, result),
            PoolValidator::Ram => ram(context, result),
        }
    }
}

fn global(context: &ValidationContext<'_>, result: &mut ValidationResult) {
    let pool = context.pool();

    if context.is_manifest() && pool.is_derived() {
        result.add_error(ErrorKeys::POOL_NOT_AVAILABLE_TO_MANIFEST);
    }

    if !context.is_manifest()
        && context.quantity() > 1
        && !is_yes(pool.merged_attribute(attributes::MULTI_ENTITLEMENT))
    {
        result.add_error(ErrorKeys::MULTI_ENTITLEMENT_UNSUPPORTED);
    }

    if pool.owner_id != context.consumer().owner_id {
        result.add_error(ErrorKeys::OWNER_MISMATCH);
    }
}

fn requires_consumer_type(context: &ValidationContext<'_>, result: &mut ValidationResult) {
    let Some(required) = context.pool().merged_attribute(attributes::REQUIRES_CONSUMER_TYPE) else {
        return;
    };
    let labels: Vec<&str> = split_list(required).collect();

    let label = context.consumer_type().label.as_str();
    if labels.contains(&label) {
        return;
    }
    // Manifest consumers may carry anything not meant for a person
    if context.is_manifest() && !labels.contains(&"person") {
        return;
    }
    result.add_error(ErrorKeys::CONSUMER_TYPE_MISMATCH);
}

fn requires_consumer(context: &ValidationContext<'_>, result: &mut ValidationResult) {
    let Some(required) = context.pool().merged_attribute(attributes::REQUIRES_CONSUMER) else {
        return;
    };
    if context.consumer().uuid != required {
        result.add_error(ErrorKeys::CONSUMER_MISMATCH);
    }
}

fn requires_host(context: &ValidationContext<'_>, result: &mut ValidationResult) {
    let Some(required) = context.pool().merged_attribute(attributes::REQUIRES_HOST) else {
        return;
    };

    if context.is_manifest() {
        result.add_error(ErrorKeys::POOL_NOT_AVAILABLE_TO_MANIFEST);
        return;
    }

    let host_matches = context.consumer().is_guest()
        && context.host().is_some_and(|host| host.uuid == required);
    if !host_matches {
        result.add_error(ErrorKeys::HOST_MISMATCH);
    }
}

fn virt_only(context: &ValidationContext<'_>, config: &EnforcerConfig, result: &mut ValidationResult) {
    if !is_affirmative(context.pool().merged_attribute(attributes::VIRT_ONLY)) {
        return;
    }
    if context.is_manifest() || context.consumer().is_guest() {
        return;
    }

    if lenient(context, config) {
        result.add_warning(WarningKeys::VIRT_ONLY);
    } else {
        result.add_error(ErrorKeys::VIRT_ONLY);
    }
}

fn physical_only(
    context: &ValidationContext<'_>,
    config: &EnforcerConfig,
    result: &mut ValidationResult,
) {
    if !is_affirmative(context.pool().merged_attribute(attributes::PHYSICAL_ONLY)) {
        return;
    }
    if !context.consumer().is_guest() {
        return;
    }

    if lenient(context, config) {
        result.add_warning(WarningKeys::PHYSICAL_ONLY);
    } else {
        result.add_error(ErrorKeys::PHYSICAL_ONLY);
    }
}

fn unmapped_guests_only(context: &ValidationContext<'_>, result: &mut ValidationResult) {
    if !is_affirmative(context.pool().merged_attribute(attributes::UNMAPPED_GUESTS_ONLY)) {
        return;
    }

    if !context.consumer().is_guest() {
        result.add_error(ErrorKeys::VIRT_ONLY);
    } else if context.host().is_some() {
        result.add_error(ErrorKeys::UNMAPPED_GUEST_HAS_HOST);
    }
}

fn instance_multiplier(context: &ValidationContext<'_>, result: &mut ValidationResult) {
    if context.is_manifest()
        || context.consumer().is_guest()
        || context.caller() == CallerType::ListPools
    {
        return;
    }
    let Some(raw) = context.pool().merged_attribute(attributes::INSTANCE_MULTIPLIER) else {
        return;
    };

    let multiplier = match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => n,
        _ => {
            warn!(
                pool_id = %context.pool().id,
                value = raw,
                "Ignoring malformed instance multiplier"
            );
            return;
        }
    };

    if context.quantity() % multiplier != 0 {
        result.add_error(
            ValidationError::new(ErrorKeys::QUANTITY_MISMATCH)
                .with_args([multiplier, context.quantity()]),
        );
    }
}

fn architecture(context: &ValidationContext<'_>, result: &mut ValidationResult) {
    if context.is_manifest() {
        return;
    }
    let Some(supported) = context.pool().merged_attribute(attributes::ARCHITECTURE) else {
        return;
    };
    let Some(arch) = context.consumer().fact(facts::ARCHITECTURE) else {
        return;
    };

    if !split_list(supported).any(|candidate| arch_matches(candidate, arch)) {
        result.add_warning(WarningKeys::ARCHITECTURE_MISMATCH);
    }
}

fn arch_matches(supported: &str, arch: &str) -> bool {
    if supported.eq_ignore_ascii_case("ALL") || supported.eq_ignore_ascii_case(arch) {
        return true;
    }
    supported.eq_ignore_ascii_case("x86") && matches!(arch, "i386" | "i586" | "i686")
}

fn sockets(context: &ValidationContext<'_>, result: &mut ValidationResult) {
    let consumer_sockets = fact_number(context, facts::SOCKETS);
    check_limit(context, attributes::SOCKETS, consumer_sockets, WarningKeys::UNSUPPORTED_SOCKETS, result);
}

fn cores(context: &ValidationContext<'_>, result: &mut ValidationResult) {
    let consumer_cores = fact_number(context, facts::SOCKETS)
        .zip(fact_number(context, facts::CORES_PER_SOCKET))
        .map(|(sockets, per_socket)| sockets.saturating_mul(per_socket));
    check_limit(context, attributes::CORES, consumer_cores, WarningKeys::UNSUPPORTED_CORES, result);
}

fn ram(context: &ValidationContext<'_>, result: &mut ValidationResult) {
    let consumer_gib = fact_number(context, facts::MEMORY_TOTAL)
        .map(|kib| kib.saturating_add(KIB_PER_GIB / 2) / KIB_PER_GIB);
    check_limit(context, attributes::RAM, consumer_gib, WarningKeys::UNSUPPORTED_RAM, result);
}

/// Shared body of the socket/core/RAM coverage checks
fn check_limit(
    context: &ValidationContext<'_>,
    key: &str,
    consumer_value: Option<u64>,
    warning: &str,
    result: &mut ValidationResult,
) {
    let pool = context.pool();
    if context.is_manifest() || pool.has_merged_attribute(attributes::STACKING_ID) {
        return;
    }
    let Some(consumer_value) = consumer_value else {
        return;
    };
    let Some(limit) = pool
        .merged_attribute(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
    else {
        return;
    };

    if consumer_value > limit {
        result.add_warning(warning);
    }
}

fn fact_number(context: &ValidationContext<'_>, key: &str) -> Option<u64> {
    context
        .consumer()
        .fact(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn lenient(context: &ValidationContext<'_>, config: &EnforcerConfig) -> bool {
    config.lenient_listing && context.caller() == CallerType::ListPools
}
