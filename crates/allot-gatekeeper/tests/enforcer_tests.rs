//! Integration tests for allot-gatekeeper
//!
//! These tests drive the enforcer end to end through its public API.

use allot_domain::traits::ConsumerDirectory;
use allot_domain::{Capacity, Consumer, ConsumerType, Entitlement, FixedClock, Pool, PoolQuantity};
use allot_gatekeeper::{
    CallerType, Enforcer, EnforcerConfig, ErrorKeys, GatekeeperError, PoolValidator,
    ProductRuleTable, RuleError, ValidationContext, ValidationResult, WarningKeys,
};

const NOW: u64 = 1_700_000_000;

struct Directory;

impl ConsumerDirectory for Directory {
    type Error = String;

    fn consumer_type(&self, consumer: &Consumer) -> Result<ConsumerType, String> {
        match consumer.type_label.as_str() {
            "system" => Ok(ConsumerType::system()),
            "person" => Ok(ConsumerType::person()),
            "candlepin" => Ok(ConsumerType::manifest("candlepin")),
            other => Err(format!("unknown consumer type {}", other)),
        }
    }

    fn host(&self, _guest_uuid: &str, _owner_id: &str) -> Result<Option<Consumer>, String> {
        Ok(None)
    }
}

fn enforcer() -> Enforcer<Directory, FixedClock> {
    Enforcer::new(Directory).with_clock(FixedClock(NOW))
}

fn pool(id: &str, quantity: u64) -> Pool {
    let mut pool = Pool::new(id, "org", "awesomeos", Capacity::count(quantity));
    pool.end_date = NOW + 86_400;
    pool
}

fn system() -> Consumer {
    Consumer::new("c1", "org", "system")
}

#[test]
fn test_validators_without_their_key_never_report() {
    let bare = pool("p1", 10);
    let manifest_type = ConsumerType::manifest("candlepin");
    let system_type = ConsumerType::system();
    let guest = Consumer::new("guest", "org", "system")
        .with_fact("virt.is_guest", "true")
        .with_fact("cpu.cpu_socket(s)", "64")
        .with_fact("memory.memtotal", "999999999")
        .with_fact("uname.machine", "s390x");
    let distributor = Consumer::new("dist", "org", "candlepin");

    let cases: [(&Consumer, &ConsumerType); 3] = [
        (&guest, &system_type),
        (&distributor, &manifest_type),
        (&guest, &manifest_type),
    ];

    for (consumer, consumer_type) in cases {
        for caller in [CallerType::Bind, CallerType::ListPools, CallerType::Unknown] {
            let context = ValidationContext::builder()
                .caller(caller)
                .consumer(consumer)
                .consumer_type(consumer_type)
                .pool(&bare)
                .quantity(7)
                .build()
                .unwrap();

            for validator in PoolValidator::ALL.iter().filter(|v| **v != PoolValidator::Global) {
                assert!(!validator.applies_to(&bare));

                let mut result = ValidationResult::new();
                validator.validate(&context, &EnforcerConfig::default(), &mut result);
                assert!(
                    !result.has_errors() && !result.has_warnings(),
                    "{:?} reported {:?}",
                    validator,
                    result
                );
            }
        }
    }
}

#[test]
fn test_global_validator_always_runs() {
    let foreign = Consumer::new("c1", "other-org", "system");
    let result = enforcer().pre_entitlement(&foreign, &pool("p1", 10), 1).unwrap();
    assert!(result.has_error(ErrorKeys::OWNER_MISMATCH));
}

#[test]
fn test_exactly_one_capacity_error() {
    let mut full = pool("p1", 2)
        .with_product_attribute("instance_multiplier", "2")
        .with_product_attribute("virt_only", "true");
    full.consumed = 2;

    let result = enforcer()
        .pre_entitlement_as(&system(), &full, 3, CallerType::Bind)
        .unwrap();

    let capacity_errors = result
        .errors()
        .iter()
        .filter(|e| e.key == ErrorKeys::NO_ENTITLEMENTS_AVAILABLE)
        .count();
    assert_eq!(capacity_errors, 1);
    assert!(result.has_error(ErrorKeys::QUANTITY_MISMATCH));
    assert!(result.has_error(ErrorKeys::VIRT_ONLY));
}

#[test]
fn test_expired_and_exhausted_both_reported() {
    let mut stale = pool("p1", 1);
    stale.consumed = 1;
    stale.end_date = NOW - 1;

    let result = enforcer().pre_entitlement(&system(), &stale, 1).unwrap();

    assert!(result.has_error(ErrorKeys::NO_ENTITLEMENTS_AVAILABLE));
    let expired = result
        .errors()
        .iter()
        .find(|e| e.key == ErrorKeys::POOL_EXPIRED)
        .expect("expiration error");
    assert_eq!(expired.args, vec!["awesomeos".to_string(), (NOW - 1).to_string()]);
    let message = expired.message.as_deref().unwrap();
    assert!(message.contains("\"awesomeos\""));
    assert!(message.ends_with(&(NOW - 1).to_string()));
}

#[test]
fn test_filter_pools_respects_show_all() {
    let consumer = system().with_fact("uname.machine", "aarch64");
    let clean = pool("P1", 5);
    let warned = pool("P2", 5).with_product_attribute("arch", "x86_64");
    let mut failed = pool("P3", 5);
    failed.owner_id = "other-org".to_string();
    let pools = vec![clean, warned, failed];

    let visible = enforcer().filter_pools(&consumer, &pools, false).unwrap();
    let ids: Vec<&str> = visible.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["P1"]);

    let all = enforcer().filter_pools(&consumer, &pools, true).unwrap();
    let ids: Vec<&str> = all.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["P1", "P2"]);
}

#[test]
fn test_filter_pools_lists_virt_only_as_warning() {
    let virt = pool("virt", 5).with_product_attribute("virt_only", "true");
    let pools = vec![virt];

    assert!(enforcer().filter_pools(&system(), &pools, false).unwrap().is_empty());
    assert_eq!(enforcer().filter_pools(&system(), &pools, true).unwrap().len(), 1);

    let strict = enforcer().with_config(EnforcerConfig::strict());
    assert!(strict.filter_pools(&system(), &pools, true).unwrap().is_empty());
}

#[test]
fn test_update_instance_multiplier() {
    let multiplied = pool("p1", 100)
        .with_product_attribute("instance_multiplier", "3")
        .with_product_attribute("multi-entitlement", "yes");
    let entitlement = Entitlement::new("e1", system(), multiplied, 3).unwrap();

    let uneven = enforcer().update(&system(), &entitlement, 2).unwrap();
    assert!(uneven.has_error(ErrorKeys::QUANTITY_MISMATCH));

    let even = enforcer().update(&system(), &entitlement, 3).unwrap();
    assert!(!even.has_error(ErrorKeys::QUANTITY_MISMATCH));
    assert!(even.is_successful());
}

#[test]
fn test_multi_entitlement_true_is_not_yes() {
    let flagged = pool("p1", 10).with_product_attribute("multi-entitlement", "true");
    let entitlement = Entitlement::new("e1", system(), flagged.clone(), 1).unwrap();

    let grown = enforcer().update(&system(), &entitlement, 1).unwrap();
    assert!(grown.has_error(ErrorKeys::MULTI_ENTITLEMENT_UNSUPPORTED));

    let fresh = enforcer().pre_entitlement(&system(), &flagged, 2).unwrap();
    assert!(fresh.has_error(ErrorKeys::MULTI_ENTITLEMENT_UNSUPPORTED));
}

#[test]
fn test_update_checks_capacity_of_change() {
    let mut nearly_full = pool("p1", 10).with_product_attribute("multi-entitlement", "yes");
    nearly_full.consumed = 9;
    let entitlement = Entitlement::new("e1", system(), nearly_full, 2).unwrap();

    let result = enforcer().update(&system(), &entitlement, 2).unwrap();
    assert!(result.has_error(ErrorKeys::NO_ENTITLEMENTS_AVAILABLE));

    let shrink = enforcer().update(&system(), &entitlement, -1).unwrap();
    assert!(shrink.is_successful());
}

#[test]
fn test_batch_keys_results_by_pool_id() {
    let batch = vec![
        PoolQuantity::new(pool("a", 5), 1),
        PoolQuantity::new(pool("b", 0), 1),
    ];

    let results = enforcer()
        .pre_entitlement_batch(&system(), &batch, CallerType::Bind)
        .unwrap();

    assert!(results["a"].is_successful());
    assert!(results["b"].has_error(ErrorKeys::NO_ENTITLEMENTS_AVAILABLE));
}

#[test]
fn test_product_rules_run_after_validators() {
    let table = ProductRuleTable::new().with_rule("awesomeos", |context, result| {
        if context.consumer().fact("lscpu.model").is_none() {
            result.add_warning("rulewarning.missing.cpu.model");
        }
        Ok(())
    });
    let enforcer = enforcer().with_rule_source(table);

    let result = enforcer.pre_entitlement(&system(), &pool("p1", 5), 1).unwrap();
    assert!(result.is_successful());
    assert!(result.has_warning("rulewarning.missing.cpu.model"));

    // No rule for this product is fine
    let mut other = pool("p2", 5);
    other.product_id = "unknown".to_string();
    let result = enforcer.pre_entitlement(&system(), &other, 1).unwrap();
    assert!(!result.has_warnings());
}

#[test]
fn test_product_rules_can_be_disabled() {
    let table = ProductRuleTable::new().with_rule("awesomeos", |_, result| {
        result.add_error("rulefailed.custom");
        Ok(())
    });
    let config = EnforcerConfig {
        run_product_rules: false,
        ..EnforcerConfig::default()
    };
    let enforcer = enforcer().with_rule_source(table).with_config(config);

    let result = enforcer.pre_entitlement(&system(), &pool("p1", 5), 1).unwrap();
    assert!(result.is_successful());
}

#[test]
fn test_product_rule_failure_aborts() {
    let table = ProductRuleTable::new()
        .with_rule("awesomeos", |_, _| Err(RuleError("bad script".to_string())));
    let enforcer = enforcer().with_rule_source(table);

    match enforcer.pre_entitlement(&system(), &pool("p1", 5), 1) {
        Err(GatekeeperError::RuleExecution { label, message }) => {
            assert_eq!(label, "awesomeos");
            assert_eq!(message, "bad script");
        }
        other => panic!("Expected RuleExecution, got {:?}", other),
    }
}

#[test]
fn test_manifest_consumer_may_take_several_units() {
    let distributor = Consumer::new("dist", "org", "candlepin");
    let result = enforcer().pre_entitlement(&distributor, &pool("p1", 10), 4).unwrap();
    assert!(result.is_successful());

    let person_only = pool("p2", 10).with_product_attribute("requires_consumer_type", "person");
    let result = enforcer().pre_entitlement(&distributor, &person_only, 1).unwrap();
    assert!(result.has_error(ErrorKeys::CONSUMER_TYPE_MISMATCH));
}

#[test]
fn test_unknown_consumer_type_is_directory_error() {
    let odd = Consumer::new("c1", "org", "toaster");
    let result = enforcer().pre_entitlement(&odd, &pool("p1", 1), 1);
    assert!(matches!(result, Err(GatekeeperError::Directory(_))));
}

#[test]
fn test_physical_only_warning_when_listing() {
    let guest = system().with_fact("virt.is_guest", "true");
    let physical = pool("p1", 5).with_attribute("physical_only", "true");

    let result = enforcer()
        .pre_entitlement_as(&guest, &physical, 1, CallerType::ListPools)
        .unwrap();
    assert!(result.is_successful());
    assert!(result.has_warning(WarningKeys::PHYSICAL_ONLY));
}
