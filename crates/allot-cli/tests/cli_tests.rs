//! Integration tests for allot-cli

use allot_cli::cli::{BindArgs, CallerArg, FilterArgs, UnbindArgs, ValidateArgs};
use allot_cli::commands::bind::run_bind;
use allot_cli::commands::filter::run_filter;
use allot_cli::commands::unbind::run_unbind;
use allot_cli::commands::validate::run_validate;
use allot_cli::commands::execute_bind;
use allot_cli::config::OutputFormat;
use allot_cli::{CliError, Config, Formatter, MemoryStore, Scenario};
use allot_domain::Capacity;
use allot_gatekeeper::ErrorKeys;

const HOSTED: &str = include_str!("../scenarios/hosted.toml");

fn store() -> MemoryStore {
    MemoryStore::from_scenario(Scenario::from_toml(HOSTED).unwrap()).unwrap()
}

fn bind_args(consumer: &str, pool: &str, quantity: u64) -> BindArgs {
    BindArgs {
        consumer: consumer.to_string(),
        pool: pool.to_string(),
        quantity,
        write: false,
    }
}

fn filter_ids(store: &MemoryStore, consumer: &str, show_all: bool) -> Vec<String> {
    let args = FilterArgs {
        consumer: consumer.to_string(),
        show_all,
    };
    run_filter(&args, store, &Config::default())
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect()
}

#[test]
fn test_distributor_export_shrinks_and_unbind_restores_bonus_pool() {
    let mut store = store();
    let config = Config::default();

    let outcome = run_bind(&bind_args("dist-1", "rhel-physical", 3), &mut store, &config).unwrap();
    let entitlement = outcome.entitlement.expect("bind should pass the rules");
    assert_eq!(entitlement.id, "ent-1");
    assert_eq!(
        outcome.callback.final_quantities().get("rhel-bonus"),
        Some(&Capacity::Count(28))
    );
    assert_eq!(store.pool("rhel-bonus").unwrap().quantity, Capacity::Count(28));
    assert_eq!(store.pool("rhel-physical").unwrap().consumed, 3);
    assert_eq!(store.pool("rhel-physical").unwrap().exported, 3);

    let args = UnbindArgs {
        entitlement: entitlement.id.clone(),
        write: false,
    };
    let (_, callback) = run_unbind(&args, &mut store, &config).unwrap();
    assert_eq!(callback.final_quantities().get("rhel-bonus"), Some(&Capacity::Count(40)));
    assert_eq!(store.pool("rhel-bonus").unwrap().quantity, Capacity::Count(40));
    assert_eq!(store.pool("rhel-physical").unwrap().consumed, 0);
    assert_eq!(store.pool("rhel-physical").unwrap().exported, 0);
}

#[test]
fn test_standalone_distributor_leaves_bonus_pool_alone() {
    let mut store = store();
    let config = Config::from_toml("[reconciler]\nstandalone = true\n").unwrap();

    let outcome = run_bind(&bind_args("dist-1", "rhel-physical", 3), &mut store, &config).unwrap();
    assert!(outcome.entitlement.is_some());
    assert!(outcome.callback.is_empty());
    assert_eq!(store.pool("rhel-bonus").unwrap().quantity, Capacity::Count(40));
}

#[test]
fn test_hypervisor_bind_creates_host_restricted_pool_once_per_stack() {
    let mut store = store();
    let config = Config::default();

    let outcome = run_bind(&bind_args("hv-1", "rhel-datacenter", 1), &mut store, &config).unwrap();
    let created = outcome.callback.pools_to_create();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].id, "rhel-datacenter-hv-1-ent-1");

    let sub_pool = store.pool("rhel-datacenter-hv-1-ent-1").unwrap();
    assert_eq!(sub_pool.quantity, Capacity::Unlimited);
    assert_eq!(sub_pool.source_stack_id.as_deref(), Some("rhel-dc-stack"));

    let again = run_bind(&bind_args("hv-1", "rhel-datacenter", 1), &mut store, &config).unwrap();
    assert!(again.entitlement.is_some());
    assert!(again.callback.pools_to_create().is_empty());
    assert_eq!(store.pool("rhel-datacenter").unwrap().consumed, 2);
}

#[test]
fn test_only_guests_of_the_host_may_use_its_pool() {
    let mut store = store();
    let config = Config::default();
    run_bind(&bind_args("hv-1", "rhel-datacenter", 1), &mut store, &config).unwrap();

    let validate = |consumer: &str| ValidateArgs {
        consumer: consumer.to_string(),
        pool: "rhel-datacenter-hv-1-ent-1".to_string(),
        quantity: 1,
        caller: CallerArg::Bind,
    };

    let mapped = run_validate(&validate("guest-1"), &store, &config).unwrap();
    assert!(mapped.is_successful());

    let orphan = run_validate(&validate("guest-2"), &store, &config).unwrap();
    assert!(orphan.has_error(ErrorKeys::HOST_MISMATCH));

    assert!(filter_ids(&store, "guest-1", false).contains(&"rhel-datacenter-hv-1-ent-1".to_string()));
}

#[test]
fn test_rejected_bind_leaves_store_untouched() {
    let mut store = store();

    let outcome = run_bind(&bind_args("hv-1", "rhel-bonus", 1), &mut store, &Config::default()).unwrap();
    assert!(outcome.entitlement.is_none());
    assert!(outcome.result.has_error(ErrorKeys::VIRT_ONLY));
    assert_eq!(store.pool("rhel-bonus").unwrap().consumed, 0);
    assert!(store.entitlement("ent-1").is_err());
}

#[test]
fn test_filter_per_consumer() {
    let store = store();

    assert_eq!(
        filter_ids(&store, "hv-1", false),
        vec!["rhel-datacenter", "rhel-physical"]
    );
    assert_eq!(
        filter_ids(&store, "hv-1", true),
        vec!["rhel-bonus", "rhel-datacenter", "rhel-physical"]
    );

    let orphan = filter_ids(&store, "guest-2", false);
    assert!(orphan.contains(&"unmapped-trial".to_string()));
    assert!(!orphan.contains(&"expired-dev".to_string()));

    assert!(!filter_ids(&store, "guest-1", false).contains(&"unmapped-trial".to_string()));
}

#[test]
fn test_expired_pool_reports_end_date() {
    let store = store();
    let args = ValidateArgs {
        consumer: "hv-1".to_string(),
        pool: "expired-dev".to_string(),
        quantity: 1,
        caller: CallerArg::Unknown,
    };

    let result = run_validate(&args, &store, &Config::default()).unwrap();
    let expired = result
        .errors()
        .iter()
        .find(|e| e.key == ErrorKeys::POOL_EXPIRED)
        .expect("expired error");
    assert_eq!(expired.args, vec!["rhel-dev".to_string(), "1600000000".to_string()]);
}

#[test]
fn test_unknown_consumer() {
    let store = store();
    let args = ValidateArgs {
        consumer: "nobody".to_string(),
        pool: "rhel-physical".to_string(),
        quantity: 1,
        caller: CallerArg::Unknown,
    };

    let result = run_validate(&args, &store, &Config::default());
    assert!(matches!(result, Err(CliError::NotFound { kind: "Consumer", .. })));
}

#[test]
fn test_bind_writes_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenario.toml");
    std::fs::write(&path, HOSTED).unwrap();

    let mut store = MemoryStore::from_scenario(Scenario::load(&path).unwrap()).unwrap();
    let formatter = Formatter::new(OutputFormat::Json, false);
    let mut args = bind_args("dist-1", "rhel-physical", 2);
    args.write = true;

    execute_bind(args, &mut store, &Config::default(), &formatter, &path).unwrap();

    let saved = MemoryStore::from_scenario(Scenario::load(&path).unwrap()).unwrap();
    assert_eq!(saved.entitlement("ent-1").unwrap().quantity, 2);
    assert_eq!(saved.pool("rhel-bonus").unwrap().quantity, Capacity::Count(32));
    assert_eq!(saved.now(), 1_700_000_000);
}

#[test]
fn test_rejected_bind_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenario.toml");
    let mut store = store();
    let formatter = Formatter::new(OutputFormat::Table, false);

    let result = execute_bind(
        bind_args("dist-1", "rhel-bonus", 1),
        &mut store,
        &Config::default(),
        &formatter,
        &path,
    );
    assert!(matches!(result, Err(CliError::Rejected(pool)) if pool == "rhel-bonus"));
    assert!(!path.exists());
}

#[test]
fn test_repeated_standalone_host_bind_creates_a_pool_each_time() {
    let mut store = store();
    let config = Config::from_toml("[reconciler]\nstandalone = true\n").unwrap();

    let first = run_bind(&bind_args("hv-1", "rhel-physical", 1), &mut store, &config).unwrap();
    let second = run_bind(&bind_args("hv-1", "rhel-physical", 1), &mut store, &config).unwrap();

    assert_eq!(second.entitlement.map(|e| e.id), Some("ent-2".to_string()));
    assert_eq!(first.callback.pools_to_create()[0].id, "rhel-physical-hv-1-ent-1");
    assert_eq!(second.callback.pools_to_create()[0].id, "rhel-physical-hv-1-ent-2");
    assert_eq!(store.pool("rhel-physical-hv-1-ent-2").unwrap().quantity, Capacity::Count(4));
    assert_eq!(store.pool("rhel-physical").unwrap().consumed, 2);
}
