//! Scenario files and the in-memory store built from them.
//!
//! A scenario is a TOML snapshot of one organisation: consumer types,
//! consumers, which host runs which guests, pools and existing entitlements.
//! [`MemoryStore`] serves it to the rule engines through the domain traits.

use crate::error::{CliError, Result};
use allot_domain::attributes::{self, Attributes};
use allot_domain::traits::{Clock, ConsumerDirectory, PoolManager, PoolWriter};
use allot_domain::{
    Capacity, Consumer, ConsumerType, Entitlement, Pool, PoolOperationCallback, SystemClock,
    VirtLimit,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Contents of a scenario file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    /// Evaluation time (seconds since the Unix epoch); wall clock when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub now: Option<u64>,

    /// Known consumer types
    #[serde(default)]
    pub consumer_types: Vec<ConsumerType>,

    /// Registered consumers
    #[serde(default)]
    pub consumers: Vec<Consumer>,

    /// Which host reports which guests
    #[serde(default)]
    pub guest_mappings: Vec<GuestMapping>,

    /// Pools of the organisation
    #[serde(default)]
    pub pools: Vec<Pool>,

    /// Existing entitlements
    #[serde(default)]
    pub entitlements: Vec<EntitlementRecord>,
}

/// Guests reported by one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestMapping {
    /// Host consumer uuid
    pub host: String,

    /// Virt uuids of the guests
    pub guests: Vec<String>,
}

/// An entitlement as stored in the scenario file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementRecord {
    /// Entitlement id
    pub id: String,

    /// Consumer uuid
    pub consumer: String,

    /// Pool id
    pub pool: String,

    /// Granted units
    pub quantity: u64,
}

impl Scenario {
    /// Load a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse a scenario from TOML.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Write the scenario as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Consumer types and guest mappings, handed to the rule engines.
#[derive(Debug, Clone, Default)]
pub struct ScenarioDirectory {
    consumer_types: BTreeMap<String, ConsumerType>,
    hosts_by_guest: BTreeMap<String, Consumer>,
}

impl ConsumerDirectory for ScenarioDirectory {
    type Error = String;

    fn consumer_type(&self, consumer: &Consumer) -> std::result::Result<ConsumerType, String> {
        self.consumer_types
            .get(&consumer.type_label)
            .cloned()
            .ok_or_else(|| format!("Unknown consumer type '{}'", consumer.type_label))
    }

    fn host(&self, guest_uuid: &str, owner_id: &str) -> std::result::Result<Option<Consumer>, String> {
        Ok(self
            .hosts_by_guest
            .get(guest_uuid)
            .filter(|host| host.owner_id == owner_id)
            .cloned())
    }
}

/// In-memory store holding one scenario.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    now: u64,
    consumer_types: BTreeMap<String, ConsumerType>,
    consumers: BTreeMap<String, Consumer>,
    guest_mappings: Vec<GuestMapping>,
    pools: BTreeMap<String, Pool>,
    entitlements: BTreeMap<String, EntitlementRecord>,
}

impl MemoryStore {
    /// Build a store, checking that every reference in the scenario resolves.
    pub fn from_scenario(scenario: Scenario) -> Result<Self> {
        let mut store = Self {
            now: scenario.now.unwrap_or_else(|| SystemClock.now()),
            guest_mappings: scenario.guest_mappings,
            ..Self::default()
        };

        for consumer_type in scenario.consumer_types {
            store
                .consumer_types
                .insert(consumer_type.label.clone(), consumer_type);
        }
        for consumer in scenario.consumers {
            if !store.consumer_types.contains_key(&consumer.type_label) {
                return Err(CliError::Scenario(format!(
                    "Consumer '{}' has unknown type '{}'",
                    consumer.uuid, consumer.type_label
                )));
            }
            if store.consumers.insert(consumer.uuid.clone(), consumer.clone()).is_some() {
                return Err(CliError::Scenario(format!("Duplicate consumer '{}'", consumer.uuid)));
            }
        }
        for mapping in &store.guest_mappings {
            if !store.consumers.contains_key(&mapping.host) {
                return Err(CliError::Scenario(format!(
                    "Guest mapping names unknown host '{}'",
                    mapping.host
                )));
            }
        }
        for pool in scenario.pools {
            if store.pools.insert(pool.id.clone(), pool.clone()).is_some() {
                return Err(CliError::Scenario(format!("Duplicate pool '{}'", pool.id)));
            }
        }
        for record in scenario.entitlements {
            if !store.consumers.contains_key(&record.consumer) || !store.pools.contains_key(&record.pool) {
                return Err(CliError::Scenario(format!(
                    "Entitlement '{}' references an unknown consumer or pool",
                    record.id
                )));
            }
            if record.quantity == 0 {
                return Err(CliError::Scenario(format!("Entitlement '{}' grants no units", record.id)));
            }
            store.entitlements.insert(record.id.clone(), record);
        }

        Ok(store)
    }

    /// Snapshot the current state as a scenario.
    pub fn to_scenario(&self) -> Scenario {
        Scenario {
            now: Some(self.now),
            consumer_types: self.consumer_types.values().cloned().collect(),
            consumers: self.consumers.values().cloned().collect(),
            guest_mappings: self.guest_mappings.clone(),
            pools: self.pools.values().cloned().collect(),
            entitlements: self.entitlements.values().cloned().collect(),
        }
    }

    /// Evaluation time.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Directory view for the rule engines.
    pub fn directory(&self) -> ScenarioDirectory {
        let mut hosts_by_guest = BTreeMap::new();
        for mapping in &self.guest_mappings {
            if let Some(host) = self.consumers.get(&mapping.host) {
                for guest in &mapping.guests {
                    hosts_by_guest.insert(guest.clone(), host.clone());
                }
            }
        }
        ScenarioDirectory {
            consumer_types: self.consumer_types.clone(),
            hosts_by_guest,
        }
    }

    /// Look up a consumer.
    pub fn consumer(&self, uuid: &str) -> Result<&Consumer> {
        self.consumers.get(uuid).ok_or_else(|| CliError::NotFound {
            kind: "Consumer",
            id: uuid.to_string(),
        })
    }

    /// Resolve the type of a consumer.
    pub fn consumer_type(&self, consumer: &Consumer) -> Result<&ConsumerType> {
        self.consumer_types
            .get(&consumer.type_label)
            .ok_or_else(|| CliError::NotFound {
                kind: "Consumer type",
                id: consumer.type_label.clone(),
            })
    }

    /// Look up a pool.
    pub fn pool(&self, id: &str) -> Result<&Pool> {
        self.pools.get(id).ok_or_else(|| CliError::NotFound {
            kind: "Pool",
            id: id.to_string(),
        })
    }

    /// All pools, ordered by id.
    pub fn pools(&self) -> Vec<Pool> {
        self.pools.values().cloned().collect()
    }

    /// Pools of one owner, ordered by id.
    pub fn pools_for_owner(&self, owner_id: &str) -> Vec<Pool> {
        self.pools
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect()
    }

    /// Resolve an entitlement record into a full entitlement.
    pub fn entitlement(&self, id: &str) -> Result<Entitlement> {
        let record = self.entitlements.get(id).ok_or_else(|| CliError::NotFound {
            kind: "Entitlement",
            id: id.to_string(),
        })?;
        Entitlement::new(
            record.id.clone(),
            self.consumer(&record.consumer)?.clone(),
            self.pool(&record.pool)?.clone(),
            record.quantity,
        )
        .map_err(CliError::Scenario)
    }

    /// Host-restricted pools already created for the consumer's stacks.
    pub fn stack_sub_pools(&self, consumer: &Consumer) -> Vec<Pool> {
        self.pools
            .values()
            .filter(|p| p.source_stack_id.is_some())
            .filter(|p| p.attribute(attributes::REQUIRES_HOST) == Some(consumer.uuid.as_str()))
            .cloned()
            .collect()
    }

    /// Next free entitlement id.
    pub fn next_entitlement_id(&self) -> String {
        (1..)
            .map(|n| format!("ent-{}", n))
            .find(|id| !self.entitlements.contains_key(id))
            .unwrap_or_default()
    }

    /// Record a granted entitlement and count it against its pool.
    pub fn record_entitlement(&mut self, entitlement: &Entitlement, exported: bool) -> Result<()> {
        let pool = self.pool_mut(&entitlement.pool.id)?;
        pool.consumed = pool.consumed.saturating_add(entitlement.quantity);
        if exported {
            pool.exported = pool.exported.saturating_add(entitlement.quantity);
        }
        self.entitlements.insert(
            entitlement.id.clone(),
            EntitlementRecord {
                id: entitlement.id.clone(),
                consumer: entitlement.consumer.uuid.clone(),
                pool: entitlement.pool.id.clone(),
                quantity: entitlement.quantity,
            },
        );
        Ok(())
    }

    /// Drop an entitlement and release its units.
    pub fn remove_entitlement(&mut self, entitlement: &Entitlement, exported: bool) -> Result<()> {
        self.entitlements.remove(&entitlement.id);
        let pool = self.pool_mut(&entitlement.pool.id)?;
        pool.consumed = pool.consumed.saturating_sub(entitlement.quantity);
        if exported {
            pool.exported = pool.exported.saturating_sub(entitlement.quantity);
        }
        Ok(())
    }

    fn pool_mut(&mut self, id: &str) -> Result<&mut Pool> {
        self.pools.get_mut(id).ok_or_else(|| CliError::NotFound {
            kind: "Pool",
            id: id.to_string(),
        })
    }
}

impl PoolWriter for MemoryStore {
    type Error = String;

    fn set_pool_quantity(&mut self, pool_id: &str, quantity: Capacity) -> std::result::Result<(), String> {
        let pool = self
            .pools
            .get_mut(pool_id)
            .ok_or_else(|| format!("No pool '{}'", pool_id))?;
        pool.quantity = quantity;
        Ok(())
    }

    fn create_pool(&mut self, pool: Pool) -> std::result::Result<(), String> {
        if self.pools.contains_key(&pool.id) {
            return Err(format!("Pool '{}' already exists", pool.id));
        }
        self.pools.insert(pool.id.clone(), pool);
        Ok(())
    }
}

impl PoolManager for MemoryStore {
    fn pools_by_subscription_id(
        &self,
        owner_id: &str,
        subscription_id: &str,
    ) -> std::result::Result<Vec<Pool>, String> {
        let ids = BTreeSet::from([subscription_id.to_string()]);
        self.pools_by_subscription_ids(owner_id, &ids)
    }

    fn pools_by_subscription_ids(
        &self,
        owner_id: &str,
        subscription_ids: &BTreeSet<String>,
    ) -> std::result::Result<Vec<Pool>, String> {
        Ok(self
            .pools
            .values()
            .filter(|p| p.owner_id == owner_id)
            .filter(|p| p.subscription_id.as_ref().is_some_and(|s| subscription_ids.contains(s)))
            .cloned()
            .collect())
    }

    fn create_host_restricted_pools(
        &self,
        consumer: &Consumer,
        pools: &[&Pool],
        entitlements: &BTreeMap<String, Entitlement>,
        attribute_maps: &BTreeMap<String, Attributes>,
    ) -> std::result::Result<PoolOperationCallback, String> {
        let mut callback = PoolOperationCallback::new();
        let mut taken: BTreeSet<String> = BTreeSet::new();

        for pool in pools {
            let flattened = attribute_maps
                .get(&pool.id)
                .cloned()
                .unwrap_or_else(|| pool.flattened_attributes());
            let quantity = match flattened.get(attributes::VIRT_LIMIT).and_then(|v| VirtLimit::parse(v)) {
                Some(VirtLimit::Limited(limit)) => Capacity::count(u64::try_from(limit).unwrap_or(0)),
                Some(VirtLimit::Unlimited) => Capacity::Unlimited,
                None => return Err(format!("Pool '{}' has no usable virt_limit", pool.id)),
            };

            // One sub-pool per source entitlement
            let base = match entitlements.get(&pool.id) {
                Some(source) => format!("{}-{}-{}", pool.id, consumer.uuid, source.id),
                None => format!("{}-{}", pool.id, consumer.uuid),
            };
            let id = (1..)
                .map(|n| if n == 1 { base.clone() } else { format!("{}-{}", base, n) })
                .find(|id| !self.pools.contains_key(id) && !taken.contains(id))
                .unwrap_or(base);
            taken.insert(id.clone());

            let mut derived = Pool::new(
                id,
                &pool.owner_id,
                &pool.product_id,
                quantity,
            )
            .with_attribute(attributes::DERIVED_POOL, "true")
            .with_attribute(attributes::VIRT_ONLY, "true")
            .with_attribute(attributes::REQUIRES_HOST, &consumer.uuid);
            derived.subscription_id = pool.subscription_id.clone();
            derived.product_name = pool.product_name.clone();
            derived.product_attributes = pool.product_attributes.clone();
            derived.start_date = pool.start_date;
            derived.end_date = pool.end_date;
            derived.source_stack_id = flattened.get(attributes::STACKING_ID).cloned();

            callback.create_pool(derived);
        }

        Ok(callback)
    }
}
