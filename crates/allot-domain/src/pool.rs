//! Pool module - blocks of entitlement capacity tied to a subscription

use crate::attributes::{self, Attributes};
use crate::Capacity;

/// A block of entitlement capacity
///
/// Pools are owned by the persistence layer; the rules only read them.
/// Attributes come from two sources: the pool itself and the product it
/// grants. When both define a key the pool's value wins.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pool {
    /// Unique identifier
    pub id: String,

    /// Owning organisation
    pub owner_id: String,

    /// Subscription this pool was created from (shared by physical and derived pools)
    #[cfg_attr(feature = "serde", serde(default))]
    pub subscription_id: Option<String>,

    /// Product granted by this pool
    pub product_id: String,

    /// Product display name
    #[cfg_attr(feature = "serde", serde(default))]
    pub product_name: String,

    /// Total capacity
    pub quantity: Capacity,

    /// Units currently granted to consumers (including exported units)
    #[cfg_attr(feature = "serde", serde(default))]
    pub consumed: u64,

    /// Units granted to manifest consumers and exported downstream
    #[cfg_attr(feature = "serde", serde(default))]
    pub exported: u64,

    /// Start of validity (seconds since the Unix epoch)
    #[cfg_attr(feature = "serde", serde(default))]
    pub start_date: u64,

    /// End of validity (seconds since the Unix epoch)
    pub end_date: u64,

    /// Attributes set on the pool itself
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: Attributes,

    /// Attributes of the granted product
    #[cfg_attr(feature = "serde", serde(default))]
    pub product_attributes: Attributes,

    /// Stacking id of the entitlements this pool was derived from
    #[cfg_attr(feature = "serde", serde(default))]
    pub source_stack_id: Option<String>,
}

impl Pool {
    /// Create a pool valid from the epoch onwards with no attributes
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        product_id: impl Into<String>,
        quantity: Capacity,
    ) -> Self {
        let product_id = product_id.into();
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            subscription_id: None,
            product_name: product_id.clone(),
            product_id,
            quantity,
            consumed: 0,
            exported: 0,
            start_date: 0,
            end_date: u64::MAX,
            attributes: Attributes::new(),
            product_attributes: Attributes::new(),
            source_stack_id: None,
        }
    }

    /// Builder-style helper to set the subscription id
    pub fn with_subscription(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }

    /// Builder-style helper to add a pool attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder-style helper to add a product attribute
    pub fn with_product_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.product_attributes.insert(key.into(), value.into());
        self
    }

    /// Pool attribute only
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Product attribute only
    pub fn product_attribute(&self, key: &str) -> Option<&str> {
        self.product_attributes.get(key).map(String::as_str)
    }

    /// Attribute from the merged view (pool value first, then product)
    pub fn merged_attribute(&self, key: &str) -> Option<&str> {
        self.attribute(key).or_else(|| self.product_attribute(key))
    }

    /// Whether the merged view carries `key`
    pub fn has_merged_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key) || self.product_attributes.contains_key(key)
    }

    /// Merge product and pool attributes into one map, pool values taking precedence
    pub fn flattened_attributes(&self) -> Attributes {
        let mut merged = self.product_attributes.clone();
        merged.extend(
            self.attributes
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        merged
    }

    /// Whether this is a bonus pool derived from a physical pool
    pub fn is_derived(&self) -> bool {
        self.attributes.contains_key(attributes::DERIVED_POOL)
    }

    /// Whether capacity is unbounded
    pub fn is_unlimited(&self) -> bool {
        self.quantity.is_unlimited()
    }

    /// Whether `quantity` more units can be granted
    pub fn entitlements_available(&self, quantity: i64) -> bool {
        self.quantity.available(self.consumed, quantity)
    }

    /// Whether the pool ended before `now`
    pub fn is_expired(&self, now: u64) -> bool {
        self.end_date < now
    }
}

/// A pool paired with a requested (or changed) quantity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolQuantity {
    /// The pool
    pub pool: Pool,

    /// Requested units; negative when an update gives units back
    pub quantity: i64,
}

impl PoolQuantity {
    /// Pair a pool with a quantity
    pub fn new(pool: Pool, quantity: i64) -> Self {
        Self { pool, quantity }
    }
}
